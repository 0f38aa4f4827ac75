use z8000_emu::cpu::table;
use z8000_emu::mem::{FixedVectors, NoPorts, Ram};
use z8000_emu::{Variant, Z8000};

// The registry is process-wide, so everything touching it lives in one test.
#[test]
fn instances_share_one_table_per_variant() {
    assert_eq!(table::users(Variant::Z8001), 0);

    let a = Z8000::new(Variant::Z8001, Ram::new(16), NoPorts, FixedVectors::default());
    let jp = *a.table().entry(0x5e08);
    let b = Z8000::new(Variant::Z8001, Ram::new(16), NoPorts, FixedVectors::default());
    assert_eq!(table::users(Variant::Z8001), 2);
    assert!(std::ptr::eq(a.table(), b.table()));

    // building again left existing entries alone
    let again = a.table().entry(0x5e08);
    assert_eq!((again.words, again.cycles), (jp.words, jp.cycles));
    assert_eq!(again.words, 3);

    let c = Z8000::new(Variant::Z8002, Ram::new(16), NoPorts, FixedVectors::default());
    assert!(!std::ptr::eq(a.table(), c.table()));
    assert_eq!(c.table().entry(0x5e08).words, 2);

    drop(a);
    assert_eq!(table::users(Variant::Z8001), 1);
    b.exit();
    assert_eq!(table::users(Variant::Z8001), 0);
    drop(c);
    assert_eq!(table::users(Variant::Z8002), 0);
}
