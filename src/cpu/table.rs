//! Opcode dispatch tables, one per CPU variant, shared by every live CPU of
//! that variant.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::decode::{OPCODES, OpcodeRange};
use super::exec;
use super::{Variant, Z8000};

/// Instruction handler. Receives the CPU and the fetched instruction words;
/// unused trailing words are zero.
pub type Handler = fn(&mut Z8000, [u16; 3]);

#[derive(Clone, Copy)]
pub struct OpcodeEntry {
    /// Instruction length in words, including the opcode (1-3).
    pub words: u8,
    pub cycles: u8,
    pub handler: Handler,
}

impl std::fmt::Debug for OpcodeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeEntry")
            .field("words", &self.words)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

/// Cycles charged for opcodes without an implementation.
pub const ILLEGAL_CYCLES: u8 = 4;

const ILLEGAL: OpcodeEntry = OpcodeEntry {
    words: 1,
    cycles: ILLEGAL_CYCLES,
    handler: exec::illegal,
};

pub struct OpcodeTable {
    variant: Variant,
    entries: Box<[OpcodeEntry]>,
}

impl OpcodeTable {
    /// Build the full 64K entry table. Later ranges in [`OPCODES`] override
    /// earlier ones; anything left over is the illegal-instruction stub.
    pub fn build(variant: Variant) -> Self {
        let mut entries = vec![ILLEGAL; 0x1_0000].into_boxed_slice();
        for range in OPCODES {
            let words = range.words + variant_extra_words(variant, range);
            let mut op = range.first as u32;
            while op <= range.last as u32 {
                entries[op as usize] = OpcodeEntry {
                    words,
                    cycles: range.cycles,
                    handler: range.handler,
                };
                op += range.step as u32;
            }
        }
        Self { variant, entries }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn entry(&self, opcode: u16) -> &OpcodeEntry {
        &self.entries[opcode as usize]
    }

    /// Smallest and largest instruction length in words.
    pub fn length_bounds(&self) -> (u8, u8) {
        bounds(self.entries.iter().map(|e| e.words))
    }

    /// Smallest and largest cycle cost.
    pub fn cycle_bounds(&self) -> (u8, u8) {
        bounds(self.entries.iter().map(|e| e.cycles))
    }
}

impl std::fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeTable")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

fn bounds(values: impl Iterator<Item = u8>) -> (u8, u8) {
    values.fold((u8::MAX, 0), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

// Z8001 direct addresses take a segment word plus an offset word.
fn variant_extra_words(variant: Variant, range: &OpcodeRange) -> u8 {
    match variant {
        Variant::Z8001 if range.direct_address => 1,
        _ => 0,
    }
}

struct Slot {
    table: Arc<OpcodeTable>,
    users: usize,
}

/// Reference-counted tables keyed by variant.
///
/// `acquire` builds a table only when none is live for the variant and
/// otherwise hands out the existing one; `release` frees it once the last
/// user is gone.
#[derive(Default)]
pub struct Registry {
    slots: HashMap<Variant, Slot>,
}

impl Registry {
    pub fn acquire(&mut self, variant: Variant) -> Arc<OpcodeTable> {
        let slot = self.slots.entry(variant).or_insert_with(|| {
            debug!("building {:?} opcode table", variant);
            Slot {
                table: Arc::new(OpcodeTable::build(variant)),
                users: 0,
            }
        });
        slot.users += 1;
        Arc::clone(&slot.table)
    }

    pub fn release(&mut self, variant: Variant) {
        let Some(slot) = self.slots.get_mut(&variant) else {
            return;
        };
        slot.users = slot.users.saturating_sub(1);
        if slot.users == 0 {
            debug!("releasing {:?} opcode table", variant);
            self.slots.remove(&variant);
        }
    }

    pub fn users(&self, variant: Variant) -> usize {
        self.slots.get(&variant).map_or(0, |s| s.users)
    }

    pub fn is_built(&self, variant: Variant) -> bool {
        self.slots.contains_key(&variant)
    }
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

/// Shared table for `variant`, built on first use.
pub fn acquire(variant: Variant) -> Arc<OpcodeTable> {
    REGISTRY.lock().acquire(variant)
}

/// Drop one reference taken by [`acquire`].
pub fn release(variant: Variant) {
    REGISTRY.lock().release(variant)
}

/// Number of live CPUs holding the `variant` table.
pub fn users(variant: Variant) -> usize {
    REGISTRY.lock().users(variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_twice_shares_one_table() {
        let mut reg = Registry::default();
        let a = reg.acquire(Variant::Z8002);
        let b = reg.acquire(Variant::Z8002);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.users(Variant::Z8002), 2);
        assert!(!reg.is_built(Variant::Z8001));
    }

    #[test]
    fn release_frees_after_last_user() {
        let mut reg = Registry::default();
        let a = reg.acquire(Variant::Z8001);
        let _b = reg.acquire(Variant::Z8001);
        reg.release(Variant::Z8001);
        assert!(reg.is_built(Variant::Z8001));
        reg.release(Variant::Z8001);
        assert!(!reg.is_built(Variant::Z8001));
        // a fresh acquire builds a new table; the old one lives on in `a`
        let c = reg.acquire(Variant::Z8001);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn release_of_unknown_variant_is_ignored() {
        let mut reg = Registry::default();
        reg.release(Variant::Z8002);
        assert_eq!(reg.users(Variant::Z8002), 0);
    }

    #[test]
    fn variants_differ_only_in_direct_address_length() {
        let seg = OpcodeTable::build(Variant::Z8001);
        let nonseg = OpcodeTable::build(Variant::Z8002);
        // JP cc,addr
        assert_eq!(nonseg.entry(0x5e08).words, 2);
        assert_eq!(seg.entry(0x5e08).words, 3);
        // LD R,#imm
        assert_eq!(nonseg.entry(0x2101).words, 2);
        assert_eq!(seg.entry(0x2101).words, 2);
    }

    #[test]
    fn unlisted_opcodes_map_to_the_stub() {
        let table = OpcodeTable::build(Variant::Z8002);
        let e = table.entry(0x0fff);
        assert_eq!(e.words, 1);
        assert_eq!(e.cycles, ILLEGAL_CYCLES);
        assert_eq!(table.length_bounds(), (1, 3));
    }
}
