use super::exec;
use super::fcw::Fcw;
use super::table::Handler;

/// A run of opcodes sharing length, timing and handler.
pub struct OpcodeRange {
    pub first: u16,
    pub last: u16,
    pub step: u16,
    /// Length in words on the Z8002.
    pub words: u8,
    pub cycles: u8,
    /// Carries a direct address operand (one word longer on the Z8001).
    pub direct_address: bool,
    pub handler: Handler,
}

// op!(first, last, step, words, cycles, handler)
// op!(first, last, step, words, cycles, handler, da) for direct-address forms
macro_rules! op {
    ($first:expr, $last:expr, $step:expr, $words:expr, $cycles:expr, $h:path) => {
        OpcodeRange {
            first: $first,
            last: $last,
            step: $step,
            words: $words,
            cycles: $cycles,
            direct_address: false,
            handler: $h,
        }
    };
    ($first:expr, $last:expr, $step:expr, $words:expr, $cycles:expr, $h:path, da) => {
        OpcodeRange {
            first: $first,
            last: $last,
            step: $step,
            words: $words,
            cycles: $cycles,
            direct_address: true,
            handler: $h,
        }
    };
}

/// Implemented opcodes. Later entries override earlier ones.
pub const OPCODES: &[OpcodeRange] = &[
    // immediate arithmetic, 0x010d/0x030d/0x0b0d imm16
    op!(0x0100, 0x010f, 1, 2, 7, exec::add_imm),
    op!(0x0300, 0x030f, 1, 2, 7, exec::sub_imm),
    op!(0x0b00, 0x0b0f, 1, 2, 7, exec::cp_imm),
    // LDL RRd,#imm32
    op!(0x1400, 0x140f, 1, 3, 11, exec::ldl_imm),
    // JP cc,@Rd / CALL @Rd
    op!(0x1e10, 0x1eff, 1, 1, 10, exec::jp_ir),
    op!(0x1f10, 0x1ff0, 0x10, 1, 10, exec::call_ir),
    // LD Rd,#imm16 / LD Rd,@Rs / LD @Rd,Rs
    op!(0x2100, 0x210f, 1, 2, 7, exec::ld_imm),
    op!(0x2110, 0x21ff, 1, 1, 7, exec::ld_ir),
    op!(0x2f10, 0x2fff, 1, 1, 8, exec::st_ir),
    // IN/SIN/OUT/SOUT with a direct port, byte and word
    op!(0x3a04, 0x3af4, 0x10, 2, 12, exec::io_direct_byte),
    op!(0x3a05, 0x3af5, 0x10, 2, 12, exec::io_direct_byte),
    op!(0x3a06, 0x3af6, 0x10, 2, 12, exec::io_direct_byte),
    op!(0x3a07, 0x3af7, 0x10, 2, 12, exec::io_direct_byte),
    op!(0x3b04, 0x3bf4, 0x10, 2, 12, exec::io_direct),
    op!(0x3b05, 0x3bf5, 0x10, 2, 12, exec::io_direct),
    op!(0x3b06, 0x3bf6, 0x10, 2, 12, exec::io_direct),
    op!(0x3b07, 0x3bf7, 0x10, 2, 12, exec::io_direct),
    // INB/IN/OUTB/OUT through a port register
    op!(0x3c10, 0x3cff, 1, 1, 10, exec::inb_ir),
    op!(0x3d10, 0x3dff, 1, 1, 10, exec::in_ir),
    op!(0x3e10, 0x3eff, 1, 1, 12, exec::outb_ir),
    op!(0x3f10, 0x3fff, 1, 1, 12, exec::out_ir),
    // JP cc,addr / CALL addr
    op!(0x5e00, 0x5e0f, 1, 2, 7, exec::jp_da, da),
    op!(0x5f00, 0x5f00, 1, 2, 12, exec::call_da, da),
    // LD Rd,addr / LD addr,Rs
    op!(0x6100, 0x610f, 1, 2, 9, exec::ld_da, da),
    op!(0x6f00, 0x6f0f, 1, 2, 11, exec::st_da, da),
    op!(0x7a00, 0x7a00, 1, 1, 8, exec::halt),
    op!(0x7b00, 0x7b00, 1, 1, 13, exec::iret),
    op!(0x7c00, 0x7c03, 1, 1, 7, exec::di),
    op!(0x7c04, 0x7c07, 1, 1, 7, exec::ei),
    // LDCTL: FCW, REFRESH, PSAP and NSP, read (low nibble < 8) and write
    op!(0x7d02, 0x7df2, 0x10, 1, 7, exec::ldctl),
    op!(0x7d03, 0x7df3, 0x10, 1, 7, exec::ldctl),
    op!(0x7d05, 0x7df5, 0x10, 1, 7, exec::ldctl),
    op!(0x7d07, 0x7df7, 0x10, 1, 7, exec::ldctl),
    op!(0x7d0a, 0x7dfa, 0x10, 1, 7, exec::ldctl),
    op!(0x7d0b, 0x7dfb, 0x10, 1, 7, exec::ldctl),
    op!(0x7d0d, 0x7dfd, 0x10, 1, 7, exec::ldctl),
    op!(0x7d0f, 0x7dff, 0x10, 1, 7, exec::ldctl),
    op!(0x7f00, 0x7fff, 1, 1, 33, exec::sc),
    // register-register ALU
    op!(0x8100, 0x81ff, 1, 1, 4, exec::add_rr),
    op!(0x8300, 0x83ff, 1, 1, 4, exec::sub_rr),
    op!(0x8500, 0x85ff, 1, 1, 4, exec::or_rr),
    op!(0x8700, 0x87ff, 1, 1, 4, exec::and_rr),
    op!(0x8900, 0x89ff, 1, 1, 4, exec::xor_rr),
    op!(0x8b00, 0x8bff, 1, 1, 4, exec::cp_rr),
    // single register and flag group
    op!(0x8d00, 0x8df0, 0x10, 1, 7, exec::com),
    op!(0x8d01, 0x8df1, 0x10, 1, 7, exec::setflg),
    op!(0x8d02, 0x8df2, 0x10, 1, 7, exec::neg),
    op!(0x8d03, 0x8df3, 0x10, 1, 7, exec::resflg),
    op!(0x8d04, 0x8df4, 0x10, 1, 7, exec::test),
    op!(0x8d05, 0x8df5, 0x10, 1, 7, exec::comflg),
    op!(0x8d08, 0x8df8, 0x10, 1, 7, exec::clr),
    op!(0x8d07, 0x8d07, 1, 1, 7, exec::nop),
    op!(0x9310, 0x93ff, 1, 1, 9, exec::push),
    op!(0x9400, 0x94ff, 1, 1, 5, exec::ldl_rr),
    op!(0x9600, 0x96ff, 1, 1, 8, exec::addl_rr),
    op!(0x9710, 0x97ff, 1, 1, 8, exec::pop),
    op!(0x9e00, 0x9e0f, 1, 1, 10, exec::ret),
    op!(0xa100, 0xa1ff, 1, 1, 3, exec::ld_rr),
    op!(0xa900, 0xa9ff, 1, 1, 4, exec::inc),
    op!(0xab00, 0xabff, 1, 1, 4, exec::dec),
    op!(0xc000, 0xcfff, 1, 1, 5, exec::ldb_imm),
    op!(0xe000, 0xefff, 1, 1, 6, exec::jr),
    op!(0xf000, 0xffff, 1, 1, 11, exec::djnz),
];

/// Bits 3-0 of an opcode word.
pub fn lo(op: u16) -> u16 {
    op & 0x000f
}

/// Bits 7-4 of an opcode word.
pub fn hi(op: u16) -> u16 {
    (op >> 4) & 0x000f
}

/// Bits 11-8 of an opcode word.
pub fn top(op: u16) -> u16 {
    (op >> 8) & 0x000f
}

/// Evaluate a 4-bit condition code against the flags.
pub fn condition(fcw: u16, cc: u16) -> bool {
    let f = Fcw::from_bits_retain(fcw);
    let c = f.contains(Fcw::C);
    let z = f.contains(Fcw::Z);
    let s = f.contains(Fcw::S);
    let v = f.contains(Fcw::PV);
    match cc & 0xf {
        0x0 => false,
        0x1 => s ^ v,
        0x2 => z || (s ^ v),
        0x3 => c || z,
        0x4 => v,
        0x5 => s,
        0x6 => z,
        0x7 => c,
        0x8 => true,
        0x9 => !(s ^ v),
        0xa => !(z || (s ^ v)),
        0xb => !(c || z),
        0xc => !v,
        0xd => !s,
        0xe => !z,
        _ => !c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_codes_pair_up_as_complements() {
        for fcw in [0u16, 0x0080, 0x0040, 0x0020, 0x0010, 0x00f0, 0x0030] {
            for cc in 0..8 {
                assert_ne!(condition(fcw, cc), condition(fcw, cc + 8), "fcw={fcw:04x} cc={cc}");
            }
        }
    }

    #[test]
    fn signed_less_than_uses_sign_xor_overflow() {
        assert!(condition(Fcw::S.bits(), 0x1));
        assert!(!condition((Fcw::S | Fcw::PV).bits(), 0x1));
        assert!(condition(Fcw::Z.bits(), 0x2));
    }

    #[test]
    fn ranges_are_well_formed() {
        for r in OPCODES {
            assert!(r.first <= r.last, "{:04x}", r.first);
            assert!(r.step > 0);
            assert!((1..=3).contains(&r.words));
        }
    }

    #[test]
    fn field_helpers() {
        assert_eq!(lo(0x8135), 0x5);
        assert_eq!(hi(0x8135), 0x3);
        assert_eq!(top(0xe7fe), 0x7);
    }
}
