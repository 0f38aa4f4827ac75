use bitflags::bitflags;

bitflags! {
    /// Flags and control word.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Fcw: u16 {
        /// Extended processing architecture.
        const EPA  = 0x8000;
        /// System mode; normal mode when clear.
        const SYS  = 0x4000;
        /// Segmented mode (Z8001).
        const SEG  = 0x2000;
        /// Vectored interrupt enable.
        const VIE  = 0x1000;
        /// Non-vectored interrupt enable.
        const NVIE = 0x0800;
        const C    = 0x0080;
        const Z    = 0x0040;
        const S    = 0x0020;
        /// Parity / overflow.
        const PV   = 0x0010;
        /// Decimal adjust.
        const DA   = 0x0008;
        /// Half carry.
        const H    = 0x0004;
    }
}

// One character per bit, most significant first; bits with no name use '*'.
// S is system mode, M (minus) the sign flag.
const FLAG_CHARS: [u8; 16] = *b"ESGVN***CZMPDH**";

/// 16 character display of `fcw`, '.' for clear bits.
pub fn flags_string(fcw: u16) -> String {
    FLAG_CHARS
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if fcw & (0x8000 >> i) != 0 {
                c as char
            } else {
                '.'
            }
        })
        .collect()
}

impl Fcw {
    /// Flags affected by SETFLG / RESFLG / COMFLG, from bits 7-4 of the opcode.
    pub fn from_flag_mask(op: u16) -> Self {
        Self::from_bits_truncate(op & 0x00f0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_string_marks_set_bits() {
        assert_eq!(flags_string(0), "................");
        assert_eq!(flags_string(0x4000 | 0x0080 | 0x0040), ".S......CZ......");
        assert_eq!(flags_string(0xffff).len(), 16);
        assert_eq!(flags_string(0x0100), ".......*........");
        assert_eq!(flags_string(0x0020), "..........M.....");
        assert_eq!(flags_string(0x4020), ".S........M.....");
    }

    #[test]
    fn flag_mask_maps_opcode_nibble() {
        assert_eq!(Fcw::from_flag_mask(0x8d81), Fcw::C);
        assert_eq!(Fcw::from_flag_mask(0x8df1), Fcw::C | Fcw::Z | Fcw::S | Fcw::PV);
    }
}
