/// General purpose registers R0-R15.
///
/// One 32 byte backing store seen four ways: 16 bytes (RH/RL halves of
/// R0-R7), 16 words (R0-R15), 8 longs (RR0-RR14) and 4 quads (RQ0-RQ12).
/// Every view is big endian: the lower index holds the more significant
/// half, so `byte(2 * i)` is the high byte of `word(i)` and `word(2 * i)` is
/// the high half of `long(i)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile {
    bytes: [u8; 32],
}

/// Word index of the stack pointer (R15). A segmented Z8001 keeps the stack
/// segment in R14.
pub const SP: usize = 15;

impl RegisterFile {
    pub fn byte(&self, i: usize) -> u8 {
        self.bytes[i]
    }

    pub fn set_byte(&mut self, i: usize, v: u8) {
        self.bytes[i] = v;
    }

    pub fn word(&self, i: usize) -> u16 {
        let o = i * 2;
        u16::from_be_bytes([self.bytes[o], self.bytes[o + 1]])
    }

    pub fn set_word(&mut self, i: usize, v: u16) {
        let o = i * 2;
        self.bytes[o..o + 2].copy_from_slice(&v.to_be_bytes());
    }

    pub fn long(&self, i: usize) -> u32 {
        let o = i * 4;
        let b = &self.bytes[o..o + 4];
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    pub fn set_long(&mut self, i: usize, v: u32) {
        let o = i * 4;
        self.bytes[o..o + 4].copy_from_slice(&v.to_be_bytes());
    }

    pub fn quad(&self, i: usize) -> u64 {
        let o = i * 8;
        let b = &self.bytes[o..o + 8];
        u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    pub fn set_quad(&mut self, i: usize, v: u64) {
        let o = i * 8;
        self.bytes[o..o + 8].copy_from_slice(&v.to_be_bytes());
    }

    // Instruction encodings use 0-7 for RH0-RH7 and 8-15 for RL0-RL7.
    fn byte_field(field: u16) -> usize {
        let n = (field & 7) as usize;
        n * 2 + ((field >> 3) & 1) as usize
    }

    /// Byte register named by a 4-bit instruction field.
    pub fn rb(&self, field: u16) -> u8 {
        self.byte(Self::byte_field(field))
    }

    pub fn set_rb(&mut self, field: u16, v: u8) {
        self.set_byte(Self::byte_field(field), v)
    }

    /// Word register named by a 4-bit instruction field.
    pub fn rw(&self, field: u16) -> u16 {
        self.word((field & 15) as usize)
    }

    pub fn set_rw(&mut self, field: u16, v: u16) {
        self.set_word((field & 15) as usize, v)
    }

    /// Long register RRn named by an (even) 4-bit instruction field.
    pub fn rl(&self, field: u16) -> u32 {
        self.long(((field & 15) >> 1) as usize)
    }

    pub fn set_rl(&mut self, field: u16, v: u32) {
        self.set_long(((field & 15) >> 1) as usize, v)
    }
}
