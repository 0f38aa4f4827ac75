//! Host capabilities consumed by the CPU core, plus simple RAM and port
//! implementations for standalone use.

/// Value returned by reads that hit nothing.
pub const OPEN_BUS: u8 = 0xff;

/// Program address space. Data is big endian, 16 bits wide.
///
/// Only the byte accessors are required; word and long accesses are composed
/// from them. Hosts with a native 16-bit bus can override the wider accessors.
pub trait ProgramSpace {
    fn read_byte(&mut self, addr: u32) -> u8;
    fn write_byte(&mut self, addr: u32, value: u8);

    fn read_word(&mut self, addr: u32) -> u16 {
        u16::from_be_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    fn write_word(&mut self, addr: u32, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(addr, hi);
        self.write_byte(addr.wrapping_add(1), lo);
    }

    /// Two word accesses, high half first.
    fn read_long(&mut self, addr: u32) -> u32 {
        let hi = self.read_word(addr) as u32;
        let lo = self.read_word(addr.wrapping_add(2)) as u32;
        hi << 16 | lo
    }

    fn write_long(&mut self, addr: u32, value: u32) {
        self.write_word(addr, (value >> 16) as u16);
        self.write_word(addr.wrapping_add(2), value as u16);
    }

    /// Instruction fetch. Hosts with encrypted opcode regions return the
    /// decrypted word here while `read_word` keeps returning raw data.
    fn fetch_opcode(&mut self, addr: u32) -> u16 {
        self.read_word(addr)
    }
}

/// I/O address space: 16-bit port numbers, 8-bit data.
pub trait IoSpace {
    fn read_port(&mut self, port: u16) -> u8;
    fn write_port(&mut self, port: u16, value: u8);
}

/// Source of request tags for the maskable interrupt lines.
///
/// Called with line 0 (NVI) or 1 (VI) while the line is being serviced. The
/// returned tag is fed back through the interrupt controller's request gate,
/// see [`crate::cpu::interrupt::InterruptRequest::from_tag`].
pub trait IrqAcknowledge {
    fn irq_ack(&mut self, line: u8) -> u16;
}

/// I/O space with nothing attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPorts;

impl IoSpace for NoPorts {
    fn read_port(&mut self, _port: u16) -> u8 {
        OPEN_BUS
    }

    fn write_port(&mut self, _port: u16, _value: u8) {}
}

/// Flat RAM mapped at address 0. Reads past the end return [`OPEN_BUS`],
/// writes past the end are dropped.
#[derive(Debug, Clone)]
pub struct Ram {
    data: Vec<u8>,
    /// Decrypted opcode bytes and the address they start at.
    opcodes: Option<(u32, Vec<u8>)>,
}

impl Ram {
    pub fn new(bytes: usize) -> Self {
        Self {
            data: vec![0; bytes],
            opcodes: None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Install a decrypted copy of the program used for opcode fetches only.
    /// Addresses beyond the overlay fall back to the plain data.
    pub fn set_decrypted_opcodes(&mut self, opcodes: Vec<u8>) {
        self.set_decrypted_opcodes_at(0, opcodes);
    }

    /// Same as [`Ram::set_decrypted_opcodes`] for an overlay starting at
    /// `base`. Fetches outside `base..base + len` read the plain data.
    pub fn set_decrypted_opcodes_at(&mut self, base: u32, opcodes: Vec<u8>) {
        self.opcodes = Some((base, opcodes));
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn peek(&self, addr: u32) -> u8 {
        self.data.get(addr as usize).copied().unwrap_or(OPEN_BUS)
    }
}

impl ProgramSpace for Ram {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.peek(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        if let Some(b) = self.data.get_mut(addr as usize) {
            *b = value;
        }
    }

    fn fetch_opcode(&mut self, addr: u32) -> u16 {
        let at = |a: u32| match &self.opcodes {
            Some((base, opcodes)) => a
                .checked_sub(*base)
                .and_then(|off| opcodes.get(off as usize))
                .copied()
                .unwrap_or_else(|| self.peek(a)),
            None => self.peek(a),
        };
        u16::from_be_bytes([at(addr), at(addr.wrapping_add(1))])
    }
}

/// A 64K bank of port latches: a read returns the last value written.
#[derive(Clone)]
pub struct Ports {
    latches: Box<[u8]>,
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            latches: vec![OPEN_BUS; 0x1_0000].into_boxed_slice(),
        }
    }
}

impl std::fmt::Debug for Ports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ports").finish_non_exhaustive()
    }
}

impl IoSpace for Ports {
    fn read_port(&mut self, port: u16) -> u8 {
        self.latches[port as usize]
    }

    fn write_port(&mut self, port: u16, value: u8) {
        self.latches[port as usize] = value;
    }
}

/// Acknowledge source answering every NVI/VI cycle with a fixed tag.
#[derive(Debug, Clone, Copy)]
pub struct FixedVectors {
    pub nvi: u16,
    pub vi: u16,
}

impl Default for FixedVectors {
    fn default() -> Self {
        use crate::cpu::interrupt::{REQ_NVI, REQ_VI};
        Self {
            nvi: REQ_NVI,
            vi: REQ_VI,
        }
    }
}

impl IrqAcknowledge for FixedVectors {
    fn irq_ack(&mut self, line: u8) -> u16 {
        if line == 0 { self.nvi } else { self.vi }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_is_big_endian_and_open_bus_past_end() {
        let mut ram = Ram::new(4);
        ram.write_word(0, 0x1234);
        assert_eq!(ram.read_byte(0), 0x12);
        assert_eq!(ram.read_byte(1), 0x34);
        assert_eq!(ram.read_word(4), 0xffff);
        ram.write_byte(10, 0x55);
        assert_eq!(ram.read_byte(10), OPEN_BUS);
    }

    #[test]
    fn decrypted_overlay_only_affects_fetches() {
        let mut ram = Ram::new(8);
        ram.write_word(2, 0xaaaa);
        ram.set_decrypted_opcodes(vec![0, 0, 0x8d, 0x07]);
        assert_eq!(ram.read_word(2), 0xaaaa);
        assert_eq!(ram.fetch_opcode(2), 0x8d07);
        // beyond the overlay the plain data is used
        ram.write_word(4, 0x7a00);
        assert_eq!(ram.fetch_opcode(4), 0x7a00);
    }

    #[test]
    fn based_overlay_leaves_lower_fetches_alone() {
        let mut ram = Ram::new(0x20);
        ram.write_word(0x02, 0x8d07);
        ram.write_word(0x10, 0xffff);
        ram.set_decrypted_opcodes_at(0x10, vec![0x7a, 0x00]);
        assert_eq!(ram.fetch_opcode(0x02), 0x8d07);
        assert_eq!(ram.fetch_opcode(0x10), 0x7a00);
        assert_eq!(ram.read_word(0x10), 0xffff);
        // RAM written after the overlay was installed is still seen below it
        ram.write_word(0x04, 0x7b00);
        assert_eq!(ram.fetch_opcode(0x04), 0x7b00);
    }

    #[test]
    fn long_accesses_are_two_words_high_first() {
        let mut ram = Ram::new(8);
        ram.write_long(2, 0x1122_3344);
        assert_eq!(ram.read_word(2), 0x1122);
        assert_eq!(ram.read_word(4), 0x3344);
        assert_eq!(ram.read_long(2), 0x1122_3344);
    }

    #[test]
    fn ports_latch_writes() {
        let mut ports = Ports::default();
        assert_eq!(ports.read_port(0x10), OPEN_BUS);
        ports.write_port(0x10, 0x42);
        assert_eq!(ports.read_port(0x10), 0x42);
    }
}
