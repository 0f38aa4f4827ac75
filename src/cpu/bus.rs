use super::fcw::Fcw;
use super::regs::SP;
use super::{Variant, Z8000};

/// Selects the I/O address space used by port instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// Plain IN/OUT, routed to the host's I/O space.
    Standard,
    /// Special I/O (SIN/SOUT), addressed to the MMU. Not emulated: reads
    /// return 0 and writes are ignored.
    Special,
}

impl Z8000 {
    pub(super) fn mask_address(&self, addr: u32) -> u32 {
        addr & self.variant.address_mask()
    }

    /// Instruction fetch at `pc`, advancing it by one word.
    pub fn fetch_opcode_word(&mut self) -> u16 {
        let addr = self.mask_address(self.state.pc);
        let word = self.program.fetch_opcode(addr);
        self.state.pc = self.mask_address(self.state.pc.wrapping_add(2));
        word
    }

    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let addr = self.mask_address(addr);
        self.program.read_byte(addr)
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        let addr = self.mask_address(addr);
        self.program.write_byte(addr, value)
    }

    /// Word access; odd addresses are forced even.
    pub fn read_word(&mut self, addr: u32) -> u16 {
        let addr = self.mask_address(addr & !1);
        self.program.read_word(addr)
    }

    pub fn write_word(&mut self, addr: u32, value: u16) {
        let addr = self.mask_address(addr & !1);
        self.program.write_word(addr, value)
    }

    /// Long access at the even address; the program space splits it into
    /// two word accesses, high half first.
    pub fn read_long(&mut self, addr: u32) -> u32 {
        let addr = self.mask_address(addr & !1);
        self.program.read_long(addr)
    }

    pub fn write_long(&mut self, addr: u32, value: u32) {
        let addr = self.mask_address(addr & !1);
        self.program.write_long(addr, value)
    }

    pub fn read_port_byte(&mut self, mode: IoMode, port: u16) -> u8 {
        match mode {
            IoMode::Standard => self.io.read_port(port),
            IoMode::Special => 0,
        }
    }

    pub fn write_port_byte(&mut self, mode: IoMode, port: u16, value: u8) {
        if mode == IoMode::Standard {
            self.io.write_port(port, value)
        }
    }

    /// Port word: high byte at the even port, low byte at the next one.
    pub fn read_port_word(&mut self, mode: IoMode, port: u16) -> u16 {
        match mode {
            IoMode::Standard => {
                let port = port & !1;
                let hi = self.io.read_port(port);
                let lo = self.io.read_port(port.wrapping_add(1));
                u16::from_be_bytes([hi, lo])
            }
            IoMode::Special => 0,
        }
    }

    pub fn write_port_word(&mut self, mode: IoMode, port: u16, value: u16) {
        if mode == IoMode::Standard {
            let port = port & !1;
            let [hi, lo] = value.to_be_bytes();
            self.io.write_port(port, hi);
            self.io.write_port(port.wrapping_add(1), lo);
        }
    }

    fn segmented(&self) -> bool {
        self.variant == Variant::Z8001 && self.state.fcw & Fcw::SEG.bits() != 0
    }

    /// Program address formed from a register's contents: on a segmented
    /// Z8001 the register pair RRn holds {segment, offset}.
    pub(super) fn register_address(&self, field: u16) -> u32 {
        if self.segmented() {
            let field = field & 0x0e;
            segmented_address(self.state.regs.rw(field), self.state.regs.rw(field | 1))
        } else {
            self.state.regs.rw(field) as u32
        }
    }

    /// Operand address of a direct-address instruction: the second word, or
    /// {segment, offset} in words two and three on the Z8001.
    pub(super) fn direct_address(&self, op: &[u16; 3]) -> u32 {
        match self.variant {
            Variant::Z8001 => segmented_address(op[1], op[2]),
            Variant::Z8002 => op[1] as u32,
        }
    }

    // Register holding the stack offset: Rn, or the odd half of RRn when
    // segmented.
    fn stack_offset_register(&self, field: u16) -> u16 {
        if self.segmented() { field | 1 } else { field }
    }

    /// Pre-decrement push through the stack register named by `field`.
    pub(super) fn push_via(&mut self, field: u16, value: u16) {
        let reg = self.stack_offset_register(field);
        let sp = self.state.regs.rw(reg).wrapping_sub(2);
        self.state.regs.set_rw(reg, sp);
        let addr = self.register_address(field);
        self.write_word(addr, value);
    }

    pub(super) fn pop_via(&mut self, field: u16) -> u16 {
        let addr = self.register_address(field);
        let value = self.read_word(addr);
        let reg = self.stack_offset_register(field);
        let sp = self.state.regs.rw(reg).wrapping_add(2);
        self.state.regs.set_rw(reg, sp);
        value
    }

    pub(super) fn push_word(&mut self, value: u16) {
        self.push_via(SP as u16, value)
    }

    pub(super) fn pop_word(&mut self) -> u16 {
        self.pop_via(SP as u16)
    }

    /// Push a return address: one word, or {segment, offset} when segmented.
    pub(super) fn push_pc(&mut self) {
        let pc = self.state.pc;
        if self.segmented() {
            self.push_word(pc as u16);
            self.push_word(((pc >> 8) & 0x7f00) as u16 | 0x8000);
        } else {
            self.push_word(pc as u16);
        }
    }

    pub(super) fn pop_pc(&mut self) -> u32 {
        if self.segmented() {
            let seg = self.pop_word();
            let offset = self.pop_word();
            segmented_address(seg, offset)
        } else {
            self.pop_word() as u32
        }
    }
}

/// Combine a segment word (segment number in bits 11-8) with an offset into
/// a 20-bit address.
pub fn segmented_address(seg: u16, offset: u16) -> u32 {
    ((seg as u32 & 0x0f00) << 8) | offset as u32
}
