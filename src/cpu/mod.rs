pub mod bus;
pub mod decode;
pub mod exec;
pub mod fcw;
pub mod info;
pub mod interrupt;
pub mod regs;
pub mod table;

use std::fmt;
use std::sync::Arc;

use log::{Level, debug, log_enabled, trace};

pub use bus::IoMode;
pub use fcw::{Fcw, flags_string};
pub use info::{BusWidth, CpuInfo, Endianness, RegisterId, RegisterParseError};
pub use interrupt::{InterruptClass, InterruptRequest, RequestError};
pub use regs::RegisterFile;

use crate::mem::{IoSpace, IrqAcknowledge, ProgramSpace};
use interrupt::{REQ_HALT, REQ_NVI, REQ_VI, vectors};
use regs::SP;
use table::OpcodeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Segmented, 20-bit program addresses.
    Z8001,
    /// Non-segmented, 16-bit program addresses.
    Z8002,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Z8001 => "Z8001",
            Variant::Z8002 => "Z8002",
        }
    }

    pub fn address_bits(self) -> u8 {
        match self {
            Variant::Z8001 => 20,
            Variant::Z8002 => 16,
        }
    }

    pub fn address_mask(self) -> u32 {
        (1u32 << self.address_bits()) - 1
    }
}

/// External input lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineId {
    Nmi,
    /// Maskable line 0.
    Nvi,
    /// Maskable line 1.
    Vi,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    #[default]
    Clear,
    Assert,
}

/// Everything `reset` clears.
#[derive(Debug, Default, Clone)]
struct CpuState {
    regs: RegisterFile,
    pc: u32,
    previous_pc: u32,
    fcw: u16,
    /// Stack pointer of the inactive mode, swapped with R15 on S/N changes.
    nsp: u16,
    psap: u16,
    refresh: u16,
    irq_req: u16,
    irq_srv: u16,
    irq_vec: u16,
    nmi_line: LineState,
    irq_lines: [LineState; 2],
    icount: i64,
}

pub struct Z8000 {
    variant: Variant,
    table: Arc<OpcodeTable>,
    program: Box<dyn ProgramSpace>,
    io: Box<dyn IoSpace>,
    irq_ack: Box<dyn IrqAcknowledge>,
    state: CpuState,
}

impl fmt::Debug for Z8000 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Z8000")
            .field("variant", &self.variant)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Z8000 {
    /// Bind the host capabilities and take a reference on the shared
    /// opcode table for `variant`. Call [`Z8000::reset`] before executing.
    pub fn new(
        variant: Variant,
        program: impl ProgramSpace + 'static,
        io: impl IoSpace + 'static,
        irq_ack: impl IrqAcknowledge + 'static,
    ) -> Self {
        Self {
            variant,
            table: table::acquire(variant),
            program: Box::new(program),
            io: Box::new(io),
            irq_ack: Box::new(irq_ack),
            state: CpuState::default(),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn table(&self) -> &OpcodeTable {
        &self.table
    }

    /// Clear all state and boot from the reset slots of the program status
    /// area: FCW at 2, PC at 4 (or segment at 4 and offset at 6 when the
    /// loaded FCW selects segmented mode).
    pub fn reset(&mut self) {
        self.state = CpuState::default();
        let fcw = self.read_word(vectors::RESET_FCW);
        self.state.fcw = fcw;
        self.state.pc = if fcw & Fcw::SEG.bits() != 0 {
            let seg = self.read_word(vectors::RESET_PC) as u32;
            let offset = self.read_word(vectors::RESET_PC + 2) as u32;
            ((seg & 0x0700) << 8) | offset
        } else {
            self.read_word(vectors::RESET_PC) as u32
        };
        debug!(
            "{} reset: fcw={:04x} pc={:06x}",
            self.variant.name(),
            self.state.fcw,
            self.state.pc
        );
    }

    /// Run until `cycles` are used up and return the number of cycles
    /// actually spent, which may overshoot by the last instruction's cost.
    /// At least one instruction runs even when `cycles <= 0`.
    pub fn execute(&mut self, cycles: i32) -> i32 {
        self.state.icount = cycles as i64;
        loop {
            if self.state.irq_req != 0 {
                self.service_interrupts();
            }
            if self.state.irq_req & REQ_HALT != 0 {
                self.state.icount = 0;
            } else {
                self.step();
            }
            if self.state.icount <= 0 {
                break;
            }
        }
        let used = cycles as i64 - self.state.icount;
        used.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    fn step(&mut self) {
        self.state.previous_pc = self.state.pc;
        let mut op = [0u16; 3];
        op[0] = self.fetch_opcode_word();
        let entry = *self.table.entry(op[0]);
        for word in op.iter_mut().take(entry.words as usize).skip(1) {
            *word = self.fetch_opcode_word();
        }
        if log_enabled!(Level::Trace) {
            trace!(
                "{:06x}: {:04x} {:04x} {:04x} {}",
                self.state.previous_pc,
                op[0],
                op[1],
                op[2],
                flags_string(self.state.fcw)
            );
        }
        self.state.icount -= entry.cycles as i64;
        (entry.handler)(self, op);
    }

    /// Release the shared opcode table reference. Dropping the CPU does the
    /// same.
    pub fn exit(self) {
        debug!("{} exit", self.variant.name());
    }

    // Install a new FCW, swapping stacks on S/N changes and latching any
    // maskable line that becomes enabled while asserted.
    fn change_fcw(&mut self, fcw: u16) {
        let old = self.state.fcw;
        if (old ^ fcw) & Fcw::SYS.bits() != 0 {
            let sp = self.state.regs.word(SP);
            self.state.regs.set_word(SP, self.state.nsp);
            self.state.nsp = sp;
        }
        let nvie = Fcw::NVIE.bits();
        if old & nvie == 0 && fcw & nvie != 0 && self.state.irq_lines[0] != LineState::Clear {
            self.state.irq_req |= REQ_NVI;
        }
        let vie = Fcw::VIE.bits();
        if old & vie == 0 && fcw & vie != 0 && self.state.irq_lines[1] != LineState::Clear {
            self.state.irq_req |= REQ_VI;
        }
        self.state.fcw = fcw;
    }

    pub fn pc(&self) -> u32 {
        self.state.pc
    }

    /// PC of the last fetched instruction.
    pub fn previous_pc(&self) -> u32 {
        self.state.previous_pc
    }

    pub fn fcw(&self) -> u16 {
        self.state.fcw
    }

    pub fn irq_request(&self) -> u16 {
        self.state.irq_req
    }

    pub fn irq_serviced(&self) -> u16 {
        self.state.irq_srv
    }

    pub fn is_halted(&self) -> bool {
        self.state.irq_req & REQ_HALT != 0
    }

    /// Whether any interrupt or trap class is latched, ignoring HALT and the
    /// payload byte.
    pub fn has_pending_request(&self) -> bool {
        self.state.irq_req & !(REQ_HALT | 0x00ff) != 0
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.state.regs
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.state.regs
    }

    pub fn flags_string(&self) -> String {
        flags_string(self.state.fcw)
    }

    pub fn get_reg(&self, id: RegisterId) -> u32 {
        let s = &self.state;
        match id {
            RegisterId::Pc => s.pc,
            RegisterId::PreviousPc => s.previous_pc,
            RegisterId::Sp => s.regs.word(SP) as u32,
            RegisterId::Fcw => s.fcw as u32,
            RegisterId::Nsp => s.nsp as u32,
            RegisterId::Psap => s.psap as u32,
            RegisterId::Refresh => s.refresh as u32,
            RegisterId::IrqRequest => s.irq_req as u32,
            RegisterId::IrqServiced => s.irq_srv as u32,
            RegisterId::IrqVector => s.irq_vec as u32,
            RegisterId::R(n) => s.regs.word((n & 15) as usize) as u32,
        }
    }

    /// Debugger / state-restore write. No side effects beyond the register.
    pub fn set_reg(&mut self, id: RegisterId, value: u32) {
        let s = &mut self.state;
        match id {
            RegisterId::Pc => s.pc = value & self.variant.address_mask(),
            RegisterId::PreviousPc => s.previous_pc = value,
            RegisterId::Sp => s.regs.set_word(SP, value as u16),
            RegisterId::Fcw => s.fcw = value as u16,
            RegisterId::Nsp => s.nsp = value as u16,
            RegisterId::Psap => s.psap = value as u16,
            RegisterId::Refresh => s.refresh = value as u16,
            RegisterId::IrqRequest => s.irq_req = value as u16,
            RegisterId::IrqServiced => s.irq_srv = value as u16,
            RegisterId::IrqVector => s.irq_vec = value as u16,
            RegisterId::R(n) => s.regs.set_word((n & 15) as usize, value as u16),
        }
    }

    /// `name:value` display of one register.
    pub fn register_string(&self, id: RegisterId) -> String {
        let v = self.get_reg(id);
        match id {
            RegisterId::Pc | RegisterId::PreviousPc => format!("{}:{:06x}", id, v),
            _ => format!("{}:{:04x}", id, v),
        }
    }

    pub fn info(&self) -> CpuInfo {
        let (min_words, max_words) = self.table.length_bounds();
        let (min_cycles, max_cycles) = self.table.cycle_bounds();
        CpuInfo {
            name: self.variant.name(),
            endianness: Endianness::Big,
            min_instruction_words: min_words,
            max_instruction_words: max_words,
            min_cycles,
            max_cycles,
            program: BusWidth {
                address_bits: self.variant.address_bits(),
                data_bits: 16,
            },
            io: BusWidth {
                address_bits: 16,
                data_bits: 8,
            },
        }
    }
}

impl Drop for Z8000 {
    fn drop(&mut self) {
        table::release(self.variant);
    }
}
