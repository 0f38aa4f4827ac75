use log::{debug, warn};
use thiserror::Error;

use super::fcw::Fcw;
use super::{LineId, LineState, Z8000};

// Request tags. The high byte names the class, the low byte carries the
// vector or system call number. Numeric order of the class bits is the
// priority order used by the request gate.
pub const REQ_TRAP: u16 = 0x4000;
pub const REQ_NMI: u16 = 0x2000;
pub const REQ_SEGTRAP: u16 = 0x1000;
pub const REQ_NVI: u16 = 0x0800;
pub const REQ_VI: u16 = 0x0400;
pub const REQ_SYSCALL: u16 = 0x0200;
pub const REQ_HALT: u16 = 0x0100;

/// Program status area slots.
pub mod vectors {
    pub const RESET_FCW: u32 = 0x0002;
    pub const RESET_PC: u32 = 0x0004;
    pub const TRAP: u32 = 0x0008;
    pub const SYSCALL: u32 = 0x000c;
    pub const SEGTRAP: u32 = 0x0010;
    pub const NMI: u32 = 0x0014;
    pub const NVI: u32 = 0x0018;
    pub const VI: u32 = 0x001c;
    /// PC for vector 0; vector n lives at `VEC00 + 2 * n`.
    pub const VEC00: u32 = 0x001e;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptClass {
    Trap,
    Nmi,
    SegmentTrap,
    Nvi,
    Vi,
    SysCall,
}

impl InterruptClass {
    pub fn tag(self) -> u16 {
        match self {
            InterruptClass::Trap => REQ_TRAP,
            InterruptClass::Nmi => REQ_NMI,
            InterruptClass::SegmentTrap => REQ_SEGTRAP,
            InterruptClass::Nvi => REQ_NVI,
            InterruptClass::Vi => REQ_VI,
            InterruptClass::SysCall => REQ_SYSCALL,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("request tag 0x{0:04x} names no interrupt class")]
    UnknownClass(u16),
}

/// An interrupt or trap request: a class plus its payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptRequest {
    pub class: InterruptClass,
    pub payload: u8,
}

impl InterruptRequest {
    pub fn new(class: InterruptClass, payload: u8) -> Self {
        Self { class, payload }
    }

    pub fn tag(&self) -> u16 {
        self.class.tag() | self.payload as u16
    }

    pub fn from_tag(tag: u16) -> Result<Self, RequestError> {
        let class = match tag >> 8 {
            0x40 => InterruptClass::Trap,
            0x20 => InterruptClass::Nmi,
            0x10 => InterruptClass::SegmentTrap,
            0x08 => InterruptClass::Nvi,
            0x04 => InterruptClass::Vi,
            0x02 => InterruptClass::SysCall,
            _ => return Err(RequestError::UnknownClass(tag)),
        };
        Ok(Self::new(class, tag as u8))
    }
}

impl TryFrom<u16> for InterruptRequest {
    type Error = RequestError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        Self::from_tag(tag)
    }
}

impl Z8000 {
    /// Offer a request to the controller. Returns whether it was latched.
    ///
    /// Hardware classes are dropped while a class of equal or higher priority
    /// is being serviced. SYSCALL is always latched.
    pub fn request(&mut self, req: InterruptRequest) -> bool {
        let srv = self.state.irq_srv;
        match req.class {
            InterruptClass::SysCall => {
                debug!("SYSCALL ${:02x} at pc={:06x}", req.payload, self.state.pc);
            }
            InterruptClass::Trap if srv >= REQ_TRAP => {
                warn!("double TRAP dropped at pc={:06x}", self.state.pc);
                return false;
            }
            class if srv >= class.tag() => {
                debug!("{:?} dropped while servicing {:04x}", class, srv);
                return false;
            }
            _ => {}
        }
        if req.class == InterruptClass::Vi {
            self.state.irq_vec = vectors::VI as u16;
        }
        // a new request also wakes the cpu from HALT
        self.state.irq_req = req.tag() & !REQ_HALT;
        true
    }

    fn request_tag(&mut self, tag: u16) {
        match InterruptRequest::from_tag(tag) {
            Ok(req) => {
                self.request(req);
            }
            Err(e) => warn!("irq acknowledge: {}", e),
        }
    }

    /// Drive an external input line. Only latches state; servicing happens on
    /// the next executor iteration.
    pub fn set_line(&mut self, line: LineId, state: LineState) {
        let fcw = Fcw::from_bits_retain(self.state.fcw);
        match line {
            LineId::Nmi => {
                if self.state.nmi_line == state {
                    return;
                }
                self.state.nmi_line = state;
                if state == LineState::Clear {
                    return;
                }
                if self.state.irq_srv >= REQ_NMI {
                    return;
                }
                self.state.irq_req = REQ_NMI;
                self.state.irq_vec = vectors::NMI as u16;
            }
            LineId::Nvi => {
                self.state.irq_lines[0] = state;
                self.fold_line(REQ_NVI, state, fcw.contains(Fcw::NVIE));
            }
            LineId::Vi => {
                self.state.irq_lines[1] = state;
                self.fold_line(REQ_VI, state, fcw.contains(Fcw::VIE));
            }
        }
    }

    fn fold_line(&mut self, bit: u16, state: LineState, enabled: bool) {
        match state {
            LineState::Assert if enabled => self.state.irq_req |= bit,
            LineState::Clear if !enabled => self.state.irq_req &= !bit,
            _ => {}
        }
    }

    pub fn line_state(&self, line: LineId) -> LineState {
        match line {
            LineId::Nmi => self.state.nmi_line,
            LineId::Nvi => self.state.irq_lines[0],
            LineId::Vi => self.state.irq_lines[1],
        }
    }

    /// Service at most one pending request. Called by the executor whenever
    /// `irq_request` is non-zero.
    pub(super) fn service_interrupts(&mut self) {
        if self.state.irq_req & REQ_NVI != 0 {
            let tag = self.irq_ack.irq_ack(0);
            self.request_tag(tag);
        }
        if self.state.irq_req & REQ_VI != 0 {
            let tag = self.irq_ack.irq_ack(1);
            self.request_tag(tag);
        }

        let fcw = self.state.fcw;
        let req = self.state.irq_req;
        if req & REQ_TRAP != 0 {
            self.enter_exception(fcw, REQ_TRAP);
            self.state.pc = vectors::TRAP;
            debug!("TRAP {:04x}", req);
        } else if req & REQ_SYSCALL != 0 {
            self.enter_exception(fcw, REQ_SYSCALL);
            self.state.pc = vectors::SYSCALL;
            debug!("SYSCALL {:04x}", req);
        } else if req & REQ_SEGTRAP != 0 {
            self.enter_exception(fcw, REQ_SEGTRAP);
            self.state.pc = vectors::SEGTRAP;
            debug!("SEGTRAP {:04x}", req);
        } else if req & REQ_NMI != 0 {
            self.enter_exception(fcw, REQ_NMI);
            self.load_psa(vectors::NMI, vectors::NMI + 2);
            debug!("NMI -> pc={:06x}", self.state.pc);
        } else if req & REQ_NVI != 0 && fcw & Fcw::NVIE.bits() != 0 {
            self.enter_exception(fcw, REQ_NVI);
            self.load_psa(vectors::NVI, vectors::NVI + 2);
            debug!("NVI -> pc={:06x}", self.state.pc);
        } else if req & REQ_VI != 0 && fcw & Fcw::VIE.bits() != 0 {
            self.enter_exception(fcw, REQ_VI);
            let vector = (req & 0xff) as u32;
            self.load_psa(self.state.irq_vec as u32, vectors::VEC00 + 2 * vector);
            debug!("VI #{} -> pc={:06x}", vector, self.state.pc);
        }
    }

    // Switch to the system stack and push {pc, fcw, tag}.
    fn enter_exception(&mut self, fcw: u16, class_bit: u16) {
        self.change_fcw(fcw | Fcw::SYS.bits());
        self.push_word(self.state.pc as u16);
        self.push_word(fcw);
        self.push_word(self.state.irq_req);
        self.state.irq_srv = self.state.irq_req;
        self.state.irq_req &= !class_bit;
    }

    fn load_psa(&mut self, fcw_slot: u32, pc_slot: u32) {
        let fcw = self.read_word(fcw_slot);
        self.state.pc = self.read_word(pc_slot) as u32;
        self.change_fcw(fcw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_classes() {
        let req = InterruptRequest::new(InterruptClass::Vi, 0x21);
        assert_eq!(req.tag(), 0x0421);
        assert_eq!(InterruptRequest::from_tag(0x0421), Ok(req));
        assert_eq!(
            InterruptRequest::try_from(0x7f00),
            Err(RequestError::UnknownClass(0x7f00))
        );
    }

    #[test]
    fn halt_bit_is_not_a_class() {
        assert!(InterruptRequest::from_tag(REQ_HALT).is_err());
        assert!(InterruptRequest::from_tag(REQ_HALT | REQ_NVI).is_err());
    }

    #[test]
    fn class_bits_order_by_priority() {
        let order = [
            InterruptClass::Trap,
            InterruptClass::Nmi,
            InterruptClass::SegmentTrap,
            InterruptClass::Nvi,
            InterruptClass::Vi,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].tag() > pair[1].tag());
        }
    }
}
