//! Zilog Z8000 (Z8001 / Z8002) instruction-level CPU core.
//!
//! The core is driven by a host that owns memory, I/O and scheduling. The
//! host hands the CPU three capability objects ([`mem::ProgramSpace`],
//! [`mem::IoSpace`], [`mem::IrqAcknowledge`]), calls [`cpu::Z8000::reset`]
//! once and then [`cpu::Z8000::execute`] with a cycle budget per time slice.

pub mod cpu;
pub mod debug;
pub mod image;
pub mod machine;
pub mod mem;

pub use cpu::{LineId, LineState, RegisterId, Variant, Z8000};
pub use machine::Machine;
