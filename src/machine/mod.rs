use log::debug;

use crate::cpu::{LineId, LineState, Variant, Z8000};
use crate::mem::{FixedVectors, Ports, Ram};

/// A standalone system: one CPU over flat RAM, latch ports and a fixed-tag
/// interrupt acknowledge source, run in frames of a fixed cycle budget.
#[derive(Debug)]
pub struct Machine {
    pub cpu: Z8000,
    pub cycles_per_frame: i32,
    /// Pulse NVI and VI at the start of every Nth frame.
    pub irq_period: Option<u64>,
    pub frames: u64,
    pub cycles: u64,
}

impl Machine {
    pub fn new(variant: Variant, ram: Ram, vectors: FixedVectors) -> Self {
        let mut cpu = Z8000::new(variant, ram, Ports::default(), vectors);
        cpu.reset();
        Self {
            cpu,
            cycles_per_frame: 10_000,
            irq_period: None,
            frames: 0,
            cycles: 0,
        }
    }

    fn irq_due(&self) -> bool {
        matches!(self.irq_period, Some(n) if n > 0 && self.frames % n == 0)
    }

    /// Execute a single instruction (or service one interrupt).
    pub fn step(&mut self) -> i32 {
        let used = self.cpu.execute(1);
        self.cycles += used.max(0) as u64;
        used
    }

    // One frame: pulse the maskable lines if due, let `exec` spend the
    // budget, then drop the lines again.
    fn frame(&mut self, exec: impl FnOnce(&mut Z8000, i32) -> i32) -> i32 {
        let pulse = self.irq_due();
        if pulse {
            self.cpu.set_line(LineId::Nvi, LineState::Assert);
            self.cpu.set_line(LineId::Vi, LineState::Assert);
        }
        let used = exec(&mut self.cpu, self.cycles_per_frame);
        if pulse {
            self.cpu.set_line(LineId::Nvi, LineState::Clear);
            self.cpu.set_line(LineId::Vi, LineState::Clear);
        }
        self.frames += 1;
        self.cycles += used.max(0) as u64;
        used
    }

    pub fn run_frame(&mut self) -> i32 {
        self.frame(|cpu, budget| cpu.execute(budget))
    }

    /// Same as [`Machine::run_frame`], one instruction at a time, calling
    /// `on_step` before each one. Idle halted stretches are skipped in one go.
    pub fn run_frame_traced(&mut self, on_step: &mut impl FnMut(&Z8000)) -> i32 {
        self.frame(|cpu, budget| {
            let mut used = 0i32;
            loop {
                if cpu.is_halted() && !cpu.has_pending_request() {
                    used = used.saturating_add(cpu.execute(budget.saturating_sub(used)));
                } else {
                    on_step(&*cpu);
                    used = used.saturating_add(cpu.execute(1));
                }
                if used >= budget {
                    break used;
                }
            }
        })
    }

    fn run_frames(&mut self, frames: u64, mut frame: impl FnMut(&mut Self) -> i32) -> u64 {
        let start = self.cycles;
        for _ in 0..frames {
            frame(self);
            if self.cpu.is_halted() && self.irq_period.is_none() {
                debug!("halted at pc={:06x} after {} frames", self.cpu.pc(), self.frames);
                break;
            }
        }
        self.cycles - start
    }

    /// Run up to `frames` frames. Stops early once the CPU has halted with
    /// nothing left that could wake it.
    pub fn run(&mut self, frames: u64) -> u64 {
        self.run_frames(frames, Self::run_frame)
    }

    pub fn run_traced(&mut self, frames: u64, mut on_step: impl FnMut(&Z8000)) -> u64 {
        self.run_frames(frames, |m| m.run_frame_traced(&mut on_step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::RegisterId;
    use crate::cpu::interrupt::REQ_NVI;
    use crate::mem::ProgramSpace;

    fn ram_with(program: &[u16]) -> Ram {
        let mut ram = Ram::new(0x1000);
        ram.write_word(2, 0x4000); // system mode
        ram.write_word(4, 0x0100);
        for (i, w) in program.iter().enumerate() {
            ram.write_word(0x100 + 2 * i as u32, *w);
        }
        ram
    }

    // ei nvi; halt. The NVI handler loads r1 and halts again.
    fn nvi_wakeup() -> Machine {
        let mut ram = ram_with(&[0x7c05, 0x7a00]);
        ram.write_word(0x18, 0x4000);
        ram.write_word(0x1a, 0x0180);
        ram.write_word(0x180, 0x2101);
        ram.write_word(0x182, 0x1234);
        ram.write_word(0x184, 0x7a00);
        let mut m = Machine::new(Variant::Z8002, ram, FixedVectors::default());
        m.cycles_per_frame = 200;
        m.irq_period = Some(1);
        m
    }

    #[test]
    fn halted_machine_stops_early() {
        let mut m = Machine::new(Variant::Z8002, ram_with(&[0x7a00]), FixedVectors::default());
        m.cycles_per_frame = 100;
        m.run(50);
        assert!(m.cpu.is_halted());
        assert_eq!(m.frames, 1);
    }

    #[test]
    fn step_runs_one_instruction() {
        let mut m = Machine::new(
            Variant::Z8002,
            ram_with(&[0x8d07, 0x8d07]),
            FixedVectors::default(),
        );
        m.step();
        assert_eq!(m.cpu.pc(), 0x102);
        assert_eq!(m.cpu.previous_pc(), 0x100);
    }

    #[test]
    fn periodic_irq_wakes_halted_cpu() {
        let mut m = nvi_wakeup();
        m.run(3);
        assert_eq!(m.frames, 3);
        assert_eq!(m.cpu.get_reg(RegisterId::R(1)), 0x1234);
        assert_eq!(m.cpu.irq_serviced(), REQ_NVI);
    }

    #[test]
    fn traced_run_matches_plain_run() {
        let mut plain = nvi_wakeup();
        plain.run(3);

        let mut traced = nvi_wakeup();
        let mut pcs = Vec::new();
        traced.run_traced(3, |cpu| pcs.push(cpu.pc()));

        assert_eq!(traced.frames, plain.frames);
        assert_eq!(traced.cpu.get_reg(RegisterId::R(1)), 0x1234);
        assert_eq!(traced.cpu.irq_serviced(), plain.cpu.irq_serviced());
        assert_eq!(traced.cpu.pc(), plain.cpu.pc());
        // ei; NVI entry at the halt (handler ld runs in the same step); handler halt
        assert_eq!(pcs, vec![0x100, 0x102, 0x184]);
    }

    #[test]
    fn traced_run_without_irqs_stops_at_halt() {
        let mut m = Machine::new(
            Variant::Z8002,
            ram_with(&[0x8d07, 0x7a00]),
            FixedVectors::default(),
        );
        m.cycles_per_frame = 100;
        let mut steps = 0;
        m.run_traced(10, |_| steps += 1);
        assert_eq!(steps, 2);
        assert_eq!(m.frames, 1);
        assert_eq!(m.cycles, 100);
    }
}
