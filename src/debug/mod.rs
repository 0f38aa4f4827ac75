use crate::cpu::{RegisterId, Z8000};

pub fn trace(cpu: &Z8000, step: u64) {
    let regs = cpu.registers();
    eprintln!(
        "[{:08}] pc={:06x} fcw={:04x} {} r0={:04x} r1={:04x} r2={:04x} r15={:04x}",
        step,
        cpu.pc(),
        cpu.fcw(),
        cpu.flags_string(),
        regs.word(0),
        regs.word(1),
        regs.word(2),
        regs.word(15)
    );
}

/// Multi-line dump of every register, eight per line.
pub fn register_dump(cpu: &Z8000) -> String {
    let fields: Vec<String> = RegisterId::all().map(|id| cpu.register_string(id)).collect();
    let mut out = fields
        .chunks(8)
        .map(|line| line.join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str("\nflags: ");
    out.push_str(&cpu.flags_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Variant;
    use crate::mem::{FixedVectors, NoPorts, Ram};

    #[test]
    fn dump_lists_every_register() {
        let mut cpu = Z8000::new(Variant::Z8002, Ram::new(64), NoPorts, FixedVectors::default());
        cpu.reset();
        cpu.set_reg(RegisterId::R(3), 0xbeef);
        let dump = register_dump(&cpu);
        assert!(dump.contains("r3:beef"));
        assert!(dump.contains("pc:000000"));
        assert!(dump.contains("irq_vec:0000"));
        assert!(dump.ends_with("flags: ................"));
    }
}
