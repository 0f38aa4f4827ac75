use log::warn;

use super::Z8000;
use super::bus::IoMode;
use super::decode::{condition, hi, lo, top};
use super::fcw::Fcw;
use super::interrupt::{InterruptClass, InterruptRequest, REQ_HALT};

pub fn illegal(cpu: &mut Z8000, op: [u16; 3]) {
    warn!(
        "illegal opcode {:04x} at pc={:06x}",
        op[0], cpu.state.previous_pc
    );
}

pub fn nop(_cpu: &mut Z8000, _op: [u16; 3]) {}

// Privileged instructions in normal mode raise a TRAP instead of executing.
fn privileged(cpu: &mut Z8000, op: u16) -> bool {
    if cpu.state.fcw & Fcw::SYS.bits() != 0 {
        return true;
    }
    cpu.request(InterruptRequest::new(InterruptClass::Trap, op as u8));
    false
}

fn set_flags(cpu: &mut Z8000, mask: Fcw, value: Fcw) {
    cpu.state.fcw = (cpu.state.fcw & !mask.bits()) | (value & mask).bits();
}

fn zs_word(r: u16) -> Fcw {
    let mut f = Fcw::empty();
    f.set(Fcw::Z, r == 0);
    f.set(Fcw::S, r & 0x8000 != 0);
    f
}

fn add_word(cpu: &mut Z8000, d: u16, s: u16) -> u16 {
    let (r, carry) = d.overflowing_add(s);
    let mut f = zs_word(r);
    f.set(Fcw::C, carry);
    f.set(Fcw::PV, (d ^ r) & (s ^ r) & 0x8000 != 0);
    set_flags(cpu, Fcw::C | Fcw::Z | Fcw::S | Fcw::PV, f);
    r
}

fn sub_word(cpu: &mut Z8000, d: u16, s: u16) -> u16 {
    let (r, borrow) = d.overflowing_sub(s);
    let mut f = zs_word(r);
    f.set(Fcw::C, borrow);
    f.set(Fcw::PV, (d ^ s) & (d ^ r) & 0x8000 != 0);
    set_flags(cpu, Fcw::C | Fcw::Z | Fcw::S | Fcw::PV, f);
    r
}

fn logic_word(cpu: &mut Z8000, r: u16) -> u16 {
    set_flags(cpu, Fcw::Z | Fcw::S, zs_word(r));
    r
}

pub fn add_imm(cpu: &mut Z8000, op: [u16; 3]) {
    let d = lo(op[0]);
    let v = cpu.state.regs.rw(d);
    let r = add_word(cpu, v, op[1]);
    cpu.state.regs.set_rw(d, r);
}

pub fn sub_imm(cpu: &mut Z8000, op: [u16; 3]) {
    let d = lo(op[0]);
    let v = cpu.state.regs.rw(d);
    let r = sub_word(cpu, v, op[1]);
    cpu.state.regs.set_rw(d, r);
}

pub fn cp_imm(cpu: &mut Z8000, op: [u16; 3]) {
    let v = cpu.state.regs.rw(lo(op[0]));
    sub_word(cpu, v, op[1]);
}

pub fn add_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let (d, s) = (lo(op[0]), hi(op[0]));
    let (dv, sv) = (cpu.state.regs.rw(d), cpu.state.regs.rw(s));
    let r = add_word(cpu, dv, sv);
    cpu.state.regs.set_rw(d, r);
}

pub fn sub_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let (d, s) = (lo(op[0]), hi(op[0]));
    let (dv, sv) = (cpu.state.regs.rw(d), cpu.state.regs.rw(s));
    let r = sub_word(cpu, dv, sv);
    cpu.state.regs.set_rw(d, r);
}

pub fn cp_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let (dv, sv) = (cpu.state.regs.rw(lo(op[0])), cpu.state.regs.rw(hi(op[0])));
    sub_word(cpu, dv, sv);
}

pub fn and_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let (d, s) = (lo(op[0]), hi(op[0]));
    let v = cpu.state.regs.rw(d) & cpu.state.regs.rw(s);
    let r = logic_word(cpu, v);
    cpu.state.regs.set_rw(d, r);
}

pub fn or_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let (d, s) = (lo(op[0]), hi(op[0]));
    let v = cpu.state.regs.rw(d) | cpu.state.regs.rw(s);
    let r = logic_word(cpu, v);
    cpu.state.regs.set_rw(d, r);
}

pub fn xor_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let (d, s) = (lo(op[0]), hi(op[0]));
    let v = cpu.state.regs.rw(d) ^ cpu.state.regs.rw(s);
    let r = logic_word(cpu, v);
    cpu.state.regs.set_rw(d, r);
}

pub fn addl_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let (d, s) = (lo(op[0]), hi(op[0]));
    let dv = cpu.state.regs.rl(d);
    let sv = cpu.state.regs.rl(s);
    let (r, carry) = dv.overflowing_add(sv);
    let mut f = Fcw::empty();
    f.set(Fcw::C, carry);
    f.set(Fcw::Z, r == 0);
    f.set(Fcw::S, r & 0x8000_0000 != 0);
    f.set(Fcw::PV, (dv ^ r) & (sv ^ r) & 0x8000_0000 != 0);
    set_flags(cpu, Fcw::C | Fcw::Z | Fcw::S | Fcw::PV, f);
    cpu.state.regs.set_rl(d, r);
}

// INC/DEC Rd,#n: register in bits 7-4, n - 1 in bits 3-0. Carry unaffected.
pub fn inc(cpu: &mut Z8000, op: [u16; 3]) {
    let d = hi(op[0]);
    let n = lo(op[0]) + 1;
    let v = cpu.state.regs.rw(d);
    let r = v.wrapping_add(n);
    let mut f = zs_word(r);
    f.set(Fcw::PV, !v & r & 0x8000 != 0);
    set_flags(cpu, Fcw::Z | Fcw::S | Fcw::PV, f);
    cpu.state.regs.set_rw(d, r);
}

pub fn dec(cpu: &mut Z8000, op: [u16; 3]) {
    let d = hi(op[0]);
    let n = lo(op[0]) + 1;
    let v = cpu.state.regs.rw(d);
    let r = v.wrapping_sub(n);
    let mut f = zs_word(r);
    f.set(Fcw::PV, v & !r & 0x8000 != 0);
    set_flags(cpu, Fcw::Z | Fcw::S | Fcw::PV, f);
    cpu.state.regs.set_rw(d, r);
}

pub fn com(cpu: &mut Z8000, op: [u16; 3]) {
    let d = hi(op[0]);
    let v = !cpu.state.regs.rw(d);
    let r = logic_word(cpu, v);
    cpu.state.regs.set_rw(d, r);
}

pub fn neg(cpu: &mut Z8000, op: [u16; 3]) {
    let d = hi(op[0]);
    let v = cpu.state.regs.rw(d);
    let r = sub_word(cpu, 0, v);
    cpu.state.regs.set_rw(d, r);
}

pub fn test(cpu: &mut Z8000, op: [u16; 3]) {
    let v = cpu.state.regs.rw(hi(op[0]));
    logic_word(cpu, v);
}

pub fn clr(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.state.regs.set_rw(hi(op[0]), 0);
}

pub fn setflg(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.state.fcw |= Fcw::from_flag_mask(op[0]).bits();
}

pub fn resflg(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.state.fcw &= !Fcw::from_flag_mask(op[0]).bits();
}

pub fn comflg(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.state.fcw ^= Fcw::from_flag_mask(op[0]).bits();
}

pub fn ld_imm(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.state.regs.set_rw(lo(op[0]), op[1]);
}

pub fn ld_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let v = cpu.state.regs.rw(hi(op[0]));
    cpu.state.regs.set_rw(lo(op[0]), v);
}

pub fn ld_ir(cpu: &mut Z8000, op: [u16; 3]) {
    let addr = cpu.register_address(hi(op[0]));
    let v = cpu.read_word(addr);
    cpu.state.regs.set_rw(lo(op[0]), v);
}

pub fn st_ir(cpu: &mut Z8000, op: [u16; 3]) {
    let addr = cpu.register_address(hi(op[0]));
    let v = cpu.state.regs.rw(lo(op[0]));
    cpu.write_word(addr, v);
}

pub fn ld_da(cpu: &mut Z8000, op: [u16; 3]) {
    let addr = cpu.direct_address(&op);
    let v = cpu.read_word(addr);
    cpu.state.regs.set_rw(lo(op[0]), v);
}

pub fn st_da(cpu: &mut Z8000, op: [u16; 3]) {
    let addr = cpu.direct_address(&op);
    let v = cpu.state.regs.rw(lo(op[0]));
    cpu.write_word(addr, v);
}

pub fn ldb_imm(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.state.regs.set_rb(top(op[0]), op[0] as u8);
}

pub fn ldl_imm(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.state
        .regs
        .set_rl(lo(op[0]), (op[1] as u32) << 16 | op[2] as u32);
}

pub fn ldl_rr(cpu: &mut Z8000, op: [u16; 3]) {
    let v = cpu.state.regs.rl(hi(op[0]));
    cpu.state.regs.set_rl(lo(op[0]), v);
}

// PUSH @Rd,Rs: stack register in bits 7-4.
pub fn push(cpu: &mut Z8000, op: [u16; 3]) {
    let v = cpu.state.regs.rw(lo(op[0]));
    cpu.push_via(hi(op[0]), v);
}

// POP Rd,@Rs: stack register in bits 7-4.
pub fn pop(cpu: &mut Z8000, op: [u16; 3]) {
    let v = cpu.pop_via(hi(op[0]));
    cpu.state.regs.set_rw(lo(op[0]), v);
}

pub fn jp_da(cpu: &mut Z8000, op: [u16; 3]) {
    if condition(cpu.state.fcw, lo(op[0])) {
        cpu.state.pc = cpu.direct_address(&op);
    }
}

pub fn jp_ir(cpu: &mut Z8000, op: [u16; 3]) {
    if condition(cpu.state.fcw, lo(op[0])) {
        cpu.state.pc = cpu.register_address(hi(op[0]));
    }
}

pub fn call_da(cpu: &mut Z8000, op: [u16; 3]) {
    let target = cpu.direct_address(&op);
    cpu.push_pc();
    cpu.state.pc = target;
}

pub fn call_ir(cpu: &mut Z8000, op: [u16; 3]) {
    let target = cpu.register_address(hi(op[0]));
    cpu.push_pc();
    cpu.state.pc = target;
}

pub fn ret(cpu: &mut Z8000, op: [u16; 3]) {
    if condition(cpu.state.fcw, lo(op[0])) {
        cpu.state.pc = cpu.pop_pc();
    }
}

pub fn jr(cpu: &mut Z8000, op: [u16; 3]) {
    if condition(cpu.state.fcw, top(op[0])) {
        let disp = (op[0] as u8 as i8 as i32) * 2;
        cpu.state.pc = cpu.mask_address(cpu.state.pc.wrapping_add(disp as u32));
    }
}

// DJNZ (bit 7 set, word) / DBJNZ (byte); branches back 2 * disp7 bytes.
pub fn djnz(cpu: &mut Z8000, op: [u16; 3]) {
    let r = top(op[0]);
    let remaining = if op[0] & 0x0080 != 0 {
        let v = cpu.state.regs.rw(r).wrapping_sub(1);
        cpu.state.regs.set_rw(r, v);
        v != 0
    } else {
        let v = cpu.state.regs.rb(r).wrapping_sub(1);
        cpu.state.regs.set_rb(r, v);
        v != 0
    };
    if remaining {
        let disp = (op[0] & 0x007f) as u32 * 2;
        cpu.state.pc = cpu.mask_address(cpu.state.pc.wrapping_sub(disp));
    }
}

pub fn halt(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    cpu.state.irq_req |= REQ_HALT;
    if cpu.state.icount > 0 {
        cpu.state.icount = 0;
    }
}

pub fn iret(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let tag = cpu.pop_word();
    let fcw = cpu.pop_word();
    cpu.state.pc = cpu.pop_word() as u32;
    cpu.state.irq_srv &= !tag;
    cpu.change_fcw(fcw);
}

// DI/EI: bit 0 names VI, bit 1 NVI; a clear bit selects the interrupt.
pub fn di(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let mut fcw = Fcw::from_bits_retain(cpu.state.fcw);
    if op[0] & 1 == 0 {
        fcw.remove(Fcw::VIE);
    }
    if op[0] & 2 == 0 {
        fcw.remove(Fcw::NVIE);
    }
    cpu.change_fcw(fcw.bits());
}

pub fn ei(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let mut fcw = Fcw::from_bits_retain(cpu.state.fcw);
    if op[0] & 1 == 0 {
        fcw.insert(Fcw::VIE);
    }
    if op[0] & 2 == 0 {
        fcw.insert(Fcw::NVIE);
    }
    cpu.change_fcw(fcw.bits());
}

pub fn ldctl(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let r = hi(op[0]);
    let v = cpu.state.regs.rw(r);
    match lo(op[0]) {
        0x2 => cpu.state.regs.set_rw(r, cpu.state.fcw),
        0x3 => cpu.state.regs.set_rw(r, cpu.state.refresh),
        0x5 => cpu.state.regs.set_rw(r, cpu.state.psap),
        0x7 => cpu.state.regs.set_rw(r, cpu.state.nsp),
        0xa => cpu.change_fcw(v),
        0xb => cpu.state.refresh = v,
        0xd => cpu.state.psap = v,
        0xf => cpu.state.nsp = v,
        _ => illegal(cpu, op),
    }
}

pub fn sc(cpu: &mut Z8000, op: [u16; 3]) {
    cpu.request(InterruptRequest::new(InterruptClass::SysCall, op[0] as u8));
}

fn io_mode(op: u16) -> IoMode {
    if op & 1 == 0 {
        IoMode::Standard
    } else {
        IoMode::Special
    }
}

// 3B r4 IN, r5 SIN, r6 OUT, r7 SOUT; port in the second word.
pub fn io_direct(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let r = hi(op[0]);
    let mode = io_mode(op[0]);
    if op[0] & 2 == 0 {
        let v = cpu.read_port_word(mode, op[1]);
        cpu.state.regs.set_rw(r, v);
    } else {
        let v = cpu.state.regs.rw(r);
        cpu.write_port_word(mode, op[1], v);
    }
}

pub fn io_direct_byte(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let r = hi(op[0]);
    let mode = io_mode(op[0]);
    if op[0] & 2 == 0 {
        let v = cpu.read_port_byte(mode, op[1]);
        cpu.state.regs.set_rb(r, v);
    } else {
        let v = cpu.state.regs.rb(r);
        cpu.write_port_byte(mode, op[1], v);
    }
}

pub fn in_ir(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let port = cpu.state.regs.rw(hi(op[0]));
    let v = cpu.read_port_word(IoMode::Standard, port);
    cpu.state.regs.set_rw(lo(op[0]), v);
}

pub fn inb_ir(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let port = cpu.state.regs.rw(hi(op[0]));
    let v = cpu.read_port_byte(IoMode::Standard, port);
    cpu.state.regs.set_rb(lo(op[0]), v);
}

pub fn out_ir(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let port = cpu.state.regs.rw(hi(op[0]));
    let v = cpu.state.regs.rw(lo(op[0]));
    cpu.write_port_word(IoMode::Standard, port, v);
}

pub fn outb_ir(cpu: &mut Z8000, op: [u16; 3]) {
    if !privileged(cpu, op[0]) {
        return;
    }
    let port = cpu.state.regs.rw(hi(op[0]));
    let v = cpu.state.regs.rb(lo(op[0]));
    cpu.write_port_byte(IoMode::Standard, port, v);
}
