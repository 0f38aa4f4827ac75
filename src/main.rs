use clap::{Parser, ValueEnum};

use z8000_emu::cpu::interrupt::{REQ_NVI, REQ_VI};
use z8000_emu::cpu::{RegisterId, Variant};
use z8000_emu::mem::{FixedVectors, Ram};
use z8000_emu::{Machine, debug, image};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CpuModel {
    Z8001,
    Z8002,
}

impl From<CpuModel> for Variant {
    fn from(model: CpuModel) -> Self {
        match model {
            CpuModel::Z8001 => Variant::Z8001,
            CpuModel::Z8002 => Variant::Z8002,
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    /// Raw big-endian program image
    #[arg(long)]
    image: String,

    /// Address the image is copied to
    #[arg(long, default_value = "0", value_parser = parse_number)]
    load_addr: u32,

    #[arg(long, value_enum, default_value_t = CpuModel::Z8002)]
    cpu: CpuModel,

    /// RAM size in KiB
    #[arg(long, default_value_t = 64)]
    ram_kib: usize,

    #[arg(long, default_value_t = 10_000)]
    cycles_per_frame: i32,

    #[arg(long, default_value_t = 1)]
    frames: u64,

    /// Pulse NVI and VI every N frames
    #[arg(long)]
    irq_period: Option<u64>,

    /// Vector number supplied when VI is acknowledged
    #[arg(long, default_value_t = 0)]
    vi_vector: u8,

    /// Decrypted copy of the image used for opcode fetches
    #[arg(long)]
    opcodes: Option<String>,

    /// Register overrides applied after reset, e.g. `--set pc=0x100`
    #[arg(long = "set", value_parser = parse_assignment)]
    overrides: Vec<(RegisterId, u32)>,

    /// Enable instruction trace
    #[arg(long, default_value_t = false)]
    trace: bool,

    #[arg(long, default_value = "warn", value_parser = parse_level)]
    log_level: log::Level,
}

fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("{}: {}", s, e))
}

fn parse_level(s: &str) -> Result<log::Level, String> {
    s.parse().map_err(|_| format!("unknown log level: {}", s))
}

fn parse_assignment(s: &str) -> Result<(RegisterId, u32), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected reg=value, got {}", s))?;
    let id = name.trim().parse::<RegisterId>().map_err(|e| e.to_string())?;
    Ok((id, parse_number(value.trim())?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    simple_logger::init_with_level(args.log_level)?;

    let mut ram = Ram::new(args.ram_kib * 1024);
    let len = image::load_image(&args.image, &mut ram, args.load_addr)?;
    if let Some(path) = &args.opcodes {
        let opcodes = image::read_image(path)?;
        image::place_decrypted_opcodes(&mut ram, args.load_addr, &opcodes);
    }
    println!("Loaded {} bytes at 0x{:06x}", len, args.load_addr);

    let vectors = FixedVectors {
        nvi: REQ_NVI,
        vi: REQ_VI | args.vi_vector as u16,
    };
    let mut machine = Machine::new(args.cpu.into(), ram, vectors);
    machine.cycles_per_frame = args.cycles_per_frame;
    machine.irq_period = args.irq_period;
    for &(id, value) in &args.overrides {
        machine.cpu.set_reg(id, value);
    }

    if args.trace {
        let mut step = 0;
        machine.run_traced(args.frames, |cpu| {
            debug::trace(cpu, step);
            step += 1;
        });
    } else {
        machine.run(args.frames);
    }

    if machine.cpu.is_halted() {
        println!("CPU halted at 0x{:06x}", machine.cpu.pc());
    }
    println!("Executed {} cycles", machine.cycles);
    println!("{}", debug::register_dump(&machine.cpu));
    Ok(())
}
