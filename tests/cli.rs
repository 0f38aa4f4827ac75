use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn write_image(name: &str, words: &[(usize, u16)]) -> PathBuf {
    let len = words.iter().map(|&(addr, _)| addr + 2).max().unwrap_or(0).max(0x110);
    let mut bytes = vec![0u8; len];
    for &(addr, w) in words {
        bytes[addr..addr + 2].copy_from_slice(&w.to_be_bytes());
    }
    let path = std::env::temp_dir().join(format!("z8000-emu-{}-{}.bin", name, std::process::id()));
    fs::write(&path, bytes).expect("write image");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_z8000-emu"))
        .args(args)
        .output()
        .expect("run emulator")
}

#[test]
fn runs_image_until_halt() {
    let image = write_image(
        "halt",
        &[
            (2, 0x4000),
            (4, 0x0100),
            (0x100, 0x2101), // ld r1,#0x1234
            (0x102, 0x1234),
            (0x104, 0x7a00), // halt
        ],
    );
    let out = run(&["--image", image.to_str().unwrap(), "--set", "r2=0x55"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("CPU halted at 0x000106"), "{}", stdout);
    assert!(stdout.contains("r1:1234"), "{}", stdout);
    assert!(stdout.contains("r2:0055"), "{}", stdout);
    let _ = fs::remove_file(image);
}

#[test]
fn trace_prints_each_step() {
    let image = write_image(
        "trace",
        &[(2, 0x4000), (4, 0x0100), (0x100, 0x8d07), (0x102, 0x7a00)],
    );
    let out = run(&["--image", image.to_str().unwrap(), "--trace"]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(out.status.success());
    assert!(stderr.contains("[00000000] pc=000100"), "{}", stderr);
    assert!(stderr.contains("[00000001] pc=000102"), "{}", stderr);
    let _ = fs::remove_file(image);
}

#[test]
fn traced_run_services_periodic_irqs() {
    let image = write_image(
        "trace-irq",
        &[
            (2, 0x4000),
            (4, 0x0100),
            (0x18, 0x4000), // nvi fcw
            (0x1a, 0x0180), // nvi pc
            (0x100, 0x7c05), // ei nvi
            (0x102, 0x7a00), // halt
            (0x180, 0x2101), // ld r1,#0x1234
            (0x182, 0x1234),
            (0x184, 0x7a00), // halt
        ],
    );
    let out = run(&[
        "--image",
        image.to_str().unwrap(),
        "--trace",
        "--irq-period",
        "1",
        "--frames",
        "3",
        "--cycles-per-frame",
        "200",
    ]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(out.status.success(), "{}", stderr);
    assert!(stdout.contains("r1:1234"), "{}", stdout);
    assert!(stdout.contains("irq_srv:0800"), "{}", stdout);
    assert!(stderr.contains("pc=000184"), "{}", stderr);
    let _ = fs::remove_file(image);
}

#[test]
fn rejects_unknown_register() {
    let image = write_image("badreg", &[(2, 0x4000), (4, 0x0100)]);
    let out = run(&["--image", image.to_str().unwrap(), "--set", "r99=1"]);
    assert!(!out.status.success());
    let _ = fs::remove_file(image);
}

#[test]
fn missing_image_fails() {
    let out = run(&["--image", "/nonexistent/z8000-image.bin"]);
    assert!(!out.status.success());
}
