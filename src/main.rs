use std::env;
use std::path::PathBuf;
use std::process::Command;

const TARGET: &str = "riscv64gc-unknown-none-elf";

/// Builds the kernel for the RISC-V target and boots it on the QEMU `virt`
/// machine. OpenSBI (bundled with QEMU) loads the ELF directly, so no disk
/// image needs to be assembled. Pass `DEBUG` to freeze the machine until a
/// gdb client attaches.
fn main() {
    let status = Command::new(env::var("CARGO").unwrap_or_else(|_| "cargo".into()))
        .args(["build", "--release", "-p", "kernel", "--target", TARGET])
        .status()
        .expect("failed to run cargo");
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }

    let kernel_elf: PathBuf = ["target", TARGET, "release", "kernel"].iter().collect();

    let mut cmd = Command::new("qemu-system-riscv64");
    if let Some(x) = env::args().nth(1) {
        if x == "DEBUG" {
            cmd.arg("-s");
            cmd.arg("-S");
        };
    };
    cmd.arg("-machine").arg("virt");
    cmd.arg("-m").arg("128M");
    cmd.arg("-nographic");
    cmd.arg("-serial").arg("mon:stdio");
    cmd.arg("-kernel").arg(&kernel_elf);

    let mut child = cmd.spawn().expect("failed to launch qemu-system-riscv64");
    child.wait().unwrap();
}
