fn main() {
    // The linker script only applies to the bare-metal target; host builds
    // (unit tests, integration tests) link normally.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.starts_with("riscv64") {
        let manifest = std::env::var("CARGO_MANIFEST_DIR").unwrap();
        println!("cargo:rustc-link-arg=-T{manifest}/linker.ld");
    }
    println!("cargo:rerun-if-changed=linker.ld");
}
