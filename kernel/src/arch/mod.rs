//! RISC-V machine glue: the boot entry, the trap entry stub, and the
//! handful of CSR operations the portable kernel needs. Everything here
//! assumes a single hart running in supervisor mode under OpenSBI.

use core::arch::{asm, global_asm};

use riscv::register::{sstatus, stvec};

// Boot entry. OpenSBI jumps here with the hart id in a0 and the device
// tree in a1. Clear .bss, point sp at the boot stack, and enter Rust.
global_asm!(
    r#"
    .section .text.entry
    .globl _start
_start:
    la t0, __bss_start
    la t1, __bss_end
1:
    bgeu t0, t1, 2f
    sd zero, 0(t0)
    addi t0, t0, 8
    j 1b
2:
    la sp, __boot_stack_top
    call kmain
3:
    wfi
    j 3b

    .section .bss.stack
    .align 12
__boot_stack_bottom:
    .space 0x10000
__boot_stack_top:
"#
);

// Trap entry. Saves the full register file plus sstatus/sepc/scause/stval
// into a TrapFrame on the kernel stack (layout matches
// interrupts::TrapFrame: x0..x31 at 8-byte slots, then the four CSRs),
// calls the Rust handler, and restores whatever the handler left in the
// frame, an advanced sepc included.
global_asm!(
    r#"
    .section .text
    .globl __trap_entry
    .align 2
__trap_entry:
    addi sp, sp, -288
    sd x1, 8(sp)
    sd x3, 24(sp)
    sd x4, 32(sp)
    sd x5, 40(sp)
    sd x6, 48(sp)
    sd x7, 56(sp)
    sd x8, 64(sp)
    sd x9, 72(sp)
    sd x10, 80(sp)
    sd x11, 88(sp)
    sd x12, 96(sp)
    sd x13, 104(sp)
    sd x14, 112(sp)
    sd x15, 120(sp)
    sd x16, 128(sp)
    sd x17, 136(sp)
    sd x18, 144(sp)
    sd x19, 152(sp)
    sd x20, 160(sp)
    sd x21, 168(sp)
    sd x22, 176(sp)
    sd x23, 184(sp)
    sd x24, 192(sp)
    sd x25, 200(sp)
    sd x26, 208(sp)
    sd x27, 216(sp)
    sd x28, 224(sp)
    sd x29, 232(sp)
    sd x30, 240(sp)
    sd x31, 248(sp)
    addi t0, sp, 288
    sd t0, 16(sp)
    csrr t0, sstatus
    sd t0, 256(sp)
    csrr t0, sepc
    sd t0, 264(sp)
    csrr t0, scause
    sd t0, 272(sp)
    csrr t0, stval
    sd t0, 280(sp)

    mv a0, sp
    call trap_handler

    ld t0, 256(sp)
    csrw sstatus, t0
    ld t0, 264(sp)
    csrw sepc, t0
    ld x1, 8(sp)
    ld x3, 24(sp)
    ld x4, 32(sp)
    ld x5, 40(sp)
    ld x6, 48(sp)
    ld x7, 56(sp)
    ld x8, 64(sp)
    ld x9, 72(sp)
    ld x10, 80(sp)
    ld x11, 88(sp)
    ld x12, 96(sp)
    ld x13, 104(sp)
    ld x14, 112(sp)
    ld x15, 120(sp)
    ld x16, 128(sp)
    ld x17, 136(sp)
    ld x18, 144(sp)
    ld x19, 152(sp)
    ld x20, 160(sp)
    ld x21, 168(sp)
    ld x22, 176(sp)
    ld x23, 184(sp)
    ld x24, 192(sp)
    ld x25, 200(sp)
    ld x26, 208(sp)
    ld x27, 216(sp)
    ld x28, 224(sp)
    ld x29, 232(sp)
    ld x30, 240(sp)
    ld x31, 248(sp)
    addi sp, sp, 288
    sret
"#
);

unsafe extern "C" {
    fn __trap_entry();
    static __kernel_end: u8;
}

/// Points stvec at the trap stub, direct mode (mode bits clear).
pub fn install_trap_vector() {
    unsafe {
        stvec::write(__trap_entry as usize, stvec::TrapMode::Direct);
    }
}

/// First byte of RAM past the kernel image; the page pool starts here.
pub fn kernel_end() -> usize {
    unsafe { core::ptr::addr_of!(__kernel_end) as usize }
}

/// Parks the hart for good.
pub fn halt() -> ! {
    loop {
        unsafe { riscv::asm::wfi() };
    }
}

/// Waits for the next interrupt.
pub fn wait_for_interrupt() {
    unsafe { riscv::asm::wfi() };
}

/// Runs `f` with the supervisor interrupt-enable bit clear, restoring it
/// afterwards. Required around any lock the trap handler also takes.
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let was_enabled = sstatus::read().sie();
    unsafe { sstatus::clear_sie() };
    let result = f();
    if was_enabled {
        unsafe { sstatus::set_sie() };
    }
    result
}

/// Low half of the instruction at `addr`; enough to tell a compressed
/// encoding from a full-width one.
pub fn fetch_insn(addr: u64) -> u16 {
    unsafe { core::ptr::read_volatile(addr as *const u16) }
}

/// Executes an uncompressed `ebreak` for the trap self-test.
pub fn trigger_breakpoint() {
    unsafe {
        asm!(".4byte 0x00100073");
    }
}
