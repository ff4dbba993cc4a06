//! Timer driver seam.
//!
//! The clock only needs three things from the platform: the current tick
//! count, a way to program the next deadline, and a way to unmask the timer
//! interrupt. Tests substitute a scripted implementation.

pub trait Timer {
    /// Current value of the monotone platform counter.
    fn now(&self) -> u64;
    /// Program the next timer interrupt.
    fn set_deadline(&mut self, deadline: u64);
    /// Unmask timer interrupts for this hart.
    fn enable_interrupts(&mut self);
}

/// SBI-backed timer: `time` CSR for reads, the TIME extension (with the
/// legacy extension as fallback) for programming deadlines.
#[cfg(target_arch = "riscv64")]
pub struct SbiTimer;

#[cfg(target_arch = "riscv64")]
impl Timer for SbiTimer {
    fn now(&self) -> u64 {
        riscv::register::time::read64()
    }

    fn set_deadline(&mut self, deadline: u64) {
        if sbi_rt::set_timer(deadline).is_err() {
            sbi_rt::legacy::set_timer(deadline as usize);
        }
    }

    fn enable_interrupts(&mut self) {
        unsafe {
            riscv::register::sie::set_stimer();
            riscv::register::sstatus::set_sie();
        }
    }
}
