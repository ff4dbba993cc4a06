//! Kernel binary for the QEMU RISC-V virt machine. On the host this is a
//! stub; `cargo run -p otteros` cross-builds it and boots it in QEMU.
#![cfg_attr(target_arch = "riscv64", no_std)]
#![cfg_attr(target_arch = "riscv64", no_main)]

#[cfg(target_arch = "riscv64")]
extern crate alloc;

#[cfg(target_arch = "riscv64")]
mod boot {
    use conquer_once::spin::OnceCell;
    use core::panic::PanicInfo;
    use spin::Mutex;

    use kernel::clock::Clock;
    use kernel::console::{self, Sink};
    use kernel::fs::disk::MemDisk;
    use kernel::fs::namespace::Namespace;
    use kernel::fs::otfs::{IMAGE_SIZE, OpenFlags, Otfs};
    use kernel::input::keyboard::Keyboard;
    use kernel::input::mouse::Mouse;
    use kernel::input::MouseButtons;
    use kernel::interrupts::{TrapDispatcher, TrapFrame, TrapOutcome};
    use kernel::memory::{self, PAGE_ALLOCATOR, PAGE_SIZE};
    use kernel::scheduler::Scheduler;
    use kernel::shell::line::LineEditor;
    use kernel::shell::{exec, ShellIo};
    use kernel::terminal::TerminalMultiplexer;
    use kernel::timer::SbiTimer;
    use kernel::uart::{Uart, UART0_BASE};
    use kernel::wm::keyboard::KeyboardRouter;
    use kernel::wm::{compositor, drag::DragRouter, Window, WindowManager};
    use kernel::{arch, gfx::FrameBuffer, kernel_print, kernel_println};

    const RAM_END: usize = 0x8000_0000 + 128 * 1024 * 1024;
    // 8 MiB of byte heap; the framebuffer alone needs ~1.2 MiB.
    const HEAP_PAGES: usize = 2048;

    /// Everything the timer trap needs, behind one lock. The main thread
    /// only touches it with interrupts disabled.
    struct TimerPath {
        trap: TrapDispatcher,
        clock: Clock,
        timer: SbiTimer,
        sched: Scheduler,
    }

    static TIMER_PATH: OnceCell<Mutex<TimerPath>> = OnceCell::uninit();

    #[unsafe(no_mangle)]
    extern "C" fn trap_handler(frame: &mut TrapFrame) {
        let Some(path) = TIMER_PATH.get() else {
            // Trapped before the kernel finished wiring itself up.
            arch::halt();
        };
        let mut path = path.lock();
        let path = &mut *path;
        let outcome = path.trap.dispatch(
            frame,
            &mut path.clock,
            &mut path.timer,
            &mut path.sched,
            &mut console::Global,
        );
        if outcome == TrapOutcome::Fatal {
            arch::halt();
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        kernel_println!("panicked: {}", info);
        arch::halt()
    }

    #[unsafe(no_mangle)]
    extern "C" fn kmain(_hartid: usize, _dtb: usize) -> ! {
        let mut uart = Uart::new(UART0_BASE);
        uart.init();
        console::init(Sink::Uart(uart));
        kernel_println!("BOOT: kernel entry");

        // Page pool over the RAM past the image, then a heap carved from it.
        PAGE_ALLOCATOR.lock().init(arch::kernel_end(), RAM_END);
        if memory::init_heap(HEAP_PAGES).is_err() {
            kernel_println!("BOOT: heap init failed");
            arch::halt();
        }
        {
            let pool = PAGE_ALLOCATOR.lock();
            kernel_println!(
                "MM: page pool 0x{:x}-0x{:x} page_size={} free_pages={}",
                pool.range_start(),
                pool.range_end(),
                PAGE_SIZE,
                pool.free_pages()
            );
        }

        arch::install_trap_vector();
        TIMER_PATH
            .try_init_once(|| {
                Mutex::new(TimerPath {
                    trap: TrapDispatcher::new(arch::fetch_insn),
                    clock: Clock::new(),
                    timer: SbiTimer,
                    sched: Scheduler::new(),
                })
            })
            .expect("timer path initialized once");

        trap_self_test();

        // Interrupts start firing once the clock is armed; from here on the
        // timer path is only touched with interrupts masked.
        arch::without_interrupts(|| {
            let mut path = TIMER_PATH.get().unwrap().lock();
            let path = &mut *path;
            path.clock.init(&mut path.timer);
            path.sched.bootstrap_test_tasks(&mut console::Global);
        });

        fs_self_test();
        desktop_demo();

        kernel_println!("SHELL: type `help` for commands");
        shell_loop()
    }

    /// Arms the breakpoint flag, executes `ebreak`, and checks that the
    /// dispatcher both disarmed and advanced past it.
    fn trap_self_test() {
        arch::without_interrupts(|| {
            TIMER_PATH.get().unwrap().lock().trap.arm_self_test();
        });
        arch::trigger_breakpoint();
        let passed = arch::without_interrupts(|| {
            let path = TIMER_PATH.get().unwrap().lock();
            !path.trap.self_test_armed() && path.trap.self_test_passed()
        });
        if !passed {
            kernel_println!("TRAP_TEST: breakpoint self-test failed");
            arch::halt();
        }
        kernel_println!("TRAP_TEST: breakpoint self-test passed");
    }

    /// Format, write, remount and read back on a RAM image.
    fn fs_self_test() {
        let mut disk = MemDisk::new(IMAGE_SIZE);
        if Otfs::format(&mut disk).is_err() {
            kernel_println!("FS: format failed");
            return;
        }
        let note = b"bootstrapped file content";
        let disk = match Otfs::mount(disk) {
            Ok(mut fs) => {
                let ok = fs
                    .open("note.txt", OpenFlags::WRITE | OpenFlags::CREATE)
                    .and_then(|fd| {
                        fs.write(fd, note)?;
                        fs.close(fd)
                    })
                    .is_ok();
                if !ok {
                    kernel_println!("FS: write failed");
                }
                match fs.unmount() {
                    Ok(disk) => disk,
                    Err(_) => {
                        kernel_println!("FS: unmount failed");
                        return;
                    }
                }
            }
            Err(_) => {
                kernel_println!("FS: mount failed");
                return;
            }
        };

        match Otfs::mount(disk) {
            Ok(mut fs) => {
                let mut buf = [0u8; 64];
                let ok = fs.open("note.txt", OpenFlags::READ).and_then(|fd| {
                    let n = fs.read(fd, &mut buf)?;
                    fs.close(fd)?;
                    Ok(n)
                });
                if ok == Ok(note.len()) && &buf[..note.len()] == note {
                    kernel_println!("FS: remount self-test ok");
                } else {
                    kernel_println!("FS: remount readback mismatch");
                }
            }
            Err(_) => kernel_println!("FS: remount failed"),
        }
    }

    /// Two terminal windows, scripted input, two deterministic renders.
    fn desktop_demo() {
        let mut wm = WindowManager::new(0x0020_2830);
        let mut fb = FrameBuffer::new(640, 480);

        let pattern_a = fb.render_test_pattern();
        let pattern_b = fb.render_test_pattern();
        kernel_println!(
            "FB: test pattern fingerprint=0x{:08x} stable={}",
            pattern_a,
            pattern_a == pattern_b
        );

        let Some(left) = wm.add_window(Window::new("terminal-1", 40, 60, 260, 180)) else {
            kernel_println!("WM: window setup failed");
            return;
        };
        let Some(right) = wm.add_window(Window::new("terminal-2", 220, 140, 260, 180)) else {
            kernel_println!("WM: window setup failed");
            return;
        };

        static MUX: OnceCell<Mutex<TerminalMultiplexer>> = OnceCell::uninit();
        MUX.try_init_once(|| Mutex::new(TerminalMultiplexer::new()))
            .expect("terminal multiplexer initialized once");
        let mux = MUX.get().unwrap();
        let (left_ep, right_ep) = {
            let mut mux = mux.lock();
            (mux.create_session(left), mux.create_session(right))
        };

        let mut krouter = KeyboardRouter::new();
        krouter.register_window(left, left_ep);
        krouter.register_window(right, right_ep);
        krouter.set_sink(alloc::boxed::Box::new(move |endpoint, event| {
            MUX.get().unwrap().lock().deliver(endpoint, event);
        }));

        let mut drag = DragRouter::new();
        drag.register_window(left, left_ep);
        drag.register_window(right, right_ep);

        let mut keyboard = Keyboard::new();
        let mut mouse = Mouse::new();

        // Click each title bar and type a line into the focused session.
        mouse.emit_button_down(50, 65, MouseButtons::LEFT);
        mouse.emit_button_up(50, 65, MouseButtons::LEFT);
        drag.dispatch_pending(&mut mouse, &mut wm);
        for sc in [0x23u8, 0x12, 0x26, 0x26, 0x18, 0x1c] {
            keyboard.handle_scancode(sc); // h e l l o Enter
        }
        krouter.dispatch_pending(&mut keyboard, &wm);

        mouse.emit_button_down(350, 150, MouseButtons::LEFT);
        mouse.emit_button_up(350, 150, MouseButtons::LEFT);
        drag.dispatch_pending(&mut mouse, &mut wm);
        for sc in [0x23u8, 0x17, 0x1c] {
            keyboard.handle_scancode(sc); // h i Enter
        }
        krouter.dispatch_pending(&mut keyboard, &wm);

        let first = compositor::render(&wm, &mut fb);
        let second = compositor::render(&wm, &mut fb);
        let mux = mux.lock();
        kernel_println!(
            "WM: scene fingerprint=0x{:08x} stable={}",
            first,
            first == second
        );
        if let (Some(l), Some(r)) = (mux.session(left_ep), mux.session(right_ep)) {
            kernel_println!(
                "TTY: session markers 0x{:08x} / 0x{:08x} lines {} / {}",
                l.marker(),
                r.marker(),
                l.lines_executed(),
                r.lines_executed()
            );
        }
    }

    /// Interactive shell over the UART, driven by polled bytes.
    fn shell_loop() -> ! {
        let mut uart = Uart::new(UART0_BASE);
        let mut editor = LineEditor::new();
        let mut io = ShellIo::new(console::Global);
        let mut ns = Namespace::new();

        kernel_print!("> ");
        loop {
            let Some(byte) = uart.read_byte_nonblocking() else {
                arch::wait_for_interrupt();
                continue;
            };
            if let Some(line) = editor.push_byte(byte, &mut console::Global) {
                exec::execute_line(&mut io, &mut ns, &line);
                kernel_print!("> ");
            }
        }
    }
}

#[cfg(not(target_arch = "riscv64"))]
fn main() {
    // The kernel only has an entry point on RISC-V; use the otteros runner
    // to build and boot it.
    eprintln!("kernel: cross-build for riscv64gc-unknown-none-elf and boot via qemu");
}
