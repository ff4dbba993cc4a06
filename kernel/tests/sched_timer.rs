//! Timer-to-scheduler flow: simulated timer interrupts pushed through the
//! trap dispatcher drive the clock and the round-robin scheduler exactly
//! the way the bare-metal trap stub would.

use kernel::clock::{Clock, TICK_INTERVAL};
use kernel::interrupts::{TrapDispatcher, TrapFrame, TrapOutcome};
use kernel::scheduler::Scheduler;
use kernel::timer::Timer;

struct ScriptedTimer {
    now: u64,
    deadlines: Vec<u64>,
    enables: u32,
}

impl ScriptedTimer {
    fn new(now: u64) -> Self {
        ScriptedTimer {
            now,
            deadlines: Vec::new(),
            enables: 0,
        }
    }

    fn last_deadline(&self) -> u64 {
        *self.deadlines.last().unwrap()
    }
}

impl Timer for ScriptedTimer {
    fn now(&self) -> u64 {
        self.now
    }
    fn set_deadline(&mut self, deadline: u64) {
        self.deadlines.push(deadline);
    }
    fn enable_interrupts(&mut self) {
        self.enables += 1;
    }
}

fn fetch(_addr: u64) -> u16 {
    0x0073
}

fn timer_frame(mepc: u64) -> TrapFrame {
    let mut frame = TrapFrame::new();
    frame.mepc = mepc;
    frame.mcause = 0x8000_0000_0000_0007;
    frame
}

#[test]
fn six_timer_traps_alternate_two_tasks() {
    let mut dispatcher = TrapDispatcher::new(fetch);
    let mut clock = Clock::new();
    let mut timer = ScriptedTimer::new(5000);
    let mut sched = Scheduler::new();
    let mut log = String::new();

    clock.init(&mut timer);
    assert_eq!(timer.enables, 1);
    sched.bootstrap_test_tasks(&mut log);
    assert_eq!(sched.runnable_count(), 2);

    for i in 0..6u64 {
        timer.now += TICK_INTERVAL;
        let mut frame = timer_frame(0x8000_0000 + i * 4);
        let outcome = dispatcher.dispatch(
            &mut frame,
            &mut clock,
            &mut timer,
            &mut sched,
            &mut log,
        );
        assert_eq!(outcome, TrapOutcome::TimerInterrupt);
    }

    assert_eq!(clock.ticks(), 6);

    let one = sched.task(1).expect("task 1 exists");
    let two = sched.task(2).expect("task 2 exists");
    assert_eq!(one.run_count, 3);
    assert_eq!(two.run_count, 3);
    assert_eq!(one.context.switches_in, 3);
    assert_eq!(two.context.switches_in, 3);
    assert_eq!(one.context.switches_out, 3);
    assert_eq!(two.context.switches_out, 2);
    assert_eq!(one.context.last_mcause, 0x8000_0000_0000_0007);
    assert_eq!(two.context.last_mcause, 0x8000_0000_0000_0007);

    assert!(log.contains("SCHED: policy=round-robin runnable=2"));
    assert!(log.contains("TASK: 1 running"));
    assert!(log.contains("TASK: 2 running"));
    assert!(log.contains("SCHED_TEST: alternating tasks confirmed"));
    assert_eq!(log.matches("TICK: periodic interrupt\n").count(), 4);
}

#[test]
fn deadlines_advance_by_whole_intervals() {
    let mut clock = Clock::new();
    let mut timer = ScriptedTimer::new(100);
    let mut log = String::new();

    clock.init(&mut timer);
    assert_eq!(timer.last_deadline(), 100 + TICK_INTERVAL);

    // On time: exactly one interval ahead.
    timer.now = timer.last_deadline() - 1;
    clock.handle_tick(&mut timer, &mut log);
    assert_eq!(timer.deadlines[1], timer.deadlines[0] + TICK_INTERVAL);

    // k-1 = 2 intervals missed: the next deadline lands k = 3 ahead.
    timer.now = timer.deadlines[1] + 2 * TICK_INTERVAL + 123;
    clock.handle_tick(&mut timer, &mut log);
    assert_eq!(timer.deadlines[2], timer.deadlines[1] + 3 * TICK_INTERVAL);
    assert!(timer.deadlines[2] > timer.now);
}

#[test]
fn breakpoint_self_test_between_ticks() {
    let mut dispatcher = TrapDispatcher::new(fetch);
    let mut clock = Clock::new();
    let mut timer = ScriptedTimer::new(0);
    let mut sched = Scheduler::new();
    let mut log = String::new();
    clock.init(&mut timer);

    dispatcher.arm_self_test();
    let mut frame = TrapFrame::new();
    frame.mcause = 3;
    frame.mepc = 0x8020_1000;
    let outcome = dispatcher.dispatch(&mut frame, &mut clock, &mut timer, &mut sched, &mut log);
    assert_eq!(outcome, TrapOutcome::BreakpointTest);
    assert_eq!(frame.mepc, 0x8020_1004);
    assert!(dispatcher.self_test_passed());

    // The breakpoint did not consume a clock tick.
    assert_eq!(clock.ticks(), 0);
}
