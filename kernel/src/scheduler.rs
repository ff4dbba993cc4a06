//! Task table and round-robin scheduler.
//!
//! Tasks are slot-allocated control blocks with stable 1-based ids; once
//! created they never leave the table. The scheduler keeps every Runnable
//! or Running task in a queue examined in insertion order and, on each
//! timer tick, rotates to the first Runnable task after the current slot.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::interrupts::TrapFrame;

pub const MAX_TASKS: usize = 8;

const SWITCH_LOG_LIMIT: u32 = 12;
const TASK_LOG_LIMIT: u64 = 4;
const ALTERNATION_TARGET: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Unused,
    Runnable,
    Running,
}

/// Per-task bookkeeping snapshotted on every context switch.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskContext {
    pub switches_in: u64,
    pub switches_out: u64,
    pub last_mepc: u64,
    pub last_mcause: u64,
}

pub struct TaskControlBlock {
    pub id: u32,
    pub name: String,
    pub state: TaskState,
    pub run_count: u64,
    pub context: TaskContext,
}

/// A task body. Runs to completion on every slice it is granted.
pub type TaskEntry = Box<dyn FnMut(&mut TaskControlBlock, &mut dyn Write) + Send>;

struct TaskSlot {
    tcb: TaskControlBlock,
    entry: Option<TaskEntry>,
}

pub struct TaskTable {
    slots: Vec<TaskSlot>,
}

impl TaskTable {
    pub fn new() -> Self {
        TaskTable { slots: Vec::new() }
    }

    /// Allocates the next slot. Ids are 1-based and stable for the life of
    /// the kernel; the table never shrinks.
    pub fn create(&mut self, name: &str, entry: TaskEntry) -> Option<u32> {
        if self.slots.len() >= MAX_TASKS {
            return None;
        }
        let id = self.slots.len() as u32 + 1;
        self.slots.push(TaskSlot {
            tcb: TaskControlBlock {
                id,
                name: String::from(name),
                state: TaskState::Runnable,
                run_count: 0,
                context: TaskContext::default(),
            },
            entry: Some(entry),
        });
        Some(id)
    }

    pub fn get(&self, id: u32) -> Option<&TaskControlBlock> {
        self.slots.get(id.checked_sub(1)? as usize).map(|s| &s.tcb)
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut TaskControlBlock> {
        let index = id.checked_sub(1)? as usize;
        self.slots.get_mut(index).map(|s| &mut s.tcb)
    }

    pub fn context_switch_out(&mut self, id: u32, frame: &TrapFrame) {
        if let Some(tcb) = self.get_mut(id) {
            tcb.context.switches_out += 1;
            tcb.context.last_mepc = frame.mepc;
            tcb.context.last_mcause = frame.mcause;
            if tcb.state == TaskState::Running {
                tcb.state = TaskState::Runnable;
            }
        }
    }

    pub fn context_switch_in(&mut self, id: u32, frame: &TrapFrame) {
        if let Some(tcb) = self.get_mut(id) {
            tcb.context.switches_in += 1;
            tcb.context.last_mepc = frame.mepc;
            tcb.context.last_mcause = frame.mcause;
            tcb.state = TaskState::Running;
        }
    }

    /// Grants the task a slice: bumps `run_count` and runs the entry.
    fn run(&mut self, id: u32, con: &mut dyn Write) {
        let Some(index) = id.checked_sub(1).map(|i| i as usize) else {
            return;
        };
        if index >= self.slots.len() {
            return;
        }
        // The entry is taken out for the call so it can borrow the block.
        let mut entry = self.slots[index].entry.take();
        {
            let tcb = &mut self.slots[index].tcb;
            tcb.run_count += 1;
            if let Some(entry) = entry.as_mut() {
                entry(tcb, con);
            }
        }
        self.slots[index].entry = entry;
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Scheduler {
    tasks: TaskTable,
    runnable: Vec<u32>,
    current_slot: Option<usize>,
    switch_log_count: u32,
    alternating_switches: u32,
    alternation_reported: bool,
    running: bool,
    bootstrapped: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            tasks: TaskTable::new(),
            runnable: Vec::new(),
            current_slot: None,
            switch_log_count: 0,
            alternating_switches: 0,
            alternation_reported: false,
            running: false,
            bootstrapped: false,
        }
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    pub fn task(&self, id: u32) -> Option<&TaskControlBlock> {
        self.tasks.get(id)
    }

    pub fn runnable_count(&self) -> usize {
        self.runnable.len()
    }

    /// Creates a task and appends it to the runnable queue.
    pub fn spawn(&mut self, name: &str, entry: TaskEntry) -> Option<u32> {
        if self.runnable.len() >= MAX_TASKS {
            return None;
        }
        let id = self.tasks.create(name, entry)?;
        self.runnable.push(id);
        Some(id)
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Creates the two demo tasks used by the boot-time scheduling
    /// self-test and starts the scheduler.
    pub fn bootstrap_test_tasks(&mut self, con: &mut dyn Write) {
        if self.bootstrapped {
            return;
        }
        *self = Scheduler::new();
        self.bootstrapped = true;

        let one = self.spawn("task-1", Box::new(demo_task(1)));
        let two = self.spawn("task-2", Box::new(demo_task(2)));
        if one.is_none() || two.is_none() {
            let _ = con.write_str("SCHED: bootstrap failed\n");
            return;
        }

        self.running = true;
        let _ = con.write_str("SCHED: policy=round-robin runnable=2\n");
    }

    fn id_at(&self, slot: usize) -> Option<u32> {
        self.runnable.get(slot).copied()
    }

    /// First Runnable task strictly after `current_slot`, wrapping; ties
    /// break toward the lower slot index. `None` when nothing can run.
    fn find_next_slot(&self) -> Option<usize> {
        if self.runnable.is_empty() {
            return None;
        }
        let start = match self.current_slot {
            None => 0,
            Some(slot) => (slot + 1) % self.runnable.len(),
        };
        for offset in 0..self.runnable.len() {
            let slot = (start + offset) % self.runnable.len();
            let id = self.runnable[slot];
            if let Some(tcb) = self.tasks.get(id) {
                if tcb.state == TaskState::Runnable {
                    return Some(slot);
                }
            }
        }
        None
    }

    pub fn handle_timer_interrupt(&mut self, frame: &TrapFrame, con: &mut dyn Write) {
        if !self.running || self.runnable.is_empty() {
            return;
        }

        let prev_id = self.current_slot.and_then(|slot| self.id_at(slot));
        if let Some(prev) = prev_id {
            self.tasks.context_switch_out(prev, frame);
        }

        let Some(next_slot) = self.find_next_slot() else {
            return;
        };
        let Some(next_id) = self.id_at(next_slot) else {
            return;
        };

        self.current_slot = Some(next_slot);
        self.tasks.context_switch_in(next_id, frame);

        if let Some(prev) = prev_id {
            if prev != next_id && self.switch_log_count < SWITCH_LOG_LIMIT {
                let _ = writeln!(con, "SCHED: switch {} -> {}", prev, next_id);
                self.switch_log_count += 1;
            }
            if (prev == 1 && next_id == 2) || (prev == 2 && next_id == 1) {
                self.alternating_switches += 1;
                if !self.alternation_reported
                    && self.alternating_switches >= ALTERNATION_TARGET
                {
                    let _ = con.write_str("SCHED_TEST: alternating tasks confirmed\n");
                    self.alternation_reported = true;
                }
            }
        }

        self.tasks.run(next_id, con);

        // Demote so the next tick can pick either task.
        if let Some(tcb) = self.tasks.get_mut(next_id) {
            if tcb.state == TaskState::Running {
                tcb.state = TaskState::Runnable;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_task(id: u32) -> impl FnMut(&mut TaskControlBlock, &mut dyn Write) + Send {
    move |tcb, con| {
        if tcb.run_count <= TASK_LOG_LIMIT {
            let _ = writeln!(con, "TASK: {} running", id);
        }
    }
}
