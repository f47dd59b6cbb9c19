//! Single-threaded tick scheduler.
//!
//! All game-state mutation happens on one cooperative line of control. The
//! scheduler is its clock: tasks are queued for a later tick and run when
//! the owner advances the clock with [`Scheduler::tick`]. There is no
//! preemption and no blocking wait; background work marshals back onto
//! this line via completion queues, never by touching state directly.
//!
//! Tasks receive the context `C` (the mutable core state) and the scheduler
//! itself, so a running task can queue follow-up work.

use std::collections::BTreeMap;

/// A tick counter. The engine drives one tick per game-loop iteration.
pub type Tick = u64;

/// What a repeating task wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Continue,
    Cancel,
}

type OneShot<C> = Box<dyn FnOnce(&mut C, &mut Scheduler<C>)>;
type Repeating<C> = Box<dyn FnMut(&mut C, &mut Scheduler<C>) -> TimerControl>;

struct Timer<C> {
    every: Tick,
    task: Repeating<C>,
}

/// Tick-driven task queue.
pub struct Scheduler<C> {
    now: Tick,
    one_shots: BTreeMap<Tick, Vec<OneShot<C>>>,
    timers: BTreeMap<Tick, Vec<Timer<C>>>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: 0,
            one_shots: BTreeMap::new(),
            timers: BTreeMap::new(),
        }
    }

    /// The current tick.
    #[must_use]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Run a task on the next tick.
    pub fn run_next_tick(&mut self, task: impl FnOnce(&mut C, &mut Self) + 'static) {
        self.run_later(1, task);
    }

    /// Run a task `delay` ticks from now (a delay of 0 also means next
    /// tick: the current tick is already in flight).
    pub fn run_later(&mut self, delay: Tick, task: impl FnOnce(&mut C, &mut Self) + 'static) {
        let due = self.now + delay.max(1);
        self.one_shots.entry(due).or_default().push(Box::new(task));
    }

    /// Run a task every `every` ticks, starting `initial` ticks from now,
    /// until it returns [`TimerControl::Cancel`].
    pub fn run_timer(
        &mut self,
        initial: Tick,
        every: Tick,
        task: impl FnMut(&mut C, &mut Self) -> TimerControl + 'static,
    ) {
        let due = self.now + initial.max(1);
        self.timers.entry(due).or_default().push(Timer {
            every: every.max(1),
            task: Box::new(task),
        });
    }

    /// Advance the clock one tick and run everything due.
    pub fn tick(&mut self, ctx: &mut C) {
        self.now += 1;

        if let Some(due) = self.one_shots.remove(&self.now) {
            for task in due {
                task(ctx, self);
            }
        }

        if let Some(due) = self.timers.remove(&self.now) {
            for mut timer in due {
                if (timer.task)(ctx, self) == TimerControl::Continue {
                    let next = self.now + timer.every;
                    self.timers.entry(next).or_default().push(timer);
                }
            }
        }
    }
}
