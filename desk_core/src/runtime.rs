//! Cooperative scheduler that runs every desk task on one thread.
//!
//! Each task returns the delay until it wants to run again. `run_once` picks
//! the earliest-due task (ties go to the order of `Task::ALL`), sleeps through
//! the `Clock` until it is due, and runs it. With a `ManualClock` the whole
//! desk runs deterministically and as fast as the CPU allows.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use desk_traits::{Clock, Message, PositionStore, Transport};

use crate::config::{MotionCfg, TimingCfg};
use crate::controller::SpeedController;
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::estimator::{Estimator, EstimatorReport};
use crate::hw_error::map_hw_error;
use crate::persist;
use crate::planner::{Planner, PlannerOutcome};
use crate::publisher::{StatusPublisher, StatusSnapshot};
use crate::state::DriverState;
use crate::topics::Topics;

/// Upper bound on messages handled per inbox tick.
const INBOX_BATCH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Estimator,
    Planner,
    Controller,
    Inbox,
    Keepalive,
}

impl Task {
    pub const ALL: [Task; 5] = [
        Task::Estimator,
        Task::Planner,
        Task::Controller,
        Task::Inbox,
        Task::Keepalive,
    ];
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    task: Task,
    due: Instant,
    last_run: Instant,
}

pub struct Desk {
    pub(crate) state: DriverState,
    pub(crate) motion: MotionCfg,
    pub(crate) timing: TimingCfg,
    pub(crate) estimator: Estimator,
    pub(crate) planner: Planner,
    pub(crate) controller: SpeedController,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) publisher: StatusPublisher,
    pub(crate) topics: Topics,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) store: Box<dyn PositionStore>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    slots: [Slot; 5],
}

impl core::fmt::Debug for Desk {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Desk")
            .field("state", &self.state)
            .field("motion", &self.motion)
            .field("engaged", &self.controller.is_engaged())
            .finish_non_exhaustive()
    }
}

impl Desk {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        state: DriverState,
        motion: MotionCfg,
        timing: TimingCfg,
        estimator: Estimator,
        controller: SpeedController,
        topics: Topics,
        transport: Box<dyn Transport>,
        store: Box<dyn PositionStore>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let now = clock.now();
        let slots = Task::ALL.map(|task| Slot {
            task,
            due: now,
            last_run: now,
        });
        let mut desk = Self {
            state,
            motion,
            timing,
            estimator,
            planner: Planner,
            controller,
            dispatcher: Dispatcher::new(topics.clone()),
            publisher: StatusPublisher::new(topics.clone()),
            topics,
            transport,
            store,
            clock,
            slots,
        };
        desk.subscribe();
        desk.publish_status();
        desk
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn motion(&self) -> &MotionCfg {
        &self.motion
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Current height percentage.
    pub fn percent(&self) -> u8 {
        self.state.percent(&self.motion)
    }

    pub fn is_driving(&self) -> bool {
        self.state.driving
    }

    /// Run the earliest-due task, sleeping until it is due.
    pub fn run_once(&mut self) -> Task {
        let idx = self.next_index();
        let due = self.slots[idx].due;
        let now = self.clock.now();
        if due > now {
            self.clock.sleep(due - now);
        }
        let now = self.clock.now();
        let Slot { task, last_run, .. } = self.slots[idx];
        let period = self.run_task(task, now.saturating_duration_since(last_run));
        let slot = &mut self.slots[idx];
        slot.last_run = now;
        slot.due = now + period;
        task
    }

    /// Run every task falling due within `d`, then leave the clock at `now + d`.
    pub fn run_for(&mut self, d: Duration) {
        let end = self.clock.now() + d;
        while self.next_due() <= end {
            self.run_once();
        }
        let now = self.clock.now();
        if end > now {
            self.clock.sleep(end - now);
        }
    }

    /// Run until `pred` holds for the state or `max` elapses; returns whether `pred` held.
    pub fn run_until<F>(&mut self, mut pred: F, max: Duration) -> bool
    where
        F: FnMut(&DriverState) -> bool,
    {
        let deadline = self.clock.now() + max;
        loop {
            if pred(&self.state) {
                return true;
            }
            if self.next_due() > deadline {
                return false;
            }
            self.run_once();
        }
    }

    /// Run until `shutdown` is raised, then stop the actuator and persist.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        tracing::info!(position = self.state.position, "desk running");
        while !shutdown.load(Ordering::Relaxed) {
            self.run_once();
        }
        self.shutdown();
    }

    /// Stop any motion and persist the current position.
    pub fn shutdown(&mut self) {
        self.state.driving = false;
        self.controller.halt(&mut self.state);
        self.persist();
        tracing::info!(position = self.state.position, "desk stopped");
    }

    /// Dispatch one inbound message and apply its side effects.
    pub fn handle_message(&mut self, msg: &Message) -> Dispatch {
        let outcome = self.dispatcher.handle(&mut self.state, &self.motion, msg);
        match outcome {
            Dispatch::MoveStarted { .. } => {
                for task in [Task::Estimator, Task::Planner, Task::Controller] {
                    self.wake(task);
                }
            }
            Dispatch::Overridden { .. } => {
                self.persist();
                self.publish_status();
            }
            Dispatch::Ignored => {}
        }
        outcome
    }

    fn run_task(&mut self, task: Task, elapsed: Duration) -> Duration {
        match task {
            Task::Estimator => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                match self.estimator.tick(&mut self.state, &self.motion, elapsed_ms) {
                    Ok(report) => self.apply_estimator(report),
                    Err(e) => {
                        tracing::warn!(error = %e, "encoder read failed; skipping tick");
                        if self.estimator.status_due(&mut self.state) {
                            self.publish_status();
                        }
                    }
                }
                Estimator::period(&self.state, &self.timing)
            }
            Task::Planner => {
                if self.planner.tick(&mut self.state, &self.motion) == PlannerOutcome::Reached {
                    self.persist();
                }
                Planner::period(&self.state, &self.timing)
            }
            Task::Controller => self
                .controller
                .tick(&mut self.state, &self.motion, &self.timing),
            Task::Inbox => {
                for _ in 0..INBOX_BATCH {
                    match self.transport.poll() {
                        Ok(Some(msg)) => {
                            self.handle_message(&msg);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            let err = map_hw_error(&*e);
                            tracing::warn!(error = %err, "transport poll failed");
                            break;
                        }
                    }
                }
                self.timing.inbox
            }
            Task::Keepalive => {
                if let Err(e) = self.transport.ping() {
                    let err = map_hw_error(&*e);
                    tracing::warn!(error = %err, "keepalive failed");
                }
                self.timing.keepalive
            }
        }
    }

    fn apply_estimator(&mut self, report: EstimatorReport) {
        if report.stalled {
            self.controller.halt(&mut self.state);
            self.persist();
        }
        if report.publish {
            self.publish_status();
        }
    }

    fn subscribe(&mut self) {
        for topic in self.topics.inbound() {
            if let Err(e) = self.transport.subscribe(topic) {
                let err = map_hw_error(&*e);
                tracing::warn!(topic, error = %err, "subscribe failed");
            }
        }
    }

    fn publish_status(&mut self) {
        let snap = StatusSnapshot::of(&self.state, &self.motion);
        self.publisher.publish(&mut *self.transport, snap);
    }

    fn persist(&mut self) -> bool {
        persist::persist(&mut self.state, &self.motion, &mut *self.store)
    }

    fn wake(&mut self, task: Task) {
        let now = self.clock.now();
        if let Some(slot) = self.slots.iter_mut().find(|s| s.task == task) {
            slot.due = slot.due.min(now);
        }
    }

    fn next_index(&self) -> usize {
        let mut best = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.due < self.slots[best].due {
                best = i;
            }
        }
        best
    }

    fn next_due(&self) -> Instant {
        self.slots[self.next_index()].due
    }
}
