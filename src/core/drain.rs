//! Bounded wait for in-flight guest shutdowns.
//!
//! The loop polls every tracked VM once per tick and drops members as soon as
//! they are observed off. It keeps ticking only while the set is non-empty and
//! the elapsed time is below `max_wait`; whatever is left at that point is
//! re-checked and forced off.

use std::thread;
use std::time::{Duration, Instant};

use super::events::{Event, ForceReason, PowerOperation};
use super::inventory::{PowerService, VmId};
use super::reporter::Reporter;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(900);

/// Source of elapsed time and blocking waits for the drain loop.
pub trait Ticker {
    /// Monotonic time since the ticker was created. `drain` measures its
    /// budget from the value seen on entry, so a ticker may be reused.
    fn elapsed(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock ticker backed by `Instant`, immune to time-of-day changes.
#[derive(Debug)]
pub struct SystemTicker {
    started: Instant,
}

impl SystemTicker {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Ticker for SystemTicker {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Timing knobs for the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSettings {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// VMs whose guest shutdown has been requested but not yet observed.
///
/// Insertion order is kept so polls and log lines follow the order in which
/// shutdowns were issued.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackedShutdowns {
    members: Vec<VmId>,
}

impl TrackedShutdowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `vm`. Returns `false` if it was already tracked.
    pub fn insert(&mut self, vm: VmId) -> bool {
        if self.members.contains(&vm) {
            return false;
        }
        self.members.push(vm);
        true
    }

    pub fn contains(&self, vm: &VmId) -> bool {
        self.members.contains(vm)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// What the drain loop did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Number of poll passes performed.
    pub ticks: u32,
    pub elapsed: Duration,
    /// Whether the loop stopped because `max_wait` elapsed with members left.
    pub timed_out: bool,
    /// Members observed off during a poll, in the order they were observed.
    pub converged: Vec<VmId>,
    /// Members still running at the deadline that were powered off.
    pub forced: Vec<VmId>,
    /// Members that turned out to be off at the final re-check.
    pub stopped_at_deadline: Vec<VmId>,
    /// Members whose forced power-off failed.
    pub force_failed: Vec<VmId>,
}

/// Wait for every tracked VM to leave the powered-on state, escalating to a
/// forced power-off once `settings.max_wait` has elapsed.
///
/// Consumes the tracked set; it is discarded once the loop finishes.
pub fn drain(
    power: &dyn PowerService,
    tracked: TrackedShutdowns,
    settings: DrainSettings,
    ticker: &mut dyn Ticker,
    reporter: &mut dyn Reporter,
) -> DrainReport {
    let mut report = DrainReport::default();
    let mut pending = tracked.members;

    if pending.is_empty() {
        return report;
    }

    let started = ticker.elapsed();
    reporter.report(Event::DrainStarted {
        tracked: pending.len(),
        poll_interval_ms: duration_to_millis(settings.poll_interval),
        max_wait_ms: duration_to_millis(settings.max_wait),
    });

    while !pending.is_empty() && since(&*ticker, started) < settings.max_wait {
        let remaining_wait = settings.max_wait.saturating_sub(since(&*ticker, started));
        ticker.sleep(settings.poll_interval.min(remaining_wait));
        report.ticks += 1;

        pending.retain(|vm| match power.power_state(vm) {
            Ok(state) if state.is_powered_on() => true,
            Ok(_) => {
                reporter.report(Event::ShutdownConfirmed {
                    vm: vm.clone(),
                    elapsed_ms: duration_to_millis(since(&*ticker, started)),
                });
                report.converged.push(vm.clone());
                false
            }
            Err(err) => {
                reporter.report(Event::PowerOperationFailed {
                    vm: vm.clone(),
                    operation: PowerOperation::PowerStateQuery,
                    error: err.to_string(),
                });
                true
            }
        });

        reporter.report(Event::DrainTick {
            tick: report.ticks,
            remaining: pending.len(),
            elapsed_ms: duration_to_millis(since(&*ticker, started)),
        });
    }

    report.elapsed = since(&*ticker, started);
    report.timed_out = !pending.is_empty();

    reporter.report(Event::DrainFinished {
        remaining: pending.len(),
        elapsed_ms: duration_to_millis(report.elapsed),
        timed_out: report.timed_out,
    });

    for vm in pending {
        force_straggler(power, vm, &mut report, reporter);
    }

    report
}

fn force_straggler(
    power: &dyn PowerService,
    vm: VmId,
    report: &mut DrainReport,
    reporter: &mut dyn Reporter,
) {
    // A guest can finish between the last poll and the deadline.
    match power.power_state(&vm) {
        Ok(state) if !state.is_powered_on() => {
            reporter.report(Event::ShutdownConfirmed {
                vm: vm.clone(),
                elapsed_ms: duration_to_millis(report.elapsed),
            });
            report.stopped_at_deadline.push(vm);
            return;
        }
        Ok(_) => {}
        Err(err) => {
            reporter.report(Event::PowerOperationFailed {
                vm: vm.clone(),
                operation: PowerOperation::PowerStateQuery,
                error: err.to_string(),
            });
        }
    }

    match power.power_off(&vm) {
        Ok(()) => {
            reporter.report(Event::ForcedOff {
                vm: vm.clone(),
                reason: ForceReason::DrainTimeout,
            });
            report.forced.push(vm);
        }
        Err(err) => {
            reporter.report(Event::PowerOperationFailed {
                vm: vm.clone(),
                operation: PowerOperation::PowerOff,
                error: err.to_string(),
            });
            report.force_failed.push(vm);
        }
    }
}

fn since(ticker: &dyn Ticker, started: Duration) -> Duration {
    ticker.elapsed().saturating_sub(started)
}

pub(crate) fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}
