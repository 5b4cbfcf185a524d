// src/daemon.rs
//
// The cycle state machine: network check -> cloud sync -> capture ->
// reschedule -> suspend, repeated until a wake turns out to be caused by
// something other than the RTC alarm, or a fatal error unwinds the run.

use std::time::{Duration, Instant};

use chrono::Local;
use log::{info, warn};
use thiserror::Error;

use crate::capture::{CaptureError, CaptureOrchestrator, CaptureReport, SystemGrabber};
use crate::cloud::{CloudError, DropboxCli, SyncGate};
use crate::config::Config;
use crate::daylight::DaylightWindow;
use crate::net::NetworkGate;
use crate::power::{Power, PowerError, SuspendMode, WakeCause};
use crate::shell::SystemRunner;

/// How long each cycle is willing to wait for the sync daemon to flush.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("cloud sync: {0}")]
    Cloud(#[from] CloudError),
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("suspend: {0}")]
    Power(#[from] PowerError),
    #[error("schedule has no future occurrence")]
    ScheduleExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A human (or some other external event) woke the host: stop looping.
    StoppedByExternalWake,
    /// Single --oneshot pass finished.
    OneshotComplete,
}

enum CycleOutcome {
    Continue,
    ExternalWake,
}

/// The collaborators one cycle runs through, in order. The production
/// bundle is [`Services`]; tests drive the loop with scripted mocks.
pub trait CycleServices {
    fn ensure_connectivity(&mut self);
    fn wait_for_sync(&mut self, timeout: Duration) -> Result<(), CloudError>;
    fn capture_all(
        &mut self,
        now: chrono::DateTime<Local>,
    ) -> Result<CaptureReport, CaptureError>;
    fn suspend(&mut self, wait: Duration) -> Result<WakeCause, PowerError>;
}

/// Production wiring over the system shell runner.
pub struct Services {
    net: NetworkGate<SystemRunner>,
    sync: SyncGate<DropboxCli<SystemRunner>>,
    capture: CaptureOrchestrator<SystemGrabber<SystemRunner>>,
    power: Power<SystemRunner>,
    cameras: Vec<crate::config::CameraDescriptor>,
}

impl Services {
    pub fn new(config: &Config) -> Self {
        Self {
            net: NetworkGate::new(SystemRunner),
            sync: SyncGate::new(DropboxCli::new(SystemRunner)),
            capture: CaptureOrchestrator::new(
                SystemGrabber::new(SystemRunner),
                config.datastore.clone(),
            ),
            power: Power::new(
                SystemRunner,
                SuspendMode::from_config(config.schedule.suspend_to_memory),
            ),
            cameras: config.cameras.clone(),
        }
    }
}

impl CycleServices for Services {
    fn ensure_connectivity(&mut self) {
        self.net.ensure_connectivity();
    }

    fn wait_for_sync(&mut self, timeout: Duration) -> Result<(), CloudError> {
        self.sync.wait_for_sync(timeout)
    }

    fn capture_all(
        &mut self,
        now: chrono::DateTime<Local>,
    ) -> Result<CaptureReport, CaptureError> {
        self.capture.capture_all(&self.cameras, now)
    }

    fn suspend(&mut self, wait: Duration) -> Result<WakeCause, PowerError> {
        self.power.suspend(wait)
    }
}

/// Run cycles until an external wake stops the loop or a fatal error
/// unwinds. Work time already spent in a cycle is charged against the
/// suspend budget, so the wall-clock cadence tracks the schedule no matter
/// how long syncing and capturing took.
pub fn run_loop(
    window: &DaylightWindow,
    services: &mut impl CycleServices,
) -> Result<RunOutcome, DaemonError> {
    loop {
        match run_cycle(window, services)? {
            CycleOutcome::Continue => {}
            CycleOutcome::ExternalWake => {
                info!("[daemon] resumed by an external event, stopping");
                return Ok(RunOutcome::StoppedByExternalWake);
            }
        }
    }
}

/// One network/sync/capture pass without the suspend tail.
pub fn run_once(services: &mut impl CycleServices) -> Result<RunOutcome, DaemonError> {
    services.ensure_connectivity();
    services.wait_for_sync(SYNC_TIMEOUT)?;
    let report = services.capture_all(Local::now())?;
    log_report(&report);
    Ok(RunOutcome::OneshotComplete)
}

fn run_cycle(
    window: &DaylightWindow,
    services: &mut impl CycleServices,
) -> Result<CycleOutcome, DaemonError> {
    let cycle_start = Instant::now();
    info!("[daemon] cycle started");

    services.ensure_connectivity();
    services.wait_for_sync(SYNC_TIMEOUT)?;

    let now = Local::now();
    let report = services.capture_all(now)?;
    log_report(&report);

    let now = Local::now();
    let next = window
        .next_occurrence(now)
        .ok_or(DaemonError::ScheduleExhausted)?;
    let until_next = (next - now).to_std().unwrap_or_default();
    let delay = clamp_delay(until_next, cycle_start.elapsed());
    info!(
        "[daemon] next wake at {}, suspending for {}s",
        next.format("%Y-%m-%d %H:%M:%S"),
        delay.as_secs()
    );

    match services.suspend(delay)? {
        WakeCause::RtcTimer => Ok(CycleOutcome::Continue),
        WakeCause::External => Ok(CycleOutcome::ExternalWake),
    }
}

/// Subtract the time this cycle already burned from the time until the
/// next occurrence. An overrun clamps to zero: immediate retry, never a
/// negative sleep.
fn clamp_delay(until_next: Duration, already_spent: Duration) -> Duration {
    until_next.saturating_sub(already_spent)
}

fn log_report(report: &CaptureReport) {
    if report.succeeded() == report.len() {
        info!("[daemon] captured {}/{} cameras", report.succeeded(), report.len());
    } else {
        warn!("[daemon] captured {}/{} cameras", report.succeeded(), report.len());
    }
}
