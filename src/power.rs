// src/power.rs
//
// Suspend-to-RAM with an RTC wake alarm, via rtcwake(8). The call blocks
// until the host resumes; whether the resume came from the alarm or from
// an external event (power button, keyboard) is inferred afterwards from
// how long the host actually stayed down.

use std::time::{Duration, Instant};

use log::{info, warn};
use thiserror::Error;

use crate::shell::{CommandRunner, ShellError};

#[derive(Debug, Error)]
pub enum PowerError {
    #[error("suspend command exited with code {code}: {output}")]
    Command { code: i32, output: String },
    #[error(transparent)]
    Shell(#[from] ShellError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// The programmed RTC alarm fired.
    RtcTimer,
    /// Something else resumed the host before the alarm was due.
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendMode {
    /// Real suspend-to-RAM (`rtcwake -m mem`). Needs root.
    Mem,
    /// In-process sleep. The host stays up; the wake is always the timer.
    None,
}

impl SuspendMode {
    pub fn from_config(suspend_to_memory: bool) -> Self {
        if suspend_to_memory {
            SuspendMode::Mem
        } else {
            SuspendMode::None
        }
    }
}

pub struct Power<R> {
    runner: R,
    mode: SuspendMode,
}

impl<R: CommandRunner> Power<R> {
    pub fn new(runner: R, mode: SuspendMode) -> Self {
        Self { runner, mode }
    }

    /// Block for `wait`, then report what ended the wait. A zero wait is
    /// treated as already due: no OS facility is touched.
    pub fn suspend(&self, wait: Duration) -> Result<WakeCause, PowerError> {
        if wait.is_zero() {
            return Ok(WakeCause::RtcTimer);
        }

        match self.mode {
            SuspendMode::None => {
                info!("[power] sleeping in-process for {}s", wait.as_secs());
                std::thread::sleep(wait);
                Ok(WakeCause::RtcTimer)
            }
            SuspendMode::Mem => {
                info!(
                    "[power] suspending to RAM, RTC alarm in {}s",
                    wait.as_secs()
                );
                let suspend_start = Instant::now();
                let out = self
                    .runner
                    .run(&format!("rtcwake -m mem -s {}", wait.as_secs()))?;
                if !out.success() {
                    return Err(PowerError::Command {
                        code: out.code,
                        output: out.output.trim().to_string(),
                    });
                }

                let elapsed = suspend_start.elapsed();
                if elapsed < wait {
                    info!(
                        "[power] resumed after {}s, before the RTC alarm",
                        elapsed.as_secs()
                    );
                    Ok(WakeCause::External)
                } else {
                    Ok(WakeCause::RtcTimer)
                }
            }
        }
    }

    /// Fire-and-forget halt request with a grace delay. Runs on the fatal
    /// path, so failures are only logged.
    pub fn schedule_shutdown(&self, grace_minutes: u64) {
        info!(
            "[power] scheduling system shutdown in {} minute(s)",
            grace_minutes
        );
        match self.runner.run(&format!("shutdown -h +{}", grace_minutes)) {
            Ok(out) if !out.success() => {
                warn!(
                    "[power] shutdown command exited with code {}: {}",
                    out.code,
                    out.output.trim()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("[power] shutdown command failed: {}", e),
        }
    }
}

/// Suspend-to-RAM and halt need root. Checked once at startup.
pub fn has_shutdown_privileges() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRunner;

    #[test]
    fn zero_wait_issues_no_command() {
        let runner = MockRunner::new();
        let power = Power::new(&runner, SuspendMode::Mem);
        assert_eq!(
            power.suspend(Duration::ZERO).unwrap(),
            WakeCause::RtcTimer
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn early_resume_is_an_external_wake() {
        let runner = MockRunner::new();
        runner.push_exit(0, "");
        // The mock returns immediately, far sooner than the 60s alarm.
        let power = Power::new(&runner, SuspendMode::Mem);
        assert_eq!(
            power.suspend(Duration::from_secs(60)).unwrap(),
            WakeCause::External
        );
        assert_eq!(runner.calls(), vec!["rtcwake -m mem -s 60"]);
    }

    #[test]
    fn full_duration_resume_is_the_timer() {
        let runner = MockRunner::new();
        runner.push_exit(0, "");
        runner.set_delay(Duration::from_millis(1100));
        let power = Power::new(&runner, SuspendMode::Mem);
        assert_eq!(
            power.suspend(Duration::from_secs(1)).unwrap(),
            WakeCause::RtcTimer
        );
    }

    #[test]
    fn command_failure_is_fatal() {
        let runner = MockRunner::new();
        runner.push_exit(1, "rtcwake: /dev/rtc0: permission denied");
        let power = Power::new(&runner, SuspendMode::Mem);
        match power.suspend(Duration::from_secs(60)) {
            Err(PowerError::Command { code: 1, .. }) => {}
            other => panic!("expected command failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn mode_none_sleeps_and_reports_the_timer() {
        let runner = MockRunner::new();
        let power = Power::new(&runner, SuspendMode::None);
        assert_eq!(
            power.suspend(Duration::from_millis(10)).unwrap(),
            WakeCause::RtcTimer
        );
        assert!(runner.calls().is_empty());
    }
}
