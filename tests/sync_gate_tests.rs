// tests/sync_gate_tests.rs
// Drives the cloud sync gate through the real Dropbox CLI adapter, with the
// shell seam scripted, and asserts the exact command traffic.

use std::time::Duration;

use camshotd::cloud::{CloudError, DropboxCli, SyncGate};
use camshotd::testing::MockRunner;

fn gate(runner: &MockRunner) -> SyncGate<DropboxCli<&MockRunner>> {
    SyncGate::new(DropboxCli::new(runner)).with_poll_interval(Duration::from_millis(1))
}

#[test]
fn already_converged_issues_a_single_status_call() {
    let runner = MockRunner::new();
    runner.push_ok("Up to date\n");

    gate(&runner).wait_for_sync(Duration::from_secs(60)).unwrap();
    assert_eq!(runner.calls(), vec!["dropbox status"]);
}

#[test]
fn down_daemon_is_started_then_polled_to_convergence() {
    let runner = MockRunner::new();
    runner.push_exit(0, "Dropbox isn't running!\n"); // status
    runner.push_ok(""); // dropbox start
    runner.push_ok("Syncing 2 files...\n"); // status
    runner.push_ok("Up to date\n"); // status

    gate(&runner).wait_for_sync(Duration::from_secs(60)).unwrap();
    assert_eq!(
        runner.calls(),
        vec![
            "dropbox status",
            "dropbox start",
            "dropbox status",
            "dropbox status",
        ]
    );
}

#[test]
fn missing_daemon_binary_is_fatal() {
    let runner = MockRunner::new();
    runner.push_exit(127, "sh: dropbox: command not found\n"); // status -> NotRunning
    runner.push_exit(127, "sh: dropbox: command not found\n"); // start fails

    match gate(&runner).wait_for_sync(Duration::from_secs(60)) {
        Err(CloudError::DaemonNotInstalled) => {}
        other => panic!("expected DaemonNotInstalled, got {:?}", other),
    }
}

#[test]
fn stuck_sync_times_out_softly_without_restarting() {
    let runner = MockRunner::new();
    for _ in 0..8 {
        runner.push_ok("Syncing \"big.mp4\"\n");
    }

    gate(&runner)
        .wait_for_sync(Duration::from_millis(4))
        .unwrap();

    let calls = runner.calls();
    assert!(calls.len() > 1);
    assert!(calls.iter().all(|c| c == "dropbox status"));
}
