//! Signal delivery to the shutdown waiter (unix only).
#![cfg(unix)]

use std::process::Command;
use std::time::Duration;

use runtime::shutdown::{wait_for_shutdown, ShutdownSignal};
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn sigterm_resolves_the_waiter() {
    let waiter = tokio::spawn(wait_for_shutdown());
    // Let the waiter install its handlers before the signal is sent.
    sleep(Duration::from_millis(200)).await;

    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .expect("kill is available");
    assert!(status.success());

    let received = timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter must resolve")
        .unwrap()
        .unwrap();
    assert_eq!(received, ShutdownSignal::Terminate);
}
