//! Process wide shutdown signalling.
//!
//! [`install_termination_listener`] flips the global running flag once the process receives
//! SIGINT, SIGTERM or SIGHUP. Long running loops poll [`is_running`] or await
//! [`await_shutdown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};

static RUNNING: AtomicBool = AtomicBool::new(true);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn install_termination_listener() {
    tokio::spawn(async move {
        let mut sig_term = signal(SignalKind::terminate()).ok();
        let mut sig_int = signal(SignalKind::interrupt()).ok();
        let mut sig_hup = signal(SignalKind::hangup()).ok();

        let signal_name = tokio::select! {
            Some(_) = async { sig_int.as_mut()?.recv().await } => "SIGINT",
            Some(_) = async { sig_term.as_mut()?.recv().await } => "SIGTERM",
            Some(_) = async { sig_hup.as_mut()?.recv().await } => "SIGHUP",
        };

        tracing::info!("Received {}. Shutting down...", signal_name);
        request_shutdown();
    });
}

/// Marks the process as shutting down, as if a termination signal had been received.
pub fn request_shutdown() {
    RUNNING.store(false, Ordering::Relaxed);
}

pub fn is_running() -> bool {
    RUNNING.load(Ordering::Relaxed)
}

pub async fn await_shutdown() {
    while is_running() {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
