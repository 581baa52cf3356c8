//! Periodic health monitor.
//!
//! Nudges the worker on a fixed interval; the worker decides whether a probe
//! is due. Holds only a weak sender so it never keeps the worker alive.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::worker::Command;

pub(super) fn spawn(commands: mpsc::WeakSender<Command>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(commands) = commands.upgrade() else {
                break;
            };
            if commands.send(Command::HealthCheck).await.is_err() {
                break;
            }
        }
        log::debug!("[health] Monitor stopped");
    })
}
