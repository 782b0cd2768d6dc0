use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::orchestrator::Scanner;

/// Trigger a scan every `every`. The first tick fires immediately, which
/// doubles as the startup scan. Ticks that land while a scan is still
/// running are absorbed by the scanner's single-flight guard.
pub fn spawn_schedule(scanner: Arc<Scanner>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            debug!("Scheduled scan tick");
            scanner.trigger();
        }
    })
}
