use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::pipeline::LauncherPipeline;
use crate::core::config::LauncherConfig;
use crate::core::error::{MirrorError, MirrorResult};
use crate::core::version::VersionIndex;

/// Result of one launcher within a scan: the synced version or why it failed.
#[derive(Debug)]
pub struct LauncherOutcome {
    pub launcher: String,
    pub result: MirrorResult<String>,
}

#[derive(Debug)]
pub struct ScanReport {
    pub outcomes: Vec<LauncherOutcome>,
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    Completed(ScanReport),
    /// Another scan was already running; nothing was started.
    Skipped,
}

/// Drives scans: one concurrent task per configured launcher, at most one
/// scan at a time process-wide.
pub struct Scanner {
    targets: Vec<LauncherConfig>,
    pipeline: Arc<dyn LauncherPipeline>,
    index: Arc<VersionIndex>,
    task_timeout: Duration,
    in_flight: Mutex<()>,
}

impl Scanner {
    pub fn new(
        targets: Vec<LauncherConfig>,
        pipeline: Arc<dyn LauncherPipeline>,
        index: Arc<VersionIndex>,
        task_timeout: Duration,
    ) -> Self {
        Self {
            targets,
            pipeline,
            index,
            task_timeout,
            in_flight: Mutex::new(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Fire-and-forget scan. Callers observe the result through the index and logs.
    pub fn trigger(self: &Arc<Self>) {
        let scanner = Arc::clone(self);
        tokio::spawn(async move {
            scanner.run().await;
        });
    }

    /// Run one scan to completion, or return `Skipped` right away if one is running.
    ///
    /// Never fails as a whole: per-launcher errors end up in the report and
    /// leave that launcher's previously indexed versions untouched.
    pub async fn run(&self) -> ScanOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            info!("Scan already in progress, skipping this run");
            return ScanOutcome::Skipped;
        };

        info!("Scan started ({} launchers)", self.targets.len());
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        for target in self.targets.iter().cloned() {
            let pipeline = Arc::clone(&self.pipeline);
            let index = Arc::clone(&self.index);
            let timeout = self.task_timeout;
            tasks.spawn(sync_launcher(pipeline, index, target, timeout));
        }

        let mut outcomes = Vec::with_capacity(self.targets.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Launcher task ended abnormally: {}", e),
            }
        }

        let report = ScanReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        info!(
            "Scan finished in {:?}: {}/{} launchers synced",
            report.elapsed,
            report.succeeded(),
            self.targets.len()
        );
        ScanOutcome::Completed(report)
    }
}

/// One launcher's run under its own deadline. Expiry drops the pipeline
/// future, which cancels whatever request or write it was in.
async fn sync_launcher(
    pipeline: Arc<dyn LauncherPipeline>,
    index: Arc<VersionIndex>,
    target: LauncherConfig,
    timeout: Duration,
) -> LauncherOutcome {
    let result = match tokio::time::timeout(timeout, pipeline.sync(&target)).await {
        Ok(result) => result,
        Err(_) => Err(MirrorError::Timeout {
            launcher: target.name.clone(),
            timeout,
        }),
    };

    let result = match result {
        Ok(record) => {
            index.insert(&target.name, &record.version, record.manifest_path);
            info!(launcher = %target.name, "Updated to {}", record.version);
            Ok(record.version)
        }
        Err(e) => {
            warn!(launcher = %target.name, "Sync failed: {}", e);
            Err(e)
        }
    };

    LauncherOutcome {
        launcher: target.name,
        result,
    }
}
