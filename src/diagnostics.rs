// ============================================================================
// Runtime Diagnostics Loop
// ============================================================================
//
// Periodic, purely observational sampling of process memory and runtime
// task counts, emitted as one debug record per tick. The loop never blocks
// any other component and stops when its shutdown signal fires.
//
// ============================================================================

use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle for a running diagnostics loop. Dropping the handle does not stop
/// the loop; call [`StatsHandle::stop`].
pub struct StatsHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StatsHandle {
    /// Signals the loop to stop after the current tick.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the diagnostics loop on the current runtime.
pub fn spawn(interval: Duration) -> StatsHandle {
    let (shutdown, rx) = watch::channel(false);
    let task = tokio::spawn(run(interval, rx));
    StatsHandle { shutdown, task }
}

async fn run(interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick of a tokio interval fires immediately; consume it so
    // samples start one interval after spawn.
    ticker.tick().await;

    let mut system = System::new();
    let pid = Pid::from_u32(std::process::id());

    loop {
        tokio::select! {
            _ = ticker.tick() => sample(&mut system, pid),
            _ = shutdown.changed() => {
                debug!("diagnostics loop stopped");
                return;
            }
        }
    }
}

fn sample(system: &mut System, pid: Pid) {
    system.refresh_process_specifics(pid, ProcessRefreshKind::new().with_memory());
    let memory_mb = system
        .process(pid)
        .map(|p| p.memory() as f64 / 1_000_000.0)
        .unwrap_or(0.0);

    let metrics = tokio::runtime::Handle::current().metrics();

    debug!(
        memory_mb = memory_mb,
        tasks = metrics.num_alive_tasks(),
        workers = metrics.num_workers(),
        "runtime stats"
    );
}
