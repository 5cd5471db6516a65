pub mod installed;

#[cfg(not(target_os = "macos"))]
mod fallback;
#[cfg(target_os = "macos")]
mod windows;
#[cfg(target_os = "macos")]
mod workspace;

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;

/// How the OS classifies a process for presentation purposes.
/// Only `Regular` (dock-visible) applications are presence-worthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    Regular,
    Accessory,
    Prohibited,
}

/// One entry from the running-application registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningApp {
    pub name: String,
    pub pid: i32,
    pub policy: ActivationPolicy,
    /// True if this is the foreground application.
    pub active: bool,
    /// Install location, empty if the process has no bundle.
    pub bundle_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceEventKind {
    Launched,
    Terminated,
    Activated,
}

/// A lifecycle change observed in the running-application registry.
#[derive(Debug, Clone)]
pub struct WorkspaceEvent {
    pub kind: WorkspaceEventKind,
    /// Registry state of the application at the moment of the change.
    pub app: RunningApp,
}

/// Running-application registry snapshot.
pub trait Workspace: Send + Sync {
    fn running_apps(&self) -> Vec<RunningApp>;
}

/// Window-server queries backing the presence ordering.
pub trait WindowServer: Send + Sync {
    /// Map from window id to owning process id, normal windows only.
    fn window_owners(&self) -> HashMap<u32, i32>;

    /// Window ids across all desktop spaces in front-to-back order.
    fn ordered_windows(&self) -> Vec<u32>;
}

#[cfg(target_os = "macos")]
pub fn platform_workspace() -> Box<dyn Workspace> {
    Box::new(workspace::NsWorkspace)
}

#[cfg(not(target_os = "macos"))]
pub fn platform_workspace() -> Box<dyn Workspace> {
    Box::new(fallback::NullWorkspace)
}

#[cfg(target_os = "macos")]
pub fn platform_window_server() -> Box<dyn WindowServer> {
    Box::new(windows::CgWindowServer)
}

#[cfg(not(target_os = "macos"))]
pub fn platform_window_server() -> Box<dyn WindowServer> {
    Box::new(fallback::NullWindowServer)
}

/// Watches the running-application registry and emits lifecycle events.
///
/// The registry is polled on a fixed interval and consecutive snapshots are
/// diffed into Launched/Terminated/Activated events, delivered in a
/// deterministic order per tick. The first snapshot is the baseline; apps
/// already running at startup produce no events.
pub struct WorkspaceWatcher {
    workspace: Box<dyn Workspace>,
    interval: Duration,
}

impl WorkspaceWatcher {
    pub fn new(workspace: Box<dyn Workspace>, interval: Duration) -> Self {
        Self {
            workspace,
            interval,
        }
    }

    /// Poll until the receiving side goes away. A quiescent registry never
    /// sends, so channel closure is watched alongside the tick rather than
    /// detected through a failed send.
    pub async fn run(self, events: mpsc::Sender<WorkspaceEvent>) {
        let mut previous = self.workspace.running_apps();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = events.closed() => {
                    tracing::debug!("Event channel closed, stopping workspace watcher");
                    return;
                }
            }
            let current = self.workspace.running_apps();
            for event in diff_registry(&previous, &current) {
                if events.send(event).await.is_err() {
                    tracing::debug!("Event channel closed, stopping workspace watcher");
                    return;
                }
            }
            previous = current;
        }
    }
}

/// Diff two registry snapshots into lifecycle events: launches first, then
/// terminations, then at most one activation change.
fn diff_registry(previous: &[RunningApp], current: &[RunningApp]) -> Vec<WorkspaceEvent> {
    let mut events = Vec::new();
    let previous_by_pid: HashMap<i32, &RunningApp> =
        previous.iter().map(|app| (app.pid, app)).collect();
    let current_pids: std::collections::HashSet<i32> =
        current.iter().map(|app| app.pid).collect();

    for app in current {
        if !previous_by_pid.contains_key(&app.pid) {
            events.push(WorkspaceEvent {
                kind: WorkspaceEventKind::Launched,
                app: app.clone(),
            });
        }
    }

    for app in previous {
        if !current_pids.contains(&app.pid) {
            events.push(WorkspaceEvent {
                kind: WorkspaceEventKind::Terminated,
                app: app.clone(),
            });
        }
    }

    // The app holding focus now, if it didn't hold it before.
    if let Some(active) = current.iter().find(|app| app.active) {
        let was_active = previous_by_pid
            .get(&active.pid)
            .map(|app| app.active)
            .unwrap_or(false);
        if !was_active {
            events.push(WorkspaceEvent {
                kind: WorkspaceEventKind::Activated,
                app: active.clone(),
            });
        }
    }

    events
}
