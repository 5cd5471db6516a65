use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PresenceConfig;
use crate::icon::IconCache;
use crate::source::{installed, ActivationPolicy, RunningApp, WindowServer, Workspace};

/// One entry of the canonical presence list.
///
/// Identity for dedup purposes is `name`: the same displayed application can
/// show up several times in raw window data across desktop spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    /// 0 if the application is installed but not running.
    pub pid: i32,
    /// Cached icon PNG path, empty if no icon could be resolved.
    pub icon_path: String,
    pub active: bool,
    /// Install location, empty if unknown.
    pub bundle_path: String,
}

/// Builds the canonical application list out of the raw OS snapshots.
///
/// Windowed applications come first in front-to-back window order, then
/// running applications without a window in registry order, then (optionally)
/// installed-but-not-running applications. Names appear exactly once; the
/// first occurrence wins its position.
pub struct Aggregator {
    workspace: Box<dyn Workspace>,
    windows: Box<dyn WindowServer>,
    icons: Arc<IconCache>,
    include_installed: bool,
    app_dirs: Vec<PathBuf>,
}

impl Aggregator {
    pub fn new(
        workspace: Box<dyn Workspace>,
        windows: Box<dyn WindowServer>,
        icons: Arc<IconCache>,
        config: &PresenceConfig,
    ) -> Self {
        Self {
            workspace,
            windows,
            icons,
            include_installed: config.include_installed,
            app_dirs: config.app_dirs.clone(),
        }
    }

    pub fn icons(&self) -> &IconCache {
        &self.icons
    }

    /// Build one canonical list from fresh OS snapshots.
    /// A failed OS query shows up as an empty snapshot, never an error.
    pub fn snapshot(&self) -> Vec<Application> {
        let running = self.workspace.running_apps();
        let owners = self.windows.window_owners();
        let ordered = self.windows.ordered_windows();

        // Walk windows front to back; each resolves to its owning regular app.
        let mut ranked: Vec<&RunningApp> = Vec::new();
        let mut windowed_pids: HashSet<i32> = HashSet::new();
        for window_id in &ordered {
            let pid = match owners.get(window_id) {
                Some(pid) => *pid,
                None => continue,
            };
            let app = match running.iter().find(|app| app.pid == pid) {
                Some(app) => app,
                None => continue,
            };
            if app.policy != ActivationPolicy::Regular {
                continue;
            }
            ranked.push(app);
            windowed_pids.insert(app.pid);
        }

        // Regular apps without any window keep their registry order after
        // all windowed entries.
        for app in &running {
            if app.policy == ActivationPolicy::Regular && !windowed_pids.contains(&app.pid) {
                ranked.push(app);
            }
        }

        let mut seen = HashSet::new();
        let mut list = Vec::new();
        for app in ranked {
            if seen.insert(app.name.clone()) {
                list.push(to_application(app, &self.icons));
            }
        }

        if self.include_installed {
            self.append_installed(&running, &mut seen, &mut list);
        }

        tracing::debug!("Built canonical list with {} entries", list.len());
        list
    }

    /// Installed-but-not-running tail: anything in the application
    /// directories whose bundle isn't behind a running process.
    fn append_installed(
        &self,
        running: &[RunningApp],
        seen: &mut HashSet<String>,
        list: &mut Vec<Application>,
    ) {
        let running_paths: HashSet<&str> = running
            .iter()
            .map(|app| app.bundle_path.as_str())
            .collect();

        for entry in installed::scan(&self.app_dirs) {
            let path = entry.path.to_string_lossy().into_owned();
            if running_paths.contains(path.as_str()) {
                continue;
            }
            if !seen.insert(entry.name.clone()) {
                continue;
            }
            let icon_path = self
                .icons
                .resolve_bundle(&entry.name, &path)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            list.push(Application {
                name: entry.name,
                pid: 0,
                icon_path,
                active: false,
                bundle_path: path,
            });
        }
    }
}

/// Snapshot a registry entry into a list/event record, resolving its icon.
pub fn to_application(app: &RunningApp, icons: &IconCache) -> Application {
    let icon_path = icons
        .resolve_bundle(&app.name, &app.bundle_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    Application {
        name: app.name.clone(),
        pid: app.pid,
        icon_path,
        active: app.active,
        bundle_path: app.bundle_path.clone(),
    }
}
