use std::path::PathBuf;

/// Default directories scanned for application bundles.
pub const DEFAULT_APP_DIRS: &[&str] = &[
    "/Applications",
    "/Applications/Utilities",
    "/System/Applications",
    "/System/Applications/Utilities",
];

/// An installed .app bundle discovered on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledApp {
    pub name: String,
    pub path: PathBuf,
}

/// Scan the given directories for .app bundles, sorted by name.
/// Missing or unreadable directories are skipped.
pub fn scan(dirs: &[PathBuf]) -> Vec<InstalledApp> {
    let mut apps = Vec::new();
    for dir in dirs {
        if !dir.exists() {
            continue;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "app") {
                let name = path
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();
                apps.push(InstalledApp { name, path });
            }
        }
    }
    apps.sort_by(|a, b| a.name.cmp(&b.name));
    apps
}
