//! Inert providers for platforms without a supported window system.
//! The daemon still runs and serves an empty roster.

use std::collections::HashMap;

use super::{RunningApp, WindowServer, Workspace};

pub struct NullWorkspace;

impl Workspace for NullWorkspace {
    fn running_apps(&self) -> Vec<RunningApp> {
        Vec::new()
    }
}

pub struct NullWindowServer;

impl WindowServer for NullWindowServer {
    fn window_owners(&self) -> HashMap<u32, i32> {
        HashMap::new()
    }

    fn ordered_windows(&self) -> Vec<u32> {
        Vec::new()
    }
}
