use std::ffi::CStr;

use objc::runtime::Object;
use objc::{class, msg_send, sel, sel_impl};

use super::{ActivationPolicy, RunningApp, Workspace};

/// Running-application registry backed by NSWorkspace.
pub struct NsWorkspace;

impl Workspace for NsWorkspace {
    fn running_apps(&self) -> Vec<RunningApp> {
        unsafe { snapshot_running_apps() }
    }
}

unsafe fn snapshot_running_apps() -> Vec<RunningApp> {
    let workspace: *mut Object = msg_send![class!(NSWorkspace), sharedWorkspace];
    let apps: *mut Object = msg_send![workspace, runningApplications];
    if apps.is_null() {
        return Vec::new();
    }
    let count: usize = msg_send![apps, count];

    let mut result = Vec::with_capacity(count);
    for i in 0..count {
        let app: *mut Object = msg_send![apps, objectAtIndex: i];
        if app.is_null() {
            continue;
        }
        if let Some(entry) = running_app_from(app) {
            result.push(entry);
        }
    }
    result
}

/// Read one NSRunningApplication into a registry entry.
/// Apps without a localized name are skipped.
unsafe fn running_app_from(app: *mut Object) -> Option<RunningApp> {
    let name: *mut Object = msg_send![app, localizedName];
    let name = nsstring_to_string(name)?;

    let pid: i32 = msg_send![app, processIdentifier];

    let policy: isize = msg_send![app, activationPolicy];
    let policy = match policy {
        0 => ActivationPolicy::Regular,
        1 => ActivationPolicy::Accessory,
        _ => ActivationPolicy::Prohibited,
    };

    let active: objc::runtime::BOOL = msg_send![app, isActive];
    let active = active != objc::runtime::NO;

    let url: *mut Object = msg_send![app, bundleURL];
    let bundle_path = if url.is_null() {
        String::new()
    } else {
        let path: *mut Object = msg_send![url, path];
        nsstring_to_string(path).unwrap_or_default()
    };

    Some(RunningApp {
        name,
        pid,
        policy,
        active,
        bundle_path,
    })
}

unsafe fn nsstring_to_string(ns_string: *mut Object) -> Option<String> {
    if ns_string.is_null() {
        return None;
    }
    let c_str: *const i8 = msg_send![ns_string, UTF8String];
    if c_str.is_null() {
        return None;
    }
    Some(CStr::from_ptr(c_str).to_string_lossy().into_owned())
}
