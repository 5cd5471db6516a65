use std::collections::HashMap;
use std::ffi::c_void;

use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::TCFType;
use core_foundation::number::{CFNumber, CFNumberRef};
use core_foundation::string::CFString;

use super::WindowServer;

type CGSConnectionID = u32;

extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relative_to_window: u32) -> *const c_void;
    fn CFArrayGetCount(array: *const c_void) -> isize;
    fn CFArrayGetValueAtIndex(array: *const c_void, idx: isize) -> *const c_void;
    fn CFDictionaryGetValue(dict: *const c_void, key: *const c_void) -> *const c_void;
    fn CFRelease(cf: *const c_void);

    // Private CoreGraphics services API; there is no public call that
    // enumerates window ordering across all spaces.
    fn CGSMainConnectionID() -> CGSConnectionID;
    fn CGSCopyManagedDisplaySpaces(cid: CGSConnectionID) -> *const c_void;
    fn CGSCopyWindowsWithOptionsAndTags(
        cid: CGSConnectionID,
        owner: i64,
        spaces: CFArrayRef,
        options: i64,
        set_tags: *mut i64,
        clear_tags: *mut i64,
    ) -> *const c_void;
}

const K_CG_WINDOW_LIST_OPTION_ALL: u32 = 0;
const K_CG_WINDOW_LIST_EXCLUDE_DESKTOP: u32 = 1 << 4;

/// Window-server queries via CGWindowList and the CGS space APIs.
pub struct CgWindowServer;

impl WindowServer for CgWindowServer {
    fn window_owners(&self) -> HashMap<u32, i32> {
        unsafe { copy_window_owners() }
    }

    fn ordered_windows(&self) -> Vec<u32> {
        unsafe { copy_ordered_windows() }
    }
}

unsafe fn copy_window_owners() -> HashMap<u32, i32> {
    let mut owners = HashMap::new();

    let options = K_CG_WINDOW_LIST_OPTION_ALL | K_CG_WINDOW_LIST_EXCLUDE_DESKTOP;
    let array = CGWindowListCopyWindowInfo(options, 0);
    if array.is_null() {
        return owners;
    }

    let key_layer = CFString::new("kCGWindowLayer");
    let key_number = CFString::new("kCGWindowNumber");
    let key_pid = CFString::new("kCGWindowOwnerPID");

    let count = CFArrayGetCount(array);
    for i in 0..count {
        let dict = CFArrayGetValueAtIndex(array, i);
        if dict.is_null() {
            continue;
        }

        // Normal windows only; panels, menus and overlays sit on other layers.
        let layer = dict_get_number(dict, &key_layer).unwrap_or(-1);
        if layer != 0 {
            continue;
        }

        let number = match dict_get_number(dict, &key_number) {
            Some(n) => n,
            None => continue,
        };
        let pid = match dict_get_number(dict, &key_pid) {
            Some(p) => p,
            None => continue,
        };
        owners.insert(number as u32, pid as i32);
    }

    CFRelease(array);
    owners
}

unsafe fn copy_ordered_windows() -> Vec<u32> {
    let cid = CGSMainConnectionID();
    let space_ids = copy_space_ids(cid);
    if space_ids.is_empty() {
        return Vec::new();
    }

    let space_numbers: Vec<CFNumber> = space_ids
        .iter()
        .map(|id| CFNumber::from(*id as i64))
        .collect();
    let spaces = CFArray::from_CFTypes(&space_numbers);

    let mut set_tags: i64 = 0;
    let mut clear_tags: i64 = 0x0040_0000_0000;
    let windows = CGSCopyWindowsWithOptionsAndTags(
        cid,
        0,
        spaces.as_concrete_TypeRef(),
        2,
        &mut set_tags,
        &mut clear_tags,
    );
    if windows.is_null() {
        return Vec::new();
    }

    let mut ids = Vec::new();
    let count = CFArrayGetCount(windows);
    for i in 0..count {
        let value = CFArrayGetValueAtIndex(windows, i);
        if value.is_null() {
            continue;
        }
        let number = CFNumber::wrap_under_get_rule(value as CFNumberRef);
        if let Some(id) = number.to_i64() {
            ids.push(id as u32);
        }
    }

    CFRelease(windows);
    ids
}

/// All space ids across every display, in display order.
unsafe fn copy_space_ids(cid: CGSConnectionID) -> Vec<u64> {
    let mut ids = Vec::new();

    let displays = CGSCopyManagedDisplaySpaces(cid);
    if displays.is_null() {
        return ids;
    }

    let key_spaces = CFString::new("Spaces");
    let key_id = CFString::new("id64");

    let display_count = CFArrayGetCount(displays);
    for i in 0..display_count {
        let display = CFArrayGetValueAtIndex(displays, i);
        if display.is_null() {
            continue;
        }
        let spaces = CFDictionaryGetValue(display, key_spaces.as_concrete_TypeRef() as *const c_void);
        if spaces.is_null() {
            continue;
        }
        let space_count = CFArrayGetCount(spaces);
        for j in 0..space_count {
            let space = CFArrayGetValueAtIndex(spaces, j);
            if space.is_null() {
                continue;
            }
            if let Some(id) = dict_get_number(space, &key_id) {
                ids.push(id as u64);
            }
        }
    }

    CFRelease(displays);
    ids
}

unsafe fn dict_get_number(dict: *const c_void, key: &CFString) -> Option<i64> {
    let value = CFDictionaryGetValue(dict, key.as_concrete_TypeRef() as *const c_void);
    if value.is_null() {
        return None;
    }
    CFNumber::wrap_under_get_rule(value as CFNumberRef).to_i64()
}
