//! WGL backend, drawing to the device context of the toolkit's window.

use std::ffi::{c_void, CString};
use std::io::Error as IoError;
use std::ops::Deref;
use std::ptr;

use glutin_wgl_sys::{wgl, wgl_extra};

use crate::error::NativeError;

mod config;
mod context;

pub use context::{WglBackend, WglState};

/// The WGL extension functions of the current context.
pub(crate) struct WglExtra(wgl_extra::Wgl);

unsafe impl Send for WglExtra {}
unsafe impl Sync for WglExtra {}

impl WglExtra {
    /// # Safety
    /// A context must be current on the calling thread.
    pub(crate) unsafe fn load() -> Self {
        WglExtra(wgl_extra::Wgl::load_with(proc_address))
    }
}

impl Deref for WglExtra {
    type Target = wgl_extra::Wgl;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn proc_address(name: &str) -> *const c_void {
    match CString::new(name) {
        Ok(name) => unsafe { wgl::GetProcAddress(name.as_ptr()) as *const c_void },
        Err(_) => ptr::null(),
    }
}

/// The thread's last OS error, if one is set.
pub(crate) fn last_os_error() -> Option<NativeError> {
    match IoError::last_os_error().raw_os_error() {
        Some(0) | None => None,
        Some(code) => Some(NativeError::Os(code.into())),
    }
}
