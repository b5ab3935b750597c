//! GLX backend, drawing to the toolkit's X11 window through a private
//! connection to the same display.

use std::ffi::{c_int, c_void, CString};
use std::ops::Deref;
use std::ptr;
use std::sync::{Mutex, PoisonError};

use glutin_glx_sys::{glx, glx_extra};
use libloading::Library;
use once_cell::sync::Lazy;
use x11_dl::xlib::{self, XErrorEvent, Xlib};

use crate::error::NativeError;
use crate::lib_loading::{SymLoading, SymWrapper};

mod config;
mod context;

pub use context::{GlxBackend, GlxState};

/// The XLIB handle.
pub(crate) static XLIB: Lazy<Option<Xlib>> = Lazy::new(|| Xlib::open().ok());

/// libGL with the core GLX symbols.
pub(crate) static GLX: Lazy<Option<Glx>> = Lazy::new(|| {
    let paths = ["libGL.so.1", "libGL.so"];

    unsafe { SymWrapper::new(&paths).map(Glx) }
});

/// The GLX extension functions, loaded through `glXGetProcAddress`.
pub(crate) static GLX_EXTRA: Lazy<Option<GlxExtra>> = Lazy::new(|| {
    let glx = GLX.as_ref()?;
    Some(GlxExtra::new(glx))
});

/// The first X error seen while an [`XErrorTrap`] is installed.
static LAST_ERROR: Mutex<Option<NativeError>> = Mutex::new(None);

pub(crate) struct Glx(SymWrapper<glx::Glx>);

unsafe impl Send for Glx {}
unsafe impl Sync for Glx {}

impl Glx {
    /// Resolve a GL or GLX entry point, null when it's unknown.
    pub(crate) fn proc_address(&self, name: &str) -> *const c_void {
        match CString::new(name) {
            Ok(name) => unsafe { self.GetProcAddress(name.as_ptr() as *const _) as *const c_void },
            Err(_) => ptr::null(),
        }
    }
}

impl SymLoading for glx::Glx {
    unsafe fn load_with(lib: &Library) -> Self {
        Self::load_with(|sym| unsafe {
            let sym = match CString::new(sym.as_bytes()) {
                Ok(sym) => sym,
                Err(_) => return ptr::null(),
            };

            lib.get::<*const c_void>(sym.as_bytes_with_nul()).map(|sym| *sym).unwrap_or(ptr::null())
        })
    }
}

impl Deref for Glx {
    type Target = glx::Glx;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub(crate) struct GlxExtra(glx_extra::Glx);

unsafe impl Send for GlxExtra {}
unsafe impl Sync for GlxExtra {}

impl GlxExtra {
    #[inline]
    pub fn new(glx: &Glx) -> Self {
        GlxExtra(glx_extra::Glx::load_with(|proc_name| glx.proc_address(proc_name)))
    }
}

impl Deref for GlxExtra {
    type Target = glx_extra::Glx;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn last_error() -> std::sync::MutexGuard<'static, Option<NativeError>> {
    LAST_ERROR.lock().unwrap_or_else(PoisonError::into_inner)
}

unsafe extern "C" fn record_x_error(_display: *mut xlib::Display, event: *mut XErrorEvent) -> c_int {
    if event.is_null() {
        return 0;
    }

    let event = unsafe { &*event };
    let mut last_error = last_error();
    if last_error.is_none() {
        *last_error = Some(NativeError::X11 {
            minor_code: event.minor_code,
            request_code: event.request_code,
            error_code: event.error_code,
        });
    }

    0
}

/// What `XSetErrorHandler` takes and returns.
type XErrorHandler =
    Option<unsafe extern "C" fn(*mut xlib::Display, *mut XErrorEvent) -> c_int>;

/// Scoped X error handler.
///
/// Xlib's default handler exits the process, so every GLX call that may
/// raise a protocol error runs with a trap installed. The first error is
/// kept until [`XErrorTrap::take`] reads it.
pub(crate) struct XErrorTrap<'a> {
    xlib: &'a Xlib,
    previous: XErrorHandler,
}

impl<'a> XErrorTrap<'a> {
    pub(crate) fn install(xlib: &'a Xlib) -> Self {
        last_error().take();
        let previous = unsafe { (xlib.XSetErrorHandler)(Some(record_x_error)) };
        Self { xlib, previous }
    }

    /// Flush the requests sent to `display` and take the first error.
    pub(crate) fn take(&self, display: *mut xlib::Display) -> Option<NativeError> {
        if !display.is_null() {
            unsafe {
                (self.xlib.XSync)(display, xlib::False);
            }
        }

        last_error().take()
    }
}

impl Drop for XErrorTrap<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.xlib.XSetErrorHandler)(self.previous);
        }

        if let Some(err) = last_error().take() {
            log::warn!("unhandled X error: {err}");
        }
    }
}
