//! The toolkit side of the bridge.
//!
//! The embedding toolkit owns the native window and hands it out as a
//! [`DrawingSurface`]. Every access to the [`SurfaceInfo`] must happen while
//! the surface is locked; the guards in this module make an unpaired
//! lock/unlock or a leaked info impossible to express.

use std::ffi::{c_ulong, c_void};
use std::fmt;

use bitflags::bitflags;

use crate::error::{Error, ErrorKind, Result};

/// The embedding toolkit.
pub trait Toolkit {
    /// The toolkit object that owns the native window, e.g. a canvas.
    type Component: ?Sized;

    /// The drawing surface handed out for a component.
    type Surface: DrawingSurface;

    /// Take the toolkit-wide lock.
    ///
    /// The lock serializes against the toolkit's own native activity. It's
    /// always paired with [`Toolkit::unlock`].
    fn lock(&self);

    /// Release the toolkit-wide lock.
    fn unlock(&self);

    /// Get the drawing surface of the component, `None` if there's none.
    fn drawing_surface(&self, component: &Self::Component) -> Option<Self::Surface>;

    /// Give the drawing surface back to the toolkit.
    fn free_drawing_surface(&self, surface: Self::Surface);
}

/// A toolkit-owned drawing surface.
pub trait DrawingSurface {
    /// Lock the surface, returning the lock state.
    ///
    /// The surface is considered locked unless [`LockFlags::ERROR`] is set.
    fn lock(&self) -> LockFlags;

    /// Unlock the surface.
    fn unlock(&self);

    /// Get the surface info, `None` when the toolkit can't provide it.
    ///
    /// Only called while the surface is locked.
    fn info(&self) -> Option<SurfaceInfo>;

    /// Free the info obtained with [`DrawingSurface::info`].
    fn free_info(&self, info: SurfaceInfo);
}

bitflags! {
    /// The state reported when locking a [`DrawingSurface`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LockFlags: u32 {
        /// The surface could not be locked.
        const ERROR           = 0b0001;

        /// The clip region changed since the last lock.
        const CLIP_CHANGED    = 0b0010;

        /// The bounds changed since the last lock.
        const BOUNDS_CHANGED  = 0b0100;

        /// The native surface itself was replaced since the last lock.
        const SURFACE_CHANGED = 0b1000;
    }
}

/// The bounds of the drawing surface, in toolkit units.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Drawing surface info for the duration of one lock.
pub struct SurfaceInfo {
    /// The toolkit's own record for this info, handed back in
    /// [`DrawingSurface::free_info`].
    pub handle: *mut c_void,

    /// The bounds of the surface.
    pub bounds: Bounds,

    /// The platform specific payload.
    pub platform: PlatformInfo,
}

// The handles stay owned by the toolkit, which lets them cross threads under
// its lock.
unsafe impl Send for SurfaceInfo {}

impl fmt::Debug for SurfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceInfo")
            .field("handle", &self.handle)
            .field("bounds", &self.bounds)
            .field("platform", &self.platform)
            .finish()
    }
}

/// The platform part of the [`SurfaceInfo`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformInfo {
    /// An Xlib drawable.
    Xlib {
        /// The toolkit's `Display*`.
        display: *mut c_void,
        /// The drawable id.
        drawable: c_ulong,
        /// The id of the drawable's visual.
        visual_id: c_ulong,
    },

    /// A Win32 window.
    Win32 {
        /// The `HDC` of the window, valid while the info is alive.
        hdc: *mut c_void,
    },

    /// An AppKit view backed by Core Animation.
    AppKit {
        /// The object the context installs its `CALayer` into, it must
        /// respond to `setLayer:`.
        layer_host: *mut c_void,
        /// The backing scale factor of the window.
        backing_scale: f64,
    },

    /// No platform payload.
    None,
}

/// Scoped toolkit lock.
pub(crate) struct ToolkitLock<'a, T: Toolkit> {
    toolkit: &'a T,
}

impl<'a, T: Toolkit> ToolkitLock<'a, T> {
    pub(crate) fn new(toolkit: &'a T) -> Self {
        toolkit.lock();
        Self { toolkit }
    }
}

impl<T: Toolkit> Drop for ToolkitLock<'_, T> {
    fn drop(&mut self) {
        self.toolkit.unlock();
    }
}

/// Scoped drawing surface lock.
pub(crate) struct SurfaceLock<'a, S: DrawingSurface> {
    surface: &'a S,
}

impl<'a, S: DrawingSurface> SurfaceLock<'a, S> {
    pub(crate) fn new(surface: &'a S) -> Result<Self> {
        let flags = surface.lock();
        if flags.contains(LockFlags::ERROR) {
            return Err(Error::new(ErrorKind::NoSurface, "unable to lock the drawing surface"));
        }

        if flags.intersects(LockFlags::BOUNDS_CHANGED | LockFlags::SURFACE_CHANGED) {
            log::debug!("drawing surface changed since the last lock: {flags:?}");
        }

        Ok(Self { surface })
    }

    /// Fetch the surface info; the returned guard can't outlive the lock.
    pub(crate) fn info(&self) -> Result<SurfaceInfoGuard<'_, S>> {
        match self.surface.info() {
            Some(info) => Ok(SurfaceInfoGuard { surface: self.surface, info: Some(info) }),
            None => {
                Err(Error::new(ErrorKind::NoPlatformInfo, "unable to get the drawing surface info"))
            },
        }
    }
}

impl<S: DrawingSurface> Drop for SurfaceLock<'_, S> {
    fn drop(&mut self) {
        self.surface.unlock();
    }
}

/// Scoped drawing surface info.
pub(crate) struct SurfaceInfoGuard<'a, S: DrawingSurface> {
    surface: &'a S,
    info: Option<SurfaceInfo>,
}

impl<S: DrawingSurface> SurfaceInfoGuard<'_, S> {
    pub(crate) fn get(&self) -> &SurfaceInfo {
        // Only `retain` takes the info out and it consumes the guard.
        self.info.as_ref().unwrap_or_else(|| unreachable!())
    }

    /// Keep the info alive past the guard. The caller must hand it back with
    /// [`DrawingSurface::free_info`].
    pub(crate) fn retain(mut self) -> Option<SurfaceInfo> {
        self.info.take()
    }
}

impl<S: DrawingSurface> Drop for SurfaceInfoGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(info) = self.info.take() {
            self.surface.free_info(info);
        }
    }
}
