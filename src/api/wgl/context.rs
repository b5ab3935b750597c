//! WGL context lifecycle.

use std::ffi::{c_int, c_void, CStr};
use std::{fmt, mem, ptr};

use glutin_wgl_sys::wgl::types::HGLRC;
use glutin_wgl_sys::{wgl, wgl_extra};
use windows_sys::Win32::Graphics::Gdi::HDC;
use windows_sys::Win32::Graphics::OpenGL as gl;

use super::{config, last_os_error, WglExtra};
use crate::context::{Backend, CreateRequest, PlatformContext, RawContext};
use crate::error::{Error, ErrorKind, Result};
use crate::features::{self, ContextFeatures};
use crate::surface::PlatformInfo;
use crate::swap::SwapControl;

/// GL version requested with `WGL_ARB_create_context`.
const GL_VERSION: (c_int, c_int) = (3, 3);

/// The WGL backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct WglBackend;

/// A WGL context drawing to the toolkit's device context.
pub struct WglState {
    hdc: HDC,
    context: HGLRC,
    features: ContextFeatures,
    extra: WglExtra,
}

unsafe impl Send for WglState {}

impl fmt::Debug for WglState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WglState")
            .field("hdc", &self.hdc)
            .field("context", &self.context)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

/// Deletes a context that didn't make it to the caller.
struct ContextGuard(HGLRC);

impl ContextGuard {
    fn into_raw(self) -> HGLRC {
        let raw = self.0;
        mem::forget(self);
        raw
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        unsafe {
            wgl::DeleteContext(self.0);
        }
    }
}

unsafe fn make_current(hdc: HDC, context: HGLRC) -> Result<()> {
    if unsafe { wgl::MakeCurrent(hdc as *const _, context) } == 0 {
        Err(Error::new(ErrorKind::MakeCurrentFailed, "unable to make current")
            .with_native(last_os_error()))
    } else {
        Ok(())
    }
}

/// The WGL extensions, read through the current context.
unsafe fn load_features(hdc: HDC, extra: &WglExtra) -> ContextFeatures {
    let extensions = unsafe {
        if extra.GetExtensionsStringARB.is_loaded() {
            extra.GetExtensionsStringARB(hdc as *const _)
        } else if extra.GetExtensionsStringEXT.is_loaded() {
            extra.GetExtensionsStringEXT()
        } else {
            ptr::null()
        }
    };

    if extensions.is_null() {
        return ContextFeatures::empty();
    }

    let extensions = unsafe { CStr::from_ptr(extensions) }.to_str().unwrap_or_default();
    log::debug!("WGL extensions: {extensions}");

    features::extract_features(&features::parse_extensions(extensions), "WGL")
}

/// Replace the bootstrap context with a 3.3 one when the attribute
/// extension allows it.
unsafe fn upgrade_context(
    hdc: HDC,
    legacy: ContextGuard,
    extra: &WglExtra,
    features: ContextFeatures,
) -> Result<ContextGuard> {
    if !features.contains(ContextFeatures::CREATE_CONTEXT_ATTRIBS)
        || !extra.CreateContextAttribsARB.is_loaded()
    {
        log::debug!("using the legacy context");
        return Ok(legacy);
    }

    let attributes = [
        wgl_extra::CONTEXT_MAJOR_VERSION_ARB as c_int,
        GL_VERSION.0,
        wgl_extra::CONTEXT_MINOR_VERSION_ARB as c_int,
        GL_VERSION.1,
        0,
    ];

    let raw = unsafe { extra.CreateContextAttribsARB(hdc as *const _, ptr::null(), attributes.as_ptr()) };
    if raw.is_null() {
        log::warn!(
            "unable to create a {}.{} context, keeping the legacy one ({:?})",
            GL_VERSION.0,
            GL_VERSION.1,
            last_os_error()
        );
        return Ok(legacy);
    }

    let context = ContextGuard(raw);
    unsafe { make_current(hdc, context.0)? };

    log::debug!("created a {}.{} context", GL_VERSION.0, GL_VERSION.1);
    drop(legacy);

    Ok(context)
}

impl Backend for WglBackend {
    type State = WglState;

    fn create_platform_context(
        &self,
        request: &CreateRequest<'_>,
    ) -> Result<PlatformContext<WglState>> {
        let hdc = match request.info.platform {
            PlatformInfo::Win32 { hdc } if !hdc.is_null() => hdc as HDC,
            _ => {
                return Err(Error::new(
                    ErrorKind::NoPlatformInfo,
                    "unable to get the platform drawing surface info",
                ))
            },
        };

        unsafe {
            let double_buffered = config::apply_pixel_format(hdc, &request.format)?;

            // Whatever was bound to the device context must let go of it.
            make_current(hdc, ptr::null())?;

            let legacy = wgl::CreateContext(hdc as *const _);
            if legacy.is_null() {
                return Err(Error::new(ErrorKind::ContextCreationFailed, "unable to create context")
                    .with_native(last_os_error()));
            }
            let legacy = ContextGuard(legacy);
            make_current(hdc, legacy.0)?;

            let extra = WglExtra::load();
            let features = load_features(hdc, &extra);
            let context = upgrade_context(hdc, legacy, &extra, features)?;

            // The functions may differ between the bootstrap and the final
            // context.
            let extra = WglExtra::load();

            Ok(PlatformContext {
                state: WglState { hdc, context: context.into_raw(), features, extra },
                double_buffered,
            })
        }
    }

    fn destroy_platform_context(&self, state: WglState) {
        unsafe {
            if wgl::DeleteContext(state.context) == 0 {
                log::warn!("unable to delete the WGL context ({:?})", last_os_error());
            }
        }
    }

    fn probe_platform_swap_control(&self, state: &WglState) -> SwapControl {
        let mut features = state.features;
        if !state.extra.SwapIntervalEXT.is_loaded() {
            features.remove(ContextFeatures::SWAP_CONTROL_EXT | ContextFeatures::SWAP_CONTROL_TEAR);
        }

        SwapControl::from_features(features)
    }

    fn make_current(&self, state: &WglState) -> Result<()> {
        unsafe { make_current(state.hdc, state.context) }
    }

    fn detach_current(&self, state: &WglState) -> Result<()> {
        unsafe { make_current(state.hdc, ptr::null()) }
    }

    fn swap_platform_buffers(&self, state: &mut WglState, double_buffered: bool) -> Result<()> {
        unsafe {
            if !double_buffered {
                gl::glFinish();
                return Ok(());
            }

            if gl::SwapBuffers(state.hdc) == 0 {
                return Err(Error::new(ErrorKind::SwapFailed, "unable to SwapBuffers")
                    .with_native(last_os_error()));
            }
        }

        Ok(())
    }

    fn apply_swap_interval(
        &self,
        state: &WglState,
        control: SwapControl,
        interval: i32,
    ) -> Result<()> {
        if !matches!(control, SwapControl::Ext { .. }) {
            return Err(ErrorKind::Unsupported("only WGL_EXT_swap_control is supported").into());
        }

        unsafe {
            if state.extra.SwapIntervalEXT(interval as _) == 0 {
                return Err(Error::new(ErrorKind::PlatformNativeError, "wglSwapIntervalEXT failed")
                    .with_native(last_os_error()));
            }
        }

        Ok(())
    }

    fn raw_context(&self, state: &WglState) -> RawContext {
        RawContext::Wgl(state.context)
    }

    fn device_context(&self, state: &WglState) -> Result<*mut c_void> {
        Ok(state.hdc as *mut c_void)
    }

    fn retains_surface_info(&self) -> bool {
        true
    }
}
