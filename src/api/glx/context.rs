//! GLX context lifecycle.

use std::ffi::{c_int, c_void, CStr};
use std::{fmt, mem, ptr};

use glutin_glx_sys::glx::{self, types::GLXContext};
use glutin_glx_sys::glx_extra;
use x11_dl::xlib::{self, Xlib};

use super::config::choose_fb_config;
use super::{Glx, XErrorTrap, GLX, GLX_EXTRA, XLIB};
use crate::context::{Backend, CreateRequest, PlatformContext, RawContext};
use crate::error::{Error, ErrorKind, Result};
use crate::features::{self, ContextFeatures};
use crate::surface::PlatformInfo;
use crate::swap::SwapControl;

/// GL version requested with `GLX_ARB_create_context`.
const GL_VERSION: (c_int, c_int) = (3, 3);

/// The GLX backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlxBackend;

/// A GLX context on a private display connection.
pub struct GlxState {
    display: *mut xlib::Display,
    drawable: xlib::Drawable,
    context: GLXContext,
    features: ContextFeatures,
    gl_finish: Option<unsafe extern "system" fn()>,
}

unsafe impl Send for GlxState {}

impl fmt::Debug for GlxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlxState")
            .field("display", &self.display)
            .field("drawable", &self.drawable)
            .field("context", &self.context)
            .field("features", &self.features)
            .finish()
    }
}

/// Closes the private display connection unless disarmed.
struct DisplayGuard<'a> {
    xlib: &'a Xlib,
    raw: *mut xlib::Display,
}

impl DisplayGuard<'_> {
    fn into_raw(self) -> *mut xlib::Display {
        let raw = self.raw;
        mem::forget(self);
        raw
    }
}

impl Drop for DisplayGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.xlib.XSync)(self.raw, xlib::False);
            (self.xlib.XCloseDisplay)(self.raw);
        }
    }
}

/// Destroys a context that didn't make it to the caller.
struct ContextGuard<'a> {
    glx: &'a Glx,
    display: *mut xlib::Display,
    raw: GLXContext,
}

impl ContextGuard<'_> {
    fn into_raw(self) -> GLXContext {
        let raw = self.raw;
        mem::forget(self);
        raw
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            self.glx.DestroyContext(self.display as *mut _, self.raw);
        }
    }
}

fn libraries() -> Result<(&'static Xlib, &'static Glx)> {
    let xlib = XLIB.as_ref().ok_or(ErrorKind::Unsupported("libX11 could not be loaded"))?;
    let glx = GLX.as_ref().ok_or(ErrorKind::Unsupported("libGL could not be loaded"))?;
    Ok((xlib, glx))
}

/// The GLX extensions of `screen`.
unsafe fn query_extensions(glx: &Glx, display: *mut xlib::Display, screen: c_int) -> ContextFeatures {
    let extensions = unsafe { glx.QueryExtensionsString(display as *mut _, screen) };
    if extensions.is_null() {
        return ContextFeatures::empty();
    }

    let extensions = unsafe { CStr::from_ptr(extensions) }.to_str().unwrap_or_default();
    log::debug!("GLX extensions: {extensions}");

    features::extract_features(&features::parse_extensions(extensions), "GLX")
}

/// Create the context with the attribute extension when it's there.
unsafe fn create_raw_context(
    glx: &Glx,
    display: *mut xlib::Display,
    config: glx::types::GLXFBConfig,
    features: ContextFeatures,
) -> GLXContext {
    let extra = GLX_EXTRA
        .as_ref()
        .filter(|_| features.contains(ContextFeatures::CREATE_CONTEXT_ATTRIBS))
        .filter(|extra| extra.CreateContextAttribsARB.is_loaded());

    unsafe {
        match extra {
            Some(extra) => {
                let attributes = [
                    glx_extra::CONTEXT_MAJOR_VERSION_ARB as c_int,
                    GL_VERSION.0,
                    glx_extra::CONTEXT_MINOR_VERSION_ARB as c_int,
                    GL_VERSION.1,
                    0,
                ];

                log::debug!("creating a {}.{} context", GL_VERSION.0, GL_VERSION.1);
                extra.CreateContextAttribsARB(
                    display as *mut _,
                    config,
                    ptr::null(),
                    1,
                    attributes.as_ptr(),
                )
            },
            None => {
                log::debug!("creating a legacy context");
                glx.CreateNewContext(display as *mut _, config, glx::RGBA_TYPE as c_int, ptr::null(), 1)
            },
        }
    }
}

/// Whether `glXSwapIntervalSGI` took the interval.
///
/// Mesa rejects `0` with `GLX_BAD_VALUE` although the interval is left as
/// is, only a missing context is a failure.
fn sgi_interval_applied(status: c_int) -> bool {
    status != glx::BAD_CONTEXT as c_int
}

impl Backend for GlxBackend {
    type State = GlxState;

    fn create_platform_context(
        &self,
        request: &CreateRequest<'_>,
    ) -> Result<PlatformContext<GlxState>> {
        let (toolkit_display, drawable, visual_id) = match request.info.platform {
            PlatformInfo::Xlib { display, drawable, visual_id }
                if !display.is_null() && drawable != 0 =>
            {
                (display, drawable, visual_id)
            },
            _ => {
                return Err(Error::new(
                    ErrorKind::NoPlatformInfo,
                    "unable to get the platform drawing surface info",
                ))
            },
        };

        let (xlib, glx) = libraries()?;
        let trap = XErrorTrap::install(xlib);

        unsafe {
            // A private connection keeps our requests off the toolkit's queue.
            let name = (xlib.XDisplayString)(toolkit_display as *mut _);
            let raw = (xlib.XOpenDisplay)(name);
            if raw.is_null() {
                return Err(Error::new(
                    ErrorKind::ContextCreationFailed,
                    "unable to open display copy",
                ));
            }
            let display = DisplayGuard { xlib, raw };

            if glx.QueryExtension(display.raw as *mut _, ptr::null_mut(), ptr::null_mut()) == 0 {
                return Err(Error::new(ErrorKind::ContextCreationFailed, "glx is not supported")
                    .with_native(trap.take(display.raw)));
            }

            let screen = (xlib.XDefaultScreen)(display.raw);

            let selected =
                choose_fb_config(glx, display.raw, screen, &request.format, visual_id)
                    .map_err(|err| err.with_native(trap.take(display.raw)))?;

            let features = query_extensions(glx, display.raw, screen);
            let context = create_raw_context(glx, display.raw, selected.config, features);
            if context.is_null() {
                return Err(Error::new(
                    ErrorKind::ContextCreationFailed,
                    "unable to create glx context",
                )
                .with_native(trap.take(display.raw)));
            }
            let context = ContextGuard { glx, display: display.raw, raw: context };

            if glx.MakeCurrent(display.raw as *mut _, drawable, context.raw) == 0 {
                return Err(Error::new(ErrorKind::MakeCurrentFailed, "unable to make current")
                    .with_native(trap.take(display.raw)));
            }

            if let Some(err) = trap.take(display.raw) {
                log::warn!("X error while creating the context: {err}");
            }

            let gl_finish = glx.proc_address("glFinish");
            let gl_finish = (!gl_finish.is_null())
                .then(|| mem::transmute::<*const c_void, unsafe extern "system" fn()>(gl_finish));

            let context = context.into_raw();
            let display = display.into_raw();

            Ok(PlatformContext {
                state: GlxState { display, drawable, context, features, gl_finish },
                double_buffered: selected.double_buffered,
            })
        }
    }

    fn destroy_platform_context(&self, state: GlxState) {
        let (xlib, glx) = match libraries() {
            Ok(libraries) => libraries,
            Err(err) => {
                log::warn!("leaking the GLX context: {err}");
                return;
            },
        };

        let trap = XErrorTrap::install(xlib);

        unsafe {
            glx.DestroyContext(state.display as *mut _, state.context);
        }

        if let Some(err) = trap.take(state.display) {
            log::warn!("X error while destroying the context: {err}");
        }

        unsafe {
            (xlib.XCloseDisplay)(state.display);
        }
    }

    fn probe_platform_swap_control(&self, state: &GlxState) -> SwapControl {
        let mut features = state.features;
        let (ext, sgi) = GLX_EXTRA.as_ref().map_or((false, false), |extra| {
            (extra.SwapIntervalEXT.is_loaded(), extra.SwapIntervalSGI.is_loaded())
        });

        if !ext {
            features.remove(ContextFeatures::SWAP_CONTROL_EXT | ContextFeatures::SWAP_CONTROL_TEAR);
        }

        if !sgi {
            features.remove(ContextFeatures::SWAP_CONTROL_SGI);
        }

        SwapControl::from_features(features)
    }

    fn make_current(&self, state: &GlxState) -> Result<()> {
        let (xlib, glx) = libraries()?;
        let trap = XErrorTrap::install(xlib);

        unsafe {
            if glx.MakeCurrent(state.display as *mut _, state.drawable, state.context) == 0 {
                return Err(Error::new(ErrorKind::MakeCurrentFailed, "unable to make current")
                    .with_native(trap.take(state.display)));
            }
        }

        Ok(())
    }

    fn detach_current(&self, state: &GlxState) -> Result<()> {
        let (xlib, glx) = libraries()?;
        let trap = XErrorTrap::install(xlib);

        unsafe {
            if glx.MakeCurrent(state.display as *mut _, 0, ptr::null()) == 0 {
                return Err(Error::new(ErrorKind::MakeCurrentFailed, "unable to make current")
                    .with_native(trap.take(state.display)));
            }
        }

        Ok(())
    }

    fn swap_platform_buffers(&self, state: &mut GlxState, double_buffered: bool) -> Result<()> {
        let (xlib, glx) = libraries()?;
        let trap = XErrorTrap::install(xlib);

        unsafe {
            if double_buffered {
                glx.SwapBuffers(state.display as *mut _, state.drawable);
            } else {
                match state.gl_finish {
                    Some(gl_finish) => gl_finish(),
                    None => return Err(ErrorKind::Unsupported("glFinish is not available").into()),
                }
            }
        }

        // The drawable may vanish under us while the toolkit resizes it.
        match trap.take(state.display) {
            Some(err) => Err(Error::new(ErrorKind::SwapFailed, "unable to swap buffers")
                .with_native(Some(err))),
            None => Ok(()),
        }
    }

    fn apply_swap_interval(
        &self,
        state: &GlxState,
        control: SwapControl,
        interval: i32,
    ) -> Result<()> {
        let (xlib, _) = libraries()?;
        let extra = GLX_EXTRA
            .as_ref()
            .ok_or(ErrorKind::Unsupported("GLX extensions could not be loaded"))?;
        let trap = XErrorTrap::install(xlib);

        unsafe {
            match control {
                SwapControl::Ext { .. } => {
                    extra.SwapIntervalEXT(state.display as *mut _, state.drawable, interval)
                },
                SwapControl::Sgi => {
                    let status = extra.SwapIntervalSGI(interval);
                    if !sgi_interval_applied(status) {
                        return Err(Error::new(
                            ErrorKind::PlatformNativeError,
                            "glXSwapIntervalSGI failed",
                        ));
                    }
                },
                SwapControl::None => return Ok(()),
            }
        }

        match trap.take(state.display) {
            Some(err) => Err(Error::new(ErrorKind::PlatformNativeError, "unable to set swap interval")
                .with_native(Some(err))),
            None => Ok(()),
        }
    }

    fn raw_context(&self, state: &GlxState) -> RawContext {
        RawContext::Glx(state.context)
    }

    fn display(&self, state: &GlxState) -> Result<*mut c_void> {
        Ok(state.display.cast())
    }

    fn locks_toolkit_for_drawing(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgi_interval_status() {
        assert!(sgi_interval_applied(0));
        // Turning vsync off through SGI on Mesa.
        assert!(sgi_interval_applied(glx::BAD_VALUE as c_int));
        assert!(!sgi_interval_applied(glx::BAD_CONTEXT as c_int));
    }
}
