//! The GL context bound to a toolkit drawing surface.

use std::ffi::c_void;
use std::fmt;
use std::mem;

use crate::api::NativeBackend;
use crate::config::{self, Insets, PixelFormat};
use crate::error::{Error, ErrorKind, Result};
use crate::surface::{DrawingSurface, SurfaceInfo, SurfaceLock, Toolkit, ToolkitLock};
use crate::swap::SwapControl;

/// `GL_FRONT`.
pub const GL_FRONT: u32 = 0x0404;

/// `GL_COLOR_ATTACHMENT0`.
pub const GL_COLOR_ATTACHMENT0: u32 = 0x8CE0;

/// Raw GL platform context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawContext {
    /// Raw GLX context.
    Glx(*const c_void),

    /// HGLRC pointer.
    Wgl(*const c_void),

    /// CGLContextObj pointer.
    Cgl(*const c_void),
}

/// What the backend needs to create the context.
#[derive(Debug)]
pub struct CreateRequest<'a> {
    /// The info of the locked drawing surface.
    pub info: &'a SurfaceInfo,

    /// The requested pixel format.
    pub format: PixelFormat,

    /// Layer placement hint.
    pub insets: Insets,
}

/// A freshly created platform context, current on the drawable.
#[derive(Debug)]
pub struct PlatformContext<S> {
    /// Everything the backend owns for the context.
    pub state: S,

    /// Whether the negotiated format is double buffered.
    pub double_buffered: bool,
}

/// The platform seam of the [`Context`].
///
/// The context does the state tracking, locking and surface bookkeeping,
/// the backend only talks to the native API.
pub trait Backend {
    /// Everything the backend owns for one created context.
    type State;

    /// Negotiate the pixel format, create the context and make it current
    /// on the drawable described by the request.
    ///
    /// Everything acquired must be released again when this fails.
    fn create_platform_context(
        &self,
        request: &CreateRequest<'_>,
    ) -> Result<PlatformContext<Self::State>>;

    /// Release everything [`Backend::create_platform_context`] acquired.
    ///
    /// The context was detached beforehand. Problems are only logged.
    fn destroy_platform_context(&self, state: Self::State);

    /// Discover the swap control of the context, called right after
    /// creation while it's current.
    fn probe_platform_swap_control(&self, state: &Self::State) -> SwapControl;

    /// Make the context current on the calling thread.
    fn make_current(&self, state: &Self::State) -> Result<()>;

    /// Unbind the context from the calling thread.
    fn detach_current(&self, state: &Self::State) -> Result<()>;

    /// Present the frame.
    fn swap_platform_buffers(&self, state: &mut Self::State, double_buffered: bool)
        -> Result<()>;

    /// Apply the already normalized `interval` with `control`, never called
    /// with [`SwapControl::None`].
    fn apply_swap_interval(
        &self,
        state: &Self::State,
        control: SwapControl,
        interval: i32,
    ) -> Result<()>;

    /// The raw native context.
    fn raw_context(&self, state: &Self::State) -> RawContext;

    /// The CGL share group.
    fn share_group(&self, _state: &Self::State) -> Result<*mut c_void> {
        Err(ErrorKind::Unsupported("share groups are only available with CGL").into())
    }

    /// The X display connection owned by the context.
    fn display(&self, _state: &Self::State) -> Result<*mut c_void> {
        Err(ErrorKind::Unsupported("the display is only available with GLX").into())
    }

    /// The device context the context draws to.
    fn device_context(&self, _state: &Self::State) -> Result<*mut c_void> {
        Err(ErrorKind::Unsupported("the device context is only available with WGL").into())
    }

    /// The framebuffer to draw into, or with `front` the one presented last.
    fn framebuffer(&self, _state: &Self::State, _front: bool) -> u32 {
        0
    }

    /// Whether the surface info must stay alive as long as the context.
    fn retains_surface_info(&self) -> bool {
        false
    }

    /// Whether make current, detach, swap and destroy must hold the toolkit
    /// lock.
    fn locks_toolkit_for_drawing(&self) -> bool {
        false
    }
}

/// The lifecycle state of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// The drawing surface is acquired, the format can still change.
    Uninitialized,

    /// The native context exists.
    Created,

    /// Everything is released, nothing works anymore.
    Destroyed,
}

struct Native<S> {
    state: S,
    double_buffered: bool,
    swap_control: SwapControl,
    retained_info: Option<SurfaceInfo>,
}

enum State<S> {
    Uninitialized,
    Created(Native<S>),
    Destroyed,
}

impl<S> State<S> {
    fn kind(&self) -> ContextState {
        match self {
            State::Uninitialized => ContextState::Uninitialized,
            State::Created(_) => ContextState::Created,
            State::Destroyed => ContextState::Destroyed,
        }
    }

    fn created(&self) -> Result<&Native<S>> {
        match self {
            State::Created(native) => Ok(native),
            _ => Err(not_created(self.kind())),
        }
    }

    fn created_mut(&mut self) -> Result<&mut Native<S>> {
        let kind = self.kind();
        match self {
            State::Created(native) => Ok(native),
            _ => Err(not_created(kind)),
        }
    }
}

fn not_created(state: ContextState) -> Error {
    match state {
        ContextState::Destroyed => Error::new(ErrorKind::InvalidState, "the context is destroyed"),
        _ => Error::new(ErrorKind::InvalidState, "the context is not created"),
    }
}

/// An OpenGL context drawing to a toolkit owned surface.
///
/// The context goes through `Uninitialized -> Created -> Destroyed`. The
/// format is configured while uninitialized, everything touching the native
/// context requires it to be created. Dropping the context destroys it.
pub struct Context<T: Toolkit, B: Backend = NativeBackend> {
    toolkit: T,
    surface: Option<T::Surface>,
    backend: B,
    format: PixelFormat,
    insets: Insets,
    state: State<B::State>,
}

impl<T: Toolkit> Context<T> {
    /// Acquire the drawing surface of `component` for the native backend.
    pub fn new(toolkit: T, component: &T::Component) -> Result<Self> {
        Self::with_backend(toolkit, component, NativeBackend::default())
    }
}

impl<T: Toolkit, B: Backend> Context<T, B> {
    /// Acquire the drawing surface of `component` for `backend`.
    pub fn with_backend(toolkit: T, component: &T::Component, backend: B) -> Result<Self> {
        let surface = {
            let _lock = ToolkitLock::new(&toolkit);
            toolkit.drawing_surface(component)
        };

        let surface = match surface {
            Some(surface) => surface,
            None => {
                return Err(Error::new(ErrorKind::NoSurface, "unable to get the drawing surface"))
            },
        };

        log::debug!("acquired the drawing surface");

        Ok(Self {
            toolkit,
            surface: Some(surface),
            backend,
            format: PixelFormat::default(),
            insets: Insets::default(),
            state: State::Uninitialized,
        })
    }

    /// The lifecycle state.
    #[inline]
    pub fn state(&self) -> ContextState {
        self.state.kind()
    }

    /// The format the context is going to be, or was, created with.
    #[inline]
    pub fn requested_format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn insets(&self) -> Insets {
        self.insets
    }

    fn ensure_uninitialized(&self) -> Result<()> {
        match self.state {
            State::Uninitialized => Ok(()),
            State::Created(_) => {
                Err(Error::new(ErrorKind::InvalidState, "the context is already created"))
            },
            State::Destroyed => Err(Error::new(ErrorKind::InvalidState, "the context is destroyed")),
        }
    }

    /// Set the layer placement hint.
    pub fn set_insets(&mut self, x: i32, y: i32) -> Result<()> {
        self.ensure_uninitialized()?;
        self.insets = Insets { x, y };
        Ok(())
    }

    /// Set the alpha, depth and stencil sizes, in bits.
    pub fn set_pixel_format(&mut self, alpha: i32, depth: i32, stencil: i32) -> Result<()> {
        self.ensure_uninitialized()?;

        let alpha_bits = config::bits(alpha, "alpha size")?;
        let depth_bits = config::bits(depth, "depth size")?;
        let stencil_bits = config::bits(stencil, "stencil size")?;

        self.format.alpha_bits = alpha_bits;
        self.format.depth_bits = depth_bits;
        self.format.stencil_bits = stencil_bits;
        Ok(())
    }

    /// Set the amount of samples, zero disables multisampling.
    pub fn set_multisamples(&mut self, samples: i32) -> Result<()> {
        self.ensure_uninitialized()?;
        self.format.multisamples = config::bits(samples, "multisample count")?;
        Ok(())
    }

    /// Create the native context and make it current on the drawable.
    pub fn create_gl_context(&mut self) -> Result<()> {
        self.ensure_uninitialized()?;

        let surface = match self.surface.as_ref() {
            Some(surface) => surface,
            None => return Err(Error::new(ErrorKind::NoSurface, "the drawing surface is gone")),
        };

        let native = {
            let _toolkit = ToolkitLock::new(&self.toolkit);
            let lock = SurfaceLock::new(surface)?;
            let info = lock.info()?;

            let request = CreateRequest { info: info.get(), format: self.format, insets: self.insets };
            let created = self.backend.create_platform_context(&request)?;
            let swap_control = self.backend.probe_platform_swap_control(&created.state);

            let retained_info = if self.backend.retains_surface_info() {
                info.retain()
            } else {
                drop(info);
                None
            };

            Native {
                state: created.state,
                double_buffered: created.double_buffered,
                swap_control,
                retained_info,
            }
        };

        log::debug!(
            "created the GL context with {:?}, double buffered: {}, swap control: {:?}",
            self.format,
            native.double_buffered,
            native.swap_control
        );

        self.state = State::Created(native);
        Ok(())
    }

    /// Whether the created context is double buffered.
    pub fn is_double_buffered(&self) -> Result<bool> {
        Ok(self.state.created()?.double_buffered)
    }

    /// The swap control discovered at creation.
    pub fn swap_control(&self) -> Result<SwapControl> {
        Ok(self.state.created()?.swap_control)
    }

    /// Make the context current on the calling thread.
    pub fn make_current(&mut self) -> Result<()> {
        let native = self.state.created()?;
        let _toolkit =
            self.backend.locks_toolkit_for_drawing().then(|| ToolkitLock::new(&self.toolkit));
        self.backend.make_current(&native.state)
    }

    /// Unbind the context from the calling thread.
    pub fn detach_current(&mut self) -> Result<()> {
        let native = self.state.created()?;
        let _toolkit =
            self.backend.locks_toolkit_for_drawing().then(|| ToolkitLock::new(&self.toolkit));
        self.backend.detach_current(&native.state)
    }

    /// Present the frame drawn into [`Context::framebuffer`].
    pub fn swap_buffers(&mut self) -> Result<()> {
        let native = self.state.created_mut()?;
        let _toolkit =
            self.backend.locks_toolkit_for_drawing().then(|| ToolkitLock::new(&self.toolkit));
        self.backend.swap_platform_buffers(&mut native.state, native.double_buffered)
    }

    /// Request a swap interval, returning the interval that was applied.
    ///
    /// Without any swap control the interval stays `0`. Negative intervals
    /// are negated unless adaptive vsync is supported.
    pub fn set_swap_interval(&mut self, interval: i32) -> Result<i32> {
        let native = self.state.created()?;
        let _toolkit = ToolkitLock::new(&self.toolkit);

        let effective = native.swap_control.normalize(interval);
        if native.swap_control != SwapControl::None {
            self.backend.apply_swap_interval(&native.state, native.swap_control, effective)?;
        }

        log::debug!("swap interval {interval} requested, {effective} applied");

        Ok(effective)
    }

    /// The raw native context.
    pub fn gl_context(&self) -> Result<RawContext> {
        let native = self.state.created()?;
        Ok(self.backend.raw_context(&native.state))
    }

    /// The `CGLShareGroupObj` of the context.
    pub fn share_group(&self) -> Result<*mut c_void> {
        let native = self.state.created()?;
        self.backend.share_group(&native.state)
    }

    /// The `Display*` the context was created on.
    pub fn display(&self) -> Result<*mut c_void> {
        let native = self.state.created()?;
        self.backend.display(&native.state)
    }

    /// The `HDC` the context draws to.
    pub fn device_context(&self) -> Result<*mut c_void> {
        let native = self.state.created()?;
        self.backend.device_context(&native.state)
    }

    /// The framebuffer object to draw into, or with `front` the one that
    /// was presented last. `0` is the default framebuffer of the drawable.
    pub fn framebuffer(&self, front: bool) -> Result<u32> {
        let native = self.state.created()?;
        Ok(self.backend.framebuffer(&native.state, front))
    }

    /// The buffer to read the presented frame from.
    pub fn buffer_mode(&self) -> Result<u32> {
        Ok(if self.framebuffer(true)? == 0 { GL_FRONT } else { GL_COLOR_ATTACHMENT0 })
    }

    /// Destroy the context and give the drawing surface back to the toolkit.
    ///
    /// Calling it again does nothing.
    pub fn destroy(&mut self) {
        match mem::replace(&mut self.state, State::Destroyed) {
            State::Created(native) => {
                {
                    let _toolkit = self
                        .backend
                        .locks_toolkit_for_drawing()
                        .then(|| ToolkitLock::new(&self.toolkit));

                    if let Err(err) = self.backend.detach_current(&native.state) {
                        log::warn!("failed to detach the context while destroying it: {err}");
                    }

                    self.backend.destroy_platform_context(native.state);
                }

                if let Some(info) = native.retained_info {
                    match self.surface.as_ref() {
                        Some(surface) => surface.free_info(info),
                        None => log::warn!("retained surface info outlived its surface"),
                    }
                }

                log::debug!("destroyed the GL context");
            },
            State::Uninitialized => (),
            State::Destroyed => return,
        }

        if let Some(surface) = self.surface.take() {
            self.toolkit.free_drawing_surface(surface);
            log::debug!("freed the drawing surface");
        }
    }
}

impl<T: Toolkit, B: Backend> Drop for Context<T, B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<T: Toolkit, B: Backend> fmt::Debug for Context<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Context");
        debug.field("state", &self.state.kind());
        debug.field("format", &self.format);
        debug.field("insets", &self.insets);

        if let State::Created(native) = &self.state {
            debug.field("double_buffered", &native.double_buffered);
            debug.field("swap_control", &native.swap_control);
        }

        debug.finish_non_exhaustive()
    }
}
