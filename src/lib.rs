//! The purpose of this library is to give an OpenGL [`Context`] to a drawing
//! surface owned by an embedding UI toolkit, using GLX on X11, WGL on
//! Windows and CGL on macOS.
//!
//! The toolkit is described by the [`Toolkit`] and [`DrawingSurface`]
//! traits. A [`Context`] acquires the drawing surface of a component when
//! it's made, lets you pick the [`PixelFormat`] while it's uninitialized and
//! then creates the native context with [`Context::create_gl_context`]:
//!
//! ```no_run
//! # fn run<T: glembed::Toolkit>(toolkit: T, canvas: &T::Component) -> glembed::Result<()> {
//! let mut context = glembed::Context::new(toolkit, canvas)?;
//! context.set_pixel_format(8, 24, 8)?;
//! context.create_gl_context()?;
//!
//! context.set_swap_interval(1)?;
//! context.make_current()?;
//! // Draw into `context.framebuffer(false)?`.
//! context.swap_buffers()?;
//! context.detach_current()?;
//! # Ok(())
//! # }
//! ```
//!
//! Dropping the context, or calling [`Context::destroy`], releases the
//! native context and hands the drawing surface back to the toolkit.
//!
//! The native API calls sit behind the [`Backend`] trait, the default
//! [`NativeBackend`] picks the platform from the [`PlatformInfo`] of the
//! surface.
//!
//! [`Context::create_gl_context`]: crate::context::Context::create_gl_context()
//! [`Context::destroy`]: crate::context::Context::destroy()

#![deny(missing_debug_implementations)]

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod surface;
pub mod swap;

#[cfg(glx_backend)]
mod lib_loading;

pub use api::NativeBackend;
pub use config::{Insets, PixelFormat};
pub use context::{
    Backend, Context, ContextState, CreateRequest, PlatformContext, RawContext,
    GL_COLOR_ATTACHMENT0, GL_FRONT,
};
pub use error::{Error, ErrorKind, NativeError, Result};
pub use features::ContextFeatures;
pub use surface::{Bounds, DrawingSurface, LockFlags, PlatformInfo, SurfaceInfo, Toolkit};
pub use swap::SwapControl;
