//! CGL backend, presenting IOSurface backed framebuffers through a
//! `CALayer` installed into the toolkit's layer host.

use cgl::CGLError;

use crate::error::{Error, ErrorKind, NativeError};

mod context;
mod ffi;
mod framebuffer;

pub use context::{CglBackend, CglState};

/// Turn a failed CGL status into an error of `kind`.
pub(crate) fn check(err: CGLError, kind: ErrorKind, message: &'static str) -> Result<(), Error> {
    if err == ffi::kCGLNoError {
        Ok(())
    } else {
        Err(Error::new(kind, message).with_native(Some(NativeError::Cgl(err))))
    }
}
