//! The platform backends and the dispatch between them.

#![allow(unreachable_patterns)]

use std::ffi::c_void;

use crate::context::{Backend, CreateRequest, PlatformContext, RawContext};
use crate::error::{Error, ErrorKind, Result};
use crate::surface::PlatformInfo;
use crate::swap::SwapControl;

#[cfg(cgl_backend)]
pub mod cgl;
#[cfg(glx_backend)]
pub mod glx;
#[cfg(wgl_backend)]
pub mod wgl;

/// The state of whichever backend created the context.
#[derive(Debug)]
pub enum PlatformState {
    #[cfg(glx_backend)]
    Glx(glx::GlxState),

    #[cfg(wgl_backend)]
    Wgl(wgl::WglState),

    #[cfg(cgl_backend)]
    Cgl(cgl::CglState),
}

/// Picks the backend from the platform payload of the surface info.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

macro_rules! platform_dispatch {
    ($state:expr; $backend:ident, $inner:ident => $body:expr) => {
        match $state {
            #[cfg(glx_backend)]
            PlatformState::Glx($inner) => {
                let $backend = glx::GlxBackend;
                $body
            },
            #[cfg(wgl_backend)]
            PlatformState::Wgl($inner) => {
                let $backend = wgl::WglBackend;
                $body
            },
            #[cfg(cgl_backend)]
            PlatformState::Cgl($inner) => {
                let $backend = cgl::CglBackend;
                $body
            },
            _ => unreachable!(),
        }
    };
}

fn wrap<S>(
    created: PlatformContext<S>,
    variant: impl FnOnce(S) -> PlatformState,
) -> PlatformContext<PlatformState> {
    PlatformContext { state: variant(created.state), double_buffered: created.double_buffered }
}

impl Backend for NativeBackend {
    type State = PlatformState;

    fn create_platform_context(
        &self,
        request: &CreateRequest<'_>,
    ) -> Result<PlatformContext<PlatformState>> {
        match request.info.platform {
            #[cfg(glx_backend)]
            PlatformInfo::Xlib { .. } => {
                glx::GlxBackend.create_platform_context(request).map(|c| wrap(c, PlatformState::Glx))
            },
            #[cfg(wgl_backend)]
            PlatformInfo::Win32 { .. } => {
                wgl::WglBackend.create_platform_context(request).map(|c| wrap(c, PlatformState::Wgl))
            },
            #[cfg(cgl_backend)]
            PlatformInfo::AppKit { .. } => {
                cgl::CglBackend.create_platform_context(request).map(|c| wrap(c, PlatformState::Cgl))
            },
            PlatformInfo::None => Err(Error::new(
                ErrorKind::NoPlatformInfo,
                "unable to get the platform drawing surface info",
            )),
            _ => Err(ErrorKind::Unsupported("no backend for the drawing surface platform").into()),
        }
    }

    fn destroy_platform_context(&self, state: PlatformState) {
        platform_dispatch!(state; backend, state => backend.destroy_platform_context(state))
    }

    fn probe_platform_swap_control(&self, state: &PlatformState) -> SwapControl {
        platform_dispatch!(state; backend, state => backend.probe_platform_swap_control(state))
    }

    fn make_current(&self, state: &PlatformState) -> Result<()> {
        platform_dispatch!(state; backend, state => backend.make_current(state))
    }

    fn detach_current(&self, state: &PlatformState) -> Result<()> {
        platform_dispatch!(state; backend, state => backend.detach_current(state))
    }

    fn swap_platform_buffers(
        &self,
        state: &mut PlatformState,
        double_buffered: bool,
    ) -> Result<()> {
        platform_dispatch!(state; backend, state => {
            backend.swap_platform_buffers(state, double_buffered)
        })
    }

    fn apply_swap_interval(
        &self,
        state: &PlatformState,
        control: SwapControl,
        interval: i32,
    ) -> Result<()> {
        platform_dispatch!(state; backend, state => {
            backend.apply_swap_interval(state, control, interval)
        })
    }

    fn raw_context(&self, state: &PlatformState) -> RawContext {
        platform_dispatch!(state; backend, state => backend.raw_context(state))
    }

    fn share_group(&self, state: &PlatformState) -> Result<*mut c_void> {
        platform_dispatch!(state; backend, state => backend.share_group(state))
    }

    fn display(&self, state: &PlatformState) -> Result<*mut c_void> {
        platform_dispatch!(state; backend, state => backend.display(state))
    }

    fn device_context(&self, state: &PlatformState) -> Result<*mut c_void> {
        platform_dispatch!(state; backend, state => backend.device_context(state))
    }

    fn framebuffer(&self, state: &PlatformState, front: bool) -> u32 {
        platform_dispatch!(state; backend, state => backend.framebuffer(state, front))
    }

    fn retains_surface_info(&self) -> bool {
        cfg!(wgl_backend)
    }

    fn locks_toolkit_for_drawing(&self) -> bool {
        cfg!(glx_backend)
    }
}
