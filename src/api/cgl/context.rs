//! CGL context lifecycle.

use std::ffi::c_void;
use std::{fmt, ptr};

use cgl::{
    kCGLPFAAccelerated, kCGLPFAAlphaSize, kCGLPFAColorSize, kCGLPFADepthSize,
    kCGLPFAMultisample, kCGLPFAOpenGLProfile, kCGLPFASampleBuffers, kCGLPFASamples,
    kCGLPFAStencilSize, CGLChoosePixelFormat, CGLContextObj, CGLCreateContext,
    CGLDestroyContext, CGLDestroyPixelFormat, CGLPixelFormatAttribute, CGLSetCurrentContext,
};
use objc2::msg_send;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_core_foundation::{CGPoint, CGRect, CGSize};
use objc2_quartz_core::{CALayer, CATransaction};

use super::check;
use super::ffi::{self, kCGLOGLPVersion_3_2_Core};
use super::framebuffer::{BufferPair, PixelSize};
use crate::config::PixelFormat;
use crate::context::{Backend, CreateRequest, PlatformContext, RawContext};
use crate::error::{Error, ErrorKind, Result};
use crate::surface::PlatformInfo;
use crate::swap::SwapControl;

/// The CGL backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct CglBackend;

/// A CGL context rendering into IOSurfaces shown by its own `CALayer`.
pub struct CglState {
    context: CGLContextObj,
    layer: Retained<CALayer>,
    buffers: Option<BufferPair>,
    depth_stencil: bool,
}

unsafe impl Send for CglState {}

impl fmt::Debug for CglState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CglState")
            .field("context", &self.context)
            .field("size", &self.buffers.as_ref().map(|buffers| buffers.size))
            .finish_non_exhaustive()
    }
}

pub(crate) fn pixel_format_attributes(format: &PixelFormat) -> Vec<CGLPixelFormatAttribute> {
    let mut attributes = vec![
        kCGLPFAOpenGLProfile,
        kCGLOGLPVersion_3_2_Core,
        kCGLPFAColorSize,
        (3 * PixelFormat::COLOR_CHANNEL_BITS) as CGLPixelFormatAttribute,
        kCGLPFAAlphaSize,
        format.alpha_bits as CGLPixelFormatAttribute,
        kCGLPFADepthSize,
        format.depth_bits as CGLPixelFormatAttribute,
        kCGLPFAStencilSize,
        format.stencil_bits as CGLPixelFormatAttribute,
    ];

    if format.is_multisampled() {
        attributes.push(kCGLPFAMultisample);
        attributes.push(kCGLPFASampleBuffers);
        attributes.push(1);
        attributes.push(kCGLPFASamples);
        attributes.push(format.multisamples as CGLPixelFormatAttribute);
    }

    attributes.push(kCGLPFAAccelerated);
    attributes.push(0);
    attributes
}

/// Destroys a context that didn't make it to the caller.
struct ContextGuard(CGLContextObj);

impl ContextGuard {
    fn into_raw(self) -> CGLContextObj {
        let raw = self.0;
        std::mem::forget(self);
        raw
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        unsafe {
            CGLSetCurrentContext(ptr::null_mut());
            CGLDestroyContext(self.0);
        }
    }
}

unsafe fn create_raw_context(format: &PixelFormat) -> Result<ContextGuard> {
    let attributes = pixel_format_attributes(format);

    unsafe {
        let (mut pixel_format, mut count) = (ptr::null_mut(), 0);
        let err = CGLChoosePixelFormat(attributes.as_ptr(), &mut pixel_format, &mut count);
        check(err, ErrorKind::NoMatchingFormat, "unable to choose pixel format")?;
        if count == 0 || pixel_format.is_null() {
            return Err(Error::new(ErrorKind::NoMatchingFormat, "no pixel format matches"));
        }

        let mut context = ptr::null_mut();
        let err = CGLCreateContext(pixel_format, ptr::null_mut(), &mut context);
        CGLDestroyPixelFormat(pixel_format);
        check(err, ErrorKind::ContextCreationFailed, "unable to create context")?;

        Ok(ContextGuard(context))
    }
}

fn layer_pixel_size(layer: &CALayer) -> PixelSize {
    let (bounds, scale) = unsafe { (layer.bounds(), layer.contentsScale()) };
    PixelSize::from_points(bounds.size.width, bounds.size.height, scale)
}

/// Create the layer and hand it to `layer_host`.
unsafe fn install_layer(
    layer_host: *mut c_void,
    request: &CreateRequest<'_>,
    backing_scale: f64,
) -> Retained<CALayer> {
    let bounds = request.info.bounds;
    let host = layer_host as *mut AnyObject;

    unsafe {
        CATransaction::begin();
        CATransaction::setDisableActions(true);

        let layer = CALayer::new();
        layer.setFrame(CGRect::new(
            CGPoint::new(request.insets.x as f64, request.insets.y as f64),
            CGSize::new(bounds.width as f64, bounds.height as f64),
        ));
        layer.setContentsScale(backing_scale);
        layer.setOpaque(request.format.alpha_bits == 0);

        let _: () = msg_send![host, setLayer: &*layer];

        CATransaction::commit();
        layer
    }
}

unsafe fn remove_layer(layer: &CALayer) {
    unsafe {
        CATransaction::begin();
        CATransaction::setDisableActions(true);
        layer.removeFromSuperlayer();
        CATransaction::commit();
    }
}

/// Put a new value into `slot`, freeing the old one only once the new one
/// exists.
fn replace_on_success<T>(
    slot: &mut Option<T>,
    allocate: impl FnOnce() -> Result<T>,
    free: impl FnOnce(T),
) -> Result<()> {
    let new = allocate()?;
    if let Some(old) = slot.replace(new) {
        free(old);
    }

    Ok(())
}

impl Backend for CglBackend {
    type State = CglState;

    fn create_platform_context(
        &self,
        request: &CreateRequest<'_>,
    ) -> Result<PlatformContext<CglState>> {
        let (layer_host, backing_scale) = match request.info.platform {
            PlatformInfo::AppKit { layer_host, backing_scale } if !layer_host.is_null() => {
                (layer_host, backing_scale)
            },
            _ => {
                return Err(Error::new(
                    ErrorKind::NoPlatformInfo,
                    "unable to get the platform drawing surface info",
                ))
            },
        };

        let format = request.format;
        let depth_stencil = format.depth_bits > 0 || format.stencil_bits > 0;

        unsafe {
            let context = create_raw_context(&format)?;
            check(
                CGLSetCurrentContext(context.0),
                ErrorKind::MakeCurrentFailed,
                "unable to make current",
            )?;

            let size = PixelSize::from_points(
                request.info.bounds.width as f64,
                request.info.bounds.height as f64,
                backing_scale,
            );
            let buffers = BufferPair::new(context.0, size, depth_stencil)?;
            let layer = install_layer(layer_host, request, backing_scale);

            log::debug!(
                "created the CGL context with {}x{} framebuffers at scale {backing_scale}",
                size.width,
                size.height
            );

            Ok(PlatformContext {
                state: CglState {
                    context: context.into_raw(),
                    layer,
                    buffers: Some(buffers),
                    depth_stencil,
                },
                // Presenting always flips between the two IOSurfaces.
                double_buffered: true,
            })
        }
    }

    fn destroy_platform_context(&self, mut state: CglState) {
        unsafe {
            if let Some(buffers) = state.buffers.take() {
                if CGLSetCurrentContext(state.context) == ffi::kCGLNoError {
                    buffers.delete();
                } else {
                    log::warn!("unable to make the CGL context current to free its framebuffers");
                }
            }

            remove_layer(&state.layer);

            CGLSetCurrentContext(ptr::null_mut());
            let err = CGLDestroyContext(state.context);
            if err != ffi::kCGLNoError {
                log::warn!("unable to destroy the CGL context ({err})");
            }
        }
    }

    fn probe_platform_swap_control(&self, _state: &CglState) -> SwapControl {
        // Core Animation paces the layer updates itself.
        SwapControl::None
    }

    fn make_current(&self, state: &CglState) -> Result<()> {
        unsafe {
            check(
                CGLSetCurrentContext(state.context),
                ErrorKind::MakeCurrentFailed,
                "unable to make current",
            )
        }
    }

    fn detach_current(&self, _state: &CglState) -> Result<()> {
        unsafe {
            check(
                CGLSetCurrentContext(ptr::null_mut()),
                ErrorKind::MakeCurrentFailed,
                "unable to detach the context",
            )
        }
    }

    fn swap_platform_buffers(&self, state: &mut CglState, _double_buffered: bool) -> Result<()> {
        let buffers = match state.buffers.as_mut() {
            Some(buffers) => buffers,
            None => return Err(Error::new(ErrorKind::SwapFailed, "the framebuffers are gone")),
        };

        unsafe {
            ffi::glFlush();

            CATransaction::begin();
            CATransaction::setDisableActions(true);
            state.layer.setContents(Some(buffers.back_surface().as_ref()));
            CATransaction::commit();
        }

        buffers.flip();

        let size = layer_pixel_size(&state.layer);
        if size != buffers.size {
            log::debug!(
                "layer resized from {}x{} to {}x{}",
                buffers.size.width,
                buffers.size.height,
                size.width,
                size.height
            );

            let (context, depth_stencil) = (state.context, state.depth_stencil);
            replace_on_success(
                &mut state.buffers,
                || unsafe { BufferPair::new(context, size, depth_stencil) },
                |old| unsafe { old.delete() },
            )
            .map_err(|err| {
                log::warn!("keeping the {}x{} framebuffers: {err}", size.width, size.height);
                Error::new(ErrorKind::SwapFailed, err.message().to_owned())
            })?;
        }

        Ok(())
    }

    fn apply_swap_interval(
        &self,
        _state: &CglState,
        _control: SwapControl,
        _interval: i32,
    ) -> Result<()> {
        Err(ErrorKind::Unsupported("CGL contexts have no swap control").into())
    }

    fn raw_context(&self, state: &CglState) -> RawContext {
        RawContext::Cgl(state.context as *const c_void)
    }

    fn share_group(&self, state: &CglState) -> Result<*mut c_void> {
        Ok(unsafe { ffi::CGLGetShareGroup(state.context) })
    }

    fn framebuffer(&self, state: &CglState, front: bool) -> u32 {
        state.buffers.as_ref().map_or(0, |buffers| buffers.framebuffer(front))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_reallocation_keeps_the_old_buffers() {
        let mut slot = Some(1);
        let mut freed = Vec::new();

        let err = replace_on_success(
            &mut slot,
            || Err(Error::new(ErrorKind::ContextCreationFailed, "no IOSurface")),
            |old| freed.push(old),
        )
        .unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::ContextCreationFailed);
        assert_eq!(slot, Some(1));
        assert!(freed.is_empty());

        replace_on_success(&mut slot, || Ok(2), |old| freed.push(old)).unwrap();
        assert_eq!(slot, Some(2));
        assert_eq!(freed, [1]);
    }

    #[test]
    fn attributes_are_terminated() {
        let attributes = pixel_format_attributes(&PixelFormat::new(8, 24, 8));
        assert_eq!(attributes.last(), Some(&0));
        assert!(!attributes.contains(&kCGLPFAMultisample));

        let format = PixelFormat { multisamples: 4, ..PixelFormat::default() };
        let attributes = pixel_format_attributes(&format);
        let samples = attributes.iter().position(|&a| a == kCGLPFASamples).unwrap();
        assert_eq!(attributes[samples + 1], 4);
    }
}
