//! IOSurface backed framebuffers presented through a `CALayer`.

use std::ffi::c_void;

use cgl::CGLContextObj;
use objc2_core_foundation::{
    kCFAllocatorDefault, kCFTypeDictionaryKeyCallBacks, kCFTypeDictionaryValueCallBacks,
    CFDictionary, CFIndex, CFNumber, CFRetained, CFString,
};
use objc2_io_surface::{
    kIOSurfaceBytesPerElement, kIOSurfaceBytesPerRow, kIOSurfaceHeight, kIOSurfacePixelFormat,
    kIOSurfaceWidth, IOSurfaceRef,
};

use super::ffi::*;
use crate::error::{Error, ErrorKind, NativeError, Result};

const BYTES_PER_PIXEL: i32 = 4;

/// Framebuffer size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelSize {
    pub width: i32,
    pub height: i32,
}

impl PixelSize {
    /// The backing size of a `width` x `height` point area, never empty.
    pub(crate) fn from_points(width: f64, height: f64, scale: f64) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let to_pixels = |points: f64| ((points * scale).round() as i32).max(1);
        Self { width: to_pixels(width), height: to_pixels(height) }
    }
}

/// One IOSurface with the texture and framebuffer object drawing into it.
pub(crate) struct SurfaceBuffer {
    pub surface: CFRetained<IOSurfaceRef>,
    pub texture: GLuint,
    pub fbo: GLuint,
}

/// The pair of buffers, one is drawn into while the other is shown.
pub(crate) struct BufferPair {
    pub buffers: [SurfaceBuffer; 2],
    pub depth_stencil: GLuint,
    pub back: usize,
    pub size: PixelSize,
}

impl BufferPair {
    /// Allocate the pair, the context must be current.
    pub(crate) unsafe fn new(
        context: CGLContextObj,
        size: PixelSize,
        depth_stencil: bool,
    ) -> Result<Self> {
        unsafe {
            let depth_stencil = if depth_stencil {
                let mut renderbuffer = 0;
                glGenRenderbuffers(1, &mut renderbuffer);
                glBindRenderbuffer(GL_RENDERBUFFER, renderbuffer);
                glRenderbufferStorage(GL_RENDERBUFFER, GL_DEPTH24_STENCIL8, size.width, size.height);
                glBindRenderbuffer(GL_RENDERBUFFER, 0);
                renderbuffer
            } else {
                0
            };

            let first = match SurfaceBuffer::new(context, size, depth_stencil) {
                Ok(buffer) => buffer,
                Err(err) => {
                    delete_renderbuffer(depth_stencil);
                    return Err(err);
                },
            };

            let second = match SurfaceBuffer::new(context, size, depth_stencil) {
                Ok(buffer) => buffer,
                Err(err) => {
                    first.delete();
                    delete_renderbuffer(depth_stencil);
                    return Err(err);
                },
            };

            log::debug!("allocated {}x{} IOSurface framebuffers", size.width, size.height);

            Ok(Self { buffers: [first, second], depth_stencil, back: 0, size })
        }
    }

    /// The framebuffer drawn into, or with `front` the one last shown.
    pub(crate) fn framebuffer(&self, front: bool) -> GLuint {
        let index = if front { self.back ^ 1 } else { self.back };
        self.buffers[index].fbo
    }

    pub(crate) fn back_surface(&self) -> &CFRetained<IOSurfaceRef> {
        &self.buffers[self.back].surface
    }

    pub(crate) fn flip(&mut self) {
        self.back ^= 1;
    }

    /// Delete the GL objects, the context must be current.
    pub(crate) unsafe fn delete(self) {
        unsafe {
            let [first, second] = self.buffers;
            first.delete();
            second.delete();
            delete_renderbuffer(self.depth_stencil);
        }
    }
}

impl SurfaceBuffer {
    unsafe fn new(context: CGLContextObj, size: PixelSize, depth_stencil: GLuint) -> Result<Self> {
        let surface = create_io_surface(size)?;

        unsafe {
            let mut texture = 0;
            glGenTextures(1, &mut texture);
            glBindTexture(GL_TEXTURE_RECTANGLE, texture);
            let err = CGLTexImageIOSurface2D(
                context,
                GL_TEXTURE_RECTANGLE,
                GL_RGBA,
                size.width,
                size.height,
                GL_BGRA,
                GL_UNSIGNED_INT_8_8_8_8_REV,
                &*surface as *const IOSurfaceRef,
                0,
            );
            glBindTexture(GL_TEXTURE_RECTANGLE, 0);

            if err != kCGLNoError {
                glDeleteTextures(1, &texture);
                return Err(Error::new(
                    ErrorKind::ContextCreationFailed,
                    "unable to bind the IOSurface to a texture",
                )
                .with_native(Some(NativeError::Cgl(err))));
            }

            let mut fbo = 0;
            glGenFramebuffers(1, &mut fbo);
            glBindFramebuffer(GL_FRAMEBUFFER, fbo);
            glFramebufferTexture2D(
                GL_FRAMEBUFFER,
                GL_COLOR_ATTACHMENT0,
                GL_TEXTURE_RECTANGLE,
                texture,
                0,
            );

            if depth_stencil != 0 {
                glFramebufferRenderbuffer(
                    GL_FRAMEBUFFER,
                    GL_DEPTH_STENCIL_ATTACHMENT,
                    GL_RENDERBUFFER,
                    depth_stencil,
                );
            }

            let status = glCheckFramebufferStatus(GL_FRAMEBUFFER);
            glBindFramebuffer(GL_FRAMEBUFFER, 0);

            let buffer = Self { surface, texture, fbo };
            if status != GL_FRAMEBUFFER_COMPLETE {
                buffer.delete();
                return Err(Error::new(
                    ErrorKind::ContextCreationFailed,
                    format!("framebuffer is incomplete: 0x{status:x}"),
                ));
            }

            Ok(buffer)
        }
    }

    unsafe fn delete(self) {
        unsafe {
            glDeleteFramebuffers(1, &self.fbo);
            glDeleteTextures(1, &self.texture);
        }
    }
}

unsafe fn delete_renderbuffer(renderbuffer: GLuint) {
    if renderbuffer != 0 {
        unsafe { glDeleteRenderbuffers(1, &renderbuffer) };
    }
}

fn create_io_surface(size: PixelSize) -> Result<CFRetained<IOSurfaceRef>> {
    unsafe {
        let bytes_per_row = IOSurfaceRef::align_property(
            kIOSurfaceBytesPerRow,
            (size.width * BYTES_PER_PIXEL) as usize,
        ) as i32;
        let keys = [
            kIOSurfaceWidth,
            kIOSurfaceHeight,
            kIOSurfaceBytesPerElement,
            kIOSurfaceBytesPerRow,
            kIOSurfacePixelFormat,
        ];
        let values = [
            &*CFNumber::new_i32(size.width),
            &*CFNumber::new_i32(size.height),
            &*CFNumber::new_i32(BYTES_PER_PIXEL),
            &*CFNumber::new_i32(bytes_per_row),
            &*CFNumber::new_i32(kCVPixelFormatType_32BGRA),
        ];
        let len = keys.len() as CFIndex;

        // Both the keys and the values are CF types.
        let keys: *const &CFString = keys.as_ptr();
        let keys: *mut *const c_void = keys as _;
        let values: *const &CFNumber = values.as_ptr();
        let values: *mut *const c_void = values as _;

        let properties = CFDictionary::new(
            kCFAllocatorDefault,
            keys,
            values,
            len,
            &kCFTypeDictionaryKeyCallBacks,
            &kCFTypeDictionaryValueCallBacks,
        )
        .ok_or_else(|| Error::new(ErrorKind::PlatformNativeError, "unable to create properties"))?;

        IOSurfaceRef::new(&properties).ok_or_else(|| {
            Error::new(ErrorKind::ContextCreationFailed, "unable to create an IOSurface")
        })
    }
}
