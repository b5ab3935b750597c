//! Handling of `PIXELFORMATDESCRIPTOR`.

use std::mem::{self, MaybeUninit};

use windows_sys::Win32::Graphics::Gdi::HDC;
use windows_sys::Win32::Graphics::OpenGL::{self as gl, PIXELFORMATDESCRIPTOR};

use super::last_os_error;
use crate::config::{FormatDescriptor, PixelFormat};
use crate::error::{Error, ErrorKind, Result};

pub(crate) fn pixel_format_descriptor(descriptor: &FormatDescriptor) -> PIXELFORMATDESCRIPTOR {
    let mut dw_flags = 0;
    if descriptor.draw_to_window {
        dw_flags |= gl::PFD_DRAW_TO_WINDOW;
    }

    if descriptor.support_opengl {
        dw_flags |= gl::PFD_SUPPORT_OPENGL;
    }

    if descriptor.double_buffer {
        dw_flags |= gl::PFD_DOUBLEBUFFER;
    }

    PIXELFORMATDESCRIPTOR {
        nSize: mem::size_of::<PIXELFORMATDESCRIPTOR>() as _,
        // Should be one according to the docs.
        nVersion: 1,
        dwFlags: dw_flags,
        iPixelType: gl::PFD_TYPE_RGBA,
        cColorBits: descriptor.color_bits,
        cRedBits: descriptor.channel_bits,
        cRedShift: 0,
        cGreenBits: descriptor.channel_bits,
        cGreenShift: 0,
        cBlueBits: descriptor.channel_bits,
        cBlueShift: 0,
        cAlphaBits: descriptor.alpha_bits,
        cAlphaShift: 0,
        cAccumBits: 0,
        cAccumRedBits: 0,
        cAccumGreenBits: 0,
        cAccumBlueBits: 0,
        cAccumAlphaBits: 0,
        cDepthBits: descriptor.depth_bits,
        cStencilBits: descriptor.stencil_bits,
        cAuxBuffers: 0,
        iLayerType: gl::PFD_MAIN_PLANE,
        bReserved: 0,
        dwLayerMask: 0,
        dwVisibleMask: 0,
        dwDamageMask: 0,
    }
}

/// Apply the closest pixel format to `hdc`, returning whether it's double
/// buffered.
///
/// A window keeps its pixel format for its whole life, so a format applied
/// earlier is reused.
pub(crate) unsafe fn apply_pixel_format(hdc: HDC, format: &PixelFormat) -> Result<bool> {
    let descriptor = pixel_format_descriptor(&format.descriptor());

    unsafe {
        let mut index = gl::GetPixelFormat(hdc);
        if index == 0 {
            index = gl::ChoosePixelFormat(hdc, &descriptor);
            if index == 0 {
                return Err(Error::new(ErrorKind::NoMatchingFormat, "unable to choose format")
                    .with_native(last_os_error()));
            }

            if gl::SetPixelFormat(hdc, index, &descriptor) == 0 {
                return Err(Error::new(ErrorKind::NoMatchingFormat, "unable to set pixel format")
                    .with_native(last_os_error()));
            }
        } else {
            log::debug!("reusing pixel format {index} of the window");
        }

        let mut applied = MaybeUninit::<PIXELFORMATDESCRIPTOR>::uninit();
        if gl::DescribePixelFormat(
            hdc,
            index as _,
            mem::size_of::<PIXELFORMATDESCRIPTOR>() as _,
            applied.as_mut_ptr(),
        ) == 0
        {
            log::warn!("unable to describe pixel format {index}, assuming double buffering");
            return Ok(true);
        }

        let applied = applied.assume_init();
        log::debug!(
            "pixel format {index}: color {} alpha {} depth {} stencil {}",
            applied.cColorBits,
            applied.cAlphaBits,
            applied.cDepthBits,
            applied.cStencilBits
        );

        Ok((applied.dwFlags & gl::PFD_DOUBLEBUFFER) != 0)
    }
}
