//! Framebuffer config negotiation.

use std::ffi::c_int;
use std::slice;

use glutin_glx_sys::glx::{self, types::GLXFBConfig};
use x11_dl::xlib;

use super::{Glx, XLIB};
use crate::config::{self, Buffering, PixelFormat, Selected};
use crate::error::Result;

/// The `glXChooseFBConfig` attributes for `format` with `buffering`.
pub(crate) fn fb_config_attributes(format: &PixelFormat, buffering: Buffering) -> Vec<c_int> {
    let color = PixelFormat::COLOR_CHANNEL_BITS as c_int;

    vec![
        glx::RENDER_TYPE as c_int,
        glx::RGBA_BIT as c_int,
        // Toolkits only hand out windows.
        glx::DRAWABLE_TYPE as c_int,
        glx::WINDOW_BIT as c_int,
        glx::X_VISUAL_TYPE as c_int,
        glx::TRUE_COLOR as c_int,
        glx::X_RENDERABLE as c_int,
        1,
        glx::RED_SIZE as c_int,
        color,
        glx::GREEN_SIZE as c_int,
        color,
        glx::BLUE_SIZE as c_int,
        color,
        glx::ALPHA_SIZE as c_int,
        format.alpha_bits as c_int,
        glx::DEPTH_SIZE as c_int,
        format.depth_bits as c_int,
        glx::STENCIL_SIZE as c_int,
        format.stencil_bits as c_int,
        glx::SAMPLE_BUFFERS as c_int,
        format.is_multisampled() as c_int,
        glx::SAMPLES as c_int,
        format.multisamples as c_int,
        glx::DOUBLEBUFFER as c_int,
        buffering.is_double() as c_int,
        0,
    ]
}

/// Find the config for `format`, preferring the one using the drawable's
/// visual.
pub(crate) unsafe fn choose_fb_config(
    glx: &Glx,
    display: *mut xlib::Display,
    screen: c_int,
    format: &PixelFormat,
    drawable_visual: xlib::VisualID,
) -> Result<Selected<GLXFBConfig>> {
    let search = |buffering| unsafe {
        let attributes = fb_config_attributes(format, buffering);
        let mut num_configs = 0;
        let raw = glx.ChooseFBConfig(display as *mut _, screen, attributes.as_ptr(), &mut num_configs);
        if raw.is_null() {
            return Vec::new();
        }

        let configs = match usize::try_from(num_configs) {
            Ok(len) => slice::from_raw_parts(raw, len).to_vec(),
            Err(_) => Vec::new(),
        };

        if let Some(xlib) = XLIB.as_ref() {
            (xlib.XFree)(raw as *mut _);
        }

        configs
    };

    let visual_of = |config: &GLXFBConfig| unsafe {
        let mut visual_id = 0;
        let status = glx.GetFBConfigAttrib(
            display as *mut _,
            *config,
            glx::VISUAL_ID as c_int,
            &mut visual_id,
        );

        (status == 0).then_some(visual_id as u64)
    };

    config::select_config(search, visual_of, drawable_visual as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of(attributes: &[c_int], key: u32) -> Option<c_int> {
        attributes.chunks(2).find(|pair| pair[0] == key as c_int).map(|pair| pair[1])
    }

    #[test]
    fn attributes_carry_the_format() {
        let format = PixelFormat { alpha_bits: 8, depth_bits: 24, stencil_bits: 8, multisamples: 4 };
        let attributes = fb_config_attributes(&format, Buffering::Double);

        assert_eq!(attributes.len() % 2, 1);
        assert_eq!(attributes.last(), Some(&0));
        assert_eq!(value_of(&attributes, glx::RED_SIZE), Some(8));
        assert_eq!(value_of(&attributes, glx::ALPHA_SIZE), Some(8));
        assert_eq!(value_of(&attributes, glx::DEPTH_SIZE), Some(24));
        assert_eq!(value_of(&attributes, glx::STENCIL_SIZE), Some(8));
        assert_eq!(value_of(&attributes, glx::SAMPLE_BUFFERS), Some(1));
        assert_eq!(value_of(&attributes, glx::SAMPLES), Some(4));
        assert_eq!(value_of(&attributes, glx::DOUBLEBUFFER), Some(1));
        assert_eq!(value_of(&attributes, glx::DRAWABLE_TYPE), Some(glx::WINDOW_BIT as c_int));
    }

    #[test]
    fn single_buffered_without_multisampling() {
        let attributes = fb_config_attributes(&PixelFormat::default(), Buffering::Single);

        assert_eq!(value_of(&attributes, glx::SAMPLE_BUFFERS), Some(0));
        assert_eq!(value_of(&attributes, glx::SAMPLES), Some(0));
        assert_eq!(value_of(&attributes, glx::DOUBLEBUFFER), Some(0));
    }
}
