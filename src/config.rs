//! Requested pixel format and the negotiation rules shared by the backends.

use crate::error::{Error, ErrorKind, Result};

/// The framebuffer format requested before the context is created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    /// Bits of alpha in the color buffer.
    pub alpha_bits: u8,

    /// Bits of depth in the depth buffer.
    pub depth_bits: u8,

    /// Bits of stencil in the stencil buffer.
    pub stencil_bits: u8,

    /// The amount of samples in multisample buffer, zero disables
    /// multisampling.
    pub multisamples: u8,
}

impl PixelFormat {
    /// Red, green and blue bits are fixed.
    pub const COLOR_CHANNEL_BITS: u8 = 8;

    /// Create a format with the given ancillary buffer sizes and no
    /// multisampling.
    pub const fn new(alpha_bits: u8, depth_bits: u8, stencil_bits: u8) -> Self {
        Self { alpha_bits, depth_bits, stencil_bits, multisamples: 0 }
    }

    /// Whether a multisample buffer is requested.
    #[inline]
    pub fn is_multisampled(&self) -> bool {
        self.multisamples > 0
    }

    /// The descriptor used by the single-shot "choose format" backends.
    pub fn descriptor(&self) -> FormatDescriptor {
        FormatDescriptor {
            color_bits: Self::COLOR_CHANNEL_BITS * 3,
            channel_bits: Self::COLOR_CHANNEL_BITS,
            alpha_bits: self.alpha_bits,
            depth_bits: self.depth_bits,
            stencil_bits: self.stencil_bits,
            double_buffer: true,
            draw_to_window: true,
            support_opengl: true,
        }
    }
}

/// Convert a configuration value coming from the toolkit into bits.
pub(crate) fn bits(value: i32, what: &'static str) -> Result<u8> {
    u8::try_from(value).map_err(|_| {
        Error::new(ErrorKind::BadParameter, format!("{what} must be in 0..=255, got {value}"))
    })
}

/// Placement hint for the rendering layer, relative to its superlayer.
///
/// Only the CGL backend consumes it, until the toolkit lays the layer out
/// itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Insets {
    pub x: i32,
    pub y: i32,
}

/// A pixel format descriptor for backends that pick a single closest match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Total bits of red, green and blue.
    pub color_bits: u8,
    /// Bits per color channel.
    pub channel_bits: u8,
    pub alpha_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub double_buffer: bool,
    pub draw_to_window: bool,
    pub support_opengl: bool,
}

/// The buffering mode searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buffering {
    Double,
    Single,
}

impl Buffering {
    /// The search order, double buffering is preferred.
    pub const PREFERENCE: [Buffering; 2] = [Buffering::Double, Buffering::Single];

    #[inline]
    pub fn is_double(self) -> bool {
        self == Buffering::Double
    }
}

/// The framebuffer configuration picked by [`select_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selected<C> {
    pub config: C,
    pub double_buffered: bool,
    /// Whether the config's visual is the drawable's visual.
    pub matches_visual: bool,
}

/// Pick a framebuffer configuration out of the native candidates.
///
/// `search` returns the matching configurations for a buffering mode, in
/// native preference order. Double buffering is searched first and only if
/// it yields nothing the single buffered configurations are considered.
/// Within a mode the configuration using `drawable_visual` wins, otherwise
/// the first one is taken.
pub fn select_config<C, S, V>(
    mut search: S,
    visual_of: V,
    drawable_visual: u64,
) -> Result<Selected<C>>
where
    S: FnMut(Buffering) -> Vec<C>,
    V: Fn(&C) -> Option<u64>,
{
    for buffering in Buffering::PREFERENCE {
        let candidates = search(buffering);
        let matching =
            candidates.iter().position(|config| visual_of(config) == Some(drawable_visual));

        let (index, matches_visual) = match matching {
            Some(index) => (index, true),
            None if !candidates.is_empty() => (0, false),
            None => {
                log::debug!("no {buffering:?} buffered configs");
                continue;
            },
        };

        let double_buffered = buffering.is_double();
        let config = match candidates.into_iter().nth(index) {
            Some(config) => config,
            None => continue,
        };

        log::debug!(
            "picked {buffering:?} buffered config, visual match with 0x{drawable_visual:x}: \
             {matches_visual}"
        );

        return Ok(Selected { config, double_buffered, matches_visual });
    }

    Err(Error::new(ErrorKind::NoMatchingFormat, "unable to find a fb config"))
}
