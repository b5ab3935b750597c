//! Swap interval negotiation.

use crate::features::ContextFeatures;

/// The swap control extension picked for a context.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapControl {
    /// No way to change the swap interval.
    #[default]
    None,

    /// `*_EXT_swap_control`, with `tear` when adaptive vsync is available.
    Ext { tear: bool },

    /// `GLX_SGI_swap_control`.
    Sgi,
}

impl SwapControl {
    /// Pick the swap control, the EXT flavor wins over SGI.
    pub fn from_features(features: ContextFeatures) -> Self {
        if features.contains(ContextFeatures::SWAP_CONTROL_EXT) {
            SwapControl::Ext { tear: features.contains(ContextFeatures::SWAP_CONTROL_TEAR) }
        } else if features.contains(ContextFeatures::SWAP_CONTROL_SGI) {
            SwapControl::Sgi
        } else {
            SwapControl::None
        }
    }

    /// Whether negative intervals are honored.
    #[inline]
    pub fn supports_tear(self) -> bool {
        matches!(self, SwapControl::Ext { tear: true })
    }

    /// The interval that is going to be applied for `requested`.
    pub fn normalize(self, requested: i32) -> i32 {
        match self {
            SwapControl::None => 0,
            _ if requested < 0 && !self.supports_tear() => {
                requested.checked_neg().unwrap_or(i32::MAX)
            },
            _ => requested,
        }
    }
}
