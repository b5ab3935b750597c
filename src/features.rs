//! Capability probing from the native extension strings.

use std::collections::HashSet;

use bitflags::bitflags;

bitflags! {
    /// The context capabilities discovered from the extension string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContextFeatures: u32 {
        /// The context could be created with explicit attributes, like the
        /// GL version.
        const CREATE_CONTEXT_ATTRIBS = 0b0001;

        /// `*_EXT_swap_control` is present.
        const SWAP_CONTROL_EXT       = 0b0010;

        /// `*_EXT_swap_control_tear` is present, negative intervals mean
        /// adaptive vsync.
        const SWAP_CONTROL_TEAR      = 0b0100;

        /// `GLX_SGI_swap_control` is present.
        const SWAP_CONTROL_SGI       = 0b1000;
    }
}

/// Split the space separated extension string into whole tokens.
pub fn parse_extensions(extensions: &str) -> HashSet<&str> {
    extensions.split_ascii_whitespace().collect()
}

/// Extract the features out of the parsed extensions.
///
/// `prefix` is the window system binding, `"GLX"` or `"WGL"`.
pub fn extract_features(extensions: &HashSet<&str>, prefix: &str) -> ContextFeatures {
    let has = |name: &str| extensions.contains(format!("{prefix}_{name}").as_str());

    let mut features = ContextFeatures::empty();

    features.set(ContextFeatures::CREATE_CONTEXT_ATTRIBS, has("ARB_create_context"));
    features.set(ContextFeatures::SWAP_CONTROL_EXT, has("EXT_swap_control"));
    features.set(
        ContextFeatures::SWAP_CONTROL_TEAR,
        features.contains(ContextFeatures::SWAP_CONTROL_EXT) && has("EXT_swap_control_tear"),
    );
    features.set(ContextFeatures::SWAP_CONTROL_SGI, prefix == "GLX" && has("SGI_swap_control"));

    features
}
