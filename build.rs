use cfg_aliases::cfg_aliases;

fn main() {
    // Setup alias to reduce `cfg` boilerplate.
    cfg_aliases! {
        // Systems.
        free_unix: { all(unix, not(target_vendor = "apple"), not(target_os = "android")) },
        macos: { target_os = "macos" },

        // Native displays.
        x11_platform: { all(feature = "x11", free_unix) },

        // Backends.
        glx_backend: { all(feature = "glx", x11_platform) },
        wgl_backend: { all(feature = "wgl", windows) },
        cgl_backend: { all(feature = "cgl", macos) },
    }
}
