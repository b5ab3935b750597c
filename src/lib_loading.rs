//! Library loading routines.

use std::ops::Deref;
use std::sync::Arc;

use libloading::Library;

pub trait SymLoading {
    /// # Safety
    /// The library must outlive the loaded symbols.
    unsafe fn load_with(lib: &Library) -> Self;
}

/// Symbols loaded from the first library that could be opened.
#[derive(Clone)]
pub struct SymWrapper<T> {
    sym: T,
    _lib: Arc<Library>,
}

impl<T: SymLoading> SymWrapper<T> {
    /// # Safety
    /// Opening a library runs its initializers.
    pub unsafe fn new(lib_paths: &[&str]) -> Option<Self> {
        for path in lib_paths {
            let lib = match unsafe { Library::new(path) } {
                Ok(lib) => lib,
                Err(err) => {
                    log::debug!("failed to open {path}: {err}");
                    continue;
                },
            };

            let sym = unsafe { T::load_with(&lib) };
            return Some(SymWrapper { sym, _lib: Arc::new(lib) });
        }

        None
    }
}

impl<T> Deref for SymWrapper<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.sym
    }
}
