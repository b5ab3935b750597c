use glembed::{
    Context, ContextFeatures, DrawingSurface, Error, LockFlags, NativeBackend, PixelFormat,
    SurfaceInfo, SwapControl, Toolkit,
};

pub trait FailToCompileIfNotSendSync
where
    Self: Send + Sync,
{
}

impl FailToCompileIfNotSendSync for Error {}
impl FailToCompileIfNotSendSync for PixelFormat {}
impl FailToCompileIfNotSendSync for SwapControl {}
impl FailToCompileIfNotSendSync for ContextFeatures {}
impl FailToCompileIfNotSendSync for NativeBackend {}

pub trait FailToCompileIfNotSend
where
    Self: Send,
{
}

impl FailToCompileIfNotSend for SurfaceInfo {}
impl<T: Toolkit + Send> FailToCompileIfNotSend for Context<T>
where
    T::Surface: Send,
{
}

pub trait FailToCompileIfNotClone
where
    Self: Clone,
{
}

impl FailToCompileIfNotClone for Error {}
impl FailToCompileIfNotClone for PixelFormat {}
impl FailToCompileIfNotClone for NativeBackend {}

struct Headless;

impl Toolkit for Headless {
    type Component = ();
    type Surface = Headless;

    fn lock(&self) {}

    fn unlock(&self) {}

    fn drawing_surface(&self, _component: &()) -> Option<Headless> {
        Some(Headless)
    }

    fn free_drawing_surface(&self, _surface: Headless) {}
}

impl DrawingSurface for Headless {
    fn lock(&self) -> LockFlags {
        LockFlags::ERROR
    }

    fn unlock(&self) {}

    fn info(&self) -> Option<SurfaceInfo> {
        None
    }

    fn free_info(&self, _info: SurfaceInfo) {}
}

#[test]
fn context_moves_across_threads() {
    let context = Context::new(Headless, &()).unwrap();
    let state = std::thread::spawn(move || {
        let mut context = context;
        assert!(context.create_gl_context().is_err());
        context.state()
    })
    .join()
    .unwrap();

    assert_eq!(state, glembed::ContextState::Uninitialized);
}
