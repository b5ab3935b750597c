use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::ptr;
use std::rc::Rc;

use glembed::{
    Backend, Bounds, Context, ContextState, CreateRequest, DrawingSurface, Error, ErrorKind,
    LockFlags, PixelFormat, PlatformContext, PlatformInfo, RawContext, SurfaceInfo, SwapControl,
    Toolkit, GL_COLOR_ATTACHMENT0, GL_FRONT,
};

type Log = Rc<RefCell<Vec<String>>>;

fn log(log: &Log, event: impl Into<String>) {
    log.borrow_mut().push(event.into());
}

fn count(log: &Log, event: &str) -> usize {
    log.borrow().iter().filter(|e| *e == event).count()
}

fn position(log: &Log, event: &str) -> usize {
    log.borrow().iter().position(|e| e == event).unwrap_or_else(|| panic!("no {event} in log"))
}

#[derive(Default)]
struct Script {
    no_surface: bool,
    lock_error: bool,
    no_info: bool,
    create_error: Option<ErrorKind>,
    apply_error: bool,
    swap_control: SwapControl,
    double_buffered: bool,
    retains_info: bool,
    locks_drawing: bool,
    framebuffers: Option<(u32, u32)>,
}

struct MockToolkit {
    log: Log,
    script: Rc<Script>,
}

struct MockSurface {
    log: Log,
    script: Rc<Script>,
}

impl Toolkit for MockToolkit {
    type Component = str;
    type Surface = MockSurface;

    fn lock(&self) {
        log(&self.log, "toolkit.lock");
    }

    fn unlock(&self) {
        log(&self.log, "toolkit.unlock");
    }

    fn drawing_surface(&self, component: &str) -> Option<MockSurface> {
        log(&self.log, format!("surface.get {component}"));
        if self.script.no_surface {
            return None;
        }

        Some(MockSurface { log: self.log.clone(), script: self.script.clone() })
    }

    fn free_drawing_surface(&self, _surface: MockSurface) {
        log(&self.log, "surface.free");
    }
}

impl DrawingSurface for MockSurface {
    fn lock(&self) -> LockFlags {
        log(&self.log, "surface.lock");
        if self.script.lock_error {
            LockFlags::ERROR
        } else {
            LockFlags::empty()
        }
    }

    fn unlock(&self) {
        log(&self.log, "surface.unlock");
    }

    fn info(&self) -> Option<SurfaceInfo> {
        log(&self.log, "info.get");
        if self.script.no_info {
            return None;
        }

        Some(SurfaceInfo {
            handle: ptr::null_mut(),
            bounds: Bounds { x: 0, y: 0, width: 640, height: 480 },
            platform: PlatformInfo::Win32 { hdc: 0x1234 as *mut c_void },
        })
    }

    fn free_info(&self, _info: SurfaceInfo) {
        log(&self.log, "info.free");
    }
}

struct MockBackend {
    log: Log,
    script: Rc<Script>,
    next_id: Cell<usize>,
}

#[derive(Debug)]
struct MockState {
    id: usize,
    back: usize,
}

impl Backend for MockBackend {
    type State = MockState;

    fn create_platform_context(
        &self,
        request: &CreateRequest<'_>,
    ) -> glembed::Result<PlatformContext<MockState>> {
        log(&self.log, format!("backend.create {:?}", request.format));
        if let Some(kind) = self.script.create_error {
            return Err(kind.into());
        }

        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        Ok(PlatformContext {
            state: MockState { id, back: 0 },
            double_buffered: self.script.double_buffered,
        })
    }

    fn destroy_platform_context(&self, state: MockState) {
        log(&self.log, format!("backend.destroy {}", state.id));
    }

    fn probe_platform_swap_control(&self, _state: &MockState) -> SwapControl {
        self.script.swap_control
    }

    fn make_current(&self, state: &MockState) -> glembed::Result<()> {
        log(&self.log, format!("backend.make_current {}", state.id));
        Ok(())
    }

    fn detach_current(&self, state: &MockState) -> glembed::Result<()> {
        log(&self.log, format!("backend.detach {}", state.id));
        Ok(())
    }

    fn swap_platform_buffers(
        &self,
        state: &mut MockState,
        double_buffered: bool,
    ) -> glembed::Result<()> {
        log(&self.log, format!("backend.swap {double_buffered}"));
        state.back ^= 1;
        Ok(())
    }

    fn apply_swap_interval(
        &self,
        _state: &MockState,
        control: SwapControl,
        interval: i32,
    ) -> glembed::Result<()> {
        assert_ne!(control, SwapControl::None);
        log(&self.log, format!("backend.interval {interval}"));
        if self.script.apply_error {
            return Err(ErrorKind::PlatformNativeError.into());
        }

        Ok(())
    }

    fn raw_context(&self, state: &MockState) -> RawContext {
        RawContext::Wgl(state.id as *const c_void)
    }

    fn framebuffer(&self, state: &MockState, front: bool) -> u32 {
        match self.script.framebuffers {
            Some((first, second)) => {
                let back = if front { state.back ^ 1 } else { state.back };
                if back == 0 {
                    first
                } else {
                    second
                }
            },
            None => 0,
        }
    }

    fn retains_surface_info(&self) -> bool {
        self.script.retains_info
    }

    fn locks_toolkit_for_drawing(&self) -> bool {
        self.script.locks_drawing
    }
}

struct Harness {
    log: Log,
}

impl Harness {
    fn context(script: Script) -> (Self, Result<Context<MockToolkit, MockBackend>, Error>) {
        let log: Log = Rc::default();
        let script = Rc::new(script);
        let toolkit = MockToolkit { log: log.clone(), script: script.clone() };
        let backend = MockBackend { log: log.clone(), script, next_id: Cell::new(0) };
        let context = Context::with_backend(toolkit, "canvas", backend);
        (Self { log }, context)
    }

    fn created(script: Script) -> (Self, Context<MockToolkit, MockBackend>) {
        let (harness, context) = Self::context(script);
        let mut context = context.unwrap();
        context.create_gl_context().unwrap();
        harness.log.borrow_mut().clear();
        (harness, context)
    }
}

#[test]
fn acquire_locks_the_toolkit() {
    let (harness, context) = Harness::context(Script::default());
    let context = context.unwrap();

    assert_eq!(context.state(), ContextState::Uninitialized);
    assert_eq!(*harness.log.borrow(), ["toolkit.lock", "surface.get canvas", "toolkit.unlock"]);
}

#[test]
fn no_drawing_surface() {
    let (harness, context) = Harness::context(Script { no_surface: true, ..Script::default() });

    assert_eq!(context.unwrap_err().error_kind(), ErrorKind::NoSurface);
    assert_eq!(count(&harness.log, "toolkit.unlock"), 1);
}

#[test]
fn configuration_last_write_wins() {
    let (_harness, context) = Harness::context(Script::default());
    let mut context = context.unwrap();

    context.set_pixel_format(8, 16, 0).unwrap();
    context.set_pixel_format(0, 24, 8).unwrap();
    context.set_multisamples(4).unwrap();
    context.set_multisamples(2).unwrap();
    context.set_insets(3, 5).unwrap();

    let format = context.requested_format();
    assert_eq!((format.alpha_bits, format.depth_bits, format.stencil_bits), (0, 24, 8));
    assert_eq!(format.multisamples, 2);
    assert_eq!((context.insets().x, context.insets().y), (3, 5));
}

#[test]
fn negative_configuration_is_rejected() {
    let (_harness, context) = Harness::context(Script::default());
    let mut context = context.unwrap();

    let err = context.set_pixel_format(8, -24, 8).unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::BadParameter);
    assert_eq!(context.requested_format(), PixelFormat::default());

    let err = context.set_multisamples(300).unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::BadParameter);
}

#[test]
fn format_reaches_the_backend() {
    let (harness, context) = Harness::context(Script::default());
    let mut context = context.unwrap();
    context.set_pixel_format(8, 24, 8).unwrap();
    context.set_multisamples(4).unwrap();
    context.create_gl_context().unwrap();

    let requested = PixelFormat { multisamples: 4, ..PixelFormat::new(8, 24, 8) };
    assert_eq!(count(&harness.log, &format!("backend.create {requested:?}")), 1);
    assert!(matches!(context.gl_context().unwrap(), RawContext::Wgl(_)));
}

#[test]
fn operations_before_create_are_invalid() {
    let (_harness, context) = Harness::context(Script::default());
    let mut context = context.unwrap();

    assert!(context.make_current().unwrap_err().invalid_state());
    assert!(context.detach_current().unwrap_err().invalid_state());
    assert!(context.swap_buffers().unwrap_err().invalid_state());
    assert!(context.set_swap_interval(1).unwrap_err().invalid_state());
    assert!(context.is_double_buffered().unwrap_err().invalid_state());
    assert!(context.gl_context().unwrap_err().invalid_state());
    assert!(context.framebuffer(false).unwrap_err().invalid_state());
}

#[test]
fn configuration_after_create_is_invalid() {
    let (harness, mut context) = Harness::created(Script::default());

    assert!(context.set_pixel_format(8, 24, 8).unwrap_err().invalid_state());
    assert!(context.set_multisamples(4).unwrap_err().invalid_state());
    assert!(context.set_insets(1, 1).unwrap_err().invalid_state());
    assert!(harness.log.borrow().is_empty());
}

#[test]
fn second_create_keeps_the_first_context() {
    let (harness, mut context) = Harness::created(Script::default());

    let err = context.create_gl_context().unwrap_err();
    assert!(err.invalid_state());
    assert!(harness.log.borrow().iter().all(|e| !e.starts_with("backend.create")));

    context.make_current().unwrap();
    assert_eq!(*harness.log.borrow(), ["backend.make_current 1"]);
}

#[test]
fn create_unwinds_in_order() {
    let (harness, context) = Harness::context(Script::default());
    let mut context = context.unwrap();
    harness.log.borrow_mut().clear();
    context.create_gl_context().unwrap();

    assert_eq!(
        *harness.log.borrow(),
        [
            "toolkit.lock",
            "surface.lock",
            "info.get",
            "backend.create PixelFormat { alpha_bits: 0, depth_bits: 0, stencil_bits: 0, multisamples: 0 }",
            "info.free",
            "surface.unlock",
            "toolkit.unlock",
        ]
    );
}

#[test]
fn failed_create_releases_the_locks() {
    let script = Script { create_error: Some(ErrorKind::NoMatchingFormat), ..Script::default() };
    let (harness, context) = Harness::context(script);
    let mut context = context.unwrap();

    let err = context.create_gl_context().unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::NoMatchingFormat);
    assert_eq!(context.state(), ContextState::Uninitialized);

    let free = position(&harness.log, "info.free");
    let unlock = position(&harness.log, "surface.unlock");
    assert!(free < unlock);
    assert!(unlock < harness.log.borrow().iter().rposition(|e| e == "toolkit.unlock").unwrap());
}

#[test]
fn lock_error_is_no_surface() {
    let (harness, context) = Harness::context(Script { lock_error: true, ..Script::default() });
    let mut context = context.unwrap();

    let err = context.create_gl_context().unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::NoSurface);
    assert_eq!(count(&harness.log, "surface.unlock"), 0);
    assert!(harness.log.borrow().iter().all(|e| !e.starts_with("backend.create")));
}

#[test]
fn missing_info_unlocks_the_surface() {
    let (harness, context) = Harness::context(Script { no_info: true, ..Script::default() });
    let mut context = context.unwrap();

    let err = context.create_gl_context().unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::NoPlatformInfo);
    assert_eq!(count(&harness.log, "surface.unlock"), 1);
    assert_eq!(count(&harness.log, "info.free"), 0);
}

#[test]
fn retained_info_is_freed_on_destroy() {
    let (harness, mut context) = Harness::created(Script { retains_info: true, ..Script::default() });
    assert_eq!(count(&harness.log, "info.free"), 0);

    context.destroy();
    assert_eq!(
        *harness.log.borrow(),
        ["backend.detach 1", "backend.destroy 1", "info.free", "surface.free"]
    );
}

#[test]
fn destroy_holds_the_toolkit_lock_when_drawing_does() {
    let script = Script { locks_drawing: true, retains_info: true, ..Script::default() };
    let (harness, mut context) = Harness::created(script);

    context.destroy();
    assert_eq!(
        *harness.log.borrow(),
        [
            "toolkit.lock",
            "backend.detach 1",
            "backend.destroy 1",
            "toolkit.unlock",
            "info.free",
            "surface.free",
        ]
    );
}

#[test]
fn drawing_locks_the_toolkit_when_required() {
    let (harness, mut context) = Harness::created(Script { locks_drawing: true, ..Script::default() });

    context.make_current().unwrap();
    context.swap_buffers().unwrap();
    assert_eq!(
        *harness.log.borrow(),
        [
            "toolkit.lock",
            "backend.make_current 1",
            "toolkit.unlock",
            "toolkit.lock",
            "backend.swap false",
            "toolkit.unlock",
        ]
    );
}

#[test]
fn destroy_is_idempotent() {
    let (harness, mut context) = Harness::created(Script::default());

    context.destroy();
    context.destroy();
    drop(context);

    assert_eq!(count(&harness.log, "backend.destroy 1"), 1);
    assert_eq!(count(&harness.log, "surface.free"), 1);
}

#[test]
fn destroy_before_create_frees_the_surface() {
    let (harness, context) = Harness::context(Script::default());
    let mut context = context.unwrap();
    context.destroy();

    assert_eq!(context.state(), ContextState::Destroyed);
    assert_eq!(count(&harness.log, "surface.free"), 1);
    assert!(context.create_gl_context().unwrap_err().invalid_state());
}

#[test]
fn operations_after_destroy_are_invalid() {
    let (_harness, mut context) = Harness::created(Script::default());
    context.destroy();

    let err = context.make_current().unwrap_err();
    assert!(err.invalid_state());
    assert_eq!(err.message(), "the context is destroyed");
    assert!(context.swap_buffers().unwrap_err().invalid_state());
}

#[test]
fn swap_interval_without_extension() {
    let (harness, mut context) = Harness::created(Script::default());

    assert_eq!(context.set_swap_interval(1).unwrap(), 0);
    assert_eq!(context.set_swap_interval(-1).unwrap(), 0);
    assert_eq!(*harness.log.borrow(), ["toolkit.lock", "toolkit.unlock"].repeat(2));
}

#[test]
fn swap_interval_negated_without_tear() {
    let script = Script { swap_control: SwapControl::Ext { tear: false }, ..Script::default() };
    let (harness, mut context) = Harness::created(script);

    assert_eq!(context.set_swap_interval(-1).unwrap(), 1);
    assert_eq!(count(&harness.log, "backend.interval 1"), 1);
}

#[test]
fn swap_interval_adaptive_with_tear() {
    let script = Script { swap_control: SwapControl::Ext { tear: true }, ..Script::default() };
    let (harness, mut context) = Harness::created(script);

    assert_eq!(context.set_swap_interval(-1).unwrap(), -1);
    assert_eq!(count(&harness.log, "backend.interval -1"), 1);
}

#[test]
fn swap_interval_error_is_reported() {
    let script =
        Script { swap_control: SwapControl::Sgi, apply_error: true, ..Script::default() };
    let (harness, mut context) = Harness::created(script);

    let err = context.set_swap_interval(2).unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::PlatformNativeError);
    assert_eq!(count(&harness.log, "toolkit.unlock"), 1);
}

#[test]
fn buffering_reported_by_the_backend() {
    let (_harness, context) = Harness::created(Script { double_buffered: true, ..Script::default() });
    assert!(context.is_double_buffered().unwrap());

    let (harness, mut context) = Harness::created(Script::default());
    assert!(!context.is_double_buffered().unwrap());
    context.swap_buffers().unwrap();
    assert_eq!(*harness.log.borrow(), ["backend.swap false"]);
}

#[test]
fn default_framebuffer_reads_the_front_buffer() {
    let (_harness, context) = Harness::created(Script::default());

    assert_eq!(context.framebuffer(false).unwrap(), 0);
    assert_eq!(context.buffer_mode().unwrap(), GL_FRONT);
}

#[test]
fn offscreen_framebuffers_flip_on_swap() {
    let script = Script { framebuffers: Some((3, 4)), ..Script::default() };
    let (_harness, mut context) = Harness::created(script);

    assert_eq!(context.framebuffer(false).unwrap(), 3);
    assert_eq!(context.framebuffer(true).unwrap(), 4);
    assert_eq!(context.buffer_mode().unwrap(), GL_COLOR_ATTACHMENT0);

    context.swap_buffers().unwrap();
    assert_eq!(context.framebuffer(false).unwrap(), 4);
    assert_eq!(context.framebuffer(true).unwrap(), 3);
}

#[test]
fn platform_accessors_are_unsupported() {
    let (_harness, context) = Harness::created(Script::default());

    assert!(context.share_group().unwrap_err().not_supported());
    assert!(context.display().unwrap_err().not_supported());
    assert!(context.device_context().unwrap_err().not_supported());
}

#[test]
fn full_lifecycle() {
    let script = Script {
        swap_control: SwapControl::Ext { tear: false },
        double_buffered: true,
        ..Script::default()
    };
    let (harness, context) = Harness::context(script);
    let mut context = context.unwrap();

    context.set_pixel_format(8, 24, 8).unwrap();
    context.set_multisamples(0).unwrap();
    context.create_gl_context().unwrap();
    assert_eq!(context.state(), ContextState::Created);

    assert_eq!(context.set_swap_interval(1).unwrap(), 1);
    context.make_current().unwrap();
    context.swap_buffers().unwrap();
    context.detach_current().unwrap();
    context.destroy();

    assert_eq!(context.state(), ContextState::Destroyed);
    assert_eq!(count(&harness.log, "backend.swap true"), 1);
    assert!(position(&harness.log, "backend.destroy 1") < position(&harness.log, "surface.free"));
    assert_eq!(count(&harness.log, "toolkit.lock"), count(&harness.log, "toolkit.unlock"));
    assert_eq!(count(&harness.log, "surface.lock"), count(&harness.log, "surface.unlock"));
}
