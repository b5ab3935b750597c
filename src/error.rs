//! Error handling.

use std::borrow::Cow;
use std::fmt;

/// A specialized [`Result`] type for context operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all the context operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The simplified error kind to handle matching.
    kind: ErrorKind,

    /// Short human readable cause.
    message: Cow<'static, str>,

    /// The native error captured while the failing operation ran.
    native: Option<NativeError>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self { kind, message: message.into(), native: None }
    }

    /// Attach the native error captured during the failing call.
    ///
    /// An error that already carries a native error keeps the first one.
    pub(crate) fn with_native(mut self, native: Option<NativeError>) -> Self {
        if self.native.is_none() {
            self.native = native;
        }
        self
    }

    /// Helper to check that error is [`ErrorKind::InvalidState`].
    #[inline]
    pub fn invalid_state(&self) -> bool {
        self.kind == ErrorKind::InvalidState
    }

    /// Helper to check that error is [`ErrorKind::Unsupported`].
    #[inline]
    pub fn not_supported(&self) -> bool {
        matches!(self.kind, ErrorKind::Unsupported(_))
    }

    /// The underlying error kind.
    #[inline]
    pub fn error_kind(&self) -> ErrorKind {
        self.kind
    }

    /// The short cause, without the native error.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The native error, if one was captured.
    #[inline]
    pub fn native_error(&self) -> Option<NativeError> {
        self.native
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(native) = self.native {
            write!(f, " ({native})")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

/// Build an error with just a kind.
impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind, message: Cow::Borrowed(kind.as_str()), native: None }
    }
}

/// A list specifying general categories of context errors.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operation was called in a state that doesn't allow it.
    InvalidState,

    /// The toolkit could not hand out or lock a drawing surface.
    NoSurface,

    /// The drawing surface info or its platform payload is unusable.
    NoPlatformInfo,

    /// No native framebuffer configuration matched the requested format.
    NoMatchingFormat,

    /// The native context object could not be created.
    ContextCreationFailed,

    /// Binding or unbinding the context failed.
    MakeCurrentFailed,

    /// Presenting the frame failed.
    SwapFailed,

    /// The operation is not supported by the platform.
    Unsupported(&'static str),

    /// A native call failed outside of the other categories.
    PlatformNativeError,

    /// A configuration value is out of range.
    BadParameter,
}

impl ErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        use ErrorKind::*;
        match *self {
            InvalidState => "the context is in a bad state for this operation",
            NoSurface => "no drawing surface",
            NoPlatformInfo => "no platform drawing surface info",
            NoMatchingFormat => "no matching pixel format",
            ContextCreationFailed => "context creation failed",
            MakeCurrentFailed => "unable to make current",
            SwapFailed => "unable to swap buffers",
            Unsupported(reason) => reason,
            PlatformNativeError => "native platform error",
            BadParameter => "one or more argument values are invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw error reported by the native windowing layer.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum NativeError {
    /// An X protocol error.
    X11 {
        /// The minor opcode of the failed request.
        minor_code: u8,
        /// The major opcode of the failed request.
        request_code: u8,
        /// The X error code.
        error_code: u8,
    },

    /// An OS last-error code.
    Os(i64),

    /// A `CGLError` code.
    Cgl(i32),
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NativeError::X11 { minor_code, request_code, error_code } => {
                write!(f, "glx: {minor_code}.{request_code}: {error_code}")
            },
            NativeError::Os(code) => write!(f, "{code}"),
            NativeError::Cgl(code) => write!(f, "cgl: {code}"),
        }
    }
}
