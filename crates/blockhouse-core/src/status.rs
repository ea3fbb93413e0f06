//! Operation Status
//!
//! `Status` is the result value for every table operation. It carries:
//!
//! - a **code** (`Ok`, `Corruption`, `IoError`, ...) - the part callers
//!   branch on
//! - an optional **subcode** refining the code (`NoSpace`, `MemoryLimit`, ...)
//! - an optional **message** - short, stable strings that are part of the
//!   observable contract (e.g. `"block checksum mismatch"`)
//! - the **async bit** - set when the status was produced after an
//!   asynchronous I/O completion rather than on the caller's own stack
//!
//! ## Equality
//! `Status` equality compares **codes only**. Callers write
//! `status == Status::not_found()` and expect it to match regardless of
//! subcode or message; preserving that contract is why `PartialEq` is
//! implemented by hand.
//!
//! ## Thread Safety
//! A `Status` is a plain value: share it immutably across tasks freely,
//! synchronize externally if one task mutates it. `Default` is `Ok`, so
//! `std::mem::take` transfers a status and leaves `Ok` behind.

use std::fmt;

/// Primary status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Code {
    #[default]
    Ok = 0,
    NotFound = 1,
    Corruption = 2,
    NotSupported = 3,
    InvalidArgument = 4,
    IoError = 5,
    MergeInProgress = 6,
    Incomplete = 7,
    ShutdownInProgress = 8,
    TimedOut = 9,
    Aborted = 10,
    Busy = 11,
    Expired = 12,
    TryAgain = 13,
    /// Internal pipeline signal: an asynchronous continuation has been
    /// scheduled. Never returned to a caller as a final result.
    IoPending = 14,
}

/// Secondary code refining the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SubCode {
    #[default]
    None = 0,
    MutexTimeout = 1,
    LockTimeout = 2,
    LockLimit = 3,
    NoSpace = 4,
    Deadlock = 5,
    StaleFile = 6,
    MemoryLimit = 7,
}

/// The result of a table operation. See the module docs.
#[derive(Debug, Clone, Default)]
pub struct Status {
    code: Code,
    subcode: SubCode,
    state: Option<Box<str>>,
    async_completion: bool,
}

impl Status {
    fn with_code(code: Code) -> Self {
        Status {
            code,
            ..Default::default()
        }
    }

    fn with_msg(code: Code, msg: impl Into<String>) -> Self {
        Status {
            code,
            subcode: SubCode::None,
            state: Some(msg.into().into_boxed_str()),
            async_completion: false,
        }
    }

    /// A success status.
    pub fn ok() -> Self {
        Status::default()
    }

    pub fn not_found() -> Self {
        Status::with_code(Code::NotFound)
    }

    pub fn not_found_msg(msg: impl Into<String>) -> Self {
        Status::with_msg(Code::NotFound, msg)
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Status::with_msg(Code::Corruption, msg)
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Status::with_msg(Code::NotSupported, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Status::with_msg(Code::InvalidArgument, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Status::with_msg(Code::IoError, msg)
    }

    /// Out of space: an `IoError` with the `NoSpace` subcode. The subcode is
    /// only constructible through this helper, which keeps the
    /// `NoSpace ⇒ IoError` invariant.
    pub fn no_space(msg: impl Into<String>) -> Self {
        let mut s = Status::with_msg(Code::IoError, msg);
        s.subcode = SubCode::NoSpace;
        s
    }

    pub fn merge_in_progress() -> Self {
        Status::with_code(Code::MergeInProgress)
    }

    pub fn incomplete() -> Self {
        Status::with_code(Code::Incomplete)
    }

    pub fn shutdown_in_progress() -> Self {
        Status::with_code(Code::ShutdownInProgress)
    }

    pub fn timed_out() -> Self {
        Status::with_code(Code::TimedOut)
    }

    pub fn aborted() -> Self {
        Status::with_code(Code::Aborted)
    }

    /// Memory budget exhausted: an `Aborted` with the `MemoryLimit` subcode.
    pub fn memory_limit(msg: impl Into<String>) -> Self {
        let mut s = Status::with_msg(Code::Aborted, msg);
        s.subcode = SubCode::MemoryLimit;
        s
    }

    pub fn busy() -> Self {
        Status::with_code(Code::Busy)
    }

    pub fn expired() -> Self {
        Status::with_code(Code::Expired)
    }

    pub fn try_again() -> Self {
        Status::with_code(Code::TryAgain)
    }

    pub fn io_pending() -> Self {
        Status::with_code(Code::IoPending)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn subcode(&self) -> SubCode {
        self.subcode
    }

    /// The message attached at construction, if any.
    pub fn message(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Whether this status was delivered via an asynchronous completion.
    pub fn async_completion(&self) -> bool {
        self.async_completion
    }

    /// Mark (or clear) the async-completion bit. The read pipeline sets this
    /// on every terminal status produced after resuming from an I/O wait.
    pub fn set_async(&mut self, value: bool) {
        self.async_completion = value;
    }

    /// Consuming form of [`Status::set_async`].
    pub fn into_async(mut self) -> Self {
        self.async_completion = true;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Code::NotFound
    }

    pub fn is_corruption(&self) -> bool {
        self.code == Code::Corruption
    }

    pub fn is_io_error(&self) -> bool {
        self.code == Code::IoError
    }

    pub fn is_io_pending(&self) -> bool {
        self.code == Code::IoPending
    }

    pub fn is_shutdown_in_progress(&self) -> bool {
        self.code == Code::ShutdownInProgress
    }

    fn code_str(&self) -> &'static str {
        match self.code {
            Code::Ok => "OK",
            Code::NotFound => "NotFound",
            Code::Corruption => "Corruption",
            Code::NotSupported => "Not implemented",
            Code::InvalidArgument => "Invalid argument",
            Code::IoError => "IO error",
            Code::MergeInProgress => "Merge in progress",
            Code::Incomplete => "Result incomplete",
            Code::ShutdownInProgress => "Shutdown in progress",
            Code::TimedOut => "Operation timed out",
            Code::Aborted => "Operation aborted",
            Code::Busy => "Resource busy",
            Code::Expired => "Operation expired",
            Code::TryAgain => "Operation failed. Try again.",
            Code::IoPending => "IO pending",
        }
    }
}

/// Codes only; subcode, message, and the async bit do not participate.
impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Status {}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "{}: {}", self.code_str(), msg),
            None => write!(f, "{}", self.code_str()),
        }
    }
}

impl std::error::Error for Status {}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        Status::io_error(err.to_string())
    }
}

/// Result alias used throughout BlockHouse.
pub type Result<T> = std::result::Result<T, Status>;
