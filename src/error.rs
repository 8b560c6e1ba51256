//! Uniform error model for the DANA runtime.
//!
//! Mirrors the caret-pointing rendering of `why-lang`'s `parser::ParseError`
//! (see the teacher's `src/parser/mod.rs`) but generalizes it into the single
//! `DanaException` shape spec.md §7 requires: a `kind`/`type_name` pair that
//! user `try`/`except` can filter on, a `Location`, and an accumulated
//! `traceback`.

use std::fmt::{self, Display};
use std::sync::Arc;

/// Source position plus a rendered excerpt, attached to every AST node at
/// parse time and never fabricated downstream (spec.md §4.2, §9).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub excerpt: String,
}

impl Location {
    pub fn new(line: usize, column: usize, excerpt: impl Into<String>) -> Self {
        Self { line, column, excerpt: excerpt.into() }
    }

    /// A location with no useful source text, for synthesized/native errors.
    pub fn unknown() -> Self {
        Self { line: 0, column: 0, excerpt: String::new() }
    }

    fn caret(&self) -> String {
        if self.column == 0 {
            return String::new();
        }
        let mut s = String::with_capacity(self.column);
        for _ in 1..self.column {
            s.push(' ');
        }
        s.push('^');
        s
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  at line {}, col {}: {}\n  {}",
            self.line,
            self.column,
            self.excerpt,
            self.caret()
        )
    }
}

/// The error taxonomy from spec.md §6/§7. Every non-fatal kind is catchable
/// by a DANA `try`/`except`; `Fatal` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Type,
    Coercion,
    State,
    Resource,
    Timeout,
    Cancelled,
    Dana,
    Fatal,
}

impl ErrorKind {
    /// The `Kind` token used in the wire format `Kind: message\n  at ...`.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Coercion => "CoercionError",
            ErrorKind::State => "StateError",
            ErrorKind::Resource => "ResourceError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Cancelled => "CancelledError",
            ErrorKind::Dana => "DanaError",
            ErrorKind::Fatal => "FatalError",
        }
    }
}

/// A catchable runtime exception. Cloneable and `Send + Sync` so a resolved
/// `EagerPromise` can re-raise the same exception value to every observer.
#[derive(Debug, Clone)]
pub struct DanaException {
    pub kind: ErrorKind,
    /// The canonical user-facing type name, e.g. `ZeroDivisionError`. Usually
    /// equal to `kind.label()` but may be more specific (spec.md §8 scenario 6).
    pub type_name: Arc<str>,
    pub message: String,
    pub location: Location,
    /// Innermost-first list of locations accumulated as the exception
    /// propagates up through nested calls (spec.md §7).
    pub traceback: Vec<Location>,
}

impl DanaException {
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: Location) -> Self {
        let type_name: Arc<str> = Arc::from(kind.label());
        Self { kind, type_name, message: message.into(), location: location.clone(), traceback: vec![location] }
    }

    pub fn with_type_name(mut self, type_name: impl Into<Arc<str>>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Record a frame on the way up the call stack, per spec.md §7's
    /// "Location is attached at the innermost AST node ... and propagated up
    /// the stack for the traceback list."
    pub fn push_frame(mut self, location: Location) -> Self {
        self.traceback.push(location);
        self
    }

    pub fn syntax(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Syntax, message, location)
    }

    pub fn name(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Name, message, location)
    }

    pub fn type_error(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Type, message, location)
    }

    pub fn coercion(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Coercion, message, location)
    }

    pub fn state(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::State, message, location)
    }

    pub fn resource(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Resource, message, location)
    }

    pub fn timeout(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Timeout, message, location)
    }

    pub fn cancelled(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Cancelled, message, location)
    }
}

impl Display for DanaException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n{}", self.type_name, self.message, self.location)
    }
}

impl std::error::Error for DanaException {}

/// Infrastructural failure: a broken parser or registry invariant. Aborts
/// the program with a non-catchable status (spec.md §4.4, §7).
#[derive(Debug, Clone)]
pub struct FatalError {
    pub message: String,
}

impl FatalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", ErrorKind::Fatal.label(), self.message)
    }
}

impl std::error::Error for FatalError {}

/// Outcome of any interpreter operation that can raise a catchable exception
/// or abort the process. Mirrors spec.md §4.4's "raised as typed exceptions
/// catchable by user try/except" vs "abort the program with a non-catchable
/// fatal status" split.
#[derive(Debug, Clone)]
pub enum DanaError {
    Exception(DanaException),
    Fatal(FatalError),
}

impl From<DanaException> for DanaError {
    fn from(e: DanaException) -> Self {
        DanaError::Exception(e)
    }
}

impl From<FatalError> for DanaError {
    fn from(e: FatalError) -> Self {
        DanaError::Fatal(e)
    }
}

impl Display for DanaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanaError::Exception(e) => Display::fmt(e, f),
            DanaError::Fatal(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for DanaError {}

pub type DanaResult<T> = Result<T, DanaError>;
