//! Source locations and error management.

use std::fmt;

/// A position in the source code. Both `line` and `col` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

/// A fault raised by one of the interpreter stages.
/// Every fault is fatal: the first one detected aborts the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Raised by the lexer and the parser.
    #[error("Syntax error ({loc}): {message}")]
    Syntax { message: String, loc: Location },
    /// Raised by the semantic analyzer.
    #[error("Semantic error{}: {message}", at(.loc))]
    Semantic {
        message: String,
        loc: Option<Location>,
    },
    /// Raised by the virtual machine.
    #[error("Runtime error{}: {message}", at(.loc))]
    Runtime {
        message: String,
        loc: Option<Location>,
    },
}

fn at(loc: &Option<Location>) -> String {
    match loc {
        Some(loc) => format!(" ({})", loc),
        None => String::new(),
    }
}

impl Error {
    /// Create a new syntax error with the specified `message` and `loc`.
    pub fn syntax(message: impl ToString, loc: Location) -> Self {
        Self::Syntax {
            message: message.to_string(),
            loc,
        }
    }

    pub fn semantic(message: impl ToString, loc: Option<Location>) -> Self {
        Self::Semantic {
            message: message.to_string(),
            loc,
        }
    }

    pub fn runtime(message: impl ToString, loc: Option<Location>) -> Self {
        Self::Runtime {
            message: message.to_string(),
            loc,
        }
    }

    /// The human readable message, without kind and location.
    pub fn message(&self) -> &str {
        match self {
            Error::Syntax { message, .. }
            | Error::Semantic { message, .. }
            | Error::Runtime { message, .. } => message,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Syntax { loc, .. } => Some(*loc),
            Error::Semantic { loc, .. } | Error::Runtime { loc, .. } => *loc,
        }
    }

    /// Attaches `loc` if the error does not carry a location yet.
    pub fn or_at(self, loc: Location) -> Self {
        match self {
            Error::Semantic { message, loc: None } => Error::Semantic {
                message,
                loc: Some(loc),
            },
            Error::Runtime { message, loc: None } => Error::Runtime {
                message,
                loc: Some(loc),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Minimum stack space to keep available before recursing.
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, growing the native stack first if less than [`RED_ZONE`] remains.
/// Wrap the recursive entry points of the parser, the analyzer and the VM with it.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
