//! `Location`, `ParseError` and the `err!` macro, matching
//! `cranelift-reader`'s error module.

use std::fmt;

/// The location of a token or error: a 1-based line number. Line 0 is
/// reserved for command-line arguments, as in `cranelift-reader`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line_number: usize,
}

impl Location {
    pub fn new(line_number: usize) -> Self {
        Self { line_number }
    }
}

/// A parse error: a location plus a human-readable message.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.line_number == 0 {
            write!(f, "command-line arguments: {}", self.message)
        } else {
            write!(f, "{}: {}", self.location.line_number, self.message)
        }
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Build an `Err(ParseError)` at `$loc` from a `format!`-style message.
macro_rules! err {
    ( $loc:expr, $msg:expr ) => {
        Err($crate::error::ParseError {
            location: $loc,
            message: $msg.to_string(),
        })
    };

    ( $loc:expr, $fmt:expr, $( $arg:expr ),+ ) => {
        Err($crate::error::ParseError {
            location: $loc,
            message: format!( $fmt, $( $arg ),+ ),
        })
    };
}

pub(crate) use err;
