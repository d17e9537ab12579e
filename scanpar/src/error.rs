//! Source-location and error types shared by the scanner and the parser.
//!
//! Scanning errors are *values*: the scanner reports a [`LexicalError`],
//! skips one character and keeps going. Parsing errors are fatal to the
//! parse that raised them and are returned as [`ParseError`].
//!
//! # Examples
//!
//! ```rust
//! # use scanpar::{Location, Span};
//! let start = Location::new(3, 5);
//! let end = Location::new(3, 10);
//! let sp = Span::new(start, end);
//! assert!(!sp.is_empty());
//! assert_eq!(sp.line_range(), (3, 3));
//! ```

use crate::dfa::DfaStateId;
use crate::table::StateId;
use std::fmt;
use thiserror::Error;

/// A 1-based line/column location in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number (character position in the line).
    pub column: usize,
}

impl Location {
    /// Creates a new `Location`.
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open source range: `[start, end)`.
///
/// Invariants are not enforced here, but it is conventional for `start <= end`
/// in lexicographic `(line, column)` ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Starting location (inclusive).
    pub start: Location,
    /// Ending location (exclusive).
    pub end: Location,
}

impl Span {
    /// Creates a new `Span`.
    #[inline]
    pub const fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the span is empty (same start and end location).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the inclusive line range spanned by this `Span`.
    #[inline]
    pub fn line_range(&self) -> (usize, usize) {
        (self.start.line, self.end.line)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// A character the scanner could not start any token with.
///
/// The scanner skips exactly this character and resumes, so several
/// `LexicalError`s may be reported for one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("lexical error: unexpected {ch:?} at {location} (offset {offset})")]
pub struct LexicalError {
    /// Byte offset of the offending character.
    pub offset: usize,
    /// Line/column of the offending character.
    pub location: Location,
    /// The offending character.
    pub ch: char,
}

/// Errors that abort a table-driven parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The action table has no entry for the current state and token.
    #[error("syntax error: no action in state {state} for token {symbol:?} (token #{index})")]
    UnexpectedToken {
        /// Parser state on top of the stack.
        state: StateId,
        /// The offending token.
        symbol: String,
        /// Index of the token in the input stream.
        index: usize,
    },

    /// A reduction exposed a state with no goto entry for the reduced nonterminal.
    #[error("no goto entry in state {state} for nonterminal {nonterminal:?}")]
    MissingGoto {
        /// Exposed state.
        state: StateId,
        /// The nonterminal just reduced to.
        nonterminal: String,
    },

    /// A reduction tried to pop more entries than the stack holds.
    #[error("parser stack underflow")]
    StackUnderflow,

    /// The token stream ended without reaching `Accept`.
    #[error("unexpected end of token stream")]
    UnexpectedEnd,
}

/// A [`Dfa`](crate::Dfa) whose state references do not fit its state list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DfaError {
    #[error("start state {start} out of range ({len} states)")]
    StartOutOfRange { start: DfaStateId, len: usize },

    #[error("transition {state} --{ch:?}--> {target} out of range")]
    DanglingTransition {
        state: DfaStateId,
        ch: char,
        target: DfaStateId,
    },
}

/// Parts that do not assemble into a consistent [`ParseTable`](crate::ParseTable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// `$` is missing or is not the last terminal.
    #[error("end marker must be the last terminal")]
    EndMarkerNotLast,

    #[error("action table has {action} states, goto table has {goto}")]
    StateCountMismatch { action: usize, goto: usize },

    /// A row of either table is not as wide as its symbol list.
    #[error("state {state}: row width does not match the symbol count")]
    RowWidth { state: StateId },

    #[error("production head {lhs:?} is not a nonterminal")]
    UnknownHead { lhs: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_helpers() {
        let sp = Span::new(Location::new(1, 1), Location::new(2, 4));
        assert!(!sp.is_empty());
        assert_eq!(sp.line_range(), (1, 2));
        assert_eq!(sp.to_string(), "1:1 to 2:4");
        assert!(Span::default().is_empty());
    }

    #[test]
    fn lexical_error_mentions_location() {
        let err = LexicalError {
            offset: 7,
            location: Location::new(2, 3),
            ch: '@',
        };
        let msg = err.to_string();
        assert!(msg.contains("'@'"));
        assert!(msg.contains("2:3"));
    }

    #[test]
    fn parse_error_names_state_and_symbol() {
        let err = ParseError::UnexpectedToken {
            state: 4,
            symbol: "+".into(),
            index: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("state 4"));
        assert!(msg.contains("\"+\""));
    }
}
