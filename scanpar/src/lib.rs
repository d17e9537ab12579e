//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Runtime half of the scanpar toolkit: the compiled automaton and parse
//! table values, and the two executors that run them.
//!
//! - [`Dfa`] + [`Scanner`]: maximal-munch scanning with rule priority already
//!   encoded in the automaton. Rule actions live outside the automaton, in an
//!   [`Actions`] implementation such as [`ActionTable`].
//! - [`ParseTable`] + [`Parser`]: SLR(1) shift-reduce parsing of a token
//!   stream, with no error recovery.
//!
//! Both tables are produced by the `scanpar-gen` crate.

mod cursor;
mod dfa;
mod error;
mod parser;
mod scanner;
mod table;

pub use crate::cursor::Cursor;
pub use crate::dfa::{Dfa, DfaState, DfaStateId, RuleId};
pub use crate::error::{DfaError, LexicalError, Location, ParseError, Span, TableError};
pub use crate::parser::{ParseStep, Parser, ParserStats, StackEntry, StackSymbol};
pub use crate::scanner::{
    ActionTable, Actions, Lexeme, ScanEvent, Scanner, ScannerStats, Tokenized, tokenize,
};
pub use crate::table::{Action, END_MARKER, ParseTable, ProdId, Production, StateId};
