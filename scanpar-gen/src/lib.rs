//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Lexer and parser table generators.
//!
//! `scanpar-gen` builds the tables that the `scanpar` runtime executes:
//!  * [`lexgen`]: regular expressions to a minimal DFA, built directly from
//!    the syntax tree with followpos (no NFA in between)
//!  * [`pargen`]: context-free grammars to SLR(1) action/goto tables over the
//!    LR(0) canonical collection
//!
//! Both generators can read their input from description files
//! ([`lexgen::parse_rules`], [`pargen::parse_grammar`]) and are wrapped by the
//! `yalex` and `yapar` binaries when built with the `cli` feature.

pub mod error;
pub mod lexgen;
pub mod pargen;

pub use error::SpecError;
