//! SLR(1) parser generator.
//!
//! A [`Grammar`] is augmented with `S' -> S`, its LR(0) canonical collection
//! is built, FIRST and FOLLOW sets are computed, and [`SlrAnalysis::table`]
//! derives the action/goto [`ParseTable`] executed by
//! [`scanpar::Parser`]. A grammar that needs two actions in one cell is
//! rejected with the offending state and symbol.
//!
//! Grammars are usually read from a yapar-style file with
//! [`parse_grammar`] or [`read_grammar`]:
//!
//! ```text
//! %token ID PLUS
//! %token WS
//! IGNORE WS
//! %%
//! expr:
//!     expr PLUS term
//!   | term
//! ;
//! term: ID ;
//! ```

pub mod dump;
mod grammar;
mod lexer;
mod lr0;
mod parser;
mod slr;
mod symtab;

pub use grammar::{AugmentedGrammar, EPSILON, EncodedProduction, Grammar, GrammarError};
pub use lr0::{CanonicalCollection, Item, ItemSet, closure, goto};
pub use slr::{
    Conflict, ConflictKind, SlrAnalysis, SlrError, build_slr_table, first_of_sequence,
    first_sets, follow_sets,
};
pub use symtab::Symtab;

use crate::error::SpecError;
use anyhow::{Context, Result};
use chumsky::Parser as _;
use indexmap::IndexSet;
use lexer::{LexContext, Lexer};
use parser::Decl;
use scanpar::{ParseTable, Production};
use smartstring::alias::String;
use std::io::Write;
use std::path::Path;

/// Reads a grammar from yapar-style source text.
///
/// Declared tokens named by `IGNORE` go to the ignore-set and are not
/// terminals. Nonterminals are the production heads in order of first
/// appearance; the first head is the start symbol.
pub fn parse_grammar(src: &str) -> Result<Grammar, SpecError> {
    let mut ctx = LexContext::default();
    let tokens = Lexer::tokenize_all(src, &mut ctx)?;
    let file = parser::parser()
        .parse(tokens.as_slice())
        .into_result()
        .map_err(|errs| {
            let msg = errs
                .first()
                .map(|e| {
                    let found = e.found().map_or("end of input".to_string(), |t| match t {
                        lexer::Token::Ident(i) => format!("{:?}", ctx.name(*i)),
                        other => format!("{other:?}"),
                    });
                    format!("line {}: unexpected {found}", ctx.line(e.span().start))
                })
                .unwrap_or_else(|| "unparsable grammar".to_string());
            SpecError::MalformedGrammar(msg)
        })?;

    let mut declared: IndexSet<String> = IndexSet::new();
    let mut ignore: IndexSet<String> = IndexSet::new();
    for decl in &file.decls {
        match decl {
            Decl::Tokens(names) => declared.extend(names.iter().map(|&i| ctx.name(i).into())),
            Decl::Ignore(names) => ignore.extend(names.iter().map(|&i| ctx.name(i).into())),
        }
    }
    for name in &ignore {
        if !declared.contains(name) {
            log::warn!("IGNORE {name}: not declared with %token");
        }
    }
    let terminals: Vec<String> = declared
        .into_iter()
        .filter(|t| !ignore.contains(t))
        .collect();

    let mut heads: IndexSet<String> = IndexSet::new();
    let mut productions = Vec::new();
    for rule in &file.rules {
        let lhs = ctx.name(rule.lhs);
        heads.insert(lhs.into());
        for alt in &rule.alternatives {
            productions.push(Production::new(lhs, alt.iter().map(|&s| ctx.name(s))));
        }
    }

    let grammar = Grammar::new(terminals, heads, productions, ignore)?;
    log::debug!(
        "grammar: {} terminals, {} nonterminals, {} productions, {} ignored",
        grammar.terminals().len(),
        grammar.nonterminals().len(),
        grammar.productions().len(),
        grammar.ignore().len()
    );
    Ok(grammar)
}

/// Reads a grammar file.
pub fn read_grammar<P: AsRef<Path>>(path: P) -> Result<Grammar> {
    let path = path.as_ref();
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read grammar file {}", path.display()))?;
    parse_grammar(&src).with_context(|| format!("in {}", path.display()))
}

/// Reads a grammar file and builds its SLR(1) table. When `dump` is given,
/// the productions, canonical collection, FIRST/FOLLOW sets and (if built)
/// the table are written to it, even if the grammar has a conflict.
pub fn generate<P: AsRef<Path>>(grammar_path: P, dump: Option<&mut dyn Write>) -> Result<ParseTable> {
    let path = grammar_path.as_ref();
    let grammar = read_grammar(path)?;
    let analysis = SlrAnalysis::new(&grammar);
    let table = analysis.table();
    if let Some(out) = dump {
        dump::write_all(out, &analysis, table.as_ref().ok()).context("cannot write dump")?;
    }
    let table = table.with_context(|| format!("building the SLR(1) table of {}", path.display()))?;
    log::info!(
        "{}: {} states, {} productions",
        path.display(),
        table.n_states(),
        table.productions().len()
    );
    Ok(table)
}
