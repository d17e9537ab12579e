//! Text dumps of the generator's intermediate results.
//!
//! The format is line-oriented and comma-separated, one record per line,
//! with a count line before each section:
//!
//! ```text
//! PS,<number of productions>
//! P,<index>,<LHS> -> <RHS symbols>
//! CS,<number of states>
//! C,<state>,<LHS> -> <symbols with a dot>
//! FIRST,<symbol>,{<terminals>, }
//! FOLLOW,<symbol>,{<terminals>, }
//! TS,<states>,<terminals>,<nonterminals>
//! T,<state>,<symbol>,<action>
//! ```

use super::grammar::AugmentedGrammar;
use super::lr0::CanonicalCollection;
use super::slr::SlrAnalysis;
use scanpar::ParseTable;
use std::collections::BTreeSet;
use std::io::{self, Write};

/// Writes the productions, augmented production first.
pub fn write_prods<W: Write + ?Sized>(out: &mut W, grammar: &AugmentedGrammar) -> io::Result<()> {
    let prods = grammar.named_productions();
    writeln!(out, "PS,{}\n", prods.len())?;
    for (i, prod) in prods.iter().enumerate() {
        writeln!(out, "P,{i},{prod}")?;
    }
    Ok(())
}

/// Writes every state of the canonical collection. Kernel items are marked
/// with `*`.
pub fn write_set<W: Write + ?Sized>(
    out: &mut W,
    c: &CanonicalCollection,
    grammar: &AugmentedGrammar,
) -> io::Result<()> {
    writeln!(out, "CS,{}\n", c.len())?;
    for (i, state) in c.states().enumerate() {
        for item in state {
            let p = grammar.production(item.prod);
            write!(
                out,
                "C,{i},{}{} ->",
                if item.is_kernel() { "*" } else { "" },
                grammar.name(p.lhs)
            )?;
            for (j, &sym) in p.rhs.iter().enumerate() {
                if j == item.dot {
                    write!(out, " .")?;
                }
                write!(out, " {}", grammar.name(sym))?;
            }
            if item.dot == p.rhs.len() {
                write!(out, " .")?;
            }
            writeln!(out)?;
        }
        for (&sym, &target) in c.transitions(i) {
            writeln!(out, "G,{i},{},{target}", grammar.name(sym))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Writes FIRST sets (when `nullable` is given, with `` `empty' `` for
/// nullable symbols) or FOLLOW sets.
pub fn write_fstflw<W: Write + ?Sized>(
    out: &mut W,
    vs: &[BTreeSet<usize>],
    nullable: Option<&[bool]>,
    grammar: &AugmentedGrammar,
) -> io::Result<()> {
    let label = if nullable.is_some() { "FIRST" } else { "FOLLOW" };
    for (sym, set) in vs.iter().enumerate() {
        write!(out, "{label},{},{{", grammar.name(sym))?;
        if nullable.is_some_and(|n| n[sym]) {
            write!(out, "`empty', ")?;
        }
        for &t in set {
            write!(out, "{}, ", grammar.name(t))?;
        }
        writeln!(out, "}}")?;
    }
    Ok(())
}

/// Writes the non-empty action and goto cells.
pub fn write_table<W: Write + ?Sized>(out: &mut W, table: &ParseTable) -> io::Result<()> {
    writeln!(
        out,
        "TS,{},{},{}\n",
        table.n_states(),
        table.terminals().len(),
        table.nonterminals().len()
    )?;
    for state in 0..table.n_states() {
        for (t, name) in table.terminals().iter().enumerate() {
            if let Some(action) = table.action_at(state, t) {
                writeln!(out, "T,{state},{name},{action}")?;
            }
        }
        for (n, name) in table.nonterminals().iter().enumerate() {
            if let Some(target) = table.goto_at(state, n) {
                writeln!(out, "T,{state},{name},g{target}")?;
            }
        }
    }
    Ok(())
}

/// Writes every section for an analysed grammar, and the table if it was
/// built.
pub fn write_all<W: Write + ?Sized>(
    out: &mut W,
    analysis: &SlrAnalysis,
    table: Option<&ParseTable>,
) -> io::Result<()> {
    let g = analysis.grammar();
    write_prods(out, g)?;
    writeln!(out)?;
    write_set(out, analysis.collection(), g)?;
    write_fstflw(out, analysis.first(), Some(analysis.nullable()), g)?;
    writeln!(out)?;
    write_fstflw(out, analysis.follow(), None, g)?;
    if let Some(table) = table {
        writeln!(out)?;
        write_table(out, table)?;
    }
    Ok(())
}
