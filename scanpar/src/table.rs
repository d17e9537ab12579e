//! The SLR(1) parse table consumed by the [`Parser`](crate::Parser).
//!
//! A [`ParseTable`] is built once by the generator and is immutable
//! thereafter. Terminals and nonterminals are interned in insertion order;
//! the end-of-input marker [`END_MARKER`] is always the last terminal and the
//! augmented start symbol is always nonterminal 0, its single production
//! being production 0.

use crate::error::TableError;
use indexmap::IndexSet;
use smartstring::alias::String;
use std::collections::BTreeSet;
use std::fmt;

/// Index of an LR(0) state / parser state.
pub type StateId = usize;

/// Index of a production in [`ParseTable::productions`].
pub type ProdId = usize;

/// The end-of-input terminal.
pub const END_MARKER: &str = "$";

/// One cell of the action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(StateId),
    Reduce(ProdId),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shift(s) => write!(f, "s{s}"),
            Action::Reduce(p) => write!(f, "r{p}"),
            Action::Accept => write!(f, "acc"),
        }
    }
}

/// A grammar production `lhs -> rhs`. An empty `rhs` is an ε-production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    pub lhs: String,
    pub rhs: Vec<String>,
}

impl Production {
    pub fn new<L, R, S>(lhs: L, rhs: R) -> Self
    where
        L: Into<String>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        if self.rhs.is_empty() {
            write!(f, " ε")?;
        }
        for sym in &self.rhs {
            write!(f, " {sym}")?;
        }
        Ok(())
    }
}

/// Action and goto tables of an SLR(1) parser.
#[derive(Debug, Clone)]
pub struct ParseTable {
    terminals: IndexSet<String>,
    nonterminals: IndexSet<String>,
    productions: Vec<Production>,
    /// Nonterminal index of each production's left-hand side.
    prod_lhs: Vec<usize>,
    /// `action[state][terminal]`
    action: Vec<Vec<Option<Action>>>,
    /// `goto[state][nonterminal]`
    goto: Vec<Vec<Option<StateId>>>,
    ignore: BTreeSet<String>,
}

impl ParseTable {
    /// Assembles a table from already-computed parts.
    ///
    /// Fails if `$` is not the last terminal, if the row widths do not match
    /// the symbol counts, or if a production's left-hand side is not a
    /// nonterminal.
    pub fn from_parts(
        terminals: IndexSet<String>,
        nonterminals: IndexSet<String>,
        productions: Vec<Production>,
        action: Vec<Vec<Option<Action>>>,
        goto: Vec<Vec<Option<StateId>>>,
        ignore: BTreeSet<String>,
    ) -> Result<Self, TableError> {
        if terminals.last().map(|s| s.as_str()) != Some(END_MARKER) {
            return Err(TableError::EndMarkerNotLast);
        }
        if action.len() != goto.len() {
            return Err(TableError::StateCountMismatch {
                action: action.len(),
                goto: goto.len(),
            });
        }
        let bad_row = action.iter().zip(&goto).position(|(a, g)| {
            a.len() != terminals.len() || g.len() != nonterminals.len()
        });
        if let Some(state) = bad_row {
            return Err(TableError::RowWidth { state });
        }
        let prod_lhs: Vec<usize> = productions
            .iter()
            .map(|p| {
                nonterminals
                    .get_index_of(&p.lhs)
                    .ok_or_else(|| TableError::UnknownHead {
                        lhs: p.lhs.to_string(),
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            terminals,
            nonterminals,
            productions,
            prod_lhs,
            action,
            goto,
            ignore,
        })
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.action.len()
    }

    #[inline]
    pub fn terminals(&self) -> &IndexSet<String> {
        &self.terminals
    }

    #[inline]
    pub fn nonterminals(&self) -> &IndexSet<String> {
        &self.nonterminals
    }

    #[inline]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    #[inline]
    pub fn production(&self, prod: ProdId) -> &Production {
        &self.productions[prod]
    }

    /// Nonterminal index of the left-hand side of `prod`.
    #[inline]
    pub fn production_lhs(&self, prod: ProdId) -> usize {
        self.prod_lhs[prod]
    }

    #[inline]
    pub fn terminal_index(&self, name: &str) -> Option<usize> {
        self.terminals.get_index_of(name)
    }

    #[inline]
    pub fn nonterminal_index(&self, name: &str) -> Option<usize> {
        self.nonterminals.get_index_of(name)
    }

    #[inline]
    pub fn end_marker_index(&self) -> usize {
        self.terminals.len() - 1
    }

    /// Action for terminal index `terminal` in `state`.
    #[inline]
    pub fn action_at(&self, state: StateId, terminal: usize) -> Option<Action> {
        self.action[state][terminal]
    }

    /// Action for the terminal named `symbol` in `state`; `None` for an empty
    /// cell or an unknown terminal.
    pub fn action(&self, state: StateId, symbol: &str) -> Option<Action> {
        self.terminal_index(symbol)
            .and_then(|t| self.action_at(state, t))
    }

    #[inline]
    pub fn goto_at(&self, state: StateId, nonterminal: usize) -> Option<StateId> {
        self.goto[state][nonterminal]
    }

    pub fn goto(&self, state: StateId, symbol: &str) -> Option<StateId> {
        self.nonterminal_index(symbol)
            .and_then(|n| self.goto_at(state, n))
    }

    #[inline]
    pub fn is_ignored(&self, symbol: &str) -> bool {
        self.ignore.contains(symbol)
    }

    #[inline]
    pub fn ignore(&self) -> &BTreeSet<String> {
        &self.ignore
    }

    /// Number of non-empty action cells.
    pub fn action_count(&self) -> usize {
        self.action.iter().flatten().filter(|c| c.is_some()).count()
    }
}
