//! Grammar model and its integer encoding.
//!
//! A [`Grammar`] is the checked, name-based value handed to the generator.
//! [`AugmentedGrammar`] adds the synthetic start production `S' -> S` and
//! numbers every symbol: nonterminals first (the augmented start is 0), then
//! the terminals, with the end marker `$` last. The LR(0) and SLR(1) passes
//! work on this encoding only.

use super::symtab::Symtab;
use indexmap::IndexSet;
use scanpar::{END_MARKER, ProdId, Production};
use smartstring::alias::String;
use std::collections::BTreeSet;
use thiserror::Error;

/// Written in a right-hand side, stands for nothing.
pub const EPSILON: &str = "ε";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("grammar has no productions")]
    NoProductions,

    #[error("undefined symbol {symbol:?} in a production of {lhs:?}")]
    UndefinedSymbol { symbol: String, lhs: String },

    #[error("production head {symbol:?} is not a nonterminal")]
    NotANonterminal { symbol: String },

    #[error("{symbol:?} is reserved")]
    ReservedSymbol { symbol: String },

    #[error("symbol {symbol:?} is declared more than once")]
    DuplicateSymbol { symbol: String },
}

/// A context-free grammar. The start symbol is the head of the first
/// production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    terminals: IndexSet<String>,
    nonterminals: IndexSet<String>,
    productions: Vec<Production>,
    ignore: BTreeSet<String>,
}

fn intern<I, S>(names: I, into: &mut IndexSet<String>) -> Result<(), GrammarError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for name in names {
        let name = name.into();
        if name.as_str() == END_MARKER || name.as_str() == EPSILON {
            return Err(GrammarError::ReservedSymbol { symbol: name });
        }
        if !into.insert(name.clone()) {
            return Err(GrammarError::DuplicateSymbol { symbol: name });
        }
    }
    Ok(())
}

impl Grammar {
    /// Checks and assembles a grammar. `ε` in a right-hand side is dropped.
    pub fn new<T, N, I, S>(
        terminals: T,
        nonterminals: N,
        productions: Vec<Production>,
        ignore: I,
    ) -> Result<Self, GrammarError>
    where
        T: IntoIterator<Item = S>,
        N: IntoIterator<Item = S>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms = IndexSet::new();
        intern(terminals, &mut terms)?;
        let mut nonterms = IndexSet::new();
        intern(nonterminals, &mut nonterms)?;
        if let Some(both) = terms.iter().find(|t| nonterms.contains(*t)) {
            return Err(GrammarError::DuplicateSymbol {
                symbol: both.clone(),
            });
        }
        if productions.is_empty() {
            return Err(GrammarError::NoProductions);
        }

        let mut checked = Vec::with_capacity(productions.len());
        for prod in productions {
            if !nonterms.contains(&prod.lhs) {
                return Err(GrammarError::NotANonterminal { symbol: prod.lhs });
            }
            let rhs: Vec<String> = prod.rhs.into_iter().filter(|s| s.as_str() != EPSILON).collect();
            if let Some(sym) = rhs
                .iter()
                .find(|s| !terms.contains(*s) && !nonterms.contains(*s))
            {
                return Err(GrammarError::UndefinedSymbol {
                    symbol: sym.clone(),
                    lhs: prod.lhs,
                });
            }
            checked.push(Production { lhs: prod.lhs, rhs });
        }

        Ok(Self {
            terminals: terms,
            nonterminals: nonterms,
            productions: checked,
            ignore: ignore.into_iter().map(Into::into).collect(),
        })
    }

    /// Builds a grammar whose nonterminals are the production heads (in
    /// order of first appearance) and whose terminals are all other symbols.
    pub fn from_productions(productions: Vec<Production>) -> Result<Self, GrammarError> {
        let heads: IndexSet<String> = productions.iter().map(|p| p.lhs.clone()).collect();
        let terminals: IndexSet<String> = productions
            .iter()
            .flat_map(|p| p.rhs.iter())
            .filter(|s| !heads.contains(*s) && s.as_str() != EPSILON)
            .cloned()
            .collect();
        Self::new(terminals, heads, productions, Vec::<String>::new())
    }

    pub fn terminals(&self) -> &IndexSet<String> {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &IndexSet<String> {
        &self.nonterminals
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Tokens the parser skips without consulting the table.
    pub fn ignore(&self) -> &BTreeSet<String> {
        &self.ignore
    }

    pub fn start(&self) -> &str {
        &self.productions[0].lhs
    }
}

/// A production over symbol indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedProduction {
    pub lhs: usize,
    pub rhs: Vec<usize>,
}

/// A grammar with `S' -> S` prepended and every symbol numbered.
#[derive(Debug, Clone)]
pub struct AugmentedGrammar {
    symbols: Symtab,
    n_nonterm: usize,
    productions: Vec<EncodedProduction>,
    /// Productions of each nonterminal, in declaration order.
    by_lhs: Vec<Vec<ProdId>>,
    named: Vec<Production>,
    ignore: BTreeSet<String>,
}

impl AugmentedGrammar {
    pub fn new(grammar: &Grammar) -> Self {
        let mut start = String::from(grammar.start());
        while grammar.nonterminals.contains(&start) || grammar.terminals.contains(&start) {
            start.push('\'');
        }

        let mut symbols = Symtab::new();
        symbols.add(&start);
        for nt in &grammar.nonterminals {
            symbols.add(nt);
        }
        let n_nonterm = symbols.len();
        for t in &grammar.terminals {
            symbols.add(t);
        }
        symbols.add(END_MARKER);

        let mut named = Vec::with_capacity(grammar.productions.len() + 1);
        named.push(Production::new(start, [grammar.start()]));
        named.extend(grammar.productions.iter().cloned());

        // every name was checked by Grammar::new
        let index = |name: &str| symbols.idx(name).unwrap_or_default();
        let productions: Vec<EncodedProduction> = named
            .iter()
            .map(|p| EncodedProduction {
                lhs: index(p.lhs.as_str()),
                rhs: p.rhs.iter().map(|s| index(s.as_str())).collect(),
            })
            .collect();

        let mut by_lhs = vec![Vec::new(); n_nonterm];
        for (id, p) in productions.iter().enumerate() {
            by_lhs[p.lhs].push(id);
        }

        log::debug!(
            "augmented grammar: {} nonterminals, {} terminals, {} productions",
            n_nonterm,
            symbols.len() - n_nonterm,
            productions.len()
        );
        Self {
            symbols,
            n_nonterm,
            productions,
            by_lhs,
            named,
            ignore: grammar.ignore.clone(),
        }
    }

    /// Number of nonterminals, the augmented start included.
    pub fn n_nonterm(&self) -> usize {
        self.n_nonterm
    }

    /// Number of terminals, the end marker included.
    pub fn n_term(&self) -> usize {
        self.symbols.len() - self.n_nonterm
    }

    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_nonterminal(&self, sym: usize) -> bool {
        sym < self.n_nonterm
    }

    /// The augmented start symbol `S'`.
    pub fn augmented_start(&self) -> usize {
        0
    }

    /// The original start symbol `S`.
    pub fn start(&self) -> usize {
        self.productions[0].rhs[0]
    }

    pub fn end_marker(&self) -> usize {
        self.symbols.len() - 1
    }

    pub fn productions(&self) -> &[EncodedProduction] {
        &self.productions
    }

    pub fn production(&self, prod: ProdId) -> &EncodedProduction {
        &self.productions[prod]
    }

    pub fn productions_of(&self, nonterminal: usize) -> &[ProdId] {
        &self.by_lhs[nonterminal]
    }

    /// Productions by name, `S' -> S` first.
    pub fn named_productions(&self) -> &[Production] {
        &self.named
    }

    pub fn name(&self, sym: usize) -> &str {
        self.symbols.sym(sym).unwrap_or("?")
    }

    pub fn symbol(&self, name: &str) -> Option<usize> {
        self.symbols.idx(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.as_str())
    }

    pub fn terminal_set(&self) -> IndexSet<String> {
        self.symbols.iter().skip(self.n_nonterm).cloned().collect()
    }

    pub fn nonterminal_set(&self) -> IndexSet<String> {
        self.symbols.iter().take(self.n_nonterm).cloned().collect()
    }

    pub fn ignore(&self) -> &BTreeSet<String> {
        &self.ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum() -> Grammar {
        Grammar::new(
            ["+", "id"],
            ["S"],
            vec![
                Production::new("S", ["S", "+", "S"]),
                Production::new("S", ["id"]),
            ],
            ["ws"],
        )
        .unwrap()
    }

    #[test]
    fn augments_and_numbers_symbols() {
        let g = AugmentedGrammar::new(&sum());
        let names: Vec<&str> = g.names().collect();
        assert_eq!(names, ["S'", "S", "+", "id", "$"]);
        assert_eq!(g.n_nonterm(), 2);
        assert_eq!(g.n_term(), 3);
        assert_eq!(g.start(), 1);
        assert_eq!(g.end_marker(), 4);
        assert_eq!(g.production(0), &EncodedProduction { lhs: 0, rhs: vec![1] });
        assert_eq!(g.production(1).rhs, vec![1, 2, 1]);
        assert_eq!(g.productions_of(1), &[1, 2]);
        assert_eq!(g.named_productions()[0].to_string(), "S' -> S");
        assert!(g.ignore().contains("ws"));
    }

    #[test]
    fn augmented_start_name_is_fresh() {
        let g = Grammar::from_productions(vec![
            Production::new("E", ["E'", "x"]),
            Production::new("E'", ["y"]),
        ])
        .unwrap();
        let aug = AugmentedGrammar::new(&g);
        assert_eq!(aug.name(0), "E''");
    }

    #[test]
    fn infers_symbols_and_drops_epsilon() {
        let g = Grammar::from_productions(vec![
            Production::new("S", ["A", "b"]),
            Production::new("A", ["a"]),
            Production::new("A", [EPSILON]),
        ])
        .unwrap();
        let terms: Vec<&str> = g.terminals().iter().map(|s| s.as_str()).collect();
        let nonterms: Vec<&str> = g.nonterminals().iter().map(|s| s.as_str()).collect();
        assert_eq!(terms, ["b", "a"]);
        assert_eq!(nonterms, ["S", "A"]);
        assert!(g.productions()[2].rhs.is_empty());
        assert_eq!(g.start(), "S");
    }

    #[test]
    fn rejects_bad_grammars() {
        let none: Vec<&str> = Vec::new();
        assert_eq!(
            Grammar::new(["a"], ["S"], vec![], none.clone()),
            Err(GrammarError::NoProductions)
        );
        assert_eq!(
            Grammar::new(["a"], ["S"], vec![Production::new("S", ["b"])], none.clone()),
            Err(GrammarError::UndefinedSymbol {
                symbol: "b".into(),
                lhs: "S".into()
            })
        );
        assert_eq!(
            Grammar::new(["a"], ["S"], vec![Production::new("a", ["a"])], none.clone()),
            Err(GrammarError::NotANonterminal { symbol: "a".into() })
        );
        assert_eq!(
            Grammar::new(["$"], ["S"], vec![Production::new("S", ["$"])], none.clone()),
            Err(GrammarError::ReservedSymbol { symbol: "$".into() })
        );
        assert_eq!(
            Grammar::new(["S"], ["S"], vec![Production::new("S", ["S"])], none.clone()),
            Err(GrammarError::DuplicateSymbol { symbol: "S".into() })
        );
        assert_eq!(
            Grammar::new(["a", "a"], ["S"], vec![Production::new("S", ["a"])], none),
            Err(GrammarError::DuplicateSymbol { symbol: "a".into() })
        );
    }
}
