// FIRST/FOLLOW sets and SLR(1) table construction over the LR(0)
// canonical collection. Conflicts abort construction; nothing is resolved
// by default.

use super::grammar::{AugmentedGrammar, Grammar, GrammarError};
use super::lr0::{CanonicalCollection, Item};
use scanpar::{Action, ParseTable, Production, StateId, TableError};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Computes FIRST sets and nullability for all grammar symbols.
///
/// `FIRST(t) = {t}` for a terminal. For a nonterminal, each production adds
/// the FIRST sets of its right-hand side up to the first non-nullable
/// symbol; the nonterminal is nullable when some right-hand side is entirely
/// nullable. ε is tracked in the returned flags, not in the sets.
pub fn first_sets(grammar: &AugmentedGrammar) -> (Vec<BTreeSet<usize>>, Vec<bool>) {
    let n_sym = grammar.n_symbols();
    let mut first: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n_sym];
    let mut nullable = vec![false; n_sym];
    for t in grammar.n_nonterm()..n_sym {
        first[t].insert(t);
    }
    let mut rounds = 0;
    let mut changed = true;
    while changed {
        changed = false;
        rounds += 1;
        for prod in grammar.productions() {
            let lhs = prod.lhs;
            let mut all_nullable = true;
            for &sym in &prod.rhs {
                if sym != lhs {
                    let first_sym = first[sym].clone();
                    for f in first_sym {
                        changed |= first[lhs].insert(f);
                    }
                }
                if !nullable[sym] {
                    all_nullable = false;
                    break;
                }
            }
            if all_nullable && !nullable[lhs] {
                nullable[lhs] = true;
                changed = true;
            }
        }
    }
    log::debug!("FIRST sets: fixed point after {rounds} rounds");
    (first, nullable)
}

/// FIRST of a symbol sequence, and whether the whole sequence is nullable.
pub fn first_of_sequence(
    syms: &[usize],
    first: &[BTreeSet<usize>],
    nullable: &[bool],
) -> (BTreeSet<usize>, bool) {
    let mut out = BTreeSet::new();
    for &sym in syms {
        out.extend(first[sym].iter().copied());
        if !nullable[sym] {
            return (out, false);
        }
    }
    (out, true)
}

/// Computes FOLLOW sets, one per nonterminal.
///
/// The augmented start symbol is followed by `$`. For every `A -> αBβ`,
/// `FIRST(β)` goes into `FOLLOW(B)`, and so does `FOLLOW(A)` when `β` is
/// nullable.
pub fn follow_sets(
    grammar: &AugmentedGrammar,
    first: &[BTreeSet<usize>],
    nullable: &[bool],
) -> Vec<BTreeSet<usize>> {
    let mut follow: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); grammar.n_nonterm()];
    follow[grammar.augmented_start()].insert(grammar.end_marker());
    let mut rounds = 0;
    let mut changed = true;
    while changed {
        changed = false;
        rounds += 1;
        for prod in grammar.productions() {
            for (i, &b) in prod.rhs.iter().enumerate() {
                if !grammar.is_nonterminal(b) {
                    continue;
                }
                let (first_beta, beta_nullable) =
                    first_of_sequence(&prod.rhs[i + 1..], first, nullable);
                for f in first_beta {
                    changed |= follow[b].insert(f);
                }
                if beta_nullable && b != prod.lhs {
                    let follow_lhs = follow[prod.lhs].clone();
                    for f in follow_lhs {
                        changed |= follow[b].insert(f);
                    }
                }
            }
        }
    }
    log::debug!("FOLLOW sets: fixed point after {rounds} rounds");
    follow
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::ShiftReduce => write!(f, "shift-reduce"),
            ConflictKind::ReduceReduce => write!(f, "reduce-reduce"),
        }
    }
}

/// Two actions required in one table cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} conflict in state {state} on {symbol:?}: {existing} vs {incoming}")]
pub struct Conflict {
    pub state: StateId,
    pub symbol: String,
    pub kind: ConflictKind,
    pub existing: String,
    pub incoming: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlrError {
    #[error("grammar is not SLR(1): {0}")]
    Conflict(Conflict),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Everything computed on the way to an SLR(1) table.
#[derive(Debug, Clone)]
pub struct SlrAnalysis {
    grammar: AugmentedGrammar,
    collection: CanonicalCollection,
    first: Vec<BTreeSet<usize>>,
    nullable: Vec<bool>,
    follow: Vec<BTreeSet<usize>>,
}

impl SlrAnalysis {
    pub fn new(grammar: &Grammar) -> Self {
        let grammar = AugmentedGrammar::new(grammar);
        let collection = CanonicalCollection::build(&grammar);
        let (first, nullable) = first_sets(&grammar);
        let follow = follow_sets(&grammar, &first, &nullable);
        Self {
            grammar,
            collection,
            first,
            nullable,
            follow,
        }
    }

    /// Infers the symbols from the productions (see
    /// [`Grammar::from_productions`]) and analyses the result.
    pub fn from_productions(productions: Vec<Production>) -> Result<Self, SlrError> {
        Ok(Self::new(&Grammar::from_productions(productions)?))
    }

    pub fn grammar(&self) -> &AugmentedGrammar {
        &self.grammar
    }

    pub fn collection(&self) -> &CanonicalCollection {
        &self.collection
    }

    pub fn first(&self) -> &[BTreeSet<usize>] {
        &self.first
    }

    pub fn nullable(&self) -> &[bool] {
        &self.nullable
    }

    pub fn follow(&self) -> &[BTreeSet<usize>] {
        &self.follow
    }

    fn render(&self, action: Action) -> String {
        match action {
            Action::Shift(j) => format!("shift {j}"),
            Action::Reduce(p) => format!("reduce {}", self.grammar.named_productions()[p]),
            Action::Accept => "accept".to_string(),
        }
    }

    /// Builds the action and goto tables. Fails on the first cell that would
    /// need two different actions.
    pub fn table(&self) -> Result<ParseTable, SlrError> {
        let g = &self.grammar;
        let n_nt = g.n_nonterm();
        let n_states = self.collection.len();
        let mut action: Vec<Vec<Option<Action>>> = vec![vec![None; g.n_term()]; n_states];
        let mut goto: Vec<Vec<Option<StateId>>> = vec![vec![None; n_nt]; n_states];

        for state in 0..n_states {
            for item in self.collection.state(state) {
                match item.next_symbol(g) {
                    Some(sym) if g.is_nonterminal(sym) => {
                        goto[state][sym] = self.collection.transition(state, sym);
                    }
                    Some(sym) => {
                        if let Some(j) = self.collection.transition(state, sym) {
                            self.set(&mut action, state, sym - n_nt, Action::Shift(j))?;
                        }
                    }
                    None => self.fill_reduce(&mut action, state, *item)?,
                }
            }
        }

        let table = ParseTable::from_parts(
            g.terminal_set(),
            g.nonterminal_set(),
            g.named_productions().to_vec(),
            action,
            goto,
            g.ignore().clone(),
        )?;
        log::debug!(
            "SLR(1) table: {} states, {} terminals, {} nonterminals, {} actions",
            table.n_states(),
            table.terminals().len(),
            table.nonterminals().len(),
            table.action_count()
        );
        Ok(table)
    }

    fn fill_reduce(
        &self,
        action: &mut [Vec<Option<Action>>],
        state: StateId,
        item: Item,
    ) -> Result<(), SlrError> {
        let g = &self.grammar;
        let n_nt = g.n_nonterm();
        if item.prod == 0 {
            return self.set(action, state, g.end_marker() - n_nt, Action::Accept);
        }
        let lhs = g.production(item.prod).lhs;
        for &t in &self.follow[lhs] {
            self.set(action, state, t - n_nt, Action::Reduce(item.prod))?;
        }
        Ok(())
    }

    fn set(
        &self,
        action: &mut [Vec<Option<Action>>],
        state: StateId,
        terminal: usize,
        incoming: Action,
    ) -> Result<(), SlrError> {
        let cell = &mut action[state][terminal];
        match *cell {
            None => {
                *cell = Some(incoming);
                Ok(())
            }
            Some(existing) if existing == incoming => Ok(()),
            Some(existing) => {
                let kind = if matches!(existing, Action::Shift(_))
                    || matches!(incoming, Action::Shift(_))
                {
                    ConflictKind::ShiftReduce
                } else {
                    ConflictKind::ReduceReduce
                };
                let conflict = Conflict {
                    state,
                    symbol: self.grammar.name(terminal + self.grammar.n_nonterm()).to_string(),
                    kind,
                    existing: self.render(existing),
                    incoming: self.render(incoming),
                };
                log::debug!("{conflict}");
                Err(SlrError::Conflict(conflict))
            }
        }
    }
}

/// Builds the SLR(1) table of `grammar`.
pub fn build_slr_table(grammar: &Grammar) -> Result<ParseTable, SlrError> {
    SlrAnalysis::new(grammar).table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanpar::{ParseError, ParseStep, Parser};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn expr() -> SlrAnalysis {
        SlrAnalysis::from_productions(vec![
            Production::new("E", ["E", "+", "T"]),
            Production::new("E", ["T"]),
            Production::new("T", ["T", "*", "F"]),
            Production::new("T", ["F"]),
            Production::new("F", ["(", "E", ")"]),
            Production::new("F", ["id"]),
        ])
        .unwrap()
    }

    fn names(a: &SlrAnalysis, set: &BTreeSet<usize>) -> Vec<String> {
        set.iter().map(|&s| a.grammar().name(s).to_string()).collect()
    }

    #[test]
    fn first_and_follow_of_expression_grammar() {
        init_logger();
        let a = expr();
        let g = a.grammar();
        let (e, t, f) = (
            g.symbol("E").unwrap(),
            g.symbol("T").unwrap(),
            g.symbol("F").unwrap(),
        );
        assert_eq!(names(&a, &a.first()[e]), ["(", "id"]);
        assert_eq!(names(&a, &a.first()[f]), ["(", "id"]);
        assert!(!a.nullable()[e]);
        assert_eq!(names(&a, &a.follow()[e]), ["+", ")", "$"]);
        assert_eq!(names(&a, &a.follow()[t]), ["+", "*", ")", "$"]);
        assert_eq!(a.follow()[t], a.follow()[f]);
    }

    #[test]
    fn nullable_productions() {
        init_logger();
        let a = SlrAnalysis::from_productions(vec![
            Production::new("S", ["A", "b"]),
            Production::new("A", ["a"]),
            Production::new("A", Vec::<&str>::new()),
        ])
        .unwrap();
        let g = a.grammar();
        let (s, aa) = (g.symbol("S").unwrap(), g.symbol("A").unwrap());
        assert!(a.nullable()[aa]);
        assert!(!a.nullable()[s]);
        assert_eq!(names(&a, &a.first()[s]), ["b", "a"]);
        assert_eq!(names(&a, &a.follow()[aa]), ["b"]);

        let table = a.table().unwrap();
        let mut parser = Parser::new(&table);
        assert!(parser.accepts(["b"]));
        assert!(parser.accepts(["a", "b"]));
        assert!(!parser.accepts(["a"]));
    }

    #[test]
    fn expression_grammar_parses() {
        init_logger();
        let table = expr().table().unwrap();
        assert_eq!(table.n_states(), 12);
        let mut parser = Parser::new(&table);
        assert!(parser.accepts(["id", "+", "id", "*", "id"]));
        assert!(parser.accepts(["(", "id", "+", "id", ")", "*", "id", "$"]));
        let err = parser.parse(["id", "+", "*", "id"]).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { ref symbol, index: 2, .. } if symbol == "*"));
    }

    #[test]
    fn left_recursive_sum_trace() {
        init_logger();
        let table = SlrAnalysis::from_productions(vec![
            Production::new("S", ["S", "+", "T"]),
            Production::new("S", ["T"]),
            Production::new("T", ["id"]),
        ])
        .unwrap()
        .table()
        .unwrap();
        let mut parser = Parser::new(&table);
        let steps: Vec<String> = parser
            .parse(["id", "+", "id"])
            .unwrap()
            .iter()
            .map(|s| s.render(&table).to_string())
            .collect();
        assert_eq!(
            steps,
            [
                "shift id",
                "reduce T -> id",
                "reduce S -> T",
                "shift +",
                "shift id",
                "reduce T -> id",
                "reduce S -> S + T",
                "accept",
            ]
        );
        assert_eq!(parser.stats().reductions, 4);
        assert!(matches!(parser.parse(["id"]).unwrap().last(), Some(ParseStep::Accept)));
    }

    #[test]
    fn ambiguous_expression_grammar_conflicts() {
        init_logger();
        let a = SlrAnalysis::from_productions(vec![
            Production::new("E", ["E", "+", "E"]),
            Production::new("E", ["E", "*", "E"]),
            Production::new("E", ["id"]),
        ])
        .unwrap();
        let Err(SlrError::Conflict(c)) = a.table() else {
            panic!("expected a conflict");
        };
        assert_eq!(c.kind, ConflictKind::ShiftReduce);
        assert!(c.symbol == "+" || c.symbol == "*");
        assert!(c.state < a.collection().len());
        // the state holds a complete binary production
        let complete = a
            .collection()
            .state(c.state)
            .iter()
            .any(|item| item.is_complete(a.grammar()) && item.prod != 3);
        assert!(complete);
        assert!(c.to_string().contains("shift-reduce conflict in state"));
    }

    #[test]
    fn ambiguous_sum_is_not_slr() {
        init_logger();
        // S -> S + S | id needs a reduce over shift default, which is never applied
        let a = SlrAnalysis::from_productions(vec![
            Production::new("S", ["S", "+", "S"]),
            Production::new("S", ["id"]),
        ])
        .unwrap();
        let Err(SlrError::Conflict(c)) = a.table() else {
            panic!("expected a conflict");
        };
        assert_eq!(c.kind, ConflictKind::ShiftReduce);
        assert_eq!(c.symbol, "+");
        assert!(c.existing.starts_with("shift "));
        assert_eq!(c.incoming, "reduce S -> S + S");
        assert!(
            a.collection()
                .state(c.state)
                .contains(&Item { prod: 1, dot: 3 })
        );
    }

    #[test]
    fn reduce_reduce_conflict() {
        init_logger();
        let err = SlrAnalysis::from_productions(vec![
            Production::new("S", ["A"]),
            Production::new("S", ["B"]),
            Production::new("A", ["x"]),
            Production::new("B", ["x"]),
        ])
        .unwrap()
        .table()
        .unwrap_err();
        match err {
            SlrError::Conflict(c) => {
                assert_eq!(c.kind, ConflictKind::ReduceReduce);
                assert_eq!(c.symbol, "$");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn grammar_errors_pass_through() {
        assert_eq!(
            SlrAnalysis::from_productions(vec![]).unwrap_err(),
            SlrError::Grammar(GrammarError::NoProductions)
        );
    }
}
