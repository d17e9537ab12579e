//! Regex to DFA without an intermediate NFA.
//!
//! A DFA state is a set of positions. The start state is `firstpos(root)`;
//! the successor of `S` on `a` is the union of `followpos(p)` over the
//! positions `p ∈ S` labelled `a`. States are interned by their position set,
//! so a set seen before maps back to the same state.
//!
//! A state is accepting iff it holds an end-marker position. When it holds
//! several (overlapping rules), the smallest position wins, which is the end
//! marker of the earliest declared rule.

use super::syntax_tree::{LeafSymbol, Position, PositionSet, PositionTable};
use indexmap::IndexSet;
use scanpar::{Dfa, DfaError, DfaState, DfaStateId, RuleId};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectState {
    pub positions: PositionSet,
    pub transitions: BTreeMap<char, DfaStateId>,
    /// Smallest end-marker position in `positions`.
    pub accept_position: Option<Position>,
    pub rule: Option<RuleId>,
}

impl DirectState {
    pub fn is_accepting(&self) -> bool {
        self.accept_position.is_some()
    }
}

/// DFA built directly from a [`PositionTable`], with each state's position
/// set kept for inspection.
#[derive(Debug, Clone)]
pub struct DirectDfa {
    states: Vec<DirectState>,
    /// Position set of each state, at the state's index.
    known: IndexSet<PositionSet>,
}

impl DirectDfa {
    pub fn build(table: &PositionTable) -> Self {
        let mut known: IndexSet<PositionSet> = IndexSet::new();
        let mut transitions: Vec<BTreeMap<char, DfaStateId>> = Vec::new();
        let mut worklist: VecDeque<DfaStateId> = VecDeque::new();

        let (start, _) = known.insert_full(table.start.clone());
        transitions.push(BTreeMap::new());
        worklist.push_back(start);

        while let Some(id) = worklist.pop_front() {
            // successors of every symbol at once, in alphabet order
            let mut targets: BTreeMap<char, PositionSet> = BTreeMap::new();
            for &p in &known[id] {
                if let LeafSymbol::Char(a) = table.symbols[p] {
                    targets
                        .entry(a)
                        .or_default()
                        .extend(table.followpos.get(p).iter().copied());
                }
            }
            for (a, target) in targets {
                if target.is_empty() {
                    continue;
                }
                let (next, fresh) = known.insert_full(target);
                if fresh {
                    transitions.push(BTreeMap::new());
                    worklist.push_back(next);
                }
                transitions[id].insert(a, next);
            }
        }

        let states: Vec<DirectState> = known
            .iter()
            .cloned()
            .zip(transitions)
            .map(|(positions, transitions)| {
                let accept_position = positions.iter().copied().find(|&p| table.is_end_marker(p));
                let rule = accept_position.and_then(|p| match table.symbols[p] {
                    LeafSymbol::End(rule) => Some(rule),
                    LeafSymbol::Char(_) => None,
                });
                DirectState {
                    positions,
                    transitions,
                    accept_position,
                    rule,
                }
            })
            .collect();

        log::debug!(
            "direct DFA: {} positions, {} symbols, {} states, {} accepting",
            table.symbols.len(),
            table.alphabet.len(),
            states.len(),
            states.iter().filter(|s| s.is_accepting()).count()
        );
        Self { states, known }
    }

    /// The start state is always state 0.
    pub fn start(&self) -> DfaStateId {
        0
    }

    pub fn states(&self) -> &[DirectState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Looks a state up by its position set.
    pub fn find(&self, positions: &PositionSet) -> Option<DfaStateId> {
        self.known.get_index_of(positions)
    }

    /// Drops the position sets and keeps transitions and bound rules.
    pub fn to_dfa(&self) -> Result<Dfa, DfaError> {
        let states = self
            .states
            .iter()
            .map(|s| DfaState {
                transitions: s.transitions.clone(),
                rule: s.rule,
            })
            .collect();
        Dfa::new(states, self.start())
    }
}

#[cfg(test)]
mod tests {
    use super::super::syntax_tree::SyntaxTree;
    use super::super::regex::Postfix;
    use super::*;
    use scanpar::{ScanEvent, Scanner};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn build(patterns: &[&str]) -> DirectDfa {
        DirectDfa::build(&PositionTable::compile_rules(patterns).unwrap())
    }

    #[test]
    fn textbook_state_count() {
        init_logger();
        let dfa = build(&["(a|b)*abb"]);
        assert_eq!(dfa.len(), 4);
        assert_eq!(dfa.states().iter().filter(|s| s.is_accepting()).count(), 1);
        let d = dfa.to_dfa().unwrap();
        assert_eq!(d.accepts("abb"), Some(RuleId(0)));
        assert_eq!(d.accepts("babababb"), Some(RuleId(0)));
        assert_eq!(d.accepts("ab"), None);
    }

    #[test]
    fn start_state_is_firstpos_of_root() {
        init_logger();
        for pattern in ["a(b|c)*d", "x?y+", "[0-9]+|_"] {
            let postfix = Postfix::compile_rules(&[pattern]).unwrap();
            let tree = SyntaxTree::from_postfix(&postfix).unwrap();
            let firstpos = tree.root().info.firstpos.clone();
            let dfa = DirectDfa::build(&tree.into_positions());
            assert_eq!(dfa.states()[dfa.start()].positions, firstpos, "{pattern}");
            assert_eq!(dfa.find(&firstpos), Some(dfa.start()));
        }
    }

    #[test]
    fn finds_every_state_by_its_positions() {
        init_logger();
        let dfa = build(&["(a|b)*abb", "a+"]);
        for (id, state) in dfa.states().iter().enumerate() {
            assert_eq!(dfa.find(&state.positions), Some(id));
        }
        assert_eq!(dfa.find(&PositionSet::new()), None);
    }

    #[test]
    fn a_bc_star_d() {
        init_logger();
        let dfa = build(&["a(b|c)*d"]).to_dfa().unwrap();
        for s in ["ad", "abd", "acd", "abcbcd"] {
            assert_eq!(dfa.accepts(s), Some(RuleId(0)), "{s}");
        }
        for s in ["a", "abc", "bd", "", "adx"] {
            assert_eq!(dfa.accepts(s), None, "{s}");
        }
    }

    #[test]
    fn earliest_rule_wins_ties() {
        init_logger();
        let direct = build(&["if", "[a-z]+"]);
        let dfa = direct.to_dfa().unwrap();
        assert_eq!(dfa.accepts("if"), Some(RuleId(0)));
        assert_eq!(dfa.accepts("i"), Some(RuleId(1)));
        assert_eq!(dfa.accepts("iff"), Some(RuleId(1)));
        // the "if" state holds both end markers and binds the smaller one
        let state = dfa.start();
        let state = dfa.next(state, 'i').unwrap();
        let state = dfa.next(state, 'f').unwrap();
        let table = PositionTable::compile_rules(&["if", "[a-z]+"]).unwrap();
        let ends = direct.states()[state]
            .positions
            .iter()
            .filter(|&&p| table.is_end_marker(p))
            .count();
        assert_eq!(ends, 2);
        assert_eq!(direct.states()[state].rule, Some(RuleId(0)));
    }

    #[test]
    fn longest_match_over_prefix_rule() {
        init_logger();
        let dfa = build(&["\"a\"", "\"ab\""]).to_dfa().unwrap();
        let events: Vec<_> = Scanner::new(&dfa, "ab").collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ScanEvent::Match(lx) if lx.rule == RuleId(1) && lx.text == "ab"
        ));
    }

    #[test]
    fn keyword_beats_identifier_on_equal_length() {
        init_logger();
        let dfa = build(&["\"if\"", "['a'-'z']+"]).to_dfa().unwrap();
        let rules: Vec<_> = Scanner::new(&dfa, "if iffy")
            .filter_map(|e| match e {
                ScanEvent::Match(lx) => Some((lx.rule, lx.text)),
                ScanEvent::Error(_) => None,
            })
            .collect();
        assert_eq!(rules, vec![(RuleId(0), "if"), (RuleId(1), "iffy")]);
    }
}
