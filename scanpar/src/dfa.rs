//! Compiled deterministic automaton consumed by the [`Scanner`](crate::Scanner).
//!
//! A [`Dfa`] is a plain value: a vector of states, each with a sparse
//! `char -> state` transition map and an optional [`RuleId`] bound to it when
//! the state is accepting. Missing transitions lead to an implicit dead state.

use crate::error::DfaError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Index of a DFA state.
pub type DfaStateId = usize;

/// Opaque handle for a lexer rule: its position in the declared rule list.
///
/// The automaton never runs rule actions; the host maps a `RuleId` to a
/// callback through an [`ActionTable`](crate::ActionTable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

impl From<RuleId> for usize {
    fn from(rule: RuleId) -> Self {
        rule.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One state of a compiled [`Dfa`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DfaState {
    /// Outgoing transitions.
    pub transitions: BTreeMap<char, DfaStateId>,
    /// Rule recognized when the scanner stops in this state; `None` if the
    /// state is not accepting.
    pub rule: Option<RuleId>,
}

impl DfaState {
    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.rule.is_some()
    }
}

/// A deterministic finite automaton with rule-bound accepting states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    states: Vec<DfaState>,
    start: DfaStateId,
}

impl Dfa {
    /// Creates a DFA from its states and start state, checking that `start`
    /// and every transition target name an existing state.
    pub fn new(states: Vec<DfaState>, start: DfaStateId) -> Result<Self, DfaError> {
        if start >= states.len() {
            return Err(DfaError::StartOutOfRange {
                start,
                len: states.len(),
            });
        }
        for (id, state) in states.iter().enumerate() {
            if let Some((&ch, &target)) = state
                .transitions
                .iter()
                .find(|&(_, &target)| target >= states.len())
            {
                return Err(DfaError::DanglingTransition {
                    state: id,
                    ch,
                    target,
                });
            }
        }
        Ok(Self { states, start })
    }

    #[inline]
    pub fn start(&self) -> DfaStateId {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    #[inline]
    pub fn state(&self, id: DfaStateId) -> &DfaState {
        &self.states[id]
    }

    /// Follows the transition on `ch` from `state`, if any.
    #[inline]
    pub fn next(&self, state: DfaStateId, ch: char) -> Option<DfaStateId> {
        self.states[state].transitions.get(&ch).copied()
    }

    #[inline]
    pub fn rule(&self, state: DfaStateId) -> Option<RuleId> {
        self.states[state].rule
    }

    /// All characters that label at least one transition.
    pub fn alphabet(&self) -> BTreeSet<char> {
        self.states
            .iter()
            .flat_map(|s| s.transitions.keys().copied())
            .collect()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// Runs the automaton over the whole of `input` and returns the rule bound
    /// to the final state, or `None` if the input is rejected.
    pub fn accepts(&self, input: &str) -> Option<RuleId> {
        let mut state = self.start;
        for ch in input.chars() {
            state = self.next(state, ch)?;
        }
        self.rule(state)
    }

    /// States in breadth-first discovery order from the start state, following
    /// transitions in character order.
    pub fn bfs_order(&self) -> Vec<DfaStateId> {
        let mut seen = vec![false; self.states.len()];
        let mut order = Vec::with_capacity(self.states.len());
        let mut queue = VecDeque::from([self.start]);
        seen[self.start] = true;
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &target in self.states[id].transitions.values() {
                if !seen[target] {
                    seen[target] = true;
                    queue.push_back(target);
                }
            }
        }
        order
    }

    /// Returns `true` if `self` and `other` are the same automaton up to a
    /// renaming of states (same shape reachable from the start, same bound
    /// rules).
    pub fn is_isomorphic(&self, other: &Dfa) -> bool {
        let mut map: Vec<Option<DfaStateId>> = vec![None; self.len()];
        let mut back: Vec<Option<DfaStateId>> = vec![None; other.len()];
        let mut queue = VecDeque::from([(self.start, other.start)]);
        map[self.start] = Some(other.start);
        back[other.start] = Some(self.start);
        while let Some((a, b)) = queue.pop_front() {
            let (sa, sb) = (&self.states[a], &other.states[b]);
            if sa.rule != sb.rule || sa.transitions.len() != sb.transitions.len() {
                return false;
            }
            for (ch, &ta) in &sa.transitions {
                let Some(&tb) = sb.transitions.get(ch) else {
                    return false;
                };
                match (map[ta], back[tb]) {
                    (None, None) => {
                        map[ta] = Some(tb);
                        back[tb] = Some(ta);
                        queue.push_back((ta, tb));
                    }
                    (Some(x), Some(y)) if x == tb && y == ta => {}
                    _ => return false,
                }
            }
        }
        map.iter().filter(|m| m.is_some()).count() == self.bfs_order().len()
            && back.iter().filter(|m| m.is_some()).count() == other.bfs_order().len()
    }
}
