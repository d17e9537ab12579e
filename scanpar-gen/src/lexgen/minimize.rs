//! Pruning and Moore-style minimization of a compiled [`Dfa`].
//!
//! Both functions return a new automaton and leave their input untouched.
//! Results are renumbered canonically (breadth-first from the start state,
//! transitions in character order), so equal languages with equal rule
//! bindings give equal values.

use super::BuildError;
use indexmap::IndexMap;
use scanpar::{Dfa, DfaError, DfaState, DfaStateId, RuleId};
use std::collections::{BTreeMap, VecDeque};

/// Renumbers the states reachable from the start through states allowed by
/// `keep`. Transitions into dropped states are removed.
fn canonical(dfa: &Dfa, keep: impl Fn(DfaStateId) -> bool) -> Result<Dfa, DfaError> {
    let mut map: Vec<Option<DfaStateId>> = vec![None; dfa.len()];
    let mut order = Vec::new();
    let mut queue = VecDeque::from([dfa.start()]);
    map[dfa.start()] = Some(0);
    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &target in dfa.state(id).transitions.values() {
            if map[target].is_none() && keep(target) {
                map[target] = Some(order.len() + queue.len());
                queue.push_back(target);
            }
        }
    }
    let states = order
        .iter()
        .map(|&id| {
            let old = dfa.state(id);
            DfaState {
                transitions: old
                    .transitions
                    .iter()
                    .filter_map(|(&ch, &t)| map[t].map(|t| (ch, t)))
                    .collect(),
                rule: old.rule,
            }
        })
        .collect();
    Dfa::new(states, 0)
}

/// Removes states unreachable from the start and states from which no
/// accepting state can be reached. The start state always stays.
pub fn prune(dfa: &Dfa) -> Result<Dfa, DfaError> {
    // reverse edges, then search backward from the accepting states
    let mut preds: Vec<Vec<DfaStateId>> = vec![Vec::new(); dfa.len()];
    for (id, state) in dfa.states().iter().enumerate() {
        for &target in state.transitions.values() {
            preds[target].push(id);
        }
    }
    let mut live = vec![false; dfa.len()];
    let mut queue: VecDeque<DfaStateId> = dfa
        .states()
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_accepting())
        .map(|(id, _)| id)
        .collect();
    for &id in &queue {
        live[id] = true;
    }
    while let Some(id) = queue.pop_front() {
        for &p in &preds[id] {
            if !live[p] {
                live[p] = true;
                queue.push_back(p);
            }
        }
    }
    let pruned = canonical(dfa, |id| live[id])?;
    log::debug!("prune: {} -> {} states", dfa.len(), pruned.len());
    Ok(pruned)
}

/// Merges equivalent states by partition refinement.
///
/// The initial partition groups states by bound rule (`None` for
/// non-accepting), which refines {accepting, non-accepting}. A block is split
/// while its members disagree, on some symbol, about which block they move
/// to. Fails with [`BuildError::InconsistentBlock`] if a final block mixes
/// states with different rules.
pub fn minimize(dfa: &Dfa) -> Result<Dfa, BuildError> {
    let dfa = prune(dfa)?;
    let n = dfa.len();

    let mut initial: IndexMap<Option<RuleId>, usize> = IndexMap::new();
    let mut block: Vec<usize> = dfa
        .states()
        .iter()
        .map(|s| {
            let next = initial.len();
            *initial.entry(s.rule).or_insert(next)
        })
        .collect();
    let mut n_blocks = initial.len();
    let mut rounds = 0;

    loop {
        rounds += 1;
        let mut signatures: IndexMap<(usize, Vec<(char, usize)>), usize> = IndexMap::new();
        let refined: Vec<usize> = (0..n)
            .map(|id| {
                let moves = dfa
                    .state(id)
                    .transitions
                    .iter()
                    .map(|(&ch, &t)| (ch, block[t]))
                    .collect();
                let next = signatures.len();
                *signatures.entry((block[id], moves)).or_insert(next)
            })
            .collect();
        block = refined;
        if signatures.len() == n_blocks {
            break;
        }
        n_blocks = signatures.len();
    }

    let mut members: Vec<Option<DfaStateId>> = vec![None; n_blocks];
    let mut states: Vec<DfaState> = vec![DfaState::default(); n_blocks];
    for id in 0..n {
        let b = block[id];
        let state = dfa.state(id);
        match members[b] {
            None => {
                members[b] = Some(id);
                states[b] = DfaState {
                    transitions: state
                        .transitions
                        .iter()
                        .map(|(&ch, &t)| (ch, block[t]))
                        .collect::<BTreeMap<_, _>>(),
                    rule: state.rule,
                };
            }
            Some(_) if states[b].rule != state.rule => {
                return Err(BuildError::InconsistentBlock {
                    block: b,
                    first: states[b].rule,
                    second: state.rule,
                });
            }
            Some(_) => {}
        }
    }

    let merged = Dfa::new(states, block[dfa.start()])?;
    let minimal = canonical(&merged, |_| true)?;
    log::debug!(
        "minimize: {} -> {} states in {} rounds",
        n,
        minimal.len(),
        rounds
    );
    Ok(minimal)
}

#[cfg(test)]
mod tests {
    use super::super::direct_dfa::DirectDfa;
    use super::super::syntax_tree::PositionTable;
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn direct(patterns: &[&str]) -> Dfa {
        DirectDfa::build(&PositionTable::compile_rules(patterns).unwrap())
            .to_dfa()
            .unwrap()
    }

    /// Accepting loop on 'a' with an unreachable state and a dead state.
    fn with_junk() -> Dfa {
        let mut s0 = DfaState::default();
        s0.transitions.insert('a', 1);
        s0.transitions.insert('x', 3);
        let mut s1 = DfaState {
            rule: Some(RuleId(0)),
            ..Default::default()
        };
        s1.transitions.insert('a', 1);
        // unreachable
        let mut s2 = DfaState::default();
        s2.transitions.insert('a', 1);
        // dead end
        let mut s3 = DfaState::default();
        s3.transitions.insert('y', 3);
        Dfa::new(vec![s0, s1, s2, s3], 0).unwrap()
    }

    #[test]
    fn prune_drops_unreachable_and_dead_states() {
        init_logger();
        let dfa = with_junk();
        let pruned = prune(&dfa).unwrap();
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned.accepts("aaa"), Some(RuleId(0)));
        assert_eq!(pruned.next(pruned.start(), 'x'), None);
        // input untouched
        assert_eq!(dfa.len(), 4);
    }

    #[test]
    fn prune_keeps_a_lone_start() {
        let dfa = Dfa::new(vec![DfaState::default(), DfaState::default()], 1).unwrap();
        let pruned = prune(&dfa).unwrap();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned.accepts(""), None);
    }

    #[test]
    fn merges_equivalent_states() {
        init_logger();
        // the states after "a" and after "c" both need exactly one 'b'
        let dfa = direct(&["ab|cb"]);
        assert_eq!(dfa.len(), 4);
        let min = minimize(&dfa).unwrap();
        assert_eq!(min.len(), 3);
        assert_eq!(min.accepts("ab"), Some(RuleId(0)));
        assert_eq!(min.accepts("cb"), Some(RuleId(0)));
        assert_eq!(min.accepts("b"), None);

        assert_eq!(minimize(&direct(&["(a|b)*abb"])).unwrap().len(), 4);
        let min = minimize(&direct(&["a(b|c)*d"])).unwrap();
        for s in ["ad", "abd", "acd", "abcbcd"] {
            assert_eq!(min.accepts(s), Some(RuleId(0)), "{s}");
        }
        for s in ["a", "abc", "bd"] {
            assert_eq!(min.accepts(s), None, "{s}");
        }
    }

    #[test]
    fn keeps_rules_apart() {
        init_logger();
        // both accepting states have no outgoing transitions but different rules
        let min = minimize(&direct(&["a", "b"])).unwrap();
        assert_eq!(min.len(), 3);
        assert_eq!(min.accepts("a"), Some(RuleId(0)));
        assert_eq!(min.accepts("b"), Some(RuleId(1)));
    }

    #[test]
    fn minimizing_twice_changes_nothing() {
        init_logger();
        for patterns in [
            &["a(b|c)*d"][..],
            &["if", "[a-z]+", "[0-9]+", "' '"][..],
            &["(ab|ba)*", "a+b?"][..],
        ] {
            let once = minimize(&direct(patterns)).unwrap();
            let twice = minimize(&once).unwrap();
            assert_eq!(once.len(), twice.len());
            assert!(once.is_isomorphic(&twice));
            assert_eq!(once, twice);
        }
    }
}
