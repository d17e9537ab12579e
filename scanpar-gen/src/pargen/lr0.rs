// LR(0) items, closure/goto and the canonical collection.

use super::grammar::AugmentedGrammar;
use indexmap::IndexSet;
use scanpar::{ProdId, StateId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// An LR(0) item: a production with a dot before `rhs[dot]`.
///
/// For `E -> E + T` partially recognized as `E -> E • + T`, `dot` is 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Item {
    pub prod: ProdId,
    pub dot: usize,
}

impl Item {
    /// Symbol right after the dot, or `None` if the item is complete.
    pub fn next_symbol(&self, grammar: &AugmentedGrammar) -> Option<usize> {
        grammar.production(self.prod).rhs.get(self.dot).copied()
    }

    pub fn is_complete(&self, grammar: &AugmentedGrammar) -> bool {
        self.dot == grammar.production(self.prod).rhs.len()
    }

    /// Kernel items are `S' -> •S` and every item whose dot is not at the
    /// left end.
    pub fn is_kernel(&self) -> bool {
        self.prod == 0 || self.dot > 0
    }

    fn advance(self) -> Self {
        Item {
            prod: self.prod,
            dot: self.dot + 1,
        }
    }
}

/// A set of LR(0) items. Ordered, so equal sets compare and hash equal
/// whatever order their items were added in.
pub type ItemSet = BTreeSet<Item>;

/// Adds `N -> •β` for every item with the dot before a nonterminal `N`,
/// until nothing new appears.
pub fn closure(items: &ItemSet, grammar: &AugmentedGrammar) -> ItemSet {
    let mut c = items.clone();
    let mut pending: Vec<Item> = items.iter().copied().collect();
    while let Some(item) = pending.pop() {
        let Some(sym) = item.next_symbol(grammar) else {
            continue;
        };
        if !grammar.is_nonterminal(sym) {
            continue;
        }
        for &prod in grammar.productions_of(sym) {
            let new_item = Item { prod, dot: 0 };
            if c.insert(new_item) {
                pending.push(new_item);
            }
        }
    }
    c
}

/// Items of `items` with the dot moved past `sym`, closed. Empty if no item
/// has `sym` after its dot.
pub fn goto(items: &ItemSet, sym: usize, grammar: &AugmentedGrammar) -> ItemSet {
    let moved: ItemSet = items
        .iter()
        .filter(|item| item.next_symbol(grammar) == Some(sym))
        .map(|item| item.advance())
        .collect();
    closure(&moved, grammar)
}

/// The canonical collection of LR(0) item sets with its transitions.
///
/// States are numbered in breadth-first discovery order from
/// `closure({S' -> •S})`, exploring the symbols of each state in index
/// order, so the same grammar always gives the same numbering.
#[derive(Debug, Clone)]
pub struct CanonicalCollection {
    states: IndexSet<ItemSet>,
    transitions: Vec<BTreeMap<usize, StateId>>,
}

impl CanonicalCollection {
    pub fn build(grammar: &AugmentedGrammar) -> Self {
        let mut states: IndexSet<ItemSet> = IndexSet::new();
        let mut transitions: Vec<BTreeMap<usize, StateId>> = Vec::new();
        let mut worklist: VecDeque<StateId> = VecDeque::new();

        let start = closure(&ItemSet::from([Item { prod: 0, dot: 0 }]), grammar);
        states.insert(start);
        transitions.push(BTreeMap::new());
        worklist.push_back(0);

        while let Some(id) = worklist.pop_front() {
            let symbols: BTreeSet<usize> = states[id]
                .iter()
                .filter_map(|item| item.next_symbol(grammar))
                .collect();
            for sym in symbols {
                let target = goto(&states[id], sym, grammar);
                let (next, fresh) = states.insert_full(target);
                if fresh {
                    transitions.push(BTreeMap::new());
                    worklist.push_back(next);
                }
                transitions[id].insert(sym, next);
            }
        }

        log::debug!(
            "LR(0) collection: {} states, {} transitions",
            states.len(),
            transitions.iter().map(BTreeMap::len).sum::<usize>()
        );
        Self {
            states,
            transitions,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &ItemSet> {
        self.states.iter()
    }

    pub fn state(&self, id: StateId) -> &ItemSet {
        &self.states[id]
    }

    /// Looks a state up by its item set.
    pub fn find(&self, items: &ItemSet) -> Option<StateId> {
        self.states.get_index_of(items)
    }

    pub fn transitions(&self, id: StateId) -> &BTreeMap<usize, StateId> {
        &self.transitions[id]
    }

    pub fn transition(&self, id: StateId, sym: usize) -> Option<StateId> {
        self.transitions[id].get(&sym).copied()
    }

    pub fn kernel(&self, id: StateId) -> impl Iterator<Item = &Item> {
        self.states[id].iter().filter(|item| item.is_kernel())
    }

    /// States holding `S' -> S•`.
    pub fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, set)| set.contains(&Item { prod: 0, dot: 1 }))
            .map(|(id, _)| id)
    }

    /// True if both transition graphs are equal up to renaming states.
    pub fn is_isomorphic(&self, other: &CanonicalCollection) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut map: Vec<Option<StateId>> = vec![None; self.len()];
        let mut used = vec![false; other.len()];
        let mut queue = VecDeque::from([(0, 0)]);
        map[0] = Some(0);
        used[0] = true;
        while let Some((a, b)) = queue.pop_front() {
            let (ta, tb) = (&self.transitions[a], &other.transitions[b]);
            if ta.len() != tb.len() {
                return false;
            }
            for ((sa, &na), (sb, &nb)) in ta.iter().zip(tb.iter()) {
                if sa != sb {
                    return false;
                }
                match map[na] {
                    Some(m) if m != nb => return false,
                    Some(_) => {}
                    None => {
                        if used[nb] {
                            return false;
                        }
                        map[na] = Some(nb);
                        used[nb] = true;
                        queue.push_back((na, nb));
                    }
                }
            }
        }
        map.iter().all(Option::is_some)
    }
}
