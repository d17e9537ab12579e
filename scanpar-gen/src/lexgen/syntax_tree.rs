//! Annotated syntax tree and followpos table.
//!
//! The tree is built bottom-up from a [`Postfix`] stream. Every leaf gets the
//! next unused [`Position`] when it is created; since postfix keeps operands
//! in source order, positions number the leaves left to right and an earlier
//! rule's end marker always has a smaller position than a later one's.
//!
//! `nullable`, `firstpos` and `lastpos` are computed as each node is created.
//! `followpos` is a separate table indexed by position, filled by one more
//! traversal, and is all the DFA builder needs once the tree is dropped.

use super::regex::{Postfix, RegexError, TokenKind};
use scanpar::RuleId;
use std::collections::BTreeSet;

/// Identifier of a leaf occurrence in one compiled tree.
pub type Position = usize;

pub type PositionSet = BTreeSet<Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafSymbol {
    Char(char),
    End(RuleId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInfo {
    pub nullable: bool,
    pub firstpos: PositionSet,
    pub lastpos: PositionSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { symbol: LeafSymbol, position: Position },
    /// Explicit ε leaf. Takes no position.
    Epsilon,
    Concat(Box<Node>, Box<Node>),
    Union(Box<Node>, Box<Node>),
    Star(Box<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub info: NodeInfo,
}

impl Node {
    fn leaf(symbol: LeafSymbol, position: Position) -> Self {
        let pos = PositionSet::from([position]);
        Self {
            kind: NodeKind::Leaf { symbol, position },
            info: NodeInfo {
                nullable: false,
                firstpos: pos.clone(),
                lastpos: pos,
            },
        }
    }

    fn epsilon() -> Self {
        Self {
            kind: NodeKind::Epsilon,
            info: NodeInfo {
                nullable: true,
                ..Default::default()
            },
        }
    }

    fn union(l: Node, r: Node) -> Self {
        let info = NodeInfo {
            nullable: l.info.nullable || r.info.nullable,
            firstpos: l.info.firstpos.union(&r.info.firstpos).copied().collect(),
            lastpos: l.info.lastpos.union(&r.info.lastpos).copied().collect(),
        };
        Self {
            kind: NodeKind::Union(Box::new(l), Box::new(r)),
            info,
        }
    }

    fn concat(l: Node, r: Node) -> Self {
        let firstpos = if l.info.nullable {
            l.info.firstpos.union(&r.info.firstpos).copied().collect()
        } else {
            l.info.firstpos.clone()
        };
        let lastpos = if r.info.nullable {
            l.info.lastpos.union(&r.info.lastpos).copied().collect()
        } else {
            r.info.lastpos.clone()
        };
        let info = NodeInfo {
            nullable: l.info.nullable && r.info.nullable,
            firstpos,
            lastpos,
        };
        Self {
            kind: NodeKind::Concat(Box::new(l), Box::new(r)),
            info,
        }
    }

    fn star(c: Node) -> Self {
        let info = NodeInfo {
            nullable: true,
            firstpos: c.info.firstpos.clone(),
            lastpos: c.info.lastpos.clone(),
        };
        Self {
            kind: NodeKind::Star(Box::new(c)),
            info,
        }
    }
}

/// `followpos[p]` for every position `p` of one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowposTable(Vec<PositionSet>);

impl FollowposTable {
    pub fn get(&self, p: Position) -> &PositionSet {
        &self.0[p]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    root: Node,
    /// Leaf symbol of each position.
    symbols: Vec<LeafSymbol>,
}

impl SyntaxTree {
    /// Builds the tree on a single operand stack.
    pub fn from_postfix(postfix: &Postfix) -> Result<Self, RegexError> {
        let mut symbols: Vec<LeafSymbol> = Vec::new();
        let mut stack: Vec<Node> = Vec::new();

        for (i, &tok) in postfix.tokens().iter().enumerate() {
            let missing = |op| RegexError::MissingOperand { offset: i, op };
            let node = match tok {
                TokenKind::Symbol(c) => {
                    symbols.push(LeafSymbol::Char(c));
                    Node::leaf(LeafSymbol::Char(c), symbols.len() - 1)
                }
                TokenKind::End(rule) => {
                    symbols.push(LeafSymbol::End(rule));
                    Node::leaf(LeafSymbol::End(rule), symbols.len() - 1)
                }
                TokenKind::Epsilon => Node::epsilon(),
                TokenKind::Star => Node::star(stack.pop().ok_or(missing('*'))?),
                TokenKind::Union | TokenKind::Concat => {
                    let op = if tok == TokenKind::Union { '|' } else { '·' };
                    let r = stack.pop().ok_or(missing(op))?;
                    let l = stack.pop().ok_or(missing(op))?;
                    if tok == TokenKind::Union {
                        Node::union(l, r)
                    } else {
                        Node::concat(l, r)
                    }
                }
                TokenKind::Plus | TokenKind::Optional | TokenKind::LParen | TokenKind::RParen => {
                    return Err(missing('?'));
                }
            };
            stack.push(node);
        }

        let root = stack.pop().ok_or(RegexError::EmptyPattern { offset: 0 })?;
        if !stack.is_empty() {
            return Err(RegexError::MissingOperand {
                offset: postfix.tokens().len(),
                op: '·',
            });
        }
        Ok(Self { root, symbols })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of positions (leaves other than ε).
    pub fn n_positions(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol(&self, p: Position) -> LeafSymbol {
        self.symbols[p]
    }

    /// Computes the followpos table in one traversal of the tree.
    pub fn followpos(&self) -> FollowposTable {
        let mut table = vec![PositionSet::new(); self.symbols.len()];
        let mut pending: Vec<&Node> = vec![&self.root];
        while let Some(node) = pending.pop() {
            match &node.kind {
                NodeKind::Concat(l, r) => {
                    for &p in &l.info.lastpos {
                        table[p].extend(r.info.firstpos.iter().copied());
                    }
                    pending.push(l);
                    pending.push(r);
                }
                NodeKind::Star(c) => {
                    for &p in &node.info.lastpos {
                        table[p].extend(node.info.firstpos.iter().copied());
                    }
                    pending.push(c);
                }
                NodeKind::Union(l, r) => {
                    pending.push(l);
                    pending.push(r);
                }
                NodeKind::Leaf { .. } | NodeKind::Epsilon => {}
            }
        }
        FollowposTable(table)
    }

    /// Drops the tree and keeps what the DFA builder needs.
    pub fn into_positions(self) -> PositionTable {
        let followpos = self.followpos();
        let alphabet = self
            .symbols
            .iter()
            .filter_map(|s| match s {
                LeafSymbol::Char(c) => Some(*c),
                LeafSymbol::End(_) => None,
            })
            .collect();
        PositionTable {
            start: self.root.info.firstpos,
            symbols: self.symbols,
            followpos,
            alphabet,
        }
    }
}

/// Everything the direct DFA construction reads: the symbol at each
/// position, followpos, `firstpos(root)` and the input alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionTable {
    pub symbols: Vec<LeafSymbol>,
    pub followpos: FollowposTable,
    pub start: PositionSet,
    pub alphabet: BTreeSet<char>,
}

impl PositionTable {
    pub fn compile_rules<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RegexError> {
        let postfix = Postfix::compile_rules(patterns)?;
        Ok(SyntaxTree::from_postfix(&postfix)?.into_positions())
    }

    /// End-marker positions with their rules, in position order (which is
    /// rule declaration order).
    pub fn end_markers(&self) -> Vec<(Position, RuleId)> {
        self.symbols
            .iter()
            .enumerate()
            .filter_map(|(p, s)| match s {
                LeafSymbol::End(rule) => Some((p, *rule)),
                LeafSymbol::Char(_) => None,
            })
            .collect()
    }

    pub fn is_end_marker(&self, p: Position) -> bool {
        matches!(self.symbols[p], LeafSymbol::End(_))
    }
}
