//! Table-driven shift-reduce parser.
//!
//! The stack alternates states and grammar symbols and starts as `[0]`. For
//! each token the action cell `(top state, token)` decides:
//!
//! - `Shift(j)`: push the token, push `j`, advance the input;
//! - `Reduce(A -> β)`: pop `2·|β|` entries, push `A` and
//!   `goto[exposed state, A]`;
//! - `Accept`: done;
//! - empty cell: fail with [`ParseError::UnexpectedToken`].
//!
//! There is no error recovery and no backtracking. Tokens in the table's
//! ignore-set are dropped before they reach the table.

use crate::error::ParseError;
use crate::table::{Action, END_MARKER, ParseTable, ProdId, StateId};
use smartstring::alias::String;
use std::fmt;

/// One action taken by the parser, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStep {
    Shift { symbol: String, state: StateId },
    Reduce { production: ProdId },
    Accept,
}

impl ParseStep {
    /// Human-readable form, with reductions spelled out as productions.
    pub fn render(&self, table: &ParseTable) -> String {
        match self {
            ParseStep::Shift { symbol, .. } => format!("shift {symbol}").into(),
            ParseStep::Reduce { production } => {
                format!("reduce {}", table.production(*production)).into()
            }
            ParseStep::Accept => "accept".into(),
        }
    }
}

impl fmt::Display for ParseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseStep::Shift { symbol, state } => write!(f, "shift {symbol} -> {state}"),
            ParseStep::Reduce { production } => write!(f, "reduce r{production}"),
            ParseStep::Accept => write!(f, "accept"),
        }
    }
}

/// Grammar symbol on the parser stack, as a table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSymbol {
    Terminal(usize),
    Nonterminal(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEntry {
    State(StateId),
    Symbol(StackSymbol),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Tokens read, not counting ignored ones.
    pub tokens: usize,
    /// Tokens dropped because they are in the ignore-set.
    pub ignored: usize,
    pub shifts: usize,
    pub reductions: usize,
}

/// Shift-reduce executor for one [`ParseTable`].
#[derive(Debug, Clone)]
pub struct Parser<'t> {
    table: &'t ParseTable,
    stack: Vec<StackEntry>,
    stats: ParserStats,
}

impl<'t> Parser<'t> {
    pub fn new(table: &'t ParseTable) -> Self {
        Self {
            table,
            stack: Vec::new(),
            stats: ParserStats::default(),
        }
    }

    pub fn table(&self) -> &'t ParseTable {
        self.table
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    /// Stack left by the last call to [`parse`](Self::parse). After a
    /// failure it shows where the parse stopped.
    pub fn stack(&self) -> &[StackEntry] {
        &self.stack
    }

    /// Parses a token stream and returns the steps taken.
    ///
    /// The end marker `$` is appended unless the (non-ignored) stream already
    /// ends with it. Tokens the table does not know fail like any other empty
    /// cell.
    pub fn parse<I, S>(&mut self, tokens: I) -> Result<Vec<ParseStep>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stack.clear();
        self.stack.push(StackEntry::State(0));
        self.stats = ParserStats::default();

        let mut input: Vec<(usize, String)> = Vec::new();
        let mut read = 0;
        for (index, token) in tokens.into_iter().enumerate() {
            read = index + 1;
            let token = token.as_ref();
            if self.table.is_ignored(token) {
                self.stats.ignored += 1;
                continue;
            }
            input.push((index, token.into()));
        }
        if input.last().is_none_or(|(_, t)| t.as_str() != END_MARKER) {
            input.push((read, END_MARKER.into()));
        }
        self.stats.tokens = input.len();

        let mut steps = Vec::new();
        let mut pos = 0;
        loop {
            let state = self.top_state()?;
            let (index, token) = input.get(pos).ok_or(ParseError::UnexpectedEnd)?;
            if log::log_enabled!(log::Level::Trace) {
                self.dump_stack(token);
            }
            let Some((terminal, action)) = self
                .table
                .terminal_index(token)
                .and_then(|t| self.table.action_at(state, t).map(|a| (t, a)))
            else {
                log::debug!("no action in state {state} for {token:?}");
                return Err(ParseError::UnexpectedToken {
                    state,
                    symbol: token.to_string(),
                    index: *index,
                });
            };

            match action {
                Action::Shift(next) => {
                    log::trace!("Shift {token:?} -> {next}");
                    self.stack
                        .push(StackEntry::Symbol(StackSymbol::Terminal(terminal)));
                    self.stack.push(StackEntry::State(next));
                    steps.push(ParseStep::Shift {
                        symbol: token.clone(),
                        state: next,
                    });
                    self.stats.shifts += 1;
                    pos += 1;
                }

                Action::Reduce(prod) => {
                    let production = self.table.production(prod);
                    log::trace!("Reduce r{prod}: {production}");
                    let pop = 2 * production.rhs.len();
                    if self.stack.len() <= pop {
                        return Err(ParseError::StackUnderflow);
                    }
                    self.stack.truncate(self.stack.len() - pop);
                    let exposed = self.top_state()?;
                    let lhs = self.table.production_lhs(prod);
                    let next = self.table.goto_at(exposed, lhs).ok_or_else(|| {
                        ParseError::MissingGoto {
                            state: exposed,
                            nonterminal: production.lhs.to_string(),
                        }
                    })?;
                    self.stack
                        .push(StackEntry::Symbol(StackSymbol::Nonterminal(lhs)));
                    self.stack.push(StackEntry::State(next));
                    steps.push(ParseStep::Reduce { production: prod });
                    self.stats.reductions += 1;
                }

                Action::Accept => {
                    log::trace!("Accept");
                    if pos + 1 < input.len() {
                        log::warn!(
                            "accepted with {} unread token(s) after {:?}",
                            input.len() - pos - 1,
                            END_MARKER
                        );
                    }
                    steps.push(ParseStep::Accept);
                    return Ok(steps);
                }
            }
        }
    }

    /// Returns `true` if the token stream parses.
    pub fn accepts<I, S>(&mut self, tokens: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parse(tokens).is_ok()
    }

    fn top_state(&self) -> Result<StateId, ParseError> {
        match self.stack.last() {
            Some(StackEntry::State(s)) => Ok(*s),
            _ => Err(ParseError::StackUnderflow),
        }
    }

    fn symbol_name(&self, sym: StackSymbol) -> &str {
        match sym {
            StackSymbol::Terminal(t) => self.table.terminals()[t].as_str(),
            StackSymbol::Nonterminal(n) => self.table.nonterminals()[n].as_str(),
        }
    }

    fn dump_stack(&self, incoming: &str) {
        let mut output = String::new();
        for entry in &self.stack {
            match *entry {
                StackEntry::State(s) => output.push_str(&format!("<{s}>  ")),
                StackEntry::Symbol(sym) => output.push_str(&format!("{}  ", self.symbol_name(sym))),
            }
        }
        output.push_str(&format!("<-  {incoming}"));
        log::trace!("{}", output);
    }
}
