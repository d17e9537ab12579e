//! Maximal-munch scanner over a compiled [`Dfa`].
//!
//! From the current position the scanner walks DFA transitions one character
//! at a time and remembers the last position at which it *entered* an
//! accepting state. When the walk stops (no transition, or end of input) it
//! emits the longest remembered match and resumes right after it. If no
//! accepting state was entered, it reports a [`LexicalError`] for the first
//! character, skips exactly that character and continues.
//!
//! Equal-length ties between rules are already resolved inside the DFA (the
//! earliest declared rule is bound to the state), so the scanner never
//! compares rules.
//!
//! Rule actions are not part of the automaton. The host maps each
//! [`RuleId`] to a callback through the [`Actions`] trait, usually with an
//! [`ActionTable`].

use crate::cursor::Cursor;
use crate::dfa::{Dfa, RuleId};
use crate::error::{LexicalError, Span};
use anyhow::{Context, Result, bail};
use smartstring::alias::String;
use std::fmt;
use std::iter::FusedIterator;

/// A matched piece of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'i> {
    /// Rule bound to the accepting state that ended the match.
    pub rule: RuleId,
    /// Matched text.
    pub text: &'i str,
    /// Byte offset of the first matched character.
    pub offset: usize,
    pub span: Span,
}

/// One step of scanner output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent<'i> {
    Match(Lexeme<'i>),
    Error(LexicalError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerStats {
    /// Characters consumed, by matches and by error resynchronization.
    pub chars: usize,
    pub matches: usize,
    pub errors: usize,
}

/// Iterator of [`ScanEvent`]s over one input string.
#[derive(Debug, Clone)]
pub struct Scanner<'d, 'i> {
    dfa: &'d Dfa,
    input: &'i str,
    cursor: Cursor,
    stats: ScannerStats,
}

impl<'d, 'i> Scanner<'d, 'i> {
    pub fn new(dfa: &'d Dfa, input: &'i str) -> Self {
        Self {
            dfa,
            input,
            cursor: Cursor::new(),
            stats: ScannerStats::default(),
        }
    }

    pub fn stats(&self) -> &ScannerStats {
        &self.stats
    }

    /// Unscanned remainder of the input.
    pub fn rest(&self) -> &'i str {
        &self.input[self.cursor.offset..]
    }

    /// Length in bytes of the longest prefix of `rest` that ends in an
    /// accepting state, with the rule bound to that state.
    fn longest_match(&self, rest: &str) -> Option<(RuleId, usize)> {
        let mut state = self.dfa.start();
        let mut last = None;
        for (i, ch) in rest.char_indices() {
            let Some(next) = self.dfa.next(state, ch) else {
                break;
            };
            state = next;
            if let Some(rule) = self.dfa.rule(state) {
                last = Some((rule, i + ch.len_utf8()));
            }
        }
        last
    }
}

impl<'i> Iterator for Scanner<'_, 'i> {
    type Item = ScanEvent<'i>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest();
        let first = rest.chars().next()?;
        let offset = self.cursor.offset;

        match self.longest_match(rest) {
            Some((rule, len)) => {
                let text = &rest[..len];
                let span = self.cursor.advance_str(text);
                self.stats.matches += 1;
                self.stats.chars += text.chars().count();
                log::trace!("MATCH rule {rule} {text:?} at {span}");
                Some(ScanEvent::Match(Lexeme {
                    rule,
                    text,
                    offset,
                    span,
                }))
            }
            None => {
                let err = LexicalError {
                    offset,
                    location: self.cursor.location,
                    ch: first,
                };
                self.cursor.advance(first);
                self.stats.errors += 1;
                self.stats.chars += 1;
                log::trace!("RESYNC after {first:?} at {}", err.location);
                Some(ScanEvent::Error(err))
            }
        }
    }
}

impl FusedIterator for Scanner<'_, '_> {}

/// Host-side mapping from a matched rule to an emitted token.
pub trait Actions {
    type Output;

    /// Runs the action for `lexeme.rule`. `Ok(None)` discards the lexeme.
    fn action(&mut self, lexeme: &Lexeme<'_>) -> Result<Option<Self::Output>>;
}

type Callback<T> = Box<dyn FnMut(&Lexeme<'_>) -> Result<Option<T>>>;

/// Side table of per-rule callbacks, indexed by [`RuleId`].
///
/// A rule without a registered callback discards what it matches.
pub struct ActionTable<T> {
    callbacks: Vec<Option<Callback<T>>>,
}

impl<T> ActionTable<T> {
    /// Creates a table with `n_rules` empty slots.
    pub fn new(n_rules: usize) -> Self {
        Self {
            callbacks: (0..n_rules).map(|_| None).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Installs the callback for `rule`, replacing any previous one.
    ///
    /// # Panics
    /// Panics if `rule` is out of range.
    pub fn register<F>(&mut self, rule: RuleId, f: F) -> &mut Self
    where
        F: FnMut(&Lexeme<'_>) -> Result<Option<T>> + 'static,
    {
        self.callbacks[rule.0] = Some(Box::new(f));
        self
    }
}

impl ActionTable<String> {
    /// Builds the common table where each rule's action text names the token
    /// to emit. `return NAME`, `NAME` and `"NAME"` all emit `NAME`; a missing
    /// or blank action discards the lexeme.
    pub fn token_names<S: AsRef<str>>(actions: &[Option<S>]) -> Self {
        let mut table = Self::new(actions.len());
        for (i, action) in actions.iter().enumerate() {
            let Some(name) = action.as_ref().map(|a| token_name(a.as_ref())) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let name = String::from(name);
            table.register(RuleId(i), move |_| Ok(Some(name.clone())));
        }
        table
    }
}

fn token_name(action: &str) -> &str {
    let action = action.trim();
    let action = action.strip_prefix("return").map_or(action, |rest| {
        // `returned` is a token name, not the keyword
        if rest.starts_with(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
            rest
        } else {
            action
        }
    });
    action
        .trim()
        .trim_end_matches(';')
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
}

impl<T> fmt::Debug for ActionTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: Vec<usize> = self
            .callbacks
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|_| i))
            .collect();
        f.debug_struct("ActionTable")
            .field("rules", &self.callbacks.len())
            .field("bound", &bound)
            .finish()
    }
}

impl<T> Actions for ActionTable<T> {
    type Output = T;

    fn action(&mut self, lexeme: &Lexeme<'_>) -> Result<Option<T>> {
        match self.callbacks.get_mut(lexeme.rule.0) {
            Some(Some(callback)) => callback(lexeme),
            Some(None) => Ok(None),
            None => bail!(
                "rule {} matched {:?} but the action table has only {} slots",
                lexeme.rule,
                lexeme.text,
                self.callbacks.len()
            ),
        }
    }
}

/// Result of scanning a whole input.
#[derive(Debug, Clone)]
pub struct Tokenized<T> {
    /// Action outputs, in input order.
    pub tokens: Vec<T>,
    /// Lexical errors, in input order. Scanning continued past each of them.
    pub errors: Vec<LexicalError>,
    pub stats: ScannerStats,
}

impl<T> Tokenized<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Scans `input` to the end, running `actions` on every match.
///
/// Lexical errors are collected, not returned as `Err`; only a failing action
/// aborts the scan.
pub fn tokenize<A: Actions>(dfa: &Dfa, input: &str, actions: &mut A) -> Result<Tokenized<A::Output>> {
    let mut scanner = Scanner::new(dfa, input);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for event in scanner.by_ref() {
        match event {
            ScanEvent::Match(lexeme) => {
                let out = actions.action(&lexeme).with_context(|| {
                    format!(
                        "action for rule {} failed on {:?} at {}",
                        lexeme.rule, lexeme.text, lexeme.span.start
                    )
                })?;
                tokens.extend(out);
            }
            ScanEvent::Error(err) => {
                log::warn!("{err}");
                errors.push(err);
            }
        }
    }
    let stats = scanner.stats().clone();
    log::debug!(
        "scanned {} chars: {} matches, {} tokens, {} errors",
        stats.chars,
        stats.matches,
        tokens.len(),
        stats.errors
    );
    Ok(Tokenized {
        tokens,
        errors,
        stats,
    })
}
