//! Regex source to postfix token stream.
//!
//! Four passes, each over a flat token vector:
//!
//! 1. [`tokenize`]: escapes, character classes, quoted strings and char
//!    literals, the `_` wildcard. Classes and strings become parenthesized
//!    groups of plain symbols, so later passes only see single characters and
//!    operators.
//! 2. [`rewrite_quantifiers`]: `X+` becomes `(X X*)` and `X?` becomes `(X|ε)`.
//! 3. [`insert_concatenation`]: makes concatenation an explicit operator.
//! 4. [`to_postfix`]: shunting-yard, precedence `| < · < *`.
//!
//! Supported syntax:
//!
//! | form            | meaning                                      |
//! |-----------------|----------------------------------------------|
//! | `a`             | the character `a`                            |
//! | `\x`            | `x` taken literally; `\s \t \n \r` are space, tab, newline, CR |
//! | `'c'`           | the character `c` (escapes allowed)          |
//! | `"abc"`         | the string `abc`; `""` is ε                  |
//! | `[...]`         | one of: quoted chars, strings, bare chars, ranges `a-z` |
//! | `_`             | any printable ASCII character (`' '..='~'`) |
//! | `ε`             | the empty string                             |
//! | `\| * + ? ( )`  | the usual operators                          |
//!
//! An unescaped `.` is reserved and rejected. Unquoted whitespace is not
//! significant, inside or outside classes.

use indexmap::IndexSet;
use scanpar::RuleId;
use std::fmt;
use thiserror::Error;

/// Regex syntax errors. Offsets count characters from the start of the
/// pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    #[error("unescaped '.' at offset {offset} (write \\. for a literal dot)")]
    ReservedDot { offset: usize },

    #[error("unterminated character class starting at offset {offset}")]
    UnterminatedClass { offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unterminated character literal starting at offset {offset}")]
    UnterminatedChar { offset: usize },

    #[error("dangling escape at offset {offset}")]
    UnterminatedEscape { offset: usize },

    #[error("empty character class at offset {offset}")]
    EmptyClass { offset: usize },

    #[error("invalid range in character class at offset {offset}")]
    InvalidRange { offset: usize },

    #[error("mismatched parenthesis at offset {offset}")]
    MismatchedParen { offset: usize },

    #[error("operator {op:?} at offset {offset} is missing an operand")]
    MissingOperand { offset: usize, op: char },

    #[error("empty pattern")]
    EmptyPattern { offset: usize },

    #[error("rule {rule}: {source}")]
    InRule {
        rule: usize,
        #[source]
        source: Box<RegexError>,
    },
}

impl RegexError {
    /// Character offset into the offending pattern.
    pub fn offset(&self) -> usize {
        match self {
            RegexError::ReservedDot { offset }
            | RegexError::UnterminatedClass { offset }
            | RegexError::UnterminatedString { offset }
            | RegexError::UnterminatedChar { offset }
            | RegexError::UnterminatedEscape { offset }
            | RegexError::EmptyClass { offset }
            | RegexError::InvalidRange { offset }
            | RegexError::MismatchedParen { offset }
            | RegexError::MissingOperand { offset, .. }
            | RegexError::EmptyPattern { offset } => *offset,
            RegexError::InRule { source, .. } => source.offset(),
        }
    }

    /// Index of the rule whose pattern failed, if compiled from a rule list.
    pub fn rule(&self) -> Option<usize> {
        match self {
            RegexError::InRule { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Symbol(char),
    Epsilon,
    /// End marker of a rule, appended after the rule's pattern.
    End(RuleId),
    Union,
    Concat,
    Star,
    Plus,
    Optional,
    LParen,
    RParen,
}

impl TokenKind {
    fn is_operand(self) -> bool {
        matches!(
            self,
            TokenKind::Symbol(_) | TokenKind::Epsilon | TokenKind::End(_)
        )
    }

    fn op_char(self) -> char {
        match self {
            TokenKind::Union => '|',
            TokenKind::Concat => '·',
            TokenKind::Star => '*',
            TokenKind::Plus => '+',
            TokenKind::Optional => '?',
            TokenKind::LParen => '(',
            TokenKind::RParen => ')',
            TokenKind::Symbol(c) => c,
            TokenKind::Epsilon => 'ε',
            TokenKind::End(_) => '#',
        }
    }

    fn precedence(self) -> u8 {
        match self {
            TokenKind::Union => 1,
            TokenKind::Concat => 2,
            TokenKind::Star => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Symbol(c) if c.is_ascii_graphic() => write!(f, "{c}"),
            TokenKind::Symbol(c) => write!(f, "{}", c.escape_debug()),
            TokenKind::End(rule) => write!(f, "#{}", rule.0),
            other => write!(f, "{}", other.op_char()),
        }
    }
}

/// A token with the character offset it came from (for error reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexToken {
    pub kind: TokenKind,
    pub offset: usize,
}

impl RegexToken {
    fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

fn unescape(ch: char) -> char {
    match ch {
        's' => ' ',
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        other => other,
    }
}

struct PatternReader {
    chars: Vec<char>,
    pos: usize,
    out: Vec<RegexToken>,
}

impl PatternReader {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn push(&mut self, kind: TokenKind, offset: usize) {
        self.out.push(RegexToken::new(kind, offset));
    }

    /// Reads the char after a backslash at `offset`.
    fn escaped(&mut self, offset: usize) -> Result<char, RegexError> {
        self.bump()
            .map(unescape)
            .ok_or(RegexError::UnterminatedEscape { offset })
    }

    /// Reads the rest of a char literal whose opening quote is at `offset`.
    fn char_literal(&mut self, offset: usize) -> Result<char, RegexError> {
        let ch = match self.bump() {
            Some('\\') => self.escaped(self.pos - 1)?,
            Some('\'') | None => return Err(RegexError::UnterminatedChar { offset }),
            Some(ch) => ch,
        };
        match self.bump() {
            Some('\'') => Ok(ch),
            _ => Err(RegexError::UnterminatedChar { offset }),
        }
    }

    /// Reads the rest of a string literal whose opening quote is at `offset`.
    fn string_literal(&mut self, offset: usize) -> Result<Vec<char>, RegexError> {
        let mut chars = Vec::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(chars),
                Some('\\') => chars.push(self.escaped(self.pos - 1)?),
                Some(ch) => chars.push(ch),
                None => return Err(RegexError::UnterminatedString { offset }),
            }
        }
    }

    /// Reads a class body after `[` at `offset`, up to and including `]`.
    fn class(&mut self, offset: usize) -> Result<IndexSet<char>, RegexError> {
        let mut set = IndexSet::new();
        // last single-char item, usable as a range start
        let mut last: Option<char> = None;
        let mut range_from: Option<(char, usize)> = None;
        loop {
            self.skip_whitespace();
            let at = self.pos;
            let single = match self.bump() {
                None => return Err(RegexError::UnterminatedClass { offset }),
                Some(']') => break,
                Some('-') if last.is_some() && range_from.is_none() => {
                    self.skip_whitespace();
                    if self.peek() == Some(']') {
                        Some('-')
                    } else {
                        range_from = last.take().map(|c| (c, at));
                        continue;
                    }
                }
                Some('\'') => Some(self.char_literal(at)?),
                Some('\\') => Some(self.escaped(at)?),
                Some('"') => {
                    if range_from.is_some() {
                        return Err(RegexError::InvalidRange { offset: at });
                    }
                    set.extend(self.string_literal(at)?);
                    last = None;
                    None
                }
                Some(ch) => Some(ch),
            };
            let Some(ch) = single else { continue };
            match range_from.take() {
                Some((from, dash)) => {
                    if from > ch {
                        return Err(RegexError::InvalidRange { offset: dash });
                    }
                    set.extend(from..=ch);
                    last = None;
                }
                None => {
                    set.insert(ch);
                    last = Some(ch);
                }
            }
        }
        if let Some((_, dash)) = range_from {
            return Err(RegexError::InvalidRange { offset: dash });
        }
        if set.is_empty() {
            return Err(RegexError::EmptyClass { offset });
        }
        Ok(set)
    }

    /// Emits `( c1 | c2 | ... )`.
    fn alternation<I: IntoIterator<Item = char>>(&mut self, chars: I, offset: usize) {
        self.push(TokenKind::LParen, offset);
        for (i, ch) in chars.into_iter().enumerate() {
            if i > 0 {
                self.push(TokenKind::Union, offset);
            }
            self.push(TokenKind::Symbol(ch), offset);
        }
        self.push(TokenKind::RParen, offset);
    }

    /// Emits `( c1 c2 ... )`, or ε for an empty string.
    fn sequence(&mut self, chars: Vec<char>, offset: usize) {
        if chars.is_empty() {
            self.push(TokenKind::Epsilon, offset);
            return;
        }
        self.push(TokenKind::LParen, offset);
        for ch in chars {
            self.push(TokenKind::Symbol(ch), offset);
        }
        self.push(TokenKind::RParen, offset);
    }
}

/// Splits a pattern into tokens, expanding classes, strings and `_`.
pub fn tokenize(pattern: &str) -> Result<Vec<RegexToken>, RegexError> {
    let mut r = PatternReader {
        chars: pattern.chars().collect(),
        pos: 0,
        out: Vec::new(),
    };
    while let Some(ch) = r.bump() {
        let at = r.pos - 1;
        match ch {
            '\\' => {
                let ch = r.escaped(at)?;
                r.push(TokenKind::Symbol(ch), at);
            }
            '[' => {
                let set = r.class(at)?;
                r.alternation(set, at);
            }
            '"' => {
                let chars = r.string_literal(at)?;
                r.sequence(chars, at);
            }
            '\'' => {
                let ch = r.char_literal(at)?;
                r.push(TokenKind::Symbol(ch), at);
            }
            '_' => r.alternation(' '..='~', at),
            '.' => return Err(RegexError::ReservedDot { offset: at }),
            'ε' => r.push(TokenKind::Epsilon, at),
            '|' => r.push(TokenKind::Union, at),
            '*' => r.push(TokenKind::Star, at),
            '+' => r.push(TokenKind::Plus, at),
            '?' => r.push(TokenKind::Optional, at),
            '(' => r.push(TokenKind::LParen, at),
            ')' => r.push(TokenKind::RParen, at),
            ch if ch.is_whitespace() => {}
            ch => r.push(TokenKind::Symbol(ch), at),
        }
    }
    Ok(r.out)
}

/// Start index of the operand that ends at `end`, scanning backward.
fn operand_start(tokens: &[RegexToken], end: usize) -> Option<usize> {
    match tokens[end].kind {
        kind if kind.is_operand() => Some(end),
        TokenKind::Star if end > 0 => operand_start(tokens, end - 1),
        TokenKind::RParen => {
            let mut depth = 0usize;
            for i in (0..=end).rev() {
                match tokens[i].kind {
                    TokenKind::RParen => depth += 1,
                    TokenKind::LParen => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(i);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

/// Rewrites `X+` to `(X X*)` and `X?` to `(X|ε)`.
pub fn rewrite_quantifiers(tokens: Vec<RegexToken>) -> Result<Vec<RegexToken>, RegexError> {
    let mut out: Vec<RegexToken> = Vec::with_capacity(tokens.len());
    for tok in tokens {
        let (TokenKind::Plus | TokenKind::Optional) = tok.kind else {
            out.push(tok);
            continue;
        };
        let missing = RegexError::MissingOperand {
            offset: tok.offset,
            op: tok.kind.op_char(),
        };
        let Some(last) = out.len().checked_sub(1) else {
            return Err(missing);
        };
        let start = operand_start(&out, last).ok_or(missing)?;
        let operand = out.split_off(start);
        out.push(RegexToken::new(TokenKind::LParen, tok.offset));
        out.extend_from_slice(&operand);
        if tok.kind == TokenKind::Plus {
            out.extend_from_slice(&operand);
            out.push(RegexToken::new(TokenKind::Star, tok.offset));
        } else {
            out.push(RegexToken::new(TokenKind::Union, tok.offset));
            out.push(RegexToken::new(TokenKind::Epsilon, tok.offset));
        }
        out.push(RegexToken::new(TokenKind::RParen, tok.offset));
    }
    Ok(out)
}

/// Inserts explicit [`TokenKind::Concat`] between adjacent operands.
pub fn insert_concatenation(tokens: Vec<RegexToken>) -> Vec<RegexToken> {
    let mut out: Vec<RegexToken> = Vec::with_capacity(tokens.len() * 2);
    for tok in tokens {
        if let Some(prev) = out.last() {
            let left = prev.kind.is_operand()
                || matches!(
                    prev.kind,
                    TokenKind::Star | TokenKind::Plus | TokenKind::Optional | TokenKind::RParen
                );
            let right = tok.kind.is_operand() || tok.kind == TokenKind::LParen;
            if left && right {
                out.push(RegexToken::new(TokenKind::Concat, tok.offset));
            }
        }
        out.push(tok);
    }
    out
}

/// Shunting-yard conversion to postfix. Also checks operator arity, so the
/// result is a well-formed postfix expression.
pub fn to_postfix(tokens: &[RegexToken]) -> Result<Vec<RegexToken>, RegexError> {
    let mut output: Vec<RegexToken> = Vec::with_capacity(tokens.len());
    let mut ops: Vec<RegexToken> = Vec::new();
    // operand count the output would leave on an evaluation stack
    let mut depth = 0usize;

    fn emit(
        output: &mut Vec<RegexToken>,
        depth: &mut usize,
        tok: RegexToken,
    ) -> Result<(), RegexError> {
        let need = match tok.kind {
            TokenKind::Union | TokenKind::Concat => 2,
            TokenKind::Star => 1,
            _ => 0,
        };
        if *depth < need {
            return Err(RegexError::MissingOperand {
                offset: tok.offset,
                op: tok.kind.op_char(),
            });
        }
        *depth = *depth - need + 1;
        output.push(tok);
        Ok(())
    }

    for &tok in tokens {
        match tok.kind {
            TokenKind::Symbol(_) | TokenKind::Epsilon | TokenKind::End(_) => {
                emit(&mut output, &mut depth, tok)?
            }
            TokenKind::LParen => ops.push(tok),
            TokenKind::RParen => loop {
                match ops.pop() {
                    Some(RegexToken {
                        kind: TokenKind::LParen,
                        ..
                    }) => break,
                    Some(op) => emit(&mut output, &mut depth, op)?,
                    None => return Err(RegexError::MismatchedParen { offset: tok.offset }),
                }
            },
            TokenKind::Union | TokenKind::Concat | TokenKind::Star => {
                while let Some(&top) = ops.last() {
                    if top.kind == TokenKind::LParen
                        || top.kind.precedence() < tok.kind.precedence()
                    {
                        break;
                    }
                    ops.pop();
                    emit(&mut output, &mut depth, top)?;
                }
                ops.push(tok);
            }
            TokenKind::Plus | TokenKind::Optional => {
                // removed by rewrite_quantifiers
                return Err(RegexError::MissingOperand {
                    offset: tok.offset,
                    op: tok.kind.op_char(),
                });
            }
        }
    }
    while let Some(op) = ops.pop() {
        if op.kind == TokenKind::LParen {
            return Err(RegexError::MismatchedParen { offset: op.offset });
        }
        emit(&mut output, &mut depth, op)?;
    }

    match depth {
        1 => Ok(output),
        0 => Err(RegexError::EmptyPattern {
            offset: tokens.first().map_or(0, |t| t.offset),
        }),
        _ => Err(RegexError::MissingOperand {
            offset: tokens.first().map_or(0, |t| t.offset),
            op: '·',
        }),
    }
}

/// A compiled postfix token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postfix {
    tokens: Vec<TokenKind>,
}

impl Postfix {
    /// Compiles one pattern (no end marker).
    pub fn compile(pattern: &str) -> Result<Self, RegexError> {
        let tokens = tokenize(pattern)?;
        let tokens = rewrite_quantifiers(tokens)?;
        let tokens = insert_concatenation(tokens);
        let postfix = to_postfix(&tokens)?;
        Ok(Self {
            tokens: postfix.into_iter().map(|t| t.kind).collect(),
        })
    }

    /// Compiles an ordered rule list into `(P0 #0) | (P1 #1) | ...`, each
    /// pattern followed by its own end marker.
    pub fn compile_rules<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RegexError> {
        if patterns.is_empty() {
            return Err(RegexError::EmptyPattern { offset: 0 });
        }
        let mut tokens = Vec::new();
        for (i, pattern) in patterns.iter().enumerate() {
            let rule = Self::compile(pattern.as_ref()).map_err(|e| RegexError::InRule {
                rule: i,
                source: Box::new(e),
            })?;
            tokens.extend(rule.tokens);
            tokens.push(TokenKind::End(RuleId(i)));
            tokens.push(TokenKind::Concat);
            if i > 0 {
                tokens.push(TokenKind::Union);
            }
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[TokenKind] {
        &self.tokens
    }
}

impl fmt::Display for Postfix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tok) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{tok}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postfix(pattern: &str) -> String {
        Postfix::compile(pattern).unwrap().to_string()
    }

    fn kinds(pattern: &str) -> Vec<TokenKind> {
        tokenize(pattern)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn explicit_operators() {
        assert_eq!(postfix("a(b|c)*d"), "a b c | * · d ·");
        assert_eq!(postfix("ab|c"), "a b · c |");
        assert_eq!(postfix("a|bc*"), "a b c * · |");
    }

    #[test]
    fn quantifier_rewrites() {
        assert_eq!(postfix("ab+"), "a b b * · ·");
        assert_eq!(postfix("a?"), "a ε |");
        assert_eq!(postfix("(ab)+"), "a b · a b · * ·");
        assert_eq!(postfix("a*?"), "a * ε |");
    }

    #[test]
    fn escapes_and_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds(r"\.\s\n'\t'"),
            vec![Symbol('.'), Symbol(' '), Symbol('\n'), Symbol('\t')]
        );
        assert_eq!(kinds(r#""a|""#), vec![LParen, Symbol('a'), Symbol('|'), RParen]);
        assert_eq!(kinds(r#""""#), vec![Epsilon]);
        assert_eq!(kinds("a b"), vec![Symbol('a'), Symbol('b')]);
    }

    #[test]
    fn classes_expand_to_alternations() {
        use TokenKind::*;
        assert_eq!(
            kinds("['a'-'c' 'x']"),
            vec![
                LParen,
                Symbol('a'),
                Union,
                Symbol('b'),
                Union,
                Symbol('c'),
                Union,
                Symbol('x'),
                RParen
            ]
        );
        // duplicates collapse, bare chars and strings are allowed
        assert_eq!(
            kinds(r#"[a-b"ab+"]"#),
            vec![
                LParen,
                Symbol('a'),
                Union,
                Symbol('b'),
                Union,
                Symbol('+'),
                RParen
            ]
        );
        assert_eq!(
            kinds("['+' '-']"),
            vec![LParen, Symbol('+'), Union, Symbol('-'), RParen]
        );
        assert_eq!(kinds("[a-]").len(), 5);
    }

    #[test]
    fn wildcard_covers_printable_ascii() {
        let n = kinds("_")
            .into_iter()
            .filter(|k| matches!(k, TokenKind::Symbol(_)))
            .count();
        assert_eq!(n, 95);
    }

    #[test]
    fn errors_carry_offsets() {
        assert_eq!(
            Postfix::compile("ab.c"),
            Err(RegexError::ReservedDot { offset: 2 })
        );
        assert_eq!(
            Postfix::compile("x['a'"),
            Err(RegexError::UnterminatedClass { offset: 1 })
        );
        assert_eq!(
            Postfix::compile("x\"ab"),
            Err(RegexError::UnterminatedString { offset: 1 })
        );
        assert_eq!(
            Postfix::compile("ab\\"),
            Err(RegexError::UnterminatedEscape { offset: 2 })
        );
        assert_eq!(
            Postfix::compile("'ab'"),
            Err(RegexError::UnterminatedChar { offset: 0 })
        );
        assert_eq!(Postfix::compile("[ ]"), Err(RegexError::EmptyClass { offset: 0 }));
        assert_eq!(
            Postfix::compile("[z-a]"),
            Err(RegexError::InvalidRange { offset: 2 })
        );
        assert_eq!(
            Postfix::compile("(ab"),
            Err(RegexError::MismatchedParen { offset: 0 })
        );
        assert_eq!(
            Postfix::compile("ab)"),
            Err(RegexError::MismatchedParen { offset: 2 })
        );
        assert_eq!(
            Postfix::compile("+a"),
            Err(RegexError::MissingOperand { offset: 0, op: '+' })
        );
        assert_eq!(
            Postfix::compile("a|"),
            Err(RegexError::MissingOperand { offset: 1, op: '|' })
        );
        assert_eq!(Postfix::compile(""), Err(RegexError::EmptyPattern { offset: 0 }));
    }

    #[test]
    fn rules_get_end_markers() {
        let p = Postfix::compile_rules(&["a", "ab"]).unwrap();
        assert_eq!(p.to_string(), "a #0 · a b · #1 · |");
        let err = Postfix::compile_rules(&["a", "b.", "c"]).unwrap_err();
        assert_eq!(err.rule(), Some(1));
        assert_eq!(err.offset(), 1);
        assert!(err.to_string().starts_with("rule 1:"));
    }
}
