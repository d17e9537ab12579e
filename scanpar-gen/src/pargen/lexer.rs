//! Lexer for yapar-style grammar files.
//!
//! Built on [`logos`]. Whitespace and `/* ... */` comments are skipped;
//! names are interned in a [`LexContext`] so that the parser only sees
//! small copyable [`Token`]s. The line of every token is kept for error
//! messages.

use super::symtab::Symtab;
use crate::error::SpecError;
use logos::Logos;

/// Symbol table and token lines shared by the lexer and the parser.
#[derive(Default, Debug)]
pub struct LexContext {
    /// Every name seen, terminals and nonterminals alike.
    pub names: Symtab,

    /// 1-based line of each token, in token order.
    pub lines: Vec<usize>,
}

impl LexContext {
    pub fn name(&self, idx: usize) -> &str {
        self.names.sym(idx).unwrap_or("?")
    }

    /// Line of the token at `index`, or of the last token past the end.
    pub fn line(&self, index: usize) -> usize {
        self.lines
            .get(index)
            .or(self.lines.last())
            .copied()
            .unwrap_or(1)
    }
}

/// Tokens handed to the grammar parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// `%token`
    TokenDecl,

    /// `IGNORE`
    Ignore,

    /// `%%`, between declarations and productions.
    Separator,

    Colon,

    Bar,

    Semi,

    /// `ε`, an explicitly empty alternative.
    Epsilon,

    /// A terminal or nonterminal name, interned in [`LexContext::names`].
    Ident(usize),
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
enum LogosToken {
    #[token("\n")]
    LineFeed,

    #[token("/*", block_comment)]
    Comment,

    #[token("%token")]
    TokenDecl,

    #[token("IGNORE")]
    Ignore,

    #[token("%%")]
    Separator,

    #[token(":")]
    Colon,

    #[token("|")]
    Bar,

    #[token(";")]
    Semi,

    #[token("ε")]
    Epsilon,

    #[regex(r"[A-Za-z_][A-Za-z0-9_']*")]
    Ident,
}

/// Extends a `/*` match up to and including the closing `*/`. Fails when
/// the comment is never closed.
fn block_comment(lex: &mut logos::Lexer<LogosToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

pub struct Lexer<'source> {
    inner: logos::Lexer<'source, LogosToken>,
    line: usize,
}

impl<'source> Lexer<'source> {
    pub fn new(input: &'source str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            line: 1,
        }
    }

    /// Next token with its line, `None` at end of input.
    pub fn next_token(
        &mut self,
        ctx: &mut LexContext,
    ) -> Option<Result<(Token, usize), SpecError>> {
        while let Some(kind) = self.inner.next() {
            let slice = self.inner.slice();
            let line = self.line;
            let token = match kind {
                Ok(LogosToken::LineFeed) => {
                    self.line += 1;
                    continue;
                }
                Ok(LogosToken::Comment) => {
                    self.line += slice.matches('\n').count();
                    continue;
                }
                Ok(LogosToken::TokenDecl) => Token::TokenDecl,
                Ok(LogosToken::Ignore) => Token::Ignore,
                Ok(LogosToken::Separator) => Token::Separator,
                Ok(LogosToken::Colon) => Token::Colon,
                Ok(LogosToken::Bar) => Token::Bar,
                Ok(LogosToken::Semi) => Token::Semi,
                Ok(LogosToken::Epsilon) => Token::Epsilon,
                Ok(LogosToken::Ident) => Token::Ident(ctx.names.add(slice)),
                Err(()) => {
                    let rest = &self.inner.source()[self.inner.span().start..];
                    let err = if rest.starts_with("/*") {
                        SpecError::UnterminatedComment { line }
                    } else {
                        SpecError::LexicalError {
                            line,
                            text: slice.to_string(),
                        }
                    };
                    return Some(Err(err));
                }
            };
            return Some(Ok((token, line)));
        }
        None
    }

    /// Tokenizes the whole input, recording token lines in `ctx`.
    pub fn tokenize_all(input: &'source str, ctx: &mut LexContext) -> Result<Vec<Token>, SpecError> {
        let mut lex = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(next) = lex.next_token(ctx) {
            let (tok, line) = next?;
            out.push(tok);
            ctx.lines.push(line);
        }
        Ok(out)
    }
}
