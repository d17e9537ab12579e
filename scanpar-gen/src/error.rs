//! Errors raised while reading lexer and grammar description files.

use crate::pargen::GrammarError;
use thiserror::Error;

/// A malformed rule file or grammar file. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("line {line}: reference to undefined definition {name:?}")]
    UndefinedDefinition { name: String, line: usize },

    #[error("line {line}: malformed definition {text:?}")]
    MalformedDefinition { line: usize, text: String },

    #[error("line {line}: malformed rule {text:?}")]
    MalformedRule { line: usize, text: String },

    #[error("no `rule NAME =` section found")]
    MissingRuleSection,

    #[error("line {line}: rule alternative has no pattern")]
    MissingPattern { line: usize },

    #[error("line {line}: unterminated action block")]
    UnterminatedAction { line: usize },

    #[error("line {line}: unterminated comment")]
    UnterminatedComment { line: usize },

    #[error("line {line}: unexpected input {text:?}")]
    LexicalError { line: usize, text: String },

    #[error("malformed grammar: {0}")]
    MalformedGrammar(String),

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}
