use super::lexer::Token;
use chumsky::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    /// `%token A B ...`
    Tokens(Vec<usize>),
    /// `IGNORE A B ...`
    Ignore(Vec<usize>),
}

/// `lhs : alt | alt ... ;`, each alternative a list of interned names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub lhs: usize,
    pub alternatives: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarFile {
    pub decls: Vec<Decl>,
    pub rules: Vec<RuleDef>,
}

pub fn parser<'a>() -> impl Parser<'a, &'a [Token], GrammarFile, extra::Err<Rich<'a, Token>>> {
    let ident = select! {
        Token::Ident(i) => i,
    }
    .labelled("name");

    let names = ident.clone().repeated().at_least(1).collect::<Vec<_>>();

    let decl = just(Token::TokenDecl)
        .ignore_then(names.clone())
        .map(Decl::Tokens)
        .or(just(Token::Ignore).ignore_then(names).map(Decl::Ignore))
        .labelled("declaration");

    let symbol = select! {
        Token::Ident(i) => Some(i),
        Token::Epsilon => None,
    }
    .labelled("symbol");

    let alternative = symbol
        .repeated()
        .collect::<Vec<_>>()
        .map(|syms| syms.into_iter().flatten().collect::<Vec<_>>());

    let rule = ident
        .then_ignore(just(Token::Colon))
        .then(
            alternative
                .separated_by(just(Token::Bar))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then_ignore(just(Token::Semi))
        .map(|(lhs, alternatives)| RuleDef { lhs, alternatives })
        .labelled("production");

    decl.repeated()
        .collect::<Vec<_>>()
        .then_ignore(just(Token::Separator))
        .then(rule.repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(decls, rules)| GrammarFile { decls, rules })
}
