//! Lexer generator.
//!
//! Compiles an ordered rule list (pattern + optional action text) into a
//! [`Dfa`] whose accepting states carry the [`RuleId`] of the rule they
//! recognize. The pipeline is:
//!
//! 1. [`regex`]: each pattern to postfix, joined as `(P0 #0) | (P1 #1) | ...`
//! 2. [`syntax_tree`]: annotated tree, then the followpos table
//! 3. [`direct_dfa`]: subset construction over positions
//! 4. [`minimize`]: pruning and partition refinement (optional)
//!
//! Rule files are read by [`parse_rules`]; [`generate`] runs the whole
//! pipeline from a file.

pub mod direct_dfa;
pub mod minimize;
pub mod regex;
mod spec;
pub mod syntax_tree;

pub use direct_dfa::{DirectDfa, DirectState};
pub use minimize::{minimize, prune};
pub use self::regex::{Postfix, RegexError};
pub use spec::{LexSpec, parse_rules};
pub use syntax_tree::{PositionTable, SyntaxTree};

use anyhow::{Context, Result};
use scanpar::{ActionTable, Dfa, DfaError, RuleId, Tokenized};
use smartstring::alias::String as SmartString;
use std::path::Path;
use thiserror::Error;

/// One lexer rule. Declaration order is priority: on equal-length matches
/// the earlier rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    /// Action text; `None` means match and discard.
    pub action: Option<String>,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, action: Option<&str>) -> Self {
        Self {
            pattern: pattern.into(),
            action: action.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerOptions {
    /// Prune and minimize the direct DFA.
    pub minimize: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self { minimize: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Regex(#[from] RegexError),

    #[error(
        "minimization merged states with different rules into block {block} ({first:?} vs {second:?})"
    )]
    InconsistentBlock {
        block: usize,
        first: Option<RuleId>,
        second: Option<RuleId>,
    },

    #[error(transparent)]
    Dfa(#[from] DfaError),

    #[error("no rules to compile")]
    NoRules,
}

/// A DFA together with the rules it was built from.
#[derive(Debug, Clone)]
pub struct CompiledLexer {
    pub dfa: Dfa,
    pub rules: Vec<Rule>,
}

impl CompiledLexer {
    pub fn n_rules(&self) -> usize {
        self.rules.len()
    }

    /// Action table where each rule's action text names the token it emits.
    pub fn action_table(&self) -> ActionTable<SmartString> {
        let actions: Vec<Option<&str>> = self.rules.iter().map(|r| r.action.as_deref()).collect();
        ActionTable::token_names(&actions)
    }

    /// Scans `input` and returns the emitted token names.
    pub fn tokenize(&self, input: &str) -> Result<Tokenized<SmartString>> {
        let mut actions = self.action_table();
        scanpar::tokenize(&self.dfa, input, &mut actions)
    }
}

/// Builds the unminimized DFA with position sets attached.
pub fn build_direct_dfa(rules: &[Rule]) -> Result<DirectDfa, BuildError> {
    if rules.is_empty() {
        return Err(BuildError::NoRules);
    }
    let patterns: Vec<&str> = rules.iter().map(|r| r.pattern.as_str()).collect();
    let table = PositionTable::compile_rules(&patterns)?;
    Ok(DirectDfa::build(&table))
}

pub fn compile_lexer(rules: &[Rule], options: &LexerOptions) -> Result<CompiledLexer, BuildError> {
    let direct = build_direct_dfa(rules)?;
    let dfa = direct.to_dfa()?;
    let dfa = if options.minimize { minimize(&dfa)? } else { dfa };
    log::debug!(
        "lexer: {} rules, {} direct states, {} final states, {} transitions",
        rules.len(),
        direct.len(),
        dfa.len(),
        dfa.transition_count()
    );
    Ok(CompiledLexer {
        dfa,
        rules: rules.to_vec(),
    })
}

/// Reads a rule file and compiles it.
pub fn generate<P: AsRef<Path>>(spec_path: P, options: &LexerOptions) -> Result<CompiledLexer> {
    let path = spec_path.as_ref();
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read rule file {}", path.display()))?;
    let spec = parse_rules(&src).with_context(|| format!("in {}", path.display()))?;
    log::info!(
        "{}: rule set {:?} with {} rules",
        path.display(),
        spec.name,
        spec.rules.len()
    );
    compile_lexer(&spec.rules, options).with_context(|| format!("compiling {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn arith() -> Vec<Rule> {
        vec![
            Rule::new("['0'-'9']+", Some("NUMBER")),
            Rule::new("['a'-'z']['a'-'z' '0'-'9']*", Some("return ID;")),
            Rule::new("'+'", Some("\"PLUS\"")),
            Rule::new("'*'", Some("TIMES")),
            Rule::new("[' ' '\\t' '\\n']+", None),
        ]
    }

    #[test]
    fn scans_a_token_stream() {
        init_logger();
        let lexer = compile_lexer(&arith(), &LexerOptions::default()).unwrap();
        assert_eq!(lexer.n_rules(), 5);
        let out = lexer.tokenize("x1 + 42*y\n").unwrap();
        assert!(out.is_clean());
        let names: Vec<&str> = out.tokens.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, ["ID", "PLUS", "NUMBER", "TIMES", "ID"]);
    }

    #[test]
    fn lexical_errors_do_not_stop_the_scan() {
        init_logger();
        let lexer = compile_lexer(&arith(), &LexerOptions::default()).unwrap();
        let out = lexer.tokenize("1 ? 2").unwrap();
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].ch, '?');
        assert_eq!(out.errors[0].offset, 2);
        assert_eq!(out.tokens.len(), 2);
    }

    #[test]
    fn minimization_is_optional() {
        init_logger();
        let rules = vec![Rule::new("ab|cb", Some("X"))];
        let raw = compile_lexer(&rules, &LexerOptions { minimize: false }).unwrap();
        let min = compile_lexer(&rules, &LexerOptions::default()).unwrap();
        assert_eq!(raw.dfa.len(), 4);
        assert_eq!(min.dfa.len(), 3);
        for s in ["ab", "cb", "a", "abb"] {
            assert_eq!(raw.dfa.accepts(s), min.dfa.accepts(s), "{s}");
        }
    }

    #[test]
    fn build_errors_carry_the_rule() {
        assert_eq!(
            compile_lexer(&[], &LexerOptions::default()).unwrap_err(),
            BuildError::NoRules
        );
        let rules = vec![Rule::new("a", None), Rule::new("b.c", None)];
        match compile_lexer(&rules, &LexerOptions::default()).unwrap_err() {
            BuildError::Regex(e) => {
                assert_eq!(e.rule(), Some(1));
                assert_eq!(e.offset(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn generates_from_a_rule_file() {
        init_logger();
        let path = std::env::temp_dir().join(format!("scanpar-lexgen-{}.yal", std::process::id()));
        std::fs::write(
            &path,
            "let d = ['0'-'9']\nrule main =\n  {{d}}+ { INT }\n| ' ' \n",
        )
        .unwrap();
        let lexer = generate(&path, &LexerOptions::default()).unwrap();
        std::fs::remove_file(&path).unwrap();
        let out = lexer.tokenize("12 3").unwrap();
        let names: Vec<&str> = out.tokens.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, ["INT", "INT"]);
    }

    #[test]
    fn reads_a_yalex_file_with_bare_references() {
        init_logger();
        let path = std::env::temp_dir().join(format!("scanpar-yalex-{}.yal", std::process::id()));
        std::fs::write(
            &path,
            "{ header }\n\
             let delim = [' ''\\t''\\n']\n\
             let ws = delim+\n\
             let letter = ['A'-'Z''a'-'z']\n\
             let digit = ['0'-'9']\n\
             let id = letter(letter|digit)*\n\
             let number = digit+\n\
             rule tokens =\n\
             ws\n\
             | \"if\"     { return IF }\n\
             | id       { return ID }\n\
             | number   { return NUMBER }\n\
             | '+'      { return PLUS }\n\
             { trailer }\n",
        )
        .unwrap();
        let lexer = generate(&path, &LexerOptions::default()).unwrap();
        std::fs::remove_file(&path).unwrap();
        let out = lexer.tokenize("if x1 +\t42 iffy\n").unwrap();
        assert!(out.is_clean());
        let names: Vec<&str> = out.tokens.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, ["IF", "ID", "PLUS", "NUMBER", "ID"]);
    }

    /// Pattern over {a, b, c} in both our syntax and `regex` crate syntax.
    fn pattern() -> impl Strategy<Value = (String, String)> {
        let leaf = prop_oneof![Just("a"), Just("b"), Just("c")]
            .prop_map(|s| (s.to_string(), s.to_string()));
        leaf.prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone())
                    .prop_map(|((a, ra), (b, rb))| (format!("({a})({b})"), format!("(?:{ra})(?:{rb})"))),
                (inner.clone(), inner.clone())
                    .prop_map(|((a, ra), (b, rb))| (format!("({a}|{b})"), format!("(?:{ra}|{rb})"))),
                inner.clone().prop_map(|(a, ra)| (format!("({a})*"), format!("(?:{ra})*"))),
                inner.clone().prop_map(|(a, ra)| (format!("({a})+"), format!("(?:{ra})+"))),
                inner.prop_map(|(a, ra)| (format!("({a})?"), format!("(?:{ra})?"))),
            ]
        })
    }

    proptest! {
        #[test]
        fn dfa_agrees_with_regex_crate((ours, theirs) in pattern(), inputs in prop::collection::vec("[abc]{0,6}", 1..12)) {
            let oracle = ::regex::Regex::new(&format!("^(?:{theirs})$")).unwrap();
            let rules = vec![Rule::new(ours.clone(), Some("T"))];
            let raw = compile_lexer(&rules, &LexerOptions { minimize: false }).unwrap();
            let min = compile_lexer(&rules, &LexerOptions::default()).unwrap();
            for input in &inputs {
                let expected = oracle.is_match(input).then_some(RuleId(0));
                prop_assert_eq!(raw.dfa.accepts(input), expected, "{} on {:?}", ours, input);
                prop_assert_eq!(min.dfa.accepts(input), expected, "{} on {:?}", ours, input);
            }
        }

        #[test]
        fn minimization_is_idempotent((ours, _) in pattern(), (other, _) in pattern()) {
            let rules = vec![Rule::new(ours, Some("A")), Rule::new(other, Some("B"))];
            let once = compile_lexer(&rules, &LexerOptions::default()).unwrap().dfa;
            let twice = minimize(&once).unwrap();
            prop_assert_eq!(once.len(), twice.len());
            prop_assert!(once.is_isomorphic(&twice));
        }
    }
}
