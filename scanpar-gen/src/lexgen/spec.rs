//! Reader for yalex-style rule files.
//!
//! ```text
//! { header code, skipped }
//! (* comment *)
//! let digit  = ['0'-'9']
//! let number = digit+
//! rule tokens =
//!     number            { NUMBER }
//!   | '+'               { PLUS }
//!   | [' ' '\t' '\n']
//! { trailer code, skipped }
//! ```
//!
//! Definitions are expanded as they are read, so a definition can only refer
//! to names defined above it. A bare word naming a definition expands to
//! `(value)`; any other word stays a run of literal characters. Quoted
//! literals, classes and escapes are never expanded. `{{name}}` is the strict
//! form of a reference and fails when `name` is not defined.

use super::Rule;
use crate::error::SpecError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static LET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*let\s+([A-Za-z_][A-Za-z0-9_]*)\s*=(.*)$"#).unwrap());

static RULE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*rule\s+([A-Za-z_][A-Za-z0-9_]*)[^=\n]*="#).unwrap()
});

/// A parsed rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexSpec {
    /// Name after `rule`.
    pub name: String,
    /// Definitions, already expanded, in declaration order.
    pub definitions: IndexMap<String, String>,
    /// Rules in declaration order, with references expanded.
    pub rules: Vec<Rule>,
}

fn line_at(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Index just past the closing quote of the literal opening at `i`.
fn skip_quoted(b: &[u8], i: usize) -> usize {
    let quote = b[i];
    let mut j = i + 1;
    while j < b.len() && b[j] != quote && b[j] != b'\n' {
        if b[j] == b'\\' {
            j += 1;
        }
        j += 1;
    }
    (j + 1).min(b.len())
}

/// Index of the `}` matching the `{` at `open`, counting nested braces.
fn matching_brace(b: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (j, &c) in b.iter().enumerate().skip(open) {
        match c {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

/// Blanks out `(* ... *)` comments, keeping newlines so offsets and line
/// numbers still match the source.
fn strip_comments(src: &str) -> Result<String, SpecError> {
    let b = src.as_bytes();
    let mut out = b.to_vec();
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'\\' => i += 2,
            b'\'' | b'"' => i = skip_quoted(b, i),
            b'(' if b.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                loop {
                    if i + 1 >= b.len() {
                        return Err(SpecError::UnterminatedComment {
                            line: line_at(src, start),
                        });
                    }
                    if b[i] == b'*' && b[i + 1] == b')' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                for c in &mut out[start..i] {
                    if *c != b'\n' {
                        *c = b' ';
                    }
                }
            }
            _ => i += 1,
        }
    }
    // only ASCII bytes were replaced, and only whole comments
    String::from_utf8(out).map_err(|e| SpecError::MalformedDefinition {
        line: 1,
        text: e.to_string(),
    })
}

/// Index just past the `]` closing the class that opens at `i`.
fn skip_class(b: &[u8], i: usize) -> usize {
    let mut j = i + 1;
    while j < b.len() && b[j] != b']' {
        match b[j] {
            b'\'' | b'"' => j = skip_quoted(b, j),
            b'\\' => j += 2,
            _ => j += 1,
        }
    }
    (j + 1).min(b.len())
}

fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Replaces definition references in `text` with `(value)`.
fn expand(text: &str, defs: &IndexMap<String, String>, line: usize) -> Result<String, SpecError> {
    let b = text.as_bytes();
    let char_len = |at: usize| text[at..].chars().next().map_or(1, char::len_utf8);
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < b.len() {
        let start = i;
        match b[i] {
            b'\\' => i += 1 + text[i + 1..].chars().next().map_or(0, char::len_utf8),
            b'\'' | b'"' => i = skip_quoted(b, i),
            b'[' => i = skip_class(b, i),
            b'{' if b.get(i + 1) == Some(&b'{') => {
                let Some(len) = text[i + 2..].find("}}") else {
                    return Err(SpecError::MalformedDefinition {
                        line,
                        text: text[i..].to_string(),
                    });
                };
                let name = text[i + 2..i + 2 + len].trim();
                let value = defs.get(name).ok_or_else(|| SpecError::UndefinedDefinition {
                    name: name.to_string(),
                    line,
                })?;
                out.push('(');
                out.push_str(value);
                out.push(')');
                i += 2 + len + 2;
                continue;
            }
            c if is_word_byte(c) => {
                let end = b[i..]
                    .iter()
                    .position(|&c| !is_word_byte(c))
                    .map_or(b.len(), |k| i + k);
                let word = &text[i..end];
                i = end;
                if let Some(value) = defs.get(word) {
                    out.push('(');
                    out.push_str(value);
                    out.push(')');
                    continue;
                }
            }
            _ => i += char_len(i),
        }
        out.push_str(&text[start..i]);
    }
    Ok(out)
}

fn parse_definitions(
    text: &str,
    start: usize,
    end: usize,
) -> Result<IndexMap<String, String>, SpecError> {
    // (name, value, line) before expansion
    let mut raw: Vec<(String, String, usize)> = Vec::new();
    let mut offset = start;
    for line in text[start..end].split_inclusive('\n') {
        let line_no = line_at(text, offset);
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(cap) = LET_RE.captures(line.trim_end_matches(['\r', '\n'])) {
            raw.push((cap[1].to_string(), cap[2].trim().to_string(), line_no));
            continue;
        }
        match raw.last_mut() {
            Some((_, value, _)) if !trimmed.starts_with("let") => {
                value.push(' ');
                value.push_str(trimmed);
            }
            _ => {
                return Err(SpecError::MalformedDefinition {
                    line: line_no,
                    text: trimmed.to_string(),
                });
            }
        }
    }

    let mut defs = IndexMap::new();
    for (name, value, line) in raw {
        if value.is_empty() {
            return Err(SpecError::MalformedDefinition {
                line,
                text: format!("let {name} ="),
            });
        }
        let value = expand(&value, &defs, line)?;
        if defs.insert(name.clone(), value).is_some() {
            log::warn!("line {line}: definition {name:?} redefined");
        }
    }
    Ok(defs)
}

/// One `pattern { action }` alternative, as byte ranges into the text.
struct RawAlternative {
    pattern: (usize, usize),
    action: Option<(usize, usize)>,
}

/// Splits the rule section on top-level `|`.
fn split_alternatives(
    text: &str,
    start: usize,
) -> Result<Vec<RawAlternative>, SpecError> {
    let b = text.as_bytes();
    let mut alts = Vec::new();
    let mut alt_start = start;
    let mut action: Option<(usize, usize)> = None;
    let (mut paren, mut bracket) = (0i32, 0i32);
    let mut i = start;

    let mut finish = |alt_start: usize, end: usize, action: Option<(usize, usize)>| {
        let pattern_end = action.map_or(end, |(open, _)| open - 1);
        alts.push(RawAlternative {
            pattern: (alt_start, pattern_end),
            action,
        });
    };

    while i < b.len() {
        let c = b[i];
        // only a bar or a trailing code block may follow an action
        if action.is_some() && !c.is_ascii_whitespace() && c != b'|' && c != b'{' {
            return Err(SpecError::MalformedRule {
                line: line_at(text, i),
                text: text[i..].lines().next().unwrap_or_default().to_string(),
            });
        }
        match c {
            b'\\' => {
                i += 2;
                continue;
            }
            b'\'' | b'"' => {
                i = skip_quoted(b, i);
                continue;
            }
            b'{' if b.get(i + 1) == Some(&b'{') => {
                i = text[i + 2..].find("}}").map_or(b.len(), |k| i + 2 + k + 2);
                continue;
            }
            b'{' => {
                let close = matching_brace(b, i).ok_or(SpecError::UnterminatedAction {
                    line: line_at(text, i),
                })?;
                if action.is_none() {
                    action = Some((i + 1, close));
                } else {
                    log::debug!("line {}: skipping trailing code block", line_at(text, i));
                }
                i = close + 1;
                continue;
            }
            b'(' => paren += 1,
            b')' => paren -= 1,
            b'[' => bracket += 1,
            b']' => bracket -= 1,
            b'|' if paren <= 0 && bracket <= 0 => {
                finish(alt_start, i, action.take());
                alt_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    finish(alt_start, b.len(), action);
    Ok(alts)
}

/// Parses a rule file into its expanded rule list.
pub fn parse_rules(src: &str) -> Result<LexSpec, SpecError> {
    let text = strip_comments(src)?;

    let mut defs_start = 0;
    let first = text.len() - text.trim_start().len();
    if text[first..].starts_with('{') {
        let close = matching_brace(text.as_bytes(), first).ok_or(SpecError::UnterminatedAction {
            line: line_at(&text, first),
        })?;
        log::debug!("skipping header block ({} bytes)", close - first + 1);
        defs_start = close + 1;
    }

    let rule = RULE_RE
        .captures_at(&text, defs_start)
        .ok_or(SpecError::MissingRuleSection)?;
    let (Some(header), Some(name)) = (rule.get(0), rule.get(1)) else {
        return Err(SpecError::MissingRuleSection);
    };

    let definitions = parse_definitions(&text, defs_start, header.start())?;

    let mut rules = Vec::new();
    let alts = split_alternatives(&text, header.end())?;
    let n_alts = alts.len();
    for (k, alt) in alts.into_iter().enumerate() {
        let (ps, pe) = alt.pattern;
        let pattern = text[ps..pe].trim();
        let line = line_at(&text, ps + (text[ps..pe].len() - text[ps..pe].trim_start().len()));
        if pattern.is_empty() {
            // `rule x = | a | b` has a leading bar
            if k == 0 && alt.action.is_none() && n_alts > 1 {
                continue;
            }
            return Err(SpecError::MissingPattern { line });
        }
        let action = alt
            .action
            .map(|(s, e)| text[s..e].trim().to_string())
            .filter(|a| !a.is_empty());
        rules.push(Rule {
            pattern: expand(pattern, &definitions, line)?,
            action,
        });
    }

    log::debug!(
        "rule file: {} definitions, {} rules in {:?}",
        definitions.len(),
        rules.len(),
        &name.as_str()
    );
    Ok(LexSpec {
        name: name.as_str().to_string(),
        definitions,
        rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARITH: &str = r#"
{ (* header *) import stuff }

(* digits and friends *)
let digit  = ['0'-'9']
let number = {{digit}}+
let ws     = [' ' '\t'
              '\n']

rule tokens =
    {{number}}          { return NUMBER }
  | '+'                 { PLUS }
  | '|'                 { BAR }
  | "(*"                { OPEN_COMMENT }
  | {{ws}}+
  | ['a'-'z' '|']+      { ID }

{ trailer { nested } }
"#;

    #[test]
    fn reads_definitions_and_rules() {
        let spec = parse_rules(ARITH).unwrap();
        assert_eq!(spec.name, "tokens");
        assert_eq!(spec.definitions.len(), 3);
        assert_eq!(spec.definitions["number"], "(['0'-'9'])+");
        assert_eq!(spec.definitions["ws"], "[' ' '\\t' '\\n']");

        let rules: Vec<(&str, Option<&str>)> = spec
            .rules
            .iter()
            .map(|r| (r.pattern.as_str(), r.action.as_deref()))
            .collect();
        assert_eq!(
            rules,
            vec![
                ("((['0'-'9'])+)", Some("return NUMBER")),
                ("'+'", Some("PLUS")),
                ("'|'", Some("BAR")),
                ("\"(*\"", Some("OPEN_COMMENT")),
                ("([' ' '\\t' '\\n'])+", None),
                ("['a'-'z' '|']+", Some("ID")),
            ]
        );
    }

    #[test]
    fn undefined_reference_reports_line() {
        let src = "let a = 'x'\nlet b = {{a}}{{c}}\nrule r = {{b}}";
        assert_eq!(
            parse_rules(src),
            Err(SpecError::UndefinedDefinition {
                name: "c".into(),
                line: 2
            })
        );
        // self reference is never defined yet
        let src = "let a = {{a}}'x'\nrule r = {{a}}";
        assert!(matches!(
            parse_rules(src),
            Err(SpecError::UndefinedDefinition { line: 1, .. })
        ));
        let src = "rule r =\n  'a'\n| {{nope}} { X }";
        assert_eq!(
            parse_rules(src),
            Err(SpecError::UndefinedDefinition {
                name: "nope".into(),
                line: 3
            })
        );
    }

    #[test]
    fn bare_names_refer_to_earlier_definitions() {
        let src = "let letter = ['a'-'z']\n\
                   let word = letter (letter | '_')*\n\
                   let ws = [' ' '\\t']+\n\
                   rule tokens = ws | word { return ID } | \"word\" { KW } | words { X } | [ws] { Y }";
        let spec = parse_rules(src).unwrap();
        assert_eq!(
            spec.definitions["word"],
            "(['a'-'z']) ((['a'-'z']) | '_')*"
        );
        let patterns: Vec<&str> = spec.rules.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(
            patterns,
            [
                "([' ' '\\t']+)",
                "((['a'-'z']) ((['a'-'z']) | '_')*)",
                "\"word\"",
                "words",
                "[ws]",
            ]
        );
        // a name is not visible before its definition
        let spec = parse_rules("let a = b 'x'\nlet b = 'y'\nrule r = a").unwrap();
        assert_eq!(spec.rules[0].pattern, "(b 'x')");
    }

    #[test]
    fn leading_bar_is_allowed() {
        let spec = parse_rules("rule r =\n | 'a' { A }\n | 'b' { B }").unwrap();
        assert_eq!(spec.rules.len(), 2);
    }

    #[test]
    fn reports_malformed_input() {
        assert_eq!(parse_rules("let a = 'x'"), Err(SpecError::MissingRuleSection));
        assert!(matches!(
            parse_rules("junk\nrule r = 'a'"),
            Err(SpecError::MalformedDefinition { line: 1, .. })
        ));
        assert!(matches!(
            parse_rules("let a =\nrule r = 'a'"),
            Err(SpecError::MalformedDefinition { line: 1, .. })
        ));
        assert_eq!(
            parse_rules("rule r = 'a' { A\n"),
            Err(SpecError::UnterminatedAction { line: 1 })
        );
        assert_eq!(
            parse_rules("rule r = 'a' | | 'b'"),
            Err(SpecError::MissingPattern { line: 1 })
        );
        assert!(matches!(
            parse_rules("rule r = 'a' { A } 'b'"),
            Err(SpecError::MalformedRule { line: 1, .. })
        ));
        assert_eq!(
            parse_rules("(* open\nrule r = 'a'"),
            Err(SpecError::UnterminatedComment { line: 1 })
        );
    }
}
