//! Single rules: matcher, replacement and file scope
//!
//! Pattern rules compile on the `regex` crate first. Patterns that need
//! backreferences or look-around fall back to `fancy-regex`.

use crate::domain::RuleKind;
use crate::error::RuleError;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// Numeric group references (`$1`, `${2}`) inside a replacement template.
static GROUP_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(?:\{(\d+)\}|(\d+))").expect("valid regex"));

/// An escaped dollar or a bare numeric reference, for bracing.
static BARE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$|\$(\d+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleScope {
    Global,
    /// Applies only to files whose basename equals this name.
    TargetedFile(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Literal(String),
    /// `$1` / `${name}` are expanded from the match.
    Template(String),
}

impl Replacement {
    pub fn text(&self) -> &str {
        match self {
            Replacement::Literal(text) | Replacement::Template(text) => text,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Pattern(Regex),
    Extended(fancy_regex::Regex),
}

impl Matcher {
    fn compile(id: &str, pattern: &str) -> Result<Self, RuleError> {
        match Regex::new(pattern) {
            Ok(re) => Ok(Matcher::Pattern(re)),
            Err(_) => fancy_regex::Regex::new(pattern)
                .map(Matcher::Extended)
                .map_err(|e| RuleError::InvalidPattern { id: id.to_string(), source: Box::new(e) }),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Matcher::Exact(text) => text,
            Matcher::Pattern(re) => re.as_str(),
            Matcher::Extended(re) => re.as_str(),
        }
    }

    /// Capture groups excluding the implicit whole-match group.
    fn group_count(&self) -> usize {
        match self {
            Matcher::Exact(_) => 0,
            Matcher::Pattern(re) => re.captures_len().saturating_sub(1),
            Matcher::Extended(re) => re.captures_len().saturating_sub(1),
        }
    }
}

/// Result of evaluating one rule against a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Hit { content: String, occurrences: usize },
    Miss,
}

#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    matcher: Matcher,
    replacement: Replacement,
    scope: RuleScope,
    requires: Option<String>,
    group: Option<String>,
}

impl Rule {
    /// Literal text rule. Occurrences embedded in a larger identifier are left alone.
    pub fn exact(
        id: impl Into<String>,
        text: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let text = text.into();
        if text.is_empty() {
            return Err(RuleError::EmptyMatcher { id });
        }
        Ok(Self::assemble(id, Matcher::Exact(text), Replacement::Literal(replacement.into())))
    }

    pub fn pattern(
        id: impl Into<String>,
        pattern: &str,
        replacement: Replacement,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        if pattern.is_empty() {
            return Err(RuleError::EmptyMatcher { id });
        }
        let matcher = Matcher::compile(&id, pattern)?;
        let replacement = match replacement {
            Replacement::Template(template) => {
                let template = brace_group_refs(&template);
                check_group_refs(&id, &template, matcher.group_count())?;
                Replacement::Template(template)
            }
            literal => literal,
        };
        Ok(Self::assemble(id, matcher, replacement))
    }

    fn assemble(id: String, matcher: Matcher, replacement: Replacement) -> Self {
        Self { id, matcher, replacement, scope: RuleScope::Global, requires: None, group: None }
    }

    pub fn scoped_to(mut self, file_name: impl Into<String>) -> Self {
        self.scope = RuleScope::TargetedFile(file_name.into());
        self
    }

    pub fn requiring(mut self, signature: impl Into<String>) -> Self {
        self.requires = Some(signature.into());
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> RuleKind {
        match self.matcher {
            Matcher::Exact(_) => RuleKind::Exact,
            Matcher::Pattern(_) | Matcher::Extended(_) => RuleKind::Pattern,
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    pub fn scope(&self) -> &RuleScope {
        &self.scope
    }

    pub fn requires(&self) -> Option<&str> {
        self.requires.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn applies_to(&self, file_name: &str) -> bool {
        match &self.scope {
            RuleScope::Global => true,
            RuleScope::TargetedFile(target) => target == file_name,
        }
    }

    /// Replace every occurrence in `content`, or report a miss.
    ///
    /// Only the extended engine can fail at match time (backtrack limit).
    pub fn evaluate(&self, content: &str) -> Result<Evaluation, fancy_regex::Error> {
        if let Some(signature) = &self.requires {
            if !content.contains(signature.as_str()) {
                return Ok(Evaluation::Miss);
            }
        }

        match &self.matcher {
            Matcher::Exact(text) => {
                let starts = exact_occurrences(content, text);
                if starts.is_empty() {
                    return Ok(Evaluation::Miss);
                }
                let replaced = splice(content, &starts, text.len(), self.replacement.text());
                Ok(Evaluation::Hit { content: replaced, occurrences: starts.len() })
            }
            Matcher::Pattern(re) => {
                let occurrences = re.find_iter(content).count();
                if occurrences == 0 {
                    return Ok(Evaluation::Miss);
                }
                let replaced = match &self.replacement {
                    Replacement::Literal(text) => re.replace_all(content, NoExpand(text)),
                    Replacement::Template(template) => re.replace_all(content, template.as_str()),
                };
                Ok(Evaluation::Hit { content: replaced.into_owned(), occurrences })
            }
            Matcher::Extended(re) => {
                let mut occurrences = 0;
                for found in re.find_iter(content) {
                    found?;
                    occurrences += 1;
                }
                if occurrences == 0 {
                    return Ok(Evaluation::Miss);
                }
                let replaced = match &self.replacement {
                    Replacement::Literal(text) => {
                        re.try_replacen(content, 0, fancy_regex::NoExpand(text))?
                    }
                    Replacement::Template(template) => {
                        re.try_replacen(content, 0, template.as_str())?
                    }
                };
                Ok(Evaluation::Hit { content: replaced.into_owned(), occurrences })
            }
        }
    }
}

/// Rewrite `$N` as `${N}`.
///
/// Both engines read the longest run of name characters after `$`, so
/// `$1localhost` would otherwise name a group `1localhost` and expand to nothing.
fn brace_group_refs(template: &str) -> String {
    BARE_REF
        .replace_all(template, |caps: &regex::Captures<'_>| match caps.get(1) {
            Some(digits) => format!("${{{}}}", digits.as_str()),
            None => "$$".to_string(),
        })
        .into_owned()
}

fn check_group_refs(id: &str, template: &str, available: usize) -> Result<(), RuleError> {
    let unescaped = template.replace("$$", "");
    for caps in GROUP_REF.captures_iter(&unescaped) {
        let Some(digits) = caps.get(1).or_else(|| caps.get(2)) else { continue };
        let Ok(group) = digits.as_str().parse::<usize>() else { continue };
        if group > available {
            return Err(RuleError::UnknownGroup { id: id.to_string(), group, available });
        }
    }
    Ok(())
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte offsets of `needle` in `haystack` that are not part of a larger identifier.
fn exact_occurrences(haystack: &str, needle: &str) -> Vec<usize> {
    let starts_ident = needle.chars().next().is_some_and(is_ident_char);
    let ends_ident = needle.chars().next_back().is_some_and(is_ident_char);

    haystack
        .match_indices(needle)
        .map(|(start, _)| start)
        .filter(|&start| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + needle.len()..].chars().next();
            let glued_before = starts_ident && before.is_some_and(is_ident_char);
            let glued_after = ends_ident && after.is_some_and(is_ident_char);
            !glued_before && !glued_after
        })
        .collect()
}

fn splice(haystack: &str, starts: &[usize], len: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    for &start in starts {
        out.push_str(&haystack[cursor..start]);
        out.push_str(replacement);
        cursor = start + len;
    }
    out.push_str(&haystack[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(eval: Evaluation) -> (String, usize) {
        match eval {
            Evaluation::Hit { content, occurrences } => (content, occurrences),
            Evaluation::Miss => panic!("expected a hit"),
        }
    }

    #[test]
    fn exact_rule_replaces_only_the_substring() {
        let rule = Rule::exact("badge", "Premium Only", "").expect("rule");
        let (out, n) = hit(rule.evaluate(r#"{"value":"Premium Only","x":1}"#).expect("eval"));
        assert_eq!(out, r#"{"value":"","x":1}"#);
        assert_eq!(n, 1);
    }

    #[test]
    fn exact_rule_skips_larger_identifiers() {
        let rule = Rule::exact("flag", "isPay", "true").expect("rule");
        let (out, n) = hit(rule.evaluate("a.isPay && isPayment && _isPay && isPay").expect("eval"));
        assert_eq!(out, "a.true && isPayment && _isPay && true");
        assert_eq!(n, 2);
    }

    #[test]
    fn exact_rule_treats_regex_metacharacters_literally() {
        let rule = Rule::exact("limit", "Database 5/3", "Database 10/10").expect("rule");
        let (out, _) = hit(rule.evaluate("Limits: Database 5/3.").expect("eval"));
        assert_eq!(out, "Limits: Database 10/10.");
        assert_eq!(rule.evaluate("Database 5x3").expect("eval"), Evaluation::Miss);
    }

    #[test]
    fn pattern_rule_replaces_every_occurrence() {
        let rule =
            Rule::pattern("neg", r"!(\w+)\.enabled", Replacement::Literal("false".into())).unwrap();
        let (out, n) = hit(rule.evaluate("if(!a.enabled||!b.enabled){}").expect("eval"));
        assert_eq!(out, "if(false||false){}");
        assert_eq!(n, 2);
    }

    #[test]
    fn template_expands_captures() {
        let rule = Rule::pattern(
            "swap",
            r"(\w+)=(\w+)",
            Replacement::Template("${2}=${1}".into()),
        )
        .unwrap();
        let (out, _) = hit(rule.evaluate("a=b; c=d").expect("eval"));
        assert_eq!(out, "b=a; d=c");
    }

    #[test]
    fn numeric_reference_followed_by_text_keeps_the_text() {
        let rule = Rule::pattern(
            "api",
            r#"(https?://|['"](https?://))database-client\.com/api/"#,
            Replacement::Template("$1localhost:1234/api/".into()),
        )
        .expect("rule");
        assert_eq!(rule.replacement().text(), "${1}localhost:1234/api/");

        let (out, n) = hit(rule.evaluate(r#"fetch("https://database-client.com/api/x")"#).unwrap());
        assert_eq!(out, r#"fetch("https://localhost:1234/api/x")"#);
        assert_eq!(n, 1);
    }

    #[test]
    fn bracing_leaves_escaped_dollars_alone() {
        assert_eq!(brace_group_refs("$$1 $2x ${3}y"), "$$1 ${2}x ${3}y");

        let rule =
            Rule::pattern("cost", r"(\d+)", Replacement::Template("$$$1USD".into())).expect("rule");
        let (out, _) = hit(rule.evaluate("cost 5").expect("eval"));
        assert_eq!(out, "cost $5USD");
    }

    #[test]
    fn literal_replacement_keeps_dollar_signs() {
        let rule = Rule::pattern("price", r"cost", Replacement::Literal("$1".into())).unwrap();
        let (out, _) = hit(rule.evaluate("cost").expect("eval"));
        assert_eq!(out, "$1");
    }

    #[test]
    fn backreference_pattern_uses_extended_engine() {
        let rule = Rule::pattern(
            "quoted",
            r#"value:(["'])Premium Only\1"#,
            Replacement::Template("value:$1$1".into()),
        )
        .expect("rule");
        assert!(matches!(rule.matcher(), Matcher::Extended(_)));

        let (out, n) =
            hit(rule.evaluate(r#"a={value:'Premium Only'};b={value:"Premium Only'"}"#).unwrap());
        assert_eq!(out, r#"a={value:''};b={value:"Premium Only'"}"#);
        assert_eq!(n, 1);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = Rule::pattern("broken", r"(unclosed", Replacement::Literal(String::new()))
            .expect_err("invalid");
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
    }

    #[test]
    fn empty_matchers_are_rejected() {
        assert!(matches!(Rule::exact("e", "", "x"), Err(RuleError::EmptyMatcher { .. })));
        assert!(matches!(
            Rule::pattern("p", "", Replacement::Literal("x".into())),
            Err(RuleError::EmptyMatcher { .. })
        ));
    }

    #[test]
    fn template_with_unknown_group_is_rejected() {
        let err = Rule::pattern("g", r"(a)", Replacement::Template("$2".into())).expect_err("group");
        assert!(matches!(err, RuleError::UnknownGroup { group: 2, available: 1, .. }));

        // `$$` is an escaped dollar, not a group reference.
        Rule::pattern("g", r"(a)", Replacement::Template("$$2".into())).expect("escaped");
    }

    #[test]
    fn requires_guard_turns_into_miss() {
        let rule = Rule::exact("notice", "innerHTML:notice", "innerHTML:\"\"")
            .unwrap()
            .requiring("connectNotice");
        assert_eq!(rule.evaluate("innerHTML:notice").expect("eval"), Evaluation::Miss);
        let (out, _) = hit(rule.evaluate("connectNotice;innerHTML:notice").expect("eval"));
        assert_eq!(out, "connectNotice;innerHTML:\"\"");
    }

    #[test]
    fn scope_selects_files_by_basename() {
        let rule = Rule::exact("x", "a", "b").unwrap().scoped_to("x.js");
        assert!(rule.applies_to("x.js"));
        assert!(!rule.applies_to("y.js"));
        assert!(Rule::exact("g", "a", "b").unwrap().applies_to("anything.js"));
    }
}
