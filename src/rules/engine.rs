//! Rule application over one file's content
//!
//! Rules run cumulatively: rule k sees the output of rules 1..k-1. A miss is
//! recorded and never stops later rules. Within a group, the first rule that
//! matches settles the concern and later alternates are skipped.

use crate::domain::{MatchReport, RuleHit};
use crate::rules::rule::Evaluation;
use crate::rules::RuleSet;
use std::collections::HashSet;

/// New content plus the per-rule record that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub content: String,
    pub report: MatchReport,
}

impl Applied {
    pub fn changed(&self, original: &str) -> bool {
        self.content != original
    }
}

pub fn apply(content: &str, rules: &RuleSet, file_name: &str) -> Applied {
    let mut current = content.to_string();
    let mut report = MatchReport::default();
    let mut settled: HashSet<&str> = HashSet::new();

    for rule in rules.effective_for(file_name) {
        if let Some(group) = rule.group() {
            if settled.contains(group) {
                tracing::debug!(rule = rule.id(), group, file = file_name, "superseded");
                report.superseded.push(rule.id().to_string());
                continue;
            }
        }

        match rule.evaluate(&current) {
            Ok(Evaluation::Hit { content, occurrences }) => {
                tracing::debug!(rule = rule.id(), file = file_name, occurrences, "matched");
                current = content;
                report.matched.push(RuleHit { id: rule.id().to_string(), occurrences });
                if let Some(group) = rule.group() {
                    settled.insert(group);
                }
            }
            Ok(Evaluation::Miss) => {
                tracing::debug!(rule = rule.id(), file = file_name, "missed");
                report.missed.push(rule.id().to_string());
            }
            Err(err) => {
                tracing::warn!(rule = rule.id(), file = file_name, "matcher failed: {err}");
                report.missed.push(rule.id().to_string());
            }
        }
    }

    Applied { content: current, report }
}
