//! Immutable, ordered rule collections

use crate::domain::{RuleKind, RuleSpec};
use crate::error::RuleError;
use crate::rules::rule::{Replacement, Rule};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a set, rejecting duplicate ids.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id()) {
                return Err(RuleError::DuplicateId(rule.id().to_string()));
            }
        }
        Ok(Self { rules })
    }

    /// Compile rule specs from a config file, in order.
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, RuleError> {
        let rules = specs.iter().map(compile_spec).collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Global rules plus the rules targeted at `file_name`, in declaration order.
    pub fn effective_for<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a Rule> {
        self.rules.iter().filter(move |rule| rule.applies_to(file_name))
    }
}

fn compile_spec(spec: &RuleSpec) -> Result<Rule, RuleError> {
    let mut rule = match spec.kind {
        RuleKind::Exact => Rule::exact(spec.id.as_str(), spec.find.as_str(), spec.replace.as_str())?,
        RuleKind::Pattern => {
            let replacement = if spec.literal {
                Replacement::Literal(spec.replace.clone())
            } else {
                Replacement::Template(spec.replace.clone())
            };
            Rule::pattern(spec.id.as_str(), &spec.find, replacement)?
        }
    };
    if let Some(file) = &spec.file {
        rule = rule.scoped_to(file.as_str());
    }
    if let Some(signature) = &spec.requires {
        rule = rule.requiring(signature.as_str());
    }
    if let Some(group) = &spec.group {
        rule = rule.in_group(group.as_str());
    }
    Ok(rule)
}
