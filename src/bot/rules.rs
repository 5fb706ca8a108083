use anyhow::{Context, Result};
use regex::Regex;

/// When a rule is allowed to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    /// Only on April 20th
    Holiday,
}

/// One row of a rule table: a case-insensitive pattern and the action it triggers
pub struct Rule<A> {
    pub name: &'static str,
    pattern: Regex,
    gate: Gate,
    action: A,
}

impl<A> Rule<A> {
    pub fn new(name: &'static str, pattern: &str, action: A) -> Result<Self> {
        let pattern = Regex::new(&format!("(?i){}", pattern))
            .with_context(|| format!("Invalid pattern for rule '{}'", name))?;
        Ok(Self {
            name,
            pattern,
            gate: Gate::Always,
            action,
        })
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    fn is_open(&self, holiday: bool) -> bool {
        match self.gate {
            Gate::Always => true,
            Gate::Holiday => holiday,
        }
    }
}

/// Capture groups of the first match of a rule, owned so the table can be released
/// before the action runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub rule: &'static str,
    groups: Vec<Option<String>>,
}

impl Captured {
    /// Text of group `i`; groups that did not participate read as empty
    pub fn group(&self, i: usize) -> &str {
        self.groups
            .get(i)
            .and_then(|g| g.as_deref())
            .unwrap_or_default()
    }

    /// The whole match
    pub fn whole(&self) -> &str {
        self.group(0)
    }
}

/// Ordered rules, evaluated first-match-wins
pub struct RuleTable<A> {
    rules: Vec<Rule<A>>,
}

impl<A: Copy> RuleTable<A> {
    pub fn new(rules: Vec<Rule<A>>) -> Self {
        Self { rules }
    }

    /// The first open rule whose pattern matches `text`, with its captures
    pub fn first_match(&self, text: &str, holiday: bool) -> Option<(A, Captured)> {
        self.rules
            .iter()
            .filter(|rule| rule.is_open(holiday))
            .find_map(|rule| {
                let caps = rule.pattern.captures(text)?;
                let groups = caps
                    .iter()
                    .map(|g| g.map(|m| m.as_str().to_string()))
                    .collect();
                Some((
                    rule.action,
                    Captured {
                        rule: rule.name,
                        groups,
                    },
                ))
            })
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}
