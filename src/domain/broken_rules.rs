use serde::{Deserialize, Serialize};

/// A business rule violated while an aggregate handled a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenRule {
    pub rule: String,
    pub instance: Option<String>,
    pub causes: Vec<String>,
}

impl BrokenRule {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            instance: None,
            causes: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }
}

/// A broken rule as reported in a command result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenRuleResult {
    pub rule: String,
    /// `EventSource: <aggregate type> - with id <event source>`
    pub target: String,
    pub instance: String,
    pub causes: Vec<String>,
}

impl BrokenRuleResult {
    pub(crate) fn new(rule: &BrokenRule, aggregate_type: &str, event_source: &str) -> Self {
        Self {
            rule: rule.rule.clone(),
            target: format!("EventSource: {aggregate_type} - with id {event_source}"),
            instance: rule
                .instance
                .clone()
                .unwrap_or_else(|| "[Not Set]".to_string()),
            causes: rule.causes.clone(),
        }
    }
}
