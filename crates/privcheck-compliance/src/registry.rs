//! # Rule Registry
//!
//! The set of rules a run evaluates. Defaults to every built-in rule; a run
//! configuration may narrow it to a subset of ids. Rules always run and
//! report in built-in order, whatever order the selection lists them in.

use thiserror::Error;

use crate::rules::{Rule, BUILTIN_RULES};

/// Invalid rule selection. Fatal before any domain is evaluated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A selected id names no built-in rule.
    #[error("unknown rule id {id:?}; known ids: {known}")]
    UnknownRule { id: String, known: String },

    /// The selection names no rule at all.
    #[error("rule selection is empty")]
    EmptySelection,
}

/// An ordered set of rules.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<&'static Rule>,
}

impl RuleRegistry {
    /// Every built-in rule.
    pub fn builtin() -> Self {
        Self {
            rules: BUILTIN_RULES.iter().collect(),
        }
    }

    /// The built-in rules named in `ids`.
    pub fn select<S: AsRef<str>>(ids: &[S]) -> Result<Self, RegistryError> {
        if ids.is_empty() {
            return Err(RegistryError::EmptySelection);
        }
        if let Some(unknown) = ids
            .iter()
            .map(|id| id.as_ref())
            .find(|id| !BUILTIN_RULES.iter().any(|r| r.id == *id))
        {
            return Err(RegistryError::UnknownRule {
                id: unknown.to_string(),
                known: BUILTIN_RULES.iter().map(|r| r.id).collect::<Vec<_>>().join(", "),
            });
        }
        let rules: Vec<&'static Rule> = BUILTIN_RULES
            .iter()
            .filter(|r| ids.iter().any(|id| id.as_ref() == r.id))
            .collect();
        tracing::debug!(selected = rules.len(), "narrowed rule registry");
        Ok(Self { rules })
    }

    /// Rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &'static Rule> + '_ {
        self.rules.iter().copied()
    }

    /// Rule by id.
    pub fn get(&self, id: &str) -> Option<&'static Rule> {
        self.iter().find(|r| r.id == id)
    }

    /// Rule ids in evaluation order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.iter().map(|r| r.id).collect()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry is empty. Never true for a registry built by
    /// [`builtin`](Self::builtin) or [`select`](Self::select).
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_every_rule() {
        let reg = RuleRegistry::builtin();
        assert_eq!(reg.len(), 8);
        assert_eq!(reg.ids()[0], "third_party_sharing");
        assert!(reg.get("no_tracking_claim").is_some());
    }

    #[test]
    fn selection_keeps_builtin_order() {
        let reg = RuleRegistry::select(&["session_cookies_only", "undeclared_cookie_use"]).unwrap();
        assert_eq!(reg.ids(), ["undeclared_cookie_use", "session_cookies_only"]);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let err = RuleRegistry::select(&["undeclared_cookie_use", "gdpr_everything"]).unwrap_err();
        match &err {
            RegistryError::UnknownRule { id, known } => {
                assert_eq!(id, "gdpr_everything");
                assert!(known.contains("third_party_sharing"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("gdpr_everything"));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let none: [&str; 0] = [];
        assert_eq!(RuleRegistry::select(&none).unwrap_err(), RegistryError::EmptySelection);
    }
}
