//! Action registry with alias resolution.
//!
//! The [`ActionRegistry`] is populated once at startup and then shared
//! read-only. Names are normalised before every lookup (lower-cased, `-`
//! and spaces folded to `_`), and each descriptor may declare aliases that
//! resolve to the same entry without duplicating it.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::types::{ActionDescriptor, ToolInvocation};
use crate::error::MailAgentError;

/// Configuration mistakes detected while building the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    DuplicateName(String),
    #[error("alias '{alias}' already resolves to '{existing}'")]
    DuplicateAlias { alias: String, existing: String },
    #[error("invalid action name '{0}'")]
    InvalidName(String),
}

impl From<RegistryError> for MailAgentError {
    fn from(e: RegistryError) -> Self {
        MailAgentError::RegistryError(e.to_string())
    }
}

/// Canonical form of an action name or alias.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' | '.' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Catalog of available actions.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<ActionDescriptor>>,
    /// Normalised alias → canonical name.
    aliases: HashMap<String, String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor.
    ///
    /// # Errors
    ///
    /// Fails if the name or any alias collides with an existing name or alias.
    pub fn register(&mut self, descriptor: ActionDescriptor) -> Result<(), RegistryError> {
        let name = normalize_name(&descriptor.name);
        if name.is_empty() {
            return Err(RegistryError::InvalidName(descriptor.name));
        }
        if let Some(existing) = self.resolve_name(&name) {
            return Err(if existing == name {
                RegistryError::DuplicateName(name)
            } else {
                RegistryError::DuplicateAlias {
                    alias: name,
                    existing: existing.to_owned(),
                }
            });
        }

        let mut aliases = Vec::with_capacity(descriptor.aliases.len());
        for alias in &descriptor.aliases {
            let alias = normalize_name(alias);
            if alias.is_empty() {
                return Err(RegistryError::InvalidName(alias));
            }
            if let Some(existing) = self.resolve_name(&alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias,
                    existing: existing.to_owned(),
                });
            }
            if alias == name || aliases.contains(&alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias,
                    existing: name,
                });
            }
            aliases.push(alias);
        }

        for alias in aliases {
            self.aliases.insert(alias, name.clone());
        }
        let mut descriptor = descriptor;
        descriptor.name = name.clone();
        self.actions.insert(name, Arc::new(descriptor));
        Ok(())
    }

    /// Canonical name for `name` or one of its aliases.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        let key = normalize_name(name);
        if let Some((canonical, _)) = self.actions.get_key_value(&key) {
            return Some(canonical.as_str());
        }
        self.aliases.get(&key).map(String::as_str)
    }

    /// Look up a descriptor by name or alias.
    pub fn lookup(&self, name: &str) -> Option<Arc<ActionDescriptor>> {
        let canonical = self.resolve_name(name)?;
        self.actions.get(canonical).cloned()
    }

    /// Whether `name` is gated. Unknown names are reported as not gated.
    pub fn requires_approval(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|d| d.requires_approval)
    }

    /// Approval description for an invocation.
    pub fn describe(&self, invocation: &ToolInvocation) -> String {
        match self.lookup(&invocation.action) {
            Some(d) => d.describe(&invocation.params),
            None => invocation.render_call(),
        }
    }

    /// Canonical names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Human-readable catalog for the prompt, sorted by name.
    ///
    /// ```text
    /// - send_email [REQUIRES APPROVAL] (aliases: send, compose_email): Send a new email.
    ///     to: string_list (required) - Recipient addresses
    /// ```
    pub fn render_catalog(&self) -> String {
        let mut out = String::new();
        for name in self.names() {
            let Some(d) = self.actions.get(name) else {
                continue;
            };
            let _ = write!(out, "- {}", d.name);
            if d.requires_approval {
                out.push_str(" [REQUIRES APPROVAL]");
            }
            if !d.aliases.is_empty() {
                let _ = write!(out, " (aliases: {})", d.aliases.join(", "));
            }
            let _ = writeln!(out, ": {}", d.description);
            if d.params.is_empty() {
                out.push_str("    (no parameters)\n");
            }
            for p in &d.params {
                let need = if p.required { "required" } else { "optional" };
                let _ = write!(out, "    {}: {} ({need})", p.name, p.ty);
                if !p.description.is_empty() {
                    let _ = write!(out, " - {}", p.description);
                }
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use async_trait::async_trait;

    use super::*;
    use crate::actions::types::{
        ActionExecutor, ActionOutput, ActionParams, ActionResult, ParamSpec, ParamType,
    };

    struct Noop;

    #[async_trait]
    impl ActionExecutor for Noop {
        async fn execute(&self, _params: &ActionParams) -> ActionResult {
            Ok(ActionOutput::default())
        }
    }

    fn descriptor(name: &str) -> ActionDescriptor {
        ActionDescriptor::new(name, format!("{name} things"), Arc::new(Noop))
    }

    fn make_registry() -> ActionRegistry {
        let mut reg = ActionRegistry::new();
        reg.register(
            descriptor("send_email")
                .gated()
                .alias("send")
                .alias("compose-email")
                .param(ParamSpec::required("to", ParamType::StringList, "Recipients")),
        )
        .unwrap();
        reg.register(descriptor("get_unread").param(ParamSpec::optional(
            "max_results",
            ParamType::Integer,
            "",
        )))
        .unwrap();
        reg
    }

    #[test]
    fn lookup_is_case_insensitive_and_alias_aware() {
        let reg = make_registry();
        for name in ["send_email", "SEND_EMAIL", "Send", "compose_email", "Compose Email"] {
            let d = reg.lookup(name).unwrap();
            assert_eq!(d.name, "send_email", "lookup({name})");
        }
        assert!(reg.lookup("teleport").is_none());
    }

    #[test]
    fn requires_approval_defaults_to_false_for_unknown() {
        let reg = make_registry();
        assert!(reg.requires_approval("send"));
        assert!(!reg.requires_approval("get_unread"));
        assert!(!reg.requires_approval("nonexistent"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut reg = make_registry();
        let err = reg.register(descriptor("Send_Email")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("send_email".into()));
    }

    #[test]
    fn name_colliding_with_alias_is_rejected() {
        let mut reg = make_registry();
        let err = reg.register(descriptor("send")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAlias { .. }));
    }

    #[test]
    fn alias_colliding_with_name_is_rejected_without_partial_insert() {
        let mut reg = make_registry();
        let err = reg
            .register(descriptor("blast").alias("blast_all").alias("get_unread"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAlias { ref existing, .. } if existing == "get_unread"));
        assert!(reg.lookup("blast_all").is_none());
        assert!(reg.lookup("blast").is_none());
    }

    #[test]
    fn catalog_is_sorted_and_marks_approval() {
        let catalog = make_registry().render_catalog();
        let unread = catalog.find("- get_unread").unwrap();
        let send = catalog.find("- send_email").unwrap();
        assert!(unread < send);
        assert!(catalog.contains("- send_email [REQUIRES APPROVAL] (aliases: send, compose-email)"));
        assert!(catalog.contains("    to: string_list (required) - Recipients"));
        assert!(catalog.contains("    max_results: integer (optional)\n"));
    }

    #[test]
    fn registry_error_converts_to_crate_error() {
        let err: MailAgentError = RegistryError::DuplicateName("x".into()).into();
        assert_eq!(err.code(), "REGISTRY_INVALID");
    }
}
