//! The built-in action catalog.

use std::sync::Arc;

use super::registry::{ActionRegistry, RegistryError};
use super::{calendar, contacts, folders, mail, rules, tasks};
use crate::mailbox::MailboxClient;

/// Build the full registry with every action bound to `mailbox`.
///
/// `default_max_results` is used by listing actions when the model does not
/// pass `max_results`.
///
/// # Errors
///
/// Returns [`RegistryError`] if two entries collide on a name or alias.
pub fn builtin_registry(
    mailbox: Arc<dyn MailboxClient>,
    default_max_results: usize,
) -> Result<ActionRegistry, RegistryError> {
    let mut registry = ActionRegistry::new();
    let all = mail::descriptors(&mailbox, default_max_results)
        .into_iter()
        .chain(calendar::descriptors(&mailbox))
        .chain(folders::descriptors(&mailbox))
        .chain(tasks::descriptors(&mailbox))
        .chain(rules::descriptors(&mailbox))
        .chain(contacts::descriptors(&mailbox));
    for descriptor in all {
        registry.register(descriptor)?;
    }
    Ok(registry)
}
