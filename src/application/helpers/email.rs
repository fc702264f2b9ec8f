use std::collections::HashSet;

use crate::ports::mail_server::RemoteMailbox;

/// Derive the fully-qualified, lowercased address for a mailbox identifier.
/// Provider usernames may already be fully qualified.
pub fn derive_email(local_or_full: &str, domain: &str) -> String {
    let value = local_or_full.trim();
    if value.contains('@') {
        value.to_ascii_lowercase()
    } else {
        format!("{}@{}", value, domain).to_ascii_lowercase()
    }
}

/// Provider mailboxes whose derived address is not present locally.
pub fn filter_unadopted(
    mailboxes: &[RemoteMailbox],
    local_emails: &HashSet<String>,
    domain: &str,
) -> Vec<RemoteMailbox> {
    mailboxes
        .iter()
        .filter(|mailbox| !local_emails.contains(&derive_email(&mailbox.username, domain)))
        .cloned()
        .collect()
}
