use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use crate::use_cases::reconcile::{ReconcileState, ReconcileUseCases};

/// Periodically diffs the mail server against local records and lets the
/// reconcile use case announce anything new. A failed cycle is skipped; the
/// carried state only advances on success.
pub async fn run_mailbox_poll_loop(reconcile: Arc<ReconcileUseCases>, poll_secs: u64) {
    let mut ticker = interval(Duration::from_secs(poll_secs.max(1)));
    let mut state = ReconcileState::default();

    info!("Mailbox reconciliation started (polling every {poll_secs}s)");

    loop {
        ticker.tick().await;

        match reconcile.run_cycle(&mut state).await {
            Ok(fresh) if !fresh.is_empty() => {
                info!(count = fresh.len(), "Discovered new mailboxes on mail server");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = ?e, "Mailbox reconciliation cycle failed");
            }
        }
    }
}
