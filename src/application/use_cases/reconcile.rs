use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::app_error::AppResult;
use crate::application::helpers::email::{derive_email, filter_unadopted};
use crate::ports::mail_server::{MailServerClient, RemoteMailbox};
use crate::ports::notifier::{Notification, Notifier};
use crate::use_cases::mail::MailEntryRepo;
use crate::use_cases::mail_domain::DomainUseCases;

/// What the previous cycle saw, keyed by derived address. Held by the poll
/// task only; losing it on restart merely re-announces current mailboxes.
#[derive(Debug, Default)]
pub struct ReconcileState {
    previous: HashSet<String>,
}

#[derive(Clone)]
pub struct ReconcileUseCases {
    domains: DomainUseCases,
    mail_entries: Arc<dyn MailEntryRepo>,
    mail_server: Arc<dyn MailServerClient>,
    notifier: Arc<dyn Notifier>,
}

impl ReconcileUseCases {
    pub fn new(
        domains: DomainUseCases,
        mail_entries: Arc<dyn MailEntryRepo>,
        mail_server: Arc<dyn MailServerClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            domains,
            mail_entries,
            mail_server,
            notifier,
        }
    }

    /// One reconciliation pass. Returns the mailboxes announced this cycle.
    /// A provider failure propagates with `state` untouched, so the next
    /// successful cycle reports against the last consistent view.
    #[instrument(skip(self, state))]
    pub async fn run_cycle(&self, state: &mut ReconcileState) -> AppResult<Vec<RemoteMailbox>> {
        let Some(domain) = self.domains.get().await? else {
            return Ok(Vec::new());
        };

        let remote = self.mail_server.list_mailboxes().await?;

        let local: HashSet<String> = self
            .mail_entries
            .list_emails()
            .await?
            .into_iter()
            .map(|email| email.to_ascii_lowercase())
            .collect();

        let unadopted = filter_unadopted(&remote, &local, &domain.domain);

        let fresh: Vec<RemoteMailbox> = unadopted
            .iter()
            .filter(|mailbox| {
                !state
                    .previous
                    .contains(&derive_email(&mailbox.username, &domain.domain))
            })
            .cloned()
            .collect();

        state.previous = unadopted
            .iter()
            .map(|mailbox| derive_email(&mailbox.username, &domain.domain))
            .collect();

        if !fresh.is_empty() {
            self.notifier
                .publish(Notification::NewMailboxes {
                    new_mailboxes: fresh.clone(),
                })
                .await;
        }

        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_error::AppError;
    use crate::entities::user::Role;
    use crate::test_utils::{
        InMemoryDomainRepo, InMemoryMailEntryRepo, InMemoryUserRepo, MockMailServer,
        RecordingNotifier, create_test_mail_entry, create_test_user,
    };

    struct Fixture {
        uc: ReconcileUseCases,
        users: Arc<InMemoryUserRepo>,
        entries: Arc<InMemoryMailEntryRepo>,
        mail_server: Arc<MockMailServer>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture(domain: Option<&str>) -> Fixture {
        let users = Arc::new(InMemoryUserRepo::default());
        let entries = Arc::new(InMemoryMailEntryRepo::new(users.clone()));
        let domains = Arc::new(match domain {
            Some(d) => InMemoryDomainRepo::with_domain(d),
            None => InMemoryDomainRepo::default(),
        });
        let mail_server = Arc::new(MockMailServer::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let uc = ReconcileUseCases::new(
            DomainUseCases::new(domains),
            entries.clone(),
            mail_server.clone(),
            notifier.clone(),
        );
        Fixture {
            uc,
            users,
            entries,
            mail_server,
            notifier,
        }
    }

    #[tokio::test]
    async fn reports_only_mailboxes_unknown_locally_and_only_once() {
        let f = fixture(Some("x.org"));
        let bob = create_test_user(|u| {
            u.username = "bob".into();
            u.role = Role::User;
        });
        f.users.insert(bob.clone());
        f.entries
            .insert(create_test_mail_entry(bob.id, |e| e.email = "bob@x.org".into()));
        f.mail_server.seed_mailboxes(vec!["bob", "carol"]);

        let mut state = ReconcileState::default();

        let fresh = f.uc.run_cycle(&mut state).await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].username, "carol");

        let events = f.notifier.published();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Notification::NewMailboxes { new_mailboxes } => {
                assert_eq!(new_mailboxes.len(), 1);
                assert_eq!(new_mailboxes[0].username, "carol");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Same provider view again: already reported, nothing new.
        let fresh = f.uc.run_cycle(&mut state).await.unwrap();
        assert!(fresh.is_empty());
        assert_eq!(f.notifier.published().len(), 1);
    }

    #[tokio::test]
    async fn announces_again_after_a_mailbox_disappears_and_returns() {
        let f = fixture(Some("x.org"));
        f.mail_server.seed_mailboxes(vec!["carol"]);
        let mut state = ReconcileState::default();

        assert_eq!(f.uc.run_cycle(&mut state).await.unwrap().len(), 1);

        f.mail_server.seed_mailboxes(vec![]);
        assert!(f.uc.run_cycle(&mut state).await.unwrap().is_empty());

        f.mail_server.seed_mailboxes(vec!["carol"]);
        assert_eq!(f.uc.run_cycle(&mut state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn skips_cycle_when_domain_is_unset() {
        let f = fixture(None);
        f.mail_server.seed_mailboxes(vec!["carol"]);
        let mut state = ReconcileState::default();

        let fresh = f.uc.run_cycle(&mut state).await.unwrap();
        assert!(fresh.is_empty());
        assert!(f.notifier.published().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_leaves_state_untouched() {
        let f = fixture(Some("x.org"));
        f.mail_server.seed_mailboxes(vec!["carol"]);
        let mut state = ReconcileState::default();
        assert_eq!(f.uc.run_cycle(&mut state).await.unwrap().len(), 1);

        f.mail_server.fail_list();
        f.mail_server.seed_mailboxes(vec!["carol", "dave"]);
        let err = f.uc.run_cycle(&mut state).await.unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));

        // Recovery still announces only what the failed cycle never reported.
        f.mail_server.unfail_list();
        let fresh = f.uc.run_cycle(&mut state).await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].username, "dave");
    }

    #[tokio::test]
    async fn qualified_provider_usernames_match_local_entries() {
        let f = fixture(Some("x.org"));
        let bob = create_test_user(|u| u.username = "bob".into());
        f.users.insert(bob.clone());
        f.entries
            .insert(create_test_mail_entry(bob.id, |e| e.email = "bob@x.org".into()));
        // Provider reports the fully-qualified form.
        f.mail_server.seed_mailboxes(vec!["Bob@X.org"]);
        let mut state = ReconcileState::default();

        let fresh = f.uc.run_cycle(&mut state).await.unwrap();
        assert!(fresh.is_empty());
    }
}
