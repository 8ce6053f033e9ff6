//! Request-for-quotation notification.
//!
//! [`RfqNotifier`] is the [`Notifier`] the CLI attaches to supplier
//! searches. Each supplier with a contact email gets a pending offer in the
//! ledger; a message goes out only when that offer is new, so repeating a
//! search never mails the same supplier twice for the same user. If the
//! message cannot be sent the offer is withdrawn, so the next search retries.

use crate::config::MailConfig;
use crate::search::{AggregateRow, Notifier, NotifyReport, SearchResult};
use crate::storage::{NewOffer, OfferLedger};
use crate::Result;
use std::sync::Arc;
use tracing::instrument;

/// An outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Delivers outbound messages.
pub trait Mailer: Send + Sync {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// A [`Mailer`] that writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &OutboundMessage) -> Result<()> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "request for quotation queued"
        );
        tracing::debug!(to = %message.to, body = %message.body, "request for quotation body");
        metrics::counter!("rfq_messages_total").increment(1);
        Ok(())
    }
}

/// Records pending offers and mails suppliers for new ones.
pub struct RfqNotifier {
    ledger: Arc<dyn OfferLedger>,
    mailer: Arc<dyn Mailer>,
    mail: MailConfig,
}

impl RfqNotifier {
    /// Creates a notifier.
    #[must_use]
    pub fn new(ledger: Arc<dyn OfferLedger>, mailer: Arc<dyn Mailer>, mail: MailConfig) -> Self {
        Self {
            ledger,
            mailer,
            mail,
        }
    }

    fn compose(&self, requester: &str, row: &AggregateRow, to: &str) -> OutboundMessage {
        let body = format!(
            "Dear {supplier},\n\n\
             Based on your previous public tenders we would like to invite you to quote.\n\
             Please reply to this message with your unit price, currency, available quantity \
             and delivery time in days.\n\n\
             Kind regards,\n{requester}\n",
            supplier = row.supplier_name,
        );
        OutboundMessage {
            from: self.mail.from_address.clone(),
            to: to.to_string(),
            subject: format!("{}: {}", self.mail.subject, row.supplier_name),
            body,
        }
    }
}

impl Notifier for RfqNotifier {
    #[instrument(skip(self, result), fields(operation = "notify", rows = result.rows.len()))]
    fn notify(&self, requester: &str, result: &SearchResult) -> Result<NotifyReport> {
        let mut report = NotifyReport::default();
        for row in &result.rows {
            let Some(email) = row.usable_contact() else {
                tracing::debug!(supplier = %row.supplier_name, "no contact email, skipping");
                report.skipped_no_contact.push(row.supplier_name.clone());
                continue;
            };

            let outcome = self.ledger.record_pending(&NewOffer {
                username: requester,
                supplier_name: &row.supplier_name,
                supplier_country: row.supplier_country.as_deref(),
                supplier_email: email,
            })?;

            if !outcome.created {
                report.already_pending.push(row.supplier_name.clone());
                continue;
            }
            match self.mailer.send(&self.compose(requester, row, email)) {
                Ok(()) => report.requested.push(row.supplier_name.clone()),
                Err(e) => {
                    tracing::warn!(
                        supplier = %row.supplier_name,
                        error = %e,
                        "request for quotation not sent, withdrawing offer"
                    );
                    self.ledger.withdraw_pending(&outcome.record.id)?;
                    report.failed.push(row.supplier_name.clone());
                },
            }
        }
        tracing::info!(
            user = requester,
            requested = report.requested.len(),
            already_pending = report.already_pending.len(),
            skipped = report.skipped_no_contact.len(),
            failed = report.failed.len(),
            "suppliers notified"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::RelaxationStep;
    use crate::Error;
    use crate::storage::SqliteOfferStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, message: &OutboundMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    /// Fails the first send to each listed recipient.
    #[derive(Default)]
    struct FailOnceMailer {
        failing: Mutex<Vec<String>>,
        sent: Mutex<Vec<OutboundMessage>>,
    }

    impl Mailer for FailOnceMailer {
        fn send(&self, message: &OutboundMessage) -> Result<()> {
            let mut failing = self.failing.lock().unwrap();
            if let Some(pos) = failing.iter().position(|to| *to == message.to) {
                failing.remove(pos);
                return Err(Error::OperationFailed {
                    operation: "send".to_string(),
                    cause: "connection refused".to_string(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn row(name: &str, email: Option<&str>) -> AggregateRow {
        AggregateRow {
            supplier_name: name.to_string(),
            supplier_country: Some("DE".to_string()),
            contact_email: email.map(str::to_string),
            match_count: 1,
            mean_price: None,
        }
    }

    fn result(rows: Vec<AggregateRow>) -> SearchResult {
        SearchResult {
            step: RelaxationStep::first(),
            rows,
            dropped: Vec::new(),
            queries_issued: 1,
        }
    }

    #[test]
    fn test_notify_is_idempotent_per_user() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = RfqNotifier::new(
            Arc::new(SqliteOfferStore::in_memory().unwrap()),
            mailer.clone(),
            MailConfig::default(),
        );
        let found = result(vec![
            row("Acme", Some("sales@acme.test")),
            row("Bolt", None),
            row("Cargo", Some("not-an-email")),
        ]);

        let first = notifier.notify("maria", &found).unwrap();
        assert_eq!(first.requested, vec!["Acme"]);
        assert_eq!(first.skipped_no_contact, vec!["Bolt", "Cargo"]);

        let second = notifier.notify("maria", &found).unwrap();
        assert!(second.requested.is_empty());
        assert_eq!(second.already_pending, vec!["Acme"]);

        let other = notifier.notify("li", &found).unwrap();
        assert_eq!(other.requested, vec!["Acme"]);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "sales@acme.test");
        assert!(sent[0].body.contains("Dear Acme"));
        assert!(sent[0].subject.ends_with("Acme"));
    }

    #[test]
    fn test_failed_send_withdraws_offer_and_retries() {
        let ledger = Arc::new(SqliteOfferStore::in_memory().unwrap());
        let mailer = Arc::new(FailOnceMailer {
            failing: Mutex::new(vec!["sales@acme.test".to_string()]),
            ..FailOnceMailer::default()
        });
        let notifier = RfqNotifier::new(ledger.clone(), mailer.clone(), MailConfig::default());
        let found = result(vec![
            row("Acme", Some("sales@acme.test")),
            row("Bolt", Some("info@bolt.test")),
        ]);

        let first = notifier.notify("maria", &found).unwrap();
        assert_eq!(first.failed, vec!["Acme"]);
        assert_eq!(first.requested, vec!["Bolt"]);
        assert_eq!(first.total(), 2);
        assert!(ledger.find_by_email("maria", "sales@acme.test").unwrap().is_empty());

        let second = notifier.notify("maria", &found).unwrap();
        assert_eq!(second.requested, vec!["Acme"]);
        assert_eq!(second.already_pending, vec!["Bolt"]);
        assert!(second.failed.is_empty());

        let sent = mailer.sent.lock().unwrap();
        let recipients: Vec<&str> = sent.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(recipients, vec!["info@bolt.test", "sales@acme.test"]);
        assert_eq!(ledger.list_for_user("maria").unwrap().len(), 2);
    }

    #[test]
    fn test_empty_result_sends_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = RfqNotifier::new(
            Arc::new(SqliteOfferStore::in_memory().unwrap()),
            mailer.clone(),
            MailConfig::default(),
        );
        let report = notifier.notify("maria", &result(Vec::new())).unwrap();
        assert_eq!(report.total(), 0);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_log_mailer_accepts_messages() {
        let message = OutboundMessage {
            from: "a@b.test".to_string(),
            to: "c@d.test".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        assert!(LogMailer.send(&message).is_ok());
    }
}
