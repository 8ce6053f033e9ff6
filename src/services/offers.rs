//! Offer lifecycle.

use crate::llm::{LlmProvider, extract_offer_terms};
use crate::models::{OfferId, OfferRecord, OfferStatus, OfferTerms, Session};
use crate::storage::OfferLedger;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Lists offers and moves them through pending, received and accepted.
pub struct OfferService {
    ledger: Arc<dyn OfferLedger>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl OfferService {
    /// Creates a service over `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<dyn OfferLedger>) -> Self {
        Self { ledger, llm: None }
    }

    /// Enables term extraction from reply text through `llm`.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// The session user's offers, newest first.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn list(&self, session: &Session) -> Result<Vec<OfferRecord>> {
        self.ledger.list_for_user(&session.username)
    }

    /// Reads the terms out of a supplier reply and records them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] without an LLM, extraction errors,
    /// and the errors of [`Self::record_terms`].
    #[instrument(skip(self, session, reply_text), fields(operation = "record_reply", user = %session.username))]
    pub fn record_reply(
        &self,
        session: &Session,
        supplier_email: &str,
        reply_text: &str,
    ) -> Result<OfferRecord> {
        let offer = self.pending_offer(session, supplier_email)?;
        let llm = self.llm.as_ref().ok_or_else(|| {
            Error::InvalidInput("reading replies needs an LLM; set ANTHROPIC_API_KEY".to_string())
        })?;
        let terms = extract_offer_terms(llm.as_ref(), reply_text)?;
        self.receive(&offer, &terms)
    }

    /// Records `terms` against the pending offer sent to `supplier_email`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user never contacted that address
    /// and [`Error::InvalidTransition`] if no offer to it is still pending.
    pub fn record_terms(
        &self,
        session: &Session,
        supplier_email: &str,
        terms: &OfferTerms,
    ) -> Result<OfferRecord> {
        let offer = self.pending_offer(session, supplier_email)?;
        self.receive(&offer, terms)
    }

    /// Accepts a received offer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the offer does not exist or belongs to
    /// another user, and [`Error::InvalidTransition`] unless it is in
    /// `offer_received`.
    #[instrument(skip(self, session), fields(operation = "accept_offer", user = %session.username))]
    pub fn accept(&self, session: &Session, id: &OfferId) -> Result<OfferRecord> {
        let offer = self
            .ledger
            .get(id)?
            .filter(|o| o.username == session.username)
            .ok_or_else(|| Error::NotFound(format!("offer {id}")))?;
        self.transition(&offer, OfferStatus::Accepted, None)
    }

    fn pending_offer(&self, session: &Session, supplier_email: &str) -> Result<OfferRecord> {
        let offers = self.ledger.find_by_email(&session.username, supplier_email)?;
        let newest_status = offers
            .first()
            .map(|o| o.status)
            .ok_or_else(|| Error::NotFound(format!("offer to {}", supplier_email.trim())))?;
        offers
            .into_iter()
            .find(|o| o.status == OfferStatus::Pending)
            .ok_or(Error::InvalidTransition {
                from: newest_status.as_str(),
                to: OfferStatus::OfferReceived.as_str(),
            })
    }

    fn receive(&self, offer: &OfferRecord, terms: &OfferTerms) -> Result<OfferRecord> {
        self.transition(offer, OfferStatus::OfferReceived, Some(terms))
    }

    fn transition(
        &self,
        offer: &OfferRecord,
        next: OfferStatus,
        terms: Option<&OfferTerms>,
    ) -> Result<OfferRecord> {
        offer.status.transition_to(next)?;
        if !self.ledger.update_status(&offer.id, offer.status, next, terms)? {
            // Another writer moved the offer first.
            let current = self
                .ledger
                .get(&offer.id)?
                .map_or(offer.status, |o| o.status);
            return Err(Error::InvalidTransition {
                from: current.as_str(),
                to: next.as_str(),
            });
        }
        tracing::info!(
            offer = %offer.id,
            supplier = %offer.supplier_name,
            from = %offer.status,
            to = %next,
            "offer status changed"
        );
        self.ledger
            .get(&offer.id)?
            .ok_or_else(|| Error::NotFound(format!("offer {}", offer.id)))
    }
}
