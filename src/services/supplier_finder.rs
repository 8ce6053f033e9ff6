//! Supplier search for a sourcing request.

use crate::llm::{LlmProvider, extract_filters};
use crate::models::Session;
use crate::search::{ConstrainedSearchEngine, FilterSet, QueryableAggregateStore, SearchResult};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcingRequest {
    /// Free text, turned into filters by the LLM.
    Text(String),
    /// Filters supplied directly.
    Filters(FilterSet),
}

/// A search run together with the filters it used.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderOutcome {
    /// The validated filters.
    pub filters: FilterSet,
    /// The engine result.
    pub result: SearchResult,
}

/// Runs the constrained search for a user's sourcing request.
pub struct SupplierFinder {
    store: Arc<dyn QueryableAggregateStore + Send + Sync>,
    engine: ConstrainedSearchEngine,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl SupplierFinder {
    /// Creates a finder over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn QueryableAggregateStore + Send + Sync>,
        engine: ConstrainedSearchEngine,
    ) -> Self {
        Self {
            store,
            engine,
            llm: None,
        }
    }

    /// Enables free-text requests through `llm`.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Finds suppliers for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank text request or a text
    /// request without an LLM, extraction and validation errors, and
    /// [`Error::QueryFailed`] from the engine.
    #[instrument(skip(self, session, request), fields(operation = "find_suppliers", user = %session.username))]
    pub fn find(&self, session: &Session, request: SourcingRequest) -> Result<FinderOutcome> {
        let filters = match request {
            SourcingRequest::Filters(filters) => filters,
            SourcingRequest::Text(text) => {
                if text.trim().is_empty() {
                    return Err(Error::InvalidInput("the request is empty".to_string()));
                }
                let llm = self.llm.as_ref().ok_or_else(|| {
                    Error::InvalidInput(
                        "free-text requests need an LLM; set ANTHROPIC_API_KEY or pass filters"
                            .to_string(),
                    )
                })?;
                extract_filters(llm.as_ref(), &text)?
            },
        };

        let start = Instant::now();
        let result = self.engine.search(&filters, self.store.as_ref())?;
        metrics::histogram!("search_duration_ms", "step" => result.step.name())
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(
            user = %session.username,
            filters = %filters,
            step = result.step.name(),
            rows = result.rows.len(),
            queries = result.queries_issued,
            "supplier search finished"
        );
        Ok(FinderOutcome { filters, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, TenderRecord};
    use crate::search::InMemoryTenderStore;

    struct FixedLlm(&'static str);

    impl LlmProvider for FixedLlm {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn session() -> Session {
        Session {
            username: "maria".to_string(),
            role: Role::User,
        }
    }

    fn finder() -> SupplierFinder {
        let store = InMemoryTenderStore::new(vec![TenderRecord {
            tender_id: "t1".to_string(),
            title: Some("Insulin pens".to_string()),
            buyer_country: Some("US".to_string()),
            bidder_name: Some("Acme".to_string()),
            final_price_usd: Some(40.0),
            ..TenderRecord::default()
        }]);
        SupplierFinder::new(Arc::new(store), ConstrainedSearchEngine::default())
    }

    #[test]
    fn test_find_with_filters() {
        let filters = FilterSet::builder().buyer_country("us").build().unwrap();
        let outcome = finder()
            .find(&session(), SourcingRequest::Filters(filters))
            .unwrap();
        assert_eq!(outcome.result.rows.len(), 1);
        assert_eq!(outcome.result.step.name(), "exact");
    }

    #[test]
    fn test_text_request_needs_llm() {
        let err = finder()
            .find(&session(), SourcingRequest::Text("insulin".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_text_request_uses_extracted_filters() {
        let finder = finder().with_llm(Arc::new(FixedLlm(
            r#"{"buyer_country": "US", "keywords": "insulin", "max_price": 10}"#,
        )));
        let outcome = finder
            .find(&session(), SourcingRequest::Text("cheap insulin".to_string()))
            .unwrap();
        assert_eq!(outcome.filters.keywords(), Some("insulin"));
        assert_eq!(outcome.result.step.name(), "drop_max_price");
    }
}
