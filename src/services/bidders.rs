//! Bidder browsing.

use crate::models::{BidderPage, Session, TenderTable, display_column_name};
use crate::storage::SqliteTenderStore;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Default bidders per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Pages through bidders and shows their tenders.
pub struct BidderService {
    store: Arc<SqliteTenderStore>,
    page_size: u32,
}

impl BidderService {
    /// Creates a service listing `page_size` bidders per page (minimum 1).
    #[must_use]
    pub fn new(store: Arc<SqliteTenderStore>, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Bidders per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Lists one page of bidders visible to `session`, ordered by name.
    ///
    /// Pages start at 1. Admins see every bidder; other users see the
    /// bidders assigned to them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for page 0, and store errors.
    #[instrument(skip(self, session), fields(operation = "list_bidders", user = %session.username))]
    pub fn list_bidders(&self, session: &Session, page: u32) -> Result<BidderPage> {
        if page == 0 {
            return Err(Error::InvalidInput("pages start at 1".to_string()));
        }
        let offset = u64::from(page - 1) * u64::from(self.page_size);
        let scope = (!session.is_admin()).then_some(session.username.as_str());
        let bidders = self.store.list_bidders(scope, self.page_size, offset)?;
        tracing::debug!(user = %session, page, count = bidders.len(), "listed bidders");
        Ok(BidderPage {
            page,
            page_size: self.page_size,
            bidders,
        })
    }

    /// Every tender row for `bidder`, newest first, with display column
    /// names.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn tender_details(&self, bidder: &str) -> Result<TenderTable> {
        let mut table = self.store.tender_details(bidder)?;
        table.columns = table
            .columns
            .iter()
            .map(|c| display_column_name(c))
            .collect();
        Ok(table)
    }

    /// Makes `bidder` visible to `username`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for blank names, and store errors.
    pub fn assign(&self, username: &str, bidder: &str) -> Result<()> {
        let (username, bidder) = (username.trim(), bidder.trim());
        if username.is_empty() || bidder.is_empty() {
            return Err(Error::InvalidInput(
                "username and bidder must not be empty".to_string(),
            ));
        }
        self.store.assign_bidder(username, bidder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableNames;
    use crate::models::{Role, TenderRecord};

    fn service(page_size: u32) -> BidderService {
        let store = SqliteTenderStore::in_memory(TableNames::default()).unwrap();
        let records: Vec<TenderRecord> = ["Delta", "Alpha", "Charlie", "Bravo", "Echo"]
            .iter()
            .enumerate()
            .map(|(i, name)| TenderRecord {
                tender_id: format!("t{i}"),
                year: Some(2020 + i32::try_from(i).unwrap()),
                bidder_name: Some((*name).to_string()),
                ..TenderRecord::default()
            })
            .collect();
        store.insert_tenders(&records).unwrap();
        BidderService::new(Arc::new(store), page_size)
    }

    fn session(name: &str, role: Role) -> Session {
        Session {
            username: name.to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_pages_through_all_bidders() {
        let svc = service(2);
        let admin = session("root", Role::Admin);
        assert_eq!(svc.list_bidders(&admin, 1).unwrap().bidders, vec!["Alpha", "Bravo"]);
        assert_eq!(svc.list_bidders(&admin, 3).unwrap().bidders, vec!["Echo"]);
        assert!(svc.list_bidders(&admin, 4).unwrap().bidders.is_empty());
    }

    #[test]
    fn test_user_sees_assigned_bidders_only() {
        let svc = service(20);
        svc.assign("li", "Echo").unwrap();
        svc.assign("li", "Bravo").unwrap();
        let page = svc.list_bidders(&session("li", Role::User), 1).unwrap();
        assert_eq!(page.bidders, vec!["Bravo", "Echo"]);
    }

    #[test]
    fn test_page_zero_is_invalid() {
        let svc = service(20);
        assert!(matches!(
            svc.list_bidders(&session("root", Role::Admin), 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tender_details_display_columns() {
        let svc = service(20);
        let table = svc.tender_details("Charlie").unwrap();
        assert_eq!(table.columns[0], "Tender Id");
        assert!(table.columns.contains(&"Tender Year".to_string()));
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        assert_eq!(service(0).page_size(), 1);
    }
}
