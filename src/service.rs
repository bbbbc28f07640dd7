//! Service layer API for the exchange request workflow
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::book::{BookRecord, OfferedBook};
use super::catalog::BookCatalog;
use super::config::ServiceConfig;
use super::error::{ExchangeError, InvalidOperation, Result};
use super::notify::{EventKind, NotificationPayload, NotificationSink};
use super::request::{
    Decision, ExchangeProposal, ExchangeRequest, ExchangeStatus, TargetOwner,
    sort_most_recent_first,
};
use super::store::ExchangeRequestStore;
use super::utils::same_email;

/// Runs after a request has been accepted and persisted.
///
/// The workflow itself only records the decision. Moving books between
/// owners or adjusting quantities belongs to whatever implements this.
pub trait SettlementHook: Send + Sync {
    fn on_accepted(&self, request: &ExchangeRequest) -> anyhow::Result<()>;
}

/// Leaves the catalog untouched.
pub struct NoSettlement;

impl SettlementHook for NoSettlement {
    fn on_accepted(&self, _request: &ExchangeRequest) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct ExchangeService {
    store: ExchangeRequestStore,
    catalog: Arc<dyn BookCatalog>,
    notifier: Arc<dyn NotificationSink>,
    settlement: Arc<dyn SettlementHook>,
    config: ServiceConfig,
}

impl ExchangeService {
    pub fn new(
        store: ExchangeRequestStore,
        catalog: Arc<dyn BookCatalog>,
        notifier: Arc<dyn NotificationSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            notifier,
            settlement: Arc::new(NoSettlement),
            config,
        }
    }

    pub fn with_settlement(mut self, settlement: Arc<dyn SettlementHook>) -> Self {
        self.settlement = settlement;
        self
    }

    /// Propose trading `offered_book` for the catalog book `target_book_id`.
    pub fn create_request(
        &self,
        requester_email: &str,
        target_book_id: &str,
        offered_book: OfferedBook,
    ) -> Result<ExchangeRequest> {
        let requester_email = requester_email.trim();
        if requester_email.is_empty() {
            return Err(ExchangeError::Validation("requester email is missing".into()));
        }
        if target_book_id.trim().is_empty() {
            return Err(ExchangeError::Validation("target book id is missing".into()));
        }
        offered_book.validate()?;

        let target = self.lookup_book(target_book_id)?;
        let offered_record = self.lookup_book(&offered_book.book_id)?;
        let offered_book = offered_book.complete_from(&offered_record);

        if same_email(&target.owner_email, requester_email) {
            return Err(InvalidOperation::SelfExchange(requester_email.to_string()).into());
        }

        if let Some(existing) = self.find_pending(requester_email, &target.book_id)? {
            if self.config.reject_duplicate_pending {
                return Err(InvalidOperation::DuplicatePending {
                    existing_id: existing.id,
                    book_id: target.book_id,
                }
                .into());
            }
            warn!(
                existing_id = %existing.id,
                requester = %requester_email,
                book_id = %target.book_id,
                "Duplicate pending exchange request"
            );
        }

        let proposal = ExchangeProposal {
            requester_email: requester_email.to_string(),
            target_book_id: target.book_id.clone(),
            target_book_title: target.name.clone(),
            target_owner: TargetOwner::Known(target.owner_email.clone()),
            offered_book,
        };
        // the pre-scan also sees older records; the exclusive insert closes
        // the race between two concurrent creates for the same pair
        let request = if self.config.reject_duplicate_pending {
            self.store.insert_exclusive(proposal)?
        } else {
            self.store.insert(proposal)?
        };

        info!(
            request_id = %request.id,
            requester = %request.requester_email,
            target_owner = %target.owner_email,
            book_id = %request.target_book_id,
            "Exchange request created"
        );

        self.send(
            &target.owner_email,
            EventKind::RequestCreated,
            NotificationPayload {
                request_id: request.id.clone(),
                message: format!(
                    "{} offers \"{}\" in exchange for your book \"{}\"",
                    request.requester_email, request.offered_book.title, request.target_book_title
                ),
            },
        );

        Ok(request)
    }

    /// Requests proposed by `requester_email`, most recent first.
    pub fn list_sent(&self, requester_email: &str) -> Result<Vec<ExchangeRequest>> {
        let mut requests = self.store.by_requester(requester_email)?;
        sort_most_recent_first(&mut requests);
        Ok(requests)
    }

    /// Requests addressed to `owner_email`, most recent first.
    ///
    /// Records without a captured owner are matched against the current
    /// owner of their target book. That path can miss requests whose book
    /// has since changed hands or been deleted; those are logged and left out.
    pub fn list_received(&self, owner_email: &str) -> Result<Vec<ExchangeRequest>> {
        let mut requests = self.store.by_target_owner(owner_email)?;

        for request in self.store.unresolved()? {
            match self.catalog.get(&request.target_book_id) {
                Ok(Some(book)) if same_email(&book.owner_email, owner_email) => {
                    info!(
                        request_id = %request.id,
                        book_id = %request.target_book_id,
                        "Matched request through catalog owner lookup"
                    );
                    requests.push(request);
                }
                Ok(Some(_)) => {}
                Ok(None) => warn!(
                    request_id = %request.id,
                    book_id = %request.target_book_id,
                    "Omitting request whose target book no longer exists"
                ),
                Err(e) => warn!(
                    request_id = %request.id,
                    error = %e,
                    "Catalog lookup failed, omitting request"
                ),
            }
        }

        sort_most_recent_first(&mut requests);
        Ok(requests)
    }

    pub fn get_request(&self, request_id: &str) -> Result<ExchangeRequest> {
        self.store
            .get(request_id)?
            .ok_or_else(|| ExchangeError::request_not_found(request_id))
    }

    /// Accept or reject a pending request.
    pub fn decide(&self, request_id: &str, decision: Decision) -> Result<ExchangeRequest> {
        let mut current = self.get_request(request_id)?;
        current.decide(decision)?;

        let request =
            self.store
                .update_status(request_id, ExchangeStatus::Pending, decision.outcome())?;

        info!(
            request_id = %request.id,
            status = %request.status,
            "Exchange request decided"
        );

        let (kind, verb) = match request.status {
            ExchangeStatus::Accepted => (EventKind::RequestAccepted, "accepted"),
            _ => (EventKind::RequestRejected, "rejected"),
        };
        self.send(
            &request.requester_email,
            kind,
            NotificationPayload {
                request_id: request.id.clone(),
                message: format!(
                    "Your exchange request for \"{}\" was {}",
                    request.target_book_title, verb
                ),
            },
        );

        if request.status == ExchangeStatus::Accepted {
            if let Err(e) = self.settlement.on_accepted(&request) {
                warn!(request_id = %request.id, error = %e, "Settlement hook failed");
            }
        }

        Ok(request)
    }

    fn lookup_book(&self, book_id: &str) -> Result<BookRecord> {
        self.catalog
            .get(book_id)?
            .ok_or_else(|| ExchangeError::book_not_found(book_id))
    }

    fn find_pending(&self, requester_email: &str, book_id: &str) -> Result<Option<ExchangeRequest>> {
        Ok(self
            .store
            .by_requester(requester_email)?
            .into_iter()
            .find(|r| r.status == ExchangeStatus::Pending && r.target_book_id == book_id))
    }

    // Delivery failures never fail the operation that triggered them.
    fn send(&self, email: &str, kind: EventKind, payload: NotificationPayload) {
        match self.notifier.notify(email, kind, &payload) {
            Ok(()) => debug!(recipient = %email, kind = %kind, "Notification sent"),
            Err(e) => warn!(
                recipient = %email,
                kind = %kind,
                request_id = %payload.request_id,
                error = %e,
                "Failed to send notification"
            ),
        }
    }
}
