//! Durable exchange request storage on sled
//!
//! Records live in one tree keyed by request id. Two index trees map
//! `<sha256(email)>/<id>` to the id, one for requesters and one for known
//! target owners, so the list projections do not need a full scan. A
//! fourth tree maps `<sha256(requester)>/<book id>` to the latest request
//! for that pair, which lets an insert refuse a duplicate pending request
//! inside the same transaction that writes it.
use std::sync::Arc;

use sled::transaction::{ConflictableTransactionError, Transactional};
use sled::{Db, Tree};
use tracing::{debug, warn};

use super::error::{ExchangeError, InvalidOperation, Result};
use super::request::{ExchangeProposal, ExchangeRequest, ExchangeStatus, TargetOwner};
use super::types::TimeStamp;
use super::utils::{REQUEST_HRP, email_key_prefix, index_key, new_uuid_to_bech32, same_email};

pub const REQUESTS_TREE: &str = "exchange_requests";
pub const BY_REQUESTER_TREE: &str = "exchange_requests_by_requester";
pub const BY_OWNER_TREE: &str = "exchange_requests_by_owner";
pub const LATEST_PAIR_TREE: &str = "exchange_requests_latest_pair";

pub struct ExchangeRequestStore {
    records: Tree,
    by_requester: Tree,
    by_owner: Tree,
    latest_pair: Tree,
}

impl ExchangeRequestStore {
    pub fn open(db: &Arc<Db>) -> Result<Self> {
        Ok(Self {
            records: db.open_tree(REQUESTS_TREE)?,
            by_requester: db.open_tree(BY_REQUESTER_TREE)?,
            by_owner: db.open_tree(BY_OWNER_TREE)?,
            latest_pair: db.open_tree(LATEST_PAIR_TREE)?,
        })
    }

    /// Assign a fresh id to the proposal and persist it as a pending request.
    pub fn insert(&self, proposal: ExchangeProposal) -> Result<ExchangeRequest> {
        let request = ExchangeRequest::from_proposal(new_uuid_to_bech32(REQUEST_HRP)?, proposal);
        self.write_new(&request, false)?;
        Ok(request)
    }

    /// Like `insert`, but fails with `DuplicatePending` when the requester
    /// already has a pending request for the same target book.
    ///
    /// Only pairs recorded by this store are seen; records written before
    /// the pair tree existed need a scan through `by_requester`.
    pub fn insert_exclusive(&self, proposal: ExchangeProposal) -> Result<ExchangeRequest> {
        let request = ExchangeRequest::from_proposal(new_uuid_to_bech32(REQUEST_HRP)?, proposal);
        self.write_new(&request, true)?;
        Ok(request)
    }

    fn write_new(&self, request: &ExchangeRequest, exclusive: bool) -> Result<()> {
        let bytes = request.to_cbor()?;
        let requester_key = index_key(&request.requester_email, &request.id);
        let owner_key = request
            .target_owner
            .email()
            .map(|email| index_key(email, &request.id));
        let pair_key = index_key(&request.requester_email, &request.target_book_id);

        (&self.records, &self.by_requester, &self.by_owner, &self.latest_pair).transaction(
            |(records, by_requester, by_owner, latest_pair)| {
                if records.get(request.id.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(
                        ExchangeError::Conflict(request.id.clone()),
                    ));
                }
                if exclusive {
                    if let Some(existing_id) = latest_pair.get(pair_key.as_slice())? {
                        if let Some(existing) = records.get(&existing_id)? {
                            let existing = ExchangeRequest::from_cbor(&existing)
                                .map_err(ConflictableTransactionError::Abort)?;
                            if existing.status == ExchangeStatus::Pending {
                                return Err(ConflictableTransactionError::Abort(
                                    InvalidOperation::DuplicatePending {
                                        existing_id: existing.id,
                                        book_id: request.target_book_id.clone(),
                                    }
                                    .into(),
                                ));
                            }
                        }
                    }
                }
                records.insert(request.id.as_bytes(), bytes.as_slice())?;
                by_requester.insert(requester_key.as_slice(), request.id.as_bytes())?;
                if let Some(key) = &owner_key {
                    by_owner.insert(key.as_slice(), request.id.as_bytes())?;
                }
                latest_pair.insert(pair_key.as_slice(), request.id.as_bytes())?;
                Ok(())
            },
        )?;

        debug!(request_id = %request.id, "Exchange request stored");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<ExchangeRequest>> {
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(ExchangeRequest::from_cbor(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Full scan. Records that fail to decode are logged and skipped.
    pub fn get_all(&self) -> Result<Vec<ExchangeRequest>> {
        let mut out = Vec::new();
        for entry in self.records.iter() {
            let (key, bytes) = entry?;
            match ExchangeRequest::from_cbor(&bytes) {
                Ok(request) => out.push(request),
                Err(e) => warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "Skipping undecodable exchange request"
                ),
            }
        }
        Ok(out)
    }

    pub fn by_requester(&self, email: &str) -> Result<Vec<ExchangeRequest>> {
        let mut requests = self.scan_index(&self.by_requester, email)?;
        requests.retain(|r| r.is_sent_by(email));
        Ok(requests)
    }

    /// Requests whose owner email was captured at creation.
    pub fn by_target_owner(&self, email: &str) -> Result<Vec<ExchangeRequest>> {
        let mut requests = self.scan_index(&self.by_owner, email)?;
        requests.retain(|r| r.target_owner.email().is_some_and(|owner| same_email(owner, email)));
        Ok(requests)
    }

    /// Requests without a captured owner email.
    pub fn unresolved(&self) -> Result<Vec<ExchangeRequest>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.target_owner == TargetOwner::Unresolved)
            .collect())
    }

    fn scan_index(&self, index: &Tree, email: &str) -> Result<Vec<ExchangeRequest>> {
        let prefix = format!("{}/", email_key_prefix(email));
        let mut out = Vec::new();
        for entry in index.scan_prefix(prefix.as_bytes()) {
            let (_, id) = entry?;
            let id = String::from_utf8_lossy(&id).into_owned();
            match self.get(&id) {
                Ok(Some(request)) => out.push(request),
                Ok(None) => warn!(request_id = %id, "Index entry points at a missing request"),
                Err(ExchangeError::Decode(e)) => {
                    warn!(request_id = %id, error = %e, "Skipping undecodable exchange request")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Compare-and-swap the status of a request.
    ///
    /// Fails with `Conflict` when the stored status is not `expected`, which
    /// is what the loser of two concurrent decisions observes.
    pub fn update_status(
        &self,
        id: &str,
        expected: ExchangeStatus,
        new: ExchangeStatus,
    ) -> Result<ExchangeRequest> {
        loop {
            let current = self
                .records
                .get(id.as_bytes())?
                .ok_or_else(|| ExchangeError::request_not_found(id))?;

            let mut record = ExchangeRequest::from_cbor(&current)?;
            if record.status != expected {
                return Err(ExchangeError::Conflict(id.to_string()));
            }
            record.status = new;
            if new.is_terminal() {
                record.decided_at = Some(TimeStamp::new());
            }
            let updated = record.to_cbor()?;

            match self
                .records
                .compare_and_swap(id.as_bytes(), Some(current), Some(updated))?
            {
                Ok(()) => return Ok(record),
                // the record changed between read and swap; re-read and re-check
                Err(_) => debug!(request_id = %id, "Status swap lost a race, re-reading"),
            }
        }
    }
}
