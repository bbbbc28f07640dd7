//! Exchange request record and its status state machine
use std::fmt;
use std::str::FromStr;

use super::book::OfferedBook;
use super::error::{ExchangeError, InvalidOperation};
use super::types::TimeStamp;
use super::utils::same_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum ExchangeStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
}

/// The target owner's answer to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

/// How a request is routed to the owner of the requested book.
///
/// Requests created by this service always carry the owner email captured
/// at proposal time. Older records may lack it and must be matched by
/// resolving the current owner of the target book through the catalog.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum TargetOwner {
    #[n(0)]
    Known(#[n(0)] String),
    #[n(1)]
    Unresolved,
}

/// A validated proposal that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeProposal {
    pub requester_email: String,
    pub target_book_id: String,
    pub target_book_title: String,
    pub target_owner: TargetOwner,
    pub offered_book: OfferedBook,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ExchangeRequest {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded
    #[n(1)]
    pub requester_email: String,
    #[n(2)]
    pub target_book_id: String,
    #[n(3)]
    pub target_book_title: String,
    #[n(4)]
    pub target_owner: TargetOwner,
    #[n(5)]
    pub offered_book: OfferedBook,
    #[n(6)]
    pub status: ExchangeStatus,
    #[n(7)]
    pub created_at: TimeStamp,
    #[n(8)]
    pub decided_at: Option<TimeStamp>,
}

impl ExchangeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExchangeStatus::Pending)
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::Rejected => "rejected",
        }
    }
    /// Only `pending` moves, and only once.
    pub fn apply(self, decision: Decision) -> Option<ExchangeStatus> {
        match self {
            ExchangeStatus::Pending => Some(decision.outcome()),
            ExchangeStatus::Accepted | ExchangeStatus::Rejected => None,
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Decision {
    pub fn outcome(&self) -> ExchangeStatus {
        match self {
            Decision::Accept => ExchangeStatus::Accepted,
            Decision::Reject => ExchangeStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = ExchangeError;

    // the client sends the target status, "accept"/"reject" are taken too
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" | "accept" => Ok(Decision::Accept),
            "rejected" | "reject" => Ok(Decision::Reject),
            other => Err(ExchangeError::Validation(format!(
                "unknown status '{other}', expected 'accepted' or 'rejected'"
            ))),
        }
    }
}

impl TargetOwner {
    pub fn email(&self) -> Option<&str> {
        match self {
            TargetOwner::Known(email) => Some(email),
            TargetOwner::Unresolved => None,
        }
    }
}

impl ExchangeRequest {
    pub fn from_proposal(id: String, proposal: ExchangeProposal) -> Self {
        Self {
            id,
            requester_email: proposal.requester_email,
            target_book_id: proposal.target_book_id,
            target_book_title: proposal.target_book_title,
            target_owner: proposal.target_owner,
            offered_book: proposal.offered_book,
            status: ExchangeStatus::Pending,
            created_at: TimeStamp::new(),
            decided_at: None,
        }
    }

    pub fn is_sent_by(&self, email: &str) -> bool {
        same_email(&self.requester_email, email)
    }

    /// Moves a pending request to its decided state.
    pub fn decide(&mut self, decision: Decision) -> Result<(), InvalidOperation> {
        let next = self
            .status
            .apply(decision)
            .ok_or_else(|| InvalidOperation::NotPending {
                id: self.id.clone(),
                status: self.status,
            })?;
        self.status = next;
        self.decided_at = Some(TimeStamp::new());
        Ok(())
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, ExchangeError> {
        Ok(minicbor::to_vec(self)?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ExchangeError> {
        Ok(minicbor::decode(bytes)?)
    }
}

/// Most recent first, ties broken by id so repeated reads agree.
pub fn sort_most_recent_first(requests: &mut [ExchangeRequest]) {
    requests.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
