//! Vote service.
//!
//! A user holds at most one vote per target. Voting again in the same
//! direction withdraws the vote; voting the other way flips it in place.
//! The lookup, the change and the counter resync run in one transaction with
//! the target row locked, so concurrent votes on one target serialize and
//! every resync sees its own write.

use museum_common::{AppError, AppResult, IdGenerator};
use museum_db::{
    entities::VoteDirection,
    repositories::{VoteCounts, VoteRecord, VoteRepository, VoteTargetKind},
};
use serde::Serialize;

use crate::services::aggregate::VoteAggregator;

/// What a vote request did to the stored vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    /// No previous vote; one was created.
    Created,
    /// The previous vote pointed the other way and was flipped.
    Updated,
    /// The previous vote pointed the same way and was withdrawn.
    Removed,
}

impl VoteAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Removed => "removed",
        }
    }
}

/// Decide what a vote request does given the voter's current vote.
#[must_use]
pub const fn resolve_transition(
    existing: Option<VoteDirection>,
    requested: VoteDirection,
) -> VoteAction {
    match (existing, requested) {
        (None, _) => VoteAction::Created,
        (Some(VoteDirection::Upvote), VoteDirection::Upvote)
        | (Some(VoteDirection::Downvote), VoteDirection::Downvote) => VoteAction::Removed,
        (Some(_), _) => VoteAction::Updated,
    }
}

/// Result of applying a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub action: VoteAction,
    /// The voter's vote after the request, `None` when withdrawn.
    pub direction: Option<VoteDirection>,
    /// Target counters after the resync.
    pub counts: VoteCounts,
}

/// The caller's current vote on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    pub is_upvote: Option<bool>,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    aggregator: VoteAggregator,
    forbid_self_vote: bool,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub fn new(vote_repo: VoteRepository, forbid_self_vote: bool) -> Self {
        Self {
            aggregator: VoteAggregator::new(vote_repo.clone()),
            vote_repo,
            forbid_self_vote,
            id_gen: IdGenerator::new(),
        }
    }

    /// Apply a vote and return the action taken with the resynced counters.
    pub async fn apply_vote(
        &self,
        voter_id: &str,
        kind: VoteTargetKind,
        target_id: &str,
        requested: VoteDirection,
    ) -> AppResult<VoteOutcome> {
        // Dropping `txn` on an early return rolls everything back.
        let txn = self.vote_repo.begin().await?;

        let author_id = self.vote_repo.lock_target(&txn, kind, target_id).await?;
        if self.forbid_self_vote && author_id == voter_id {
            return Err(AppError::Forbidden(format!(
                "You cannot vote on your own {}",
                kind.as_str()
            )));
        }

        let existing = self.vote_repo.find(&txn, kind, voter_id, target_id).await?;
        let action = resolve_transition(existing.as_ref().map(|v| v.direction), requested);

        match (action, existing) {
            (VoteAction::Created, _) => {
                let record = VoteRecord {
                    id: self.id_gen.generate(),
                    user_id: voter_id.to_string(),
                    target_id: target_id.to_string(),
                    direction: requested,
                };
                self.vote_repo.insert(&txn, kind, record).await?;
            }
            (VoteAction::Removed, Some(vote)) => {
                self.vote_repo.delete(&txn, kind, &vote.id).await?;
            }
            (VoteAction::Updated, Some(vote)) => {
                self.vote_repo
                    .set_direction(&txn, kind, &vote.id, requested)
                    .await?;
            }
            (VoteAction::Removed | VoteAction::Updated, None) => {
                return Err(AppError::Internal(
                    "vote transition without an existing vote".to_string(),
                ));
            }
        }

        let counts = self.aggregator.resync(&txn, kind, target_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            voter_id = %voter_id,
            kind = kind.as_str(),
            target_id = %target_id,
            action = action.as_str(),
            "Applied vote"
        );

        Ok(VoteOutcome {
            action,
            direction: match action {
                VoteAction::Removed => None,
                VoteAction::Created | VoteAction::Updated => Some(requested),
            },
            counts,
        })
    }

    /// The caller's current vote on a target. A missing target is a
    /// not-found error, not an empty status.
    pub async fn status(
        &self,
        voter_id: &str,
        kind: VoteTargetKind,
        target_id: &str,
    ) -> AppResult<VoteStatus> {
        self.vote_repo.find_target_author(kind, target_id).await?;

        let vote = self
            .vote_repo
            .find_for_user(kind, voter_id, target_id)
            .await?;

        Ok(VoteStatus {
            has_voted: vote.is_some(),
            is_upvote: vote.map(|v| v.direction.is_upvote()),
        })
    }
}
