//! Vote counter aggregation.
//!
//! Memes and comments store `upvotes`/`downvotes` counters for cheap reads.
//! The vote rows are authoritative; [`VoteAggregator::resync`] recounts them
//! and overwrites both counters, so running it twice is the same as once.

use museum_common::AppResult;
use museum_db::{
    entities::VoteDirection,
    repositories::{VoteCounts, VoteRepository, VoteTargetKind},
};
use sea_orm::ConnectionTrait;

/// Recomputes denormalized vote counters from the vote rows.
#[derive(Clone)]
pub struct VoteAggregator {
    vote_repo: VoteRepository,
}

impl VoteAggregator {
    /// Create a new aggregator.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository) -> Self {
        Self { vote_repo }
    }

    /// Recount the votes on a target and persist both counters in one write.
    ///
    /// Pass the transaction the vote change was made in so the counts include it.
    pub async fn resync<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: VoteTargetKind,
        target_id: &str,
    ) -> AppResult<VoteCounts> {
        let upvotes = self
            .vote_repo
            .count(conn, kind, target_id, VoteDirection::Upvote)
            .await?;
        let downvotes = self
            .vote_repo
            .count(conn, kind, target_id, VoteDirection::Downvote)
            .await?;

        let counts = VoteCounts {
            upvotes: to_counter(upvotes),
            downvotes: to_counter(downvotes),
        };

        self.vote_repo
            .write_counters(conn, kind, target_id, counts)
            .await?;

        tracing::debug!(
            kind = kind.as_str(),
            target_id = %target_id,
            upvotes = counts.upvotes,
            downvotes = counts.downvotes,
            "Resynced vote counters"
        );

        Ok(counts)
    }
}

fn to_counter(count: u64) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};
    use std::sync::Arc;

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(n)),
        }
    }

    #[tokio::test]
    async fn test_resync_writes_recounted_values() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(3)]])
            .append_query_results([[count_row(1)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let aggregator = VoteAggregator::new(VoteRepository::new(Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        )));

        let counts = aggregator
            .resync(&db, VoteTargetKind::Comment, "c1")
            .await
            .unwrap();

        assert_eq!(
            counts,
            VoteCounts {
                upvotes: 3,
                downvotes: 1
            }
        );

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
        assert_eq!(
            log[2],
            Transaction::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"UPDATE "comment" SET "upvotes" = $1, "downvotes" = $2 WHERE "comment"."id" = $3"#,
                [3i32.into(), 1i32.into(), "c1".into()],
            )
        );
    }

    #[test]
    fn test_to_counter_saturates() {
        assert_eq!(to_counter(7), 7);
        assert_eq!(to_counter(u64::MAX), i32::MAX);
    }
}
