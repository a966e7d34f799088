//! Comment service.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use museum_common::{AppError, AppResult, IdGenerator};
use museum_db::{
    entities::{comment, user},
    repositories::{CommentRepository, MemeRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::pagination::{PageRequest, Pagination};

/// Default number of comments per page.
pub const DEFAULT_COMMENT_PAGE_SIZE: u64 = 20;
/// Largest accepted comment page size.
pub const MAX_COMMENT_PAGE_SIZE: u64 = 100;

/// Input for posting a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 500))]
    pub content: String,
}

/// Comment author.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub id: String,
    pub username: String,
}

impl From<user::Model> for CommentAuthor {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
        }
    }
}

/// A comment with its author.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub meme_id: String,
    pub content: String,
    pub upvotes: i32,
    pub downvotes: i32,
    pub score: i32,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub user: Option<CommentAuthor>,
}

impl CommentResponse {
    fn new(c: comment::Model, user: Option<CommentAuthor>) -> Self {
        Self {
            score: c.upvotes - c.downvotes,
            id: c.id,
            meme_id: c.meme_id,
            content: c.content,
            upvotes: c.upvotes,
            downvotes: c.downvotes,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.map(|t| t.to_rfc3339()),
            user,
        }
    }
}

/// One page of comments.
#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
    pub comments: Vec<CommentResponse>,
    pub pagination: Pagination,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    meme_repo: MemeRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        meme_repo: MemeRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            meme_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comments on a meme, newest first.
    pub async fn list(
        &self,
        meme_id: &str,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> AppResult<CommentPage> {
        let page = PageRequest::resolve(
            page,
            limit,
            DEFAULT_COMMENT_PAGE_SIZE,
            MAX_COMMENT_PAGE_SIZE,
        )?;
        self.meme_repo.get_by_id(meme_id).await?;

        let total = self.comment_repo.count_by_meme(meme_id).await?;
        let comments = self
            .comment_repo
            .find_by_meme(meme_id, page.limit, page.offset())
            .await?;

        let author_ids: Vec<String> = comments
            .iter()
            .map(|c| c.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let comments = comments
            .into_iter()
            .map(|c| {
                let author = authors.get(&c.user_id).cloned().map(CommentAuthor::from);
                CommentResponse::new(c, author)
            })
            .collect();

        Ok(CommentPage {
            comments,
            pagination: page.meta(total),
        })
    }

    /// Post a comment on a meme.
    pub async fn create(
        &self,
        author: &user::Model,
        meme_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentResponse> {
        let input = CreateCommentInput {
            content: input.content.trim().to_string(),
        };
        input.validate()?;

        self.meme_repo.get_by_id(meme_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            meme_id: Set(meme_id.to_string()),
            user_id: Set(author.id.clone()),
            content: Set(input.content),
            upvotes: Set(0),
            downvotes: Set(0),
            created_at: Set(Utc::now().fixed_offset()),
            updated_at: Set(None),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, meme_id = %meme_id, user_id = %author.id, "Comment created");

        Ok(CommentResponse::new(
            comment,
            Some(CommentAuthor::from(author.clone())),
        ))
    }

    /// Get a comment with its author.
    pub async fn get(&self, id: &str) -> AppResult<CommentResponse> {
        let comment = self.comment_repo.get_by_id(id).await?;
        let author = self
            .user_repo
            .find_by_id(&comment.user_id)
            .await?
            .map(CommentAuthor::from);
        Ok(CommentResponse::new(comment, author))
    }

    /// Delete a comment. Allowed for its author and for admins.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        if comment.user_id != actor.id && !actor.is_admin {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.comment_repo.delete(id).await?;
        tracing::info!(comment_id = %id, user_id = %actor.id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use museum_db::entities::meme;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> CommentService {
        let db = Arc::new(db.into_connection());
        CommentService::new(
            CommentRepository::new(db.clone()),
            MemeRepository::new(db.clone()),
            UserRepository::new(db),
        )
    }

    fn create_test_user(id: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("{id}_name"),
            email: format!("{id}@example.com"),
            name: "Test".to_string(),
            surname: "User".to_string(),
            password_hash: String::new(),
            is_admin,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_comment(id: &str, user_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            meme_id: "m1".to_string(),
            user_id: user_id.to_string(),
            content: "nice".to_string(),
            upvotes: 3,
            downvotes: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_meme(id: &str) -> meme::Model {
        meme::Model {
            id: id.to_string(),
            user_id: "owner".to_string(),
            title: "title".to_string(),
            description: None,
            image_url: "https://example.com/a.png".to_string(),
            upvotes: 0,
            downvotes: 0,
            likes: 0,
            views: 0,
            download_count: 0,
            is_public: true,
            is_active: true,
            uploaded_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_blank_content() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(
                &create_test_user("u1", false),
                "m1",
                CreateCommentInput {
                    content: "   ".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_long_content() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(
                &create_test_user("u1", false),
                "m1",
                CreateCommentInput {
                    content: "a".repeat(501),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_on_missing_meme() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<meme::Model>::new()]);

        let result = service(db)
            .create(
                &create_test_user("u1", false),
                "m404",
                CreateCommentInput {
                    content: "hello".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::MemeNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_trims_and_attaches_author() {
        let mut stored = create_test_comment("c1", "u1");
        stored.content = "hello".to_string();
        stored.upvotes = 0;
        stored.downvotes = 0;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_meme("m1")]])
            .append_query_results([[stored]]);

        let response = service(db)
            .create(
                &create_test_user("u1", false),
                "m1",
                CreateCommentInput {
                    content: "  hello  ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(response.content, "hello");
        assert_eq!(response.user.unwrap().username, "u1_name");
    }

    #[tokio::test]
    async fn test_delete_by_stranger_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_comment("c1", "author")]]);

        let result = service(db)
            .delete(&create_test_user("stranger", false), "c1")
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_by_admin_allowed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_comment("c1", "author")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);

        service(db)
            .delete(&create_test_user("admin", true), "c1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_includes_score() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_comment("c1", "u1")]])
            .append_query_results([[create_test_user("u1", false)]]);

        let response = service(db).get("c1").await.unwrap();

        assert_eq!(response.score, 2);
        assert_eq!(response.user.unwrap().id, "u1");
    }
}
