//! Test utilities for database operations.
//!
//! Provides a migrated throwaway database plus fixture helpers. By default
//! the database is an in-memory SQLite instance; set `TEST_DATABASE_URL` to
//! run against `PostgreSQL` instead.

use std::sync::Arc;

use crate::entities::{comment, meme, meme_tag, tag, user};
use chrono::{DateTime, Utc};
use museum_common::IdGenerator;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database URL.
    pub url: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("TEST_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Whether the URL points at an in-memory SQLite database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("sqlite::memory:") || self.url.contains("mode=memory")
    }
}

/// Fields for a meme fixture. Unset fields get harmless defaults.
#[derive(Debug, Clone, Default)]
pub struct MemeFixture {
    /// Explicit ID, generated when `None`.
    pub id: Option<String>,
    /// Title, defaults to `"meme"`.
    pub title: Option<String>,
    /// Upload date, defaults to now.
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Stored upvote counter.
    pub upvotes: i32,
    /// Stored downvote counter.
    pub downvotes: i32,
    /// Whether the meme is active (defaults to active).
    pub inactive: bool,
}

/// A migrated test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
    /// Database configuration.
    pub config: TestDbConfig,
    id_gen: IdGenerator,
}

impl TestDatabase {
    /// Connect with the default configuration and run all migrations.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with a custom configuration and run all migrations.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(&config.url);
        if config.is_in_memory() {
            // Every pooled connection would otherwise open its own empty database.
            opt.max_connections(1).min_connections(1);
        }
        opt.sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        crate::migrations::Migrator::up(&conn, None).await?;

        info!(url = %config.url, "Connected to test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
            id_gen: IdGenerator::new(),
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    /// Insert a user with the given username. The password hash is a
    /// placeholder and will not verify.
    pub async fn insert_user(&self, username: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            name: Set("Test".to_string()),
            surname: Set("User".to_string()),
            password_hash: Set("!".to_string()),
            is_admin: Set(false),
            created_at: Set(Utc::now().fixed_offset()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a meme owned by `user_id`.
    pub async fn insert_meme(
        &self,
        user_id: &str,
        fixture: MemeFixture,
    ) -> Result<meme::Model, DbErr> {
        meme::ActiveModel {
            id: Set(fixture.id.unwrap_or_else(|| self.id_gen.generate())),
            user_id: Set(user_id.to_string()),
            title: Set(fixture.title.unwrap_or_else(|| "meme".to_string())),
            description: Set(None),
            image_url: Set("https://example.com/meme.png".to_string()),
            upvotes: Set(fixture.upvotes),
            downvotes: Set(fixture.downvotes),
            likes: Set(0),
            views: Set(0),
            download_count: Set(0),
            is_public: Set(true),
            is_active: Set(!fixture.inactive),
            uploaded_at: Set(fixture.uploaded_at.unwrap_or_else(Utc::now).fixed_offset()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Tag a meme, creating the tag if needed.
    pub async fn tag_meme(&self, meme_id: &str, tag_name: &str) -> Result<tag::Model, DbErr> {
        let existing = tag::Entity::find()
            .filter(tag::Column::Name.eq(tag_name))
            .one(self.conn.as_ref())
            .await?;

        let tag = match existing {
            Some(tag) => tag,
            None => {
                tag::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    name: Set(tag_name.to_string()),
                    description: Set(None),
                    color: Set(tag::DEFAULT_COLOR.to_string()),
                    created_at: Set(Utc::now().fixed_offset()),
                }
                .insert(self.conn.as_ref())
                .await?
            }
        };

        meme_tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            meme_id: Set(meme_id.to_string()),
            tag_id: Set(tag.id.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(self.conn.as_ref())
        .await?;

        Ok(tag)
    }

    /// Insert a comment on a meme.
    pub async fn insert_comment(
        &self,
        meme_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<comment::Model, DbErr> {
        comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            meme_id: Set(meme_id.to_string()),
            user_id: Set(user_id.to_string()),
            content: Set(content.to_string()),
            upvotes: Set(0),
            downvotes: Set(0),
            created_at: Set(Utc::now().fixed_offset()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }
}
