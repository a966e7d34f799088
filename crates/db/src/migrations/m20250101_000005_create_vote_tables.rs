//! Create meme_vote and comment_vote tables.
//!
//! The unique (user, target) indexes guarantee a single vote per voter and
//! target even if two requests race past the application checks.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MemeVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MemeVote::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MemeVote::UserId).string().not_null())
                    .col(ColumnDef::new(MemeVote::MemeId).string().not_null())
                    .col(ColumnDef::new(MemeVote::Direction).string_len(8).not_null())
                    .col(
                        ColumnDef::new(MemeVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MemeVote::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_vote_user")
                            .from(MemeVote::Table, MemeVote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_vote_meme")
                            .from(MemeVote::Table, MemeVote::MemeId)
                            .to(Meme::Table, Meme::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meme_vote_user_meme")
                    .table(MemeVote::Table)
                    .col(MemeVote::UserId)
                    .col(MemeVote::MemeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Aggregation counts by (meme, direction)
        manager
            .create_index(
                Index::create()
                    .name("idx_meme_vote_meme_direction")
                    .table(MemeVote::Table)
                    .col(MemeVote::MemeId)
                    .col(MemeVote::Direction)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommentVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentVote::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommentVote::UserId).string().not_null())
                    .col(ColumnDef::new(CommentVote::CommentId).string().not_null())
                    .col(
                        ColumnDef::new(CommentVote::Direction)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentVote::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_vote_user")
                            .from(CommentVote::Table, CommentVote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_vote_comment")
                            .from(CommentVote::Table, CommentVote::CommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_vote_user_comment")
                    .table(CommentVote::Table)
                    .col(CommentVote::UserId)
                    .col(CommentVote::CommentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_vote_comment_direction")
                    .table(CommentVote::Table)
                    .col(CommentVote::CommentId)
                    .col(CommentVote::Direction)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentVote::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(MemeVote::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum MemeVote {
    Table,
    Id,
    UserId,
    MemeId,
    Direction,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CommentVote {
    Table,
    Id,
    UserId,
    CommentId,
    Direction,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Meme {
    Table,
    Id,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
}
