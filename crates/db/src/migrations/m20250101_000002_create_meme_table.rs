//! Create meme table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Meme::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Meme::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Meme::UserId).string().not_null())
                    .col(ColumnDef::new(Meme::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Meme::Description).text().null())
                    .col(ColumnDef::new(Meme::ImageUrl).string_len(2048).not_null())
                    .col(
                        ColumnDef::new(Meme::Upvotes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Meme::Downvotes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Meme::Likes).integer().not_null().default(0))
                    .col(ColumnDef::new(Meme::Views).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Meme::DownloadCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Meme::IsPublic)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Meme::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Meme::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Meme::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_user")
                            .from(Meme::Table, Meme::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meme_user_id")
                    .table(Meme::Table)
                    .col(Meme::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meme_uploaded_at")
                    .table(Meme::Table)
                    .col(Meme::UploadedAt)
                    .to_owned(),
            )
            .await?;

        // Backs score ordering and meme of the day
        manager
            .create_index(
                Index::create()
                    .name("idx_meme_upvotes_downvotes")
                    .table(Meme::Table)
                    .col(Meme::Upvotes)
                    .col(Meme::Downvotes)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Meme::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Meme {
    Table,
    Id,
    UserId,
    Title,
    Description,
    ImageUrl,
    Upvotes,
    Downvotes,
    Likes,
    Views,
    DownloadCount,
    IsPublic,
    IsActive,
    UploadedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
