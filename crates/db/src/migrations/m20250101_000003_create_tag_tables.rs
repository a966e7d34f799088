//! Create tag and meme_tag tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tag::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Tag::Name)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tag::Description).text().null())
                    .col(
                        ColumnDef::new(Tag::Color)
                            .string_len(7)
                            .not_null()
                            .default("#6B7280"),
                    )
                    .col(
                        ColumnDef::new(Tag::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MemeTag::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MemeTag::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MemeTag::MemeId).string().not_null())
                    .col(ColumnDef::new(MemeTag::TagId).string().not_null())
                    .col(
                        ColumnDef::new(MemeTag::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_tag_meme")
                            .from(MemeTag::Table, MemeTag::MemeId)
                            .to(Meme::Table, Meme::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_tag_tag")
                            .from(MemeTag::Table, MemeTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A meme carries each tag at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_meme_tag_meme_tag")
                    .table(MemeTag::Table)
                    .col(MemeTag::MemeId)
                    .col(MemeTag::TagId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meme_tag_tag_id")
                    .table(MemeTag::Table)
                    .col(MemeTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MemeTag::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tag::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
    Name,
    Description,
    Color,
    CreatedAt,
}

#[derive(Iden)]
enum MemeTag {
    Table,
    Id,
    MemeId,
    TagId,
    CreatedAt,
}

#[derive(Iden)]
enum Meme {
    Table,
    Id,
}
