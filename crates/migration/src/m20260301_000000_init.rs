//! Initial schema.
//!
//! - `users`: profiles, with the relationship sets stored as JSON arrays
//! - `friend_requests`: one record per ordered pair, keyed `from_to`
//! - `friendships`: one record per unordered pair, keyed `low_high`

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    UserId,
    Username,
    UsernameFolded,
    Email,
    ImageUrl,
    UpdatedAt,
    Friends,
    IncomingRequests,
    OutgoingRequests,
}

#[derive(Iden)]
enum FriendRequests {
    Table,
    Id,
    FromUserId,
    ToUserId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Friendships {
    Table,
    Id,
    UserLow,
    UserHigh,
    Status,
    CreatedAt,
    LastInteractionAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::UsernameFolded).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Users::ImageUrl)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::UpdatedAt).big_integer().not_null())
                    .col(
                        ColumnDef::new(Users::Friends)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Users::IncomingRequests)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Users::OutgoingRequests)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-username_folded-unique")
                    .table(Users::Table)
                    .col(Users::UsernameFolded)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FriendRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FriendRequests::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FriendRequests::FromUserId).string().not_null())
                    .col(ColumnDef::new(FriendRequests::ToUserId).string().not_null())
                    .col(ColumnDef::new(FriendRequests::Status).string().not_null())
                    .col(
                        ColumnDef::new(FriendRequests::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendRequests::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-friend_requests-from_user_id")
                            .from(FriendRequests::Table, FriendRequests::FromUserId)
                            .to(Users::Table, Users::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-friend_requests-to_user_id")
                            .from(FriendRequests::Table, FriendRequests::ToUserId)
                            .to(Users::Table, Users::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-friend_requests-to_user_id-status")
                    .table(FriendRequests::Table)
                    .col(FriendRequests::ToUserId)
                    .col(FriendRequests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-friend_requests-from_user_id-status")
                    .table(FriendRequests::Table)
                    .col(FriendRequests::FromUserId)
                    .col(FriendRequests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Friendships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Friendships::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Friendships::UserLow).string().not_null())
                    .col(ColumnDef::new(Friendships::UserHigh).string().not_null())
                    .col(ColumnDef::new(Friendships::Status).string().not_null())
                    .col(
                        ColumnDef::new(Friendships::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Friendships::LastInteractionAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-friendships-user_low")
                            .from(Friendships::Table, Friendships::UserLow)
                            .to(Users::Table, Users::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-friendships-user_high")
                            .from(Friendships::Table, Friendships::UserHigh)
                            .to(Users::Table, Users::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-friendships-user_low")
                    .table(Friendships::Table)
                    .col(Friendships::UserLow)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-friendships-user_high")
                    .table(Friendships::Table)
                    .col(Friendships::UserHigh)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Friendships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FriendRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
