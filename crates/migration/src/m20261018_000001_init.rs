//! Initial schema.
//!
//! - `users`: HTTP authentication
//! - `projects`: crowdfunding projects and their lifecycle status
//! - `participants`: users taking part in a project, with their role
//! - `holdings`: shares owned per project and owner, with the soft-locked part
//! - `share_transactions`: secondary-market listings and their settlement
//! - `income_records` / `income_payouts`: distributed operating income

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Title,
    VehicleModelId,
    OperatorId,
    Currency,
    TargetAmountMinor,
    RaisedAmountMinor,
    ShareUnitPriceMinor,
    TotalShares,
    Status,
    CreatedAt,
    ClosesAt,
}

#[derive(Iden)]
enum Participants {
    Table,
    ProjectId,
    UserId,
    Role,
}

#[derive(Iden)]
enum Holdings {
    Table,
    Id,
    ProjectId,
    OwnerId,
    ShareCount,
    Reserved,
    AcquiredAt,
}

#[derive(Iden)]
enum ShareTransactions {
    Table,
    Id,
    ProjectId,
    SellerId,
    BuyerId,
    ShareCount,
    PricePerShareMinor,
    Status,
    CreatedAt,
    MatchedAt,
    CompletedAt,
    CancelledAt,
    FailureReason,
    GrossMinor,
    PlatformFeeMinor,
    OperatorFeeMinor,
    SellerNetMinor,
}

#[derive(Iden)]
enum IncomeRecords {
    Table,
    Id,
    ProjectId,
    PeriodStart,
    PeriodEnd,
    TotalIncomeMinor,
    DistributedAt,
}

#[derive(Iden)]
enum IncomePayouts {
    Table,
    Id,
    IncomeRecordId,
    OwnerId,
    ShareCount,
    AmountMinor,
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
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Projects
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Projects::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Projects::Title).string().not_null())
                    .col(
                        ColumnDef::new(Projects::VehicleModelId)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Projects::OperatorId).string().not_null())
                    .col(
                        ColumnDef::new(Projects::Currency)
                            .string()
                            .not_null()
                            .default("CNY"),
                    )
                    .col(
                        ColumnDef::new(Projects::TargetAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Projects::RaisedAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Projects::ShareUnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Projects::TotalShares)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Projects::Status).string().not_null())
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Projects::ClosesAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-projects-status-closes_at")
                    .table(Projects::Table)
                    .col(Projects::Status)
                    .col(Projects::ClosesAt)
                    .to_owned(),
            )
            .await?;

        // Participants
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Participants::ProjectId).string().not_null())
                    .col(ColumnDef::new(Participants::UserId).string().not_null())
                    .col(ColumnDef::new(Participants::Role).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(Participants::ProjectId)
                            .col(Participants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-participants-project_id")
                            .from(Participants::Table, Participants::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Holdings
        manager
            .create_table(
                Table::create()
                    .table(Holdings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Holdings::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Holdings::ProjectId).string().not_null())
                    .col(ColumnDef::new(Holdings::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(Holdings::ShareCount)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Holdings::ShareCount).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Holdings::Reserved)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Holdings::Reserved).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Holdings::AcquiredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-holdings-project_id")
                            .from(Holdings::Table, Holdings::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-holdings-project_id-owner_id-unique")
                    .table(Holdings::Table)
                    .col(Holdings::ProjectId)
                    .col(Holdings::OwnerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-holdings-owner_id")
                    .table(Holdings::Table)
                    .col(Holdings::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Share transactions
        manager
            .create_table(
                Table::create()
                    .table(ShareTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShareTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::ProjectId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::SellerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShareTransactions::BuyerId).string())
                    .col(
                        ColumnDef::new(ShareTransactions::ShareCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::PricePerShareMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::Status)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::MatchedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::CompletedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::CancelledAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(ShareTransactions::FailureReason).string())
                    .col(ColumnDef::new(ShareTransactions::GrossMinor).big_integer())
                    .col(
                        ColumnDef::new(ShareTransactions::PlatformFeeMinor)
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::OperatorFeeMinor)
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(ShareTransactions::SellerNetMinor)
                            .big_integer(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-share_transactions-project_id")
                            .from(ShareTransactions::Table, ShareTransactions::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-share_transactions-status-created_at")
                    .table(ShareTransactions::Table)
                    .col(ShareTransactions::Status)
                    .col(ShareTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-share_transactions-project_id")
                    .table(ShareTransactions::Table)
                    .col(ShareTransactions::ProjectId)
                    .to_owned(),
            )
            .await?;

        // Income
        manager
            .create_table(
                Table::create()
                    .table(IncomeRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncomeRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IncomeRecords::ProjectId).string().not_null())
                    .col(
                        ColumnDef::new(IncomeRecords::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncomeRecords::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncomeRecords::TotalIncomeMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncomeRecords::DistributedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-income_records-project_id")
                            .from(IncomeRecords::Table, IncomeRecords::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-income_records-project_id-period_start")
                    .table(IncomeRecords::Table)
                    .col(IncomeRecords::ProjectId)
                    .col(IncomeRecords::PeriodStart)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IncomePayouts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncomePayouts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IncomePayouts::IncomeRecordId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IncomePayouts::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(IncomePayouts::ShareCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncomePayouts::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-income_payouts-income_record_id")
                            .from(IncomePayouts::Table, IncomePayouts::IncomeRecordId)
                            .to(IncomeRecords::Table, IncomeRecords::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-income_payouts-owner_id")
                    .table(IncomePayouts::Table)
                    .col(IncomePayouts::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IncomePayouts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IncomeRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShareTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Holdings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
