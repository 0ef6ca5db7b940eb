use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Cny,
    Eur,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Cny => "CNY",
            Self::Eur => "EUR",
        }
    }
}

pub mod project {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ProjectStatus {
        Fundraising,
        Active,
        Closed,
        Refunded,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProjectNew {
        pub title: String,
        pub vehicle_model_id: Option<String>,
        pub currency: Option<Currency>,
        pub total_shares: i64,
        pub share_unit_price_minor: i64,
        /// RFC3339 timestamp, end of the fundraising window.
        pub closes_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProjectList {
        pub status: Option<ProjectStatus>,
        /// Only projects run by this operator.
        pub operator_id: Option<String>,
        /// Only projects the caller takes part in.
        pub mine: Option<bool>,
        pub limit: Option<u64>,
        pub offset: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProjectView {
        pub id: Uuid,
        pub title: String,
        pub vehicle_model_id: String,
        pub operator_id: String,
        pub currency: Currency,
        pub status: ProjectStatus,
        pub target_amount_minor: i64,
        pub raised_amount_minor: i64,
        pub share_unit_price_minor: i64,
        pub total_shares: i64,
        pub remaining_shares: i64,
        /// Funding progress in basis points (10 000 = fully funded).
        pub progress_bps: i64,
        pub created_at: DateTime<Utc>,
        pub closes_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProjectsResponse {
        pub projects: Vec<ProjectView>,
    }

    /// Buy `share_count` new shares of a fundraising project for the caller.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Allocate {
        pub share_count: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Transfer {
        pub to_user: String,
        pub share_count: i64,
    }

    /// The caller's (or receiver's) holding after a registry change.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct HoldingResponse {
        pub owner_id: String,
        pub share_count: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HoldingView {
        pub owner_id: String,
        pub share_count: i64,
        /// Shares soft-locked by a matched listing.
        pub reserved: i64,
        pub acquired_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HoldingsResponse {
        pub total_allocated: i64,
        pub holdings: Vec<HoldingView>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ParticipantRole {
        Investor,
        Operator,
        Platform,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub user_id: String,
        pub role: ParticipantRole,
        pub share_count: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantsResponse {
        pub participants: Vec<ParticipantView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefundView {
        pub owner_id: String,
        pub share_count: i64,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefundResponse {
        pub project: ProjectView,
        pub refunds: Vec<RefundView>,
    }
}

pub mod listing {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Listed,
        Matched,
        Completed,
        Cancelled,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MarketSort {
        PriceAsc,
        PriceDesc,
        #[default]
        TimeDesc,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ListingNew {
        pub project_id: Uuid,
        pub share_count: i64,
        pub price_per_share_minor: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MarketQuery {
        pub project_id: Option<Uuid>,
        pub sort: Option<MarketSort>,
        /// Defaults to 50.
        pub limit: Option<u64>,
        pub offset: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub gross_minor: i64,
        pub platform_fee_minor: i64,
        pub operator_fee_minor: i64,
        pub seller_net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ListingView {
        pub id: Uuid,
        pub project_id: Uuid,
        pub seller_id: String,
        pub buyer_id: Option<String>,
        pub share_count: i64,
        pub price_per_share_minor: i64,
        pub status: TransactionStatus,
        pub created_at: DateTime<Utc>,
        pub matched_at: Option<DateTime<Utc>>,
        pub completed_at: Option<DateTime<Utc>>,
        pub cancelled_at: Option<DateTime<Utc>>,
        /// Why the last settlement attempt was rolled back, if it was.
        pub failure_reason: Option<String>,
        pub settlement: Option<SettlementView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MarketResponse {
        pub listings: Vec<ListingView>,
    }
}

pub mod income {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DistributeNew {
        /// Inclusive start of the income period (RFC3339).
        pub period_start: DateTime<FixedOffset>,
        /// Exclusive end of the income period (RFC3339).
        pub period_end: DateTime<FixedOffset>,
        pub total_income_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayoutView {
        pub owner_id: String,
        pub share_count: i64,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeRecordView {
        pub id: Uuid,
        pub period_start: DateTime<Utc>,
        pub period_end: DateTime<Utc>,
        pub total_income_minor: i64,
        pub distributed_at: DateTime<Utc>,
        pub payouts: Vec<PayoutView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeResponse {
        pub records: Vec<IncomeRecordView>,
    }
}

pub mod portfolio {
    use super::*;
    use crate::project::ProjectStatus;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShareView {
        pub project_id: Uuid,
        pub title: String,
        pub status: ProjectStatus,
        pub share_count: i64,
        pub reserved: i64,
        pub acquired_at: DateTime<Utc>,
        /// Income this project has paid the caller so far.
        pub income_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SharesResponse {
        pub shares: Vec<ShareView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct IncomeQuery {
        pub project_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeEntryView {
        pub project_id: Uuid,
        pub income_record_id: Uuid,
        pub period_start: DateTime<Utc>,
        pub period_end: DateTime<Utc>,
        pub distributed_at: DateTime<Utc>,
        pub share_count: i64,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeHistoryResponse {
        pub entries: Vec<IncomeEntryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PortfolioView {
        pub project_count: u64,
        pub total_shares: i64,
        pub total_investment_minor: i64,
        pub total_income_minor: i64,
    }
}
