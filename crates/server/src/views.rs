//! Mapping between engine types and the wire types of `api_types`.

use api_types::{
    income::{IncomeRecordView, PayoutView},
    listing::{ListingView, MarketSort, SettlementView, TransactionStatus},
    portfolio::{IncomeEntryView, ShareView},
    project::{
        HoldingView, ParticipantRole, ParticipantView, ProjectStatus, ProjectView, RefundView,
    },
};

pub fn currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Cny => api_types::Currency::Cny,
        engine::Currency::Eur => api_types::Currency::Eur,
    }
}

pub fn engine_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Cny => engine::Currency::Cny,
        api_types::Currency::Eur => engine::Currency::Eur,
    }
}

pub fn project_status(status: engine::ProjectStatus) -> ProjectStatus {
    match status {
        engine::ProjectStatus::Fundraising => ProjectStatus::Fundraising,
        engine::ProjectStatus::Active => ProjectStatus::Active,
        engine::ProjectStatus::Closed => ProjectStatus::Closed,
        engine::ProjectStatus::Refunded => ProjectStatus::Refunded,
    }
}

pub fn engine_project_status(status: ProjectStatus) -> engine::ProjectStatus {
    match status {
        ProjectStatus::Fundraising => engine::ProjectStatus::Fundraising,
        ProjectStatus::Active => engine::ProjectStatus::Active,
        ProjectStatus::Closed => engine::ProjectStatus::Closed,
        ProjectStatus::Refunded => engine::ProjectStatus::Refunded,
    }
}

pub fn engine_market_sort(sort: MarketSort) -> engine::MarketSort {
    match sort {
        MarketSort::PriceAsc => engine::MarketSort::PriceAsc,
        MarketSort::PriceDesc => engine::MarketSort::PriceDesc,
        MarketSort::TimeDesc => engine::MarketSort::TimeDesc,
    }
}

pub fn project(project: engine::Project) -> ProjectView {
    ProjectView {
        id: project.id,
        remaining_shares: project.remaining_shares(),
        progress_bps: project.progress_bps(),
        title: project.title,
        vehicle_model_id: project.vehicle_model_id,
        operator_id: project.operator_id,
        currency: currency(project.currency),
        status: project_status(project.status),
        target_amount_minor: project.target_amount_minor,
        raised_amount_minor: project.raised_amount_minor,
        share_unit_price_minor: project.share_unit_price_minor,
        total_shares: project.total_shares,
        created_at: project.created_at,
        closes_at: project.closes_at,
    }
}

pub fn holding(holding: engine::Holding) -> HoldingView {
    HoldingView {
        owner_id: holding.owner_id,
        share_count: holding.share_count,
        reserved: holding.reserved,
        acquired_at: holding.acquired_at,
    }
}

pub fn participant(participant: engine::Participant) -> ParticipantView {
    ParticipantView {
        user_id: participant.user_id,
        role: match participant.role {
            engine::ParticipantRole::Investor => ParticipantRole::Investor,
            engine::ParticipantRole::Operator => ParticipantRole::Operator,
            engine::ParticipantRole::Platform => ParticipantRole::Platform,
        },
        share_count: participant.share_count,
    }
}

pub fn refund(refund: engine::Refund) -> RefundView {
    RefundView {
        owner_id: refund.owner_id,
        share_count: refund.share_count,
        amount_minor: refund.amount_minor,
    }
}

pub fn listing(tx: engine::ShareTransaction) -> ListingView {
    ListingView {
        id: tx.id,
        project_id: tx.project_id,
        seller_id: tx.seller_id,
        buyer_id: tx.buyer_id,
        share_count: tx.share_count,
        price_per_share_minor: tx.price_per_share_minor,
        status: match tx.status {
            engine::TransactionStatus::Listed => TransactionStatus::Listed,
            engine::TransactionStatus::Matched => TransactionStatus::Matched,
            engine::TransactionStatus::Completed => TransactionStatus::Completed,
            engine::TransactionStatus::Cancelled => TransactionStatus::Cancelled,
        },
        created_at: tx.created_at,
        matched_at: tx.matched_at,
        completed_at: tx.completed_at,
        cancelled_at: tx.cancelled_at,
        failure_reason: tx.failure_reason,
        settlement: tx.settlement.map(|s| SettlementView {
            gross_minor: s.gross_minor,
            platform_fee_minor: s.platform_fee_minor,
            operator_fee_minor: s.operator_fee_minor,
            seller_net_minor: s.seller_net_minor,
        }),
    }
}

pub fn income_record(
    record: engine::IncomeRecord,
    payouts: Vec<engine::Payout>,
) -> IncomeRecordView {
    IncomeRecordView {
        id: record.id,
        period_start: record.period_start,
        period_end: record.period_end,
        total_income_minor: record.total_income_minor,
        distributed_at: record.distributed_at,
        payouts: payouts
            .into_iter()
            .map(|p| PayoutView {
                owner_id: p.owner_id,
                share_count: p.share_count,
                amount_minor: p.amount_minor,
            })
            .collect(),
    }
}

pub fn share(holding: engine::OwnerHolding) -> ShareView {
    ShareView {
        project_id: holding.project_id,
        title: holding.title,
        status: project_status(holding.status),
        share_count: holding.share_count,
        reserved: holding.reserved,
        acquired_at: holding.acquired_at,
        income_minor: holding.income_minor,
    }
}

pub fn income_entry(payout: engine::OwnerPayout) -> IncomeEntryView {
    IncomeEntryView {
        project_id: payout.project_id,
        income_record_id: payout.income_record_id,
        period_start: payout.period_start,
        period_end: payout.period_end,
        distributed_at: payout.distributed_at,
        share_count: payout.share_count,
        amount_minor: payout.amount_minor,
    }
}
