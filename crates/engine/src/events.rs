//! Ledger events handed to the payment and notification collaborators.
//!
//! Events are published after the storage transaction that produced them has
//! committed, so a sink never observes a change that was rolled back.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{IncomeRecord, Payout, ProjectStatus, Settlement};

/// Amount owed back to one holder of a refunded project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub owner_id: String,
    pub share_count: i64,
    pub amount_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Matched {
        transaction_id: Uuid,
        project_id: Uuid,
        seller_id: String,
        buyer_id: String,
        share_count: i64,
    },
    Completed {
        transaction_id: Uuid,
        project_id: Uuid,
        seller_id: String,
        buyer_id: String,
        /// Receives `settlement.operator_fee_minor`.
        operator_id: String,
        share_count: i64,
        settlement: Settlement,
    },
    Cancelled {
        transaction_id: Uuid,
        project_id: Uuid,
        seller_id: String,
    },
    Distributed {
        record: IncomeRecord,
        payouts: Vec<Payout>,
    },
    Refunded {
        project_id: Uuid,
        refunds: Vec<Refund>,
    },
    StatusChanged {
        project_id: Uuid,
        from: ProjectStatus,
        to: ProjectStatus,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "matched",
            Self::Completed { .. } => "completed",
            Self::Cancelled { .. } => "cancelled",
            Self::Distributed { .. } => "distributed",
            Self::Refunded { .. } => "refunded",
            Self::StatusChanged { .. } => "status_changed",
        }
    }
}

/// Receives ledger events (payout instructions, refunds, notifications).
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: &LedgerEvent);
}

/// Default sink: logs every event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::Distributed { record, payouts } => tracing::info!(
                project_id = %record.project_id,
                record_id = %record.id,
                total_income_minor = record.total_income_minor,
                payouts = payouts.len(),
                "income distributed"
            ),
            LedgerEvent::Refunded {
                project_id,
                refunds,
            } => tracing::info!(%project_id, refunds = refunds.len(), "project refunded"),
            other => tracing::info!(event = other.name(), "ledger event"),
        }
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events published so far.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &LedgerEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}
