//! Command and filter structs for engine operations.
//!
//! These types group parameters for operations with many optional inputs,
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, ProjectStatus};

/// Create a crowdfunding project.
#[derive(Clone, Debug)]
pub struct NewProjectCmd {
    pub title: String,
    pub vehicle_model_id: String,
    pub operator_id: String,
    pub currency: Currency,
    pub total_shares: i64,
    pub share_unit_price_minor: i64,
    pub created_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl NewProjectCmd {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        operator_id: impl Into<String>,
        total_shares: i64,
        share_unit_price_minor: i64,
        created_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            vehicle_model_id: String::new(),
            operator_id: operator_id.into(),
            currency: Currency::default(),
            total_shares,
            share_unit_price_minor,
            created_at,
            closes_at,
        }
    }

    #[must_use]
    pub fn vehicle_model_id(mut self, vehicle_model_id: impl Into<String>) -> Self {
        self.vehicle_model_id = vehicle_model_id.into();
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }
}

/// Sort order of the share market.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSort {
    PriceAsc,
    PriceDesc,
    #[default]
    TimeDesc,
}

/// Filter for open listings.
#[derive(Clone, Debug)]
pub struct MarketFilter {
    pub project_id: Option<Uuid>,
    pub sort: MarketSort,
    pub limit: u64,
    /// Listings to skip, for paging.
    pub offset: u64,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self {
            project_id: None,
            sort: MarketSort::default(),
            limit: 50,
            offset: 0,
        }
    }
}

impl MarketFilter {
    #[must_use]
    pub fn project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: MarketSort) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Filter for project listings.
#[derive(Clone, Debug, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub operator_id: Option<String>,
    /// Only projects this user takes part in, in any role.
    pub participant_id: Option<String>,
    /// No limit when `None`.
    pub limit: Option<u64>,
    pub offset: u64,
}
