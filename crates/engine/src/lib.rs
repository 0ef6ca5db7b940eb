//! Fractional share ledger and settlement engine.
//!
//! The engine owns four concerns, all persisted through sea-orm:
//!
//! - the **share registry** ([`Engine::allocate`], [`Engine::transfer`],
//!   [`Engine::holding_of`], [`Engine::total_allocated`]),
//! - the **transaction matcher** ([`Engine::list`], [`Engine::match_buyer`],
//!   [`Engine::complete`], [`Engine::cancel`]),
//! - the **income distributor** ([`Engine::distribute`]),
//! - the **project lifecycle** ([`Engine::activate`], [`Engine::close`],
//!   [`Engine::refund`], [`Engine::sweep`]).
//!
//! Every mutation of a project is serialized by a per-project lock and applied
//! inside one database transaction.

pub use commands::{MarketFilter, MarketSort, NewProjectCmd, ProjectFilter};
pub use currency::Currency;
pub use distribution::{ProRataShare, split_pro_rata};
pub use error::EngineError;
pub use events::{EventSink, LedgerEvent, RecordingSink, Refund, TracingSink};
pub use fees::FeePolicy;
pub use holdings::Holding;
pub use income_payouts::{OwnerPayout, Payout};
pub use income_records::IncomeRecord;
pub use ops::{Engine, EngineBuilder, OwnerHolding, Portfolio, SweepReport};
pub use participants::{Participant, ParticipantRole};
pub use projects::{Project, ProjectStatus};
pub use share_transactions::{Settlement, ShareTransaction, TransactionStatus};

mod commands;
mod currency;
mod distribution;
mod error;
mod events;
mod fees;
mod locks;
mod ops;
mod util;

pub mod holdings;
pub mod income_payouts;
pub mod income_records;
pub mod participants;
pub mod projects;
pub mod share_transactions;

type ResultEngine<T> = Result<T, EngineError>;
