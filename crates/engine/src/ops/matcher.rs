use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    EngineError, LedgerEvent, MarketFilter, MarketSort, ResultEngine, ShareTransaction,
    TransactionStatus, share_transactions, util::require_user_id,
};

use super::{
    Engine, credit_shares, ensure_tradable, find_holding, load_project, require_holding,
    save_holding, with_tx,
};

pub(super) async fn load_transaction(
    db: &DatabaseTransaction,
    transaction_id: Uuid,
) -> ResultEngine<ShareTransaction> {
    let model = share_transactions::Entity::find_by_id(transaction_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("share transaction not exists".to_string()))?;
    ShareTransaction::try_from(model)
}

async fn save_transaction(db: &DatabaseTransaction, tx: &ShareTransaction) -> ResultEngine<()> {
    share_transactions::ActiveModel::from(tx).update(db).await?;
    Ok(())
}

/// Cancels an open transaction, releasing the seller's reservation if it was
/// matched. Used by explicit cancels, the sweep and project termination.
pub(super) async fn cancel_open(
    db: &DatabaseTransaction,
    tx: &mut ShareTransaction,
    at: DateTime<Utc>,
) -> ResultEngine<()> {
    if !tx.status.is_open() {
        return Err(not_listed(tx));
    }
    if tx.status == TransactionStatus::Matched
        && let Some(mut seller) = find_holding(db, tx.project_id, &tx.seller_id).await?
    {
        seller.release(tx.share_count);
        save_holding(db, &seller, true).await?;
    }
    tx.status = TransactionStatus::Cancelled;
    tx.cancelled_at = Some(at);
    save_transaction(db, tx).await
}

fn not_listed(tx: &ShareTransaction) -> EngineError {
    EngineError::TransactionNotListed(format!(
        "transaction {} is {}",
        tx.id,
        tx.status.as_str()
    ))
}

impl Engine {
    /// Return one share transaction.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<ShareTransaction> {
        with_tx!(self, |db_tx| load_transaction(&db_tx, transaction_id).await)
    }

    /// Lists `count` shares of `seller_id` for sale at `price_per_share_minor`.
    ///
    /// The shares stay with the seller (and tradable) until a buyer matches.
    pub async fn list(
        &self,
        project_id: Uuid,
        seller_id: &str,
        count: i64,
        price_per_share_minor: i64,
        at: DateTime<Utc>,
    ) -> ResultEngine<ShareTransaction> {
        let seller_id = require_user_id(seller_id, "seller_id")?;
        let tx = ShareTransaction::new(project_id, seller_id, count, price_per_share_minor, at)?;
        tx.gross_minor()?;

        let _guard = self.locks.acquire(project_id).await;
        with_tx!(self, |db_tx| {
            let project = load_project(&db_tx, project_id).await?;
            ensure_tradable(&project)?;

            let tradable = find_holding(&db_tx, project_id, &tx.seller_id)
                .await?
                .map_or(0, |h| h.tradable());
            if tradable < count {
                return Err(EngineError::InsufficientShares(format!(
                    "{} can trade {tradable} shares, listed {count}",
                    tx.seller_id
                )));
            }

            share_transactions::ActiveModel::from(&tx)
                .insert(&db_tx)
                .await?;
            Ok(tx)
        })
    }

    /// Matches a buyer with a listed transaction and soft-locks the seller's
    /// shares.
    ///
    /// Under concurrent calls for the same listing exactly one buyer wins; the
    /// others observe the transaction already matched and get
    /// `TransactionNotListed`.
    pub async fn match_buyer(
        &self,
        transaction_id: Uuid,
        buyer_id: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<ShareTransaction> {
        let buyer_id = require_user_id(buyer_id, "buyer_id")?;
        let project_id = self.transaction(transaction_id).await?.project_id;

        let _guard = self.locks.acquire(project_id).await;
        let tx = with_tx!(self, |db_tx| {
            let mut tx = load_transaction(&db_tx, transaction_id).await?;
            if tx.status != TransactionStatus::Listed {
                return Err(not_listed(&tx));
            }
            if tx.seller_id == buyer_id {
                return Err(EngineError::SelfTrade(format!(
                    "{buyer_id} cannot buy their own listing"
                )));
            }
            let project = load_project(&db_tx, project_id).await?;
            ensure_tradable(&project)?;

            let mut seller = require_holding(&db_tx, project_id, &tx.seller_id).await?;
            seller.reserve(tx.share_count)?;
            save_holding(&db_tx, &seller, true).await?;

            tx.status = TransactionStatus::Matched;
            tx.buyer_id = Some(buyer_id.clone());
            tx.matched_at = Some(at);
            save_transaction(&db_tx, &tx).await?;
            Ok(tx)
        })?;

        self.publish(&[LedgerEvent::Matched {
            transaction_id: tx.id,
            project_id: tx.project_id,
            seller_id: tx.seller_id.clone(),
            buyer_id,
            share_count: tx.share_count,
        }]);
        Ok(tx)
    }

    /// Settles a matched transaction: moves the reserved shares to the buyer
    /// and records the fee split.
    ///
    /// Any failure while settling rolls the attempt back entirely, then the
    /// soft-lock is released and the transaction goes back to `listed`; the
    /// caller receives `TransactionFailed` and may retry after re-matching.
    pub async fn complete(
        &self,
        transaction_id: Uuid,
        at: DateTime<Utc>,
    ) -> ResultEngine<ShareTransaction> {
        let project_id = self.transaction(transaction_id).await?.project_id;

        let _guard = self.locks.acquire(project_id).await;
        match self.settle(transaction_id, project_id, at).await {
            Ok((tx, operator_id)) => {
                if let (Some(buyer_id), Some(settlement)) = (tx.buyer_id.clone(), tx.settlement) {
                    self.publish(&[LedgerEvent::Completed {
                        transaction_id: tx.id,
                        project_id: tx.project_id,
                        seller_id: tx.seller_id.clone(),
                        buyer_id,
                        operator_id,
                        share_count: tx.share_count,
                        settlement,
                    }]);
                }
                Ok(tx)
            }
            Err(err @ EngineError::TransactionNotMatched(_)) => Err(err),
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!(%transaction_id, %reason, "settlement failed, releasing soft-lock");
                self.unwind_match(transaction_id, &reason).await?;
                Err(EngineError::TransactionFailed(reason))
            }
        }
    }

    async fn settle(
        &self,
        transaction_id: Uuid,
        project_id: Uuid,
        at: DateTime<Utc>,
    ) -> ResultEngine<(ShareTransaction, String)> {
        with_tx!(self, |db_tx| {
            let mut tx = load_transaction(&db_tx, transaction_id).await?;
            let buyer_id = match (tx.status, tx.buyer_id.clone()) {
                (TransactionStatus::Matched, Some(buyer_id)) => buyer_id,
                _ => {
                    return Err(EngineError::TransactionNotMatched(format!(
                        "transaction {transaction_id} is {}",
                        tx.status.as_str()
                    )));
                }
            };
            let project = load_project(&db_tx, project_id).await?;
            ensure_tradable(&project)?;

            let mut seller = require_holding(&db_tx, project_id, &tx.seller_id).await?;
            seller.settle_reserved(tx.share_count)?;
            save_holding(&db_tx, &seller, true).await?;
            credit_shares(&db_tx, project_id, &buyer_id, tx.share_count, at).await?;

            tx.settlement = Some(self.fees.settle(tx.gross_minor()?)?);
            tx.status = TransactionStatus::Completed;
            tx.completed_at = Some(at);
            tx.failure_reason = None;
            save_transaction(&db_tx, &tx).await?;
            Ok((tx, project.operator_id))
        })
    }

    /// Rolls a matched transaction back to `listed` and releases the
    /// reservation.
    async fn unwind_match(&self, transaction_id: Uuid, reason: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let mut tx = load_transaction(&db_tx, transaction_id).await?;
            if tx.status != TransactionStatus::Matched {
                return Ok(());
            }
            if let Some(mut seller) = find_holding(&db_tx, tx.project_id, &tx.seller_id).await? {
                seller.release(tx.share_count);
                save_holding(&db_tx, &seller, true).await?;
            }
            tx.status = TransactionStatus::Listed;
            tx.buyer_id = None;
            tx.matched_at = None;
            tx.failure_reason = Some(reason.to_string());
            save_transaction(&db_tx, &tx).await?;
            Ok(())
        })
    }

    /// Withdraws a listing. Only `listed` transactions can be cancelled.
    pub async fn cancel(
        &self,
        transaction_id: Uuid,
        at: DateTime<Utc>,
    ) -> ResultEngine<ShareTransaction> {
        let project_id = self.transaction(transaction_id).await?.project_id;

        let _guard = self.locks.acquire(project_id).await;
        let tx = with_tx!(self, |db_tx| {
            let mut tx = load_transaction(&db_tx, transaction_id).await?;
            if tx.status != TransactionStatus::Listed {
                return Err(not_listed(&tx));
            }
            cancel_open(&db_tx, &mut tx, at).await?;
            Ok(tx)
        })?;

        self.publish(&[LedgerEvent::Cancelled {
            transaction_id: tx.id,
            project_id: tx.project_id,
            seller_id: tx.seller_id.clone(),
        }]);
        Ok(tx)
    }

    /// Open listings, optionally restricted to one project.
    pub async fn market(&self, filter: &MarketFilter) -> ResultEngine<Vec<ShareTransaction>> {
        with_tx!(self, |db_tx| {
            let mut query = share_transactions::Entity::find().filter(
                share_transactions::Column::Status.eq(TransactionStatus::Listed.as_str()),
            );
            if let Some(project_id) = filter.project_id {
                query = query
                    .filter(share_transactions::Column::ProjectId.eq(project_id.to_string()));
            }
            query = match filter.sort {
                MarketSort::PriceAsc => query
                    .order_by_asc(share_transactions::Column::PricePerShareMinor)
                    .order_by_asc(share_transactions::Column::CreatedAt),
                MarketSort::PriceDesc => query
                    .order_by_desc(share_transactions::Column::PricePerShareMinor)
                    .order_by_asc(share_transactions::Column::CreatedAt),
                MarketSort::TimeDesc => {
                    query.order_by_desc(share_transactions::Column::CreatedAt)
                }
            };
            let models = query
                .offset(filter.offset)
                .limit(filter.limit)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(ShareTransaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Every transaction of a project where `user_id` is seller or buyer,
    /// newest first.
    pub async fn user_transactions(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<ShareTransaction>> {
        let user_id = require_user_id(user_id, "user_id")?;
        with_tx!(self, |db_tx| {
            let models = share_transactions::Entity::find()
                .filter(share_transactions::Column::ProjectId.eq(project_id.to_string()))
                .filter(
                    share_transactions::Column::SellerId
                        .eq(user_id.clone())
                        .or(share_transactions::Column::BuyerId.eq(user_id)),
                )
                .order_by_desc(share_transactions::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(ShareTransaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
