//! Order lifecycle service
//!
//! Owns the status transition rules. Every successful transition emits a
//! status-change audit to the pipeline; submission is fire-and-forget, so an
//! overloaded audit buffer never fails a customer operation.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::packaging::packaging_surcharge;
use crate::domain::{
    AuditEvent, Order, OrderError, OrderStatus, Packaging, StatusChangeRecord,
};
use crate::pipeline::AuditPipeline;
use crate::repos::order_repo::{self, OrderFilter};

/// Input for order creation
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: i64,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub weight: i32,
    pub cost: i32,
    pub packaging: Option<Packaging>,
    pub additional_film: bool,
}

pub struct OrderService {
    pool: PgPool,
    pipeline: Arc<AuditPipeline>,
    refund_window: Duration,
}

impl OrderService {
    pub fn new(pool: PgPool, pipeline: Arc<AuditPipeline>, refund_window_days: i64) -> Self {
        Self {
            pool,
            pipeline,
            refund_window: Duration::days(refund_window_days),
        }
    }

    /// Accept a new order with its packaging surcharge applied
    pub async fn create_order(&self, new_order: NewOrder) -> Result<Order, OrderError> {
        let now = Utc::now();
        if new_order.expires_at <= now {
            return Err(OrderError::ExpirationInPast);
        }

        let surcharge = packaging_surcharge(
            new_order.packaging,
            new_order.additional_film,
            new_order.weight,
        )?;

        let order = Order::new(
            new_order.order_id,
            new_order.user_id,
            new_order.expires_at,
            OrderStatus::Confirmed,
            new_order.weight,
            new_order.cost + surcharge,
        )?;

        order_repo::insert(&self.pool, &order).await?;

        tracing::info!(order_id = %order.order_id, cost = %order.cost, "order created");

        Ok(order)
    }

    /// Hand the order to its owner
    pub async fn complete_order(&self, order_id: i64, user_id: i64) -> Result<(), OrderError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let order = order_repo::fetch_for_update(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        ensure_completable(&order, user_id, now)?;

        order_repo::update_status(&mut tx, order_id, OrderStatus::Completed).await?;
        tx.commit().await?;

        self.emit_status_change(order_id, order.status, OrderStatus::Completed);

        Ok(())
    }

    /// Take a completed order back within the refund window
    pub async fn refund_order(&self, order_id: i64) -> Result<(), OrderError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let order = order_repo::fetch_for_update(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        ensure_refundable(&order, self.refund_window, now)?;

        order_repo::update_status(&mut tx, order_id, OrderStatus::Refunded).await?;
        tx.commit().await?;

        self.emit_status_change(order_id, order.status, OrderStatus::Refunded);

        Ok(())
    }

    /// Give the order back to the courier, removing it entirely
    pub async fn return_order(&self, order_id: i64) -> Result<(), OrderError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let order = order_repo::fetch_for_update(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        ensure_returnable(&order, now)?;

        order_repo::delete(&mut tx, order_id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, "order returned to courier");

        Ok(())
    }

    pub async fn get_order(&self, order_id: i64) -> Result<Order, OrderError> {
        order_repo::fetch(&self.pool, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }

    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        last_id: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(order_repo::list(&self.pool, &filter, last_id, limit).await?)
    }

    fn emit_status_change(&self, order_id: i64, previous: OrderStatus, current: OrderStatus) {
        self.pipeline.submit(AuditEvent::StatusChange(StatusChangeRecord {
            order_id,
            previous_status: previous,
            current_status: current,
        }));
    }
}

fn ensure_completable(order: &Order, user_id: i64, now: DateTime<Utc>) -> Result<(), OrderError> {
    if order.user_id != user_id {
        return Err(OrderError::NotOwnedByUser(order.order_id, user_id));
    }
    if order.is_expired(now) {
        return Err(OrderError::ExpirationInPast);
    }
    if order.status == OrderStatus::Completed {
        return Err(OrderError::AlreadyCompleted(order.order_id));
    }

    Ok(())
}

fn ensure_refundable(
    order: &Order,
    refund_window: Duration,
    now: DateTime<Utc>,
) -> Result<(), OrderError> {
    if order.status != OrderStatus::Completed {
        return Err(OrderError::NotCompleted(order.order_id));
    }
    if order.last_changed_at + refund_window < now {
        return Err(OrderError::RefundWindowClosed(order.order_id));
    }

    Ok(())
}

fn ensure_returnable(order: &Order, now: DateTime<Utc>) -> Result<(), OrderError> {
    match order.status {
        OrderStatus::Refunded => Ok(()),
        OrderStatus::Completed => Err(OrderError::AlreadyCompleted(order.order_id)),
        OrderStatus::Confirmed => {
            if order.is_expired(now) {
                Ok(())
            } else {
                Err(OrderError::ExpirationInFuture)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, expires_in: Duration) -> Order {
        let now = Utc::now();
        Order {
            order_id: 1,
            user_id: 10,
            expires_at: now + expires_in,
            status,
            weight: 5,
            cost: 100,
            last_changed_at: now,
        }
    }

    #[test]
    fn complete_requires_owner() {
        let now = Utc::now();
        let o = order(OrderStatus::Confirmed, Duration::days(1));

        assert!(ensure_completable(&o, 10, now).is_ok());
        assert!(matches!(
            ensure_completable(&o, 11, now),
            Err(OrderError::NotOwnedByUser(1, 11))
        ));
    }

    #[test]
    fn complete_rejects_expired_and_completed() {
        let now = Utc::now();

        let expired = order(OrderStatus::Confirmed, Duration::days(-1));
        assert!(matches!(
            ensure_completable(&expired, 10, now),
            Err(OrderError::ExpirationInPast)
        ));

        let done = order(OrderStatus::Completed, Duration::days(1));
        assert!(matches!(
            ensure_completable(&done, 10, now),
            Err(OrderError::AlreadyCompleted(1))
        ));
    }

    #[test]
    fn refund_requires_completed_within_window() {
        let now = Utc::now();
        let window = Duration::days(2);

        let confirmed = order(OrderStatus::Confirmed, Duration::days(1));
        assert!(matches!(
            ensure_refundable(&confirmed, window, now),
            Err(OrderError::NotCompleted(1))
        ));

        let fresh = order(OrderStatus::Completed, Duration::days(1));
        assert!(ensure_refundable(&fresh, window, now).is_ok());

        let mut old = order(OrderStatus::Completed, Duration::days(1));
        old.last_changed_at = now - Duration::days(3);
        assert!(matches!(
            ensure_refundable(&old, window, now),
            Err(OrderError::RefundWindowClosed(1))
        ));
    }

    #[test]
    fn return_accepts_refunded_or_expired_confirmed() {
        let now = Utc::now();

        assert!(ensure_returnable(&order(OrderStatus::Refunded, Duration::days(1)), now).is_ok());
        assert!(
            ensure_returnable(&order(OrderStatus::Confirmed, Duration::days(-1)), now).is_ok()
        );

        assert!(matches!(
            ensure_returnable(&order(OrderStatus::Confirmed, Duration::days(1)), now),
            Err(OrderError::ExpirationInFuture)
        ));
        assert!(matches!(
            ensure_returnable(&order(OrderStatus::Completed, Duration::days(1)), now),
            Err(OrderError::AlreadyCompleted(1))
        ));
    }
}
