use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::OrderError;

/// Lifecycle state of an order, stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Confirmed,
    Completed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(OrderStatus::Confirmed),
            "completed" => Ok(OrderStatus::Completed),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// An order held at the pickup point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i64,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub weight: i32,
    pub cost: i32,
    pub last_changed_at: DateTime<Utc>,
}

impl Order {
    /// Build a new order, rejecting negative weight or cost
    pub fn new(
        order_id: i64,
        user_id: i64,
        expires_at: DateTime<Utc>,
        status: OrderStatus,
        weight: i32,
        cost: i32,
    ) -> Result<Self, OrderError> {
        if weight < 0 || cost < 0 {
            return Err(OrderError::InvalidFields);
        }

        Ok(Order {
            order_id,
            user_id,
            expires_at,
            status,
            weight,
            cost,
            last_changed_at: Utc::now(),
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
