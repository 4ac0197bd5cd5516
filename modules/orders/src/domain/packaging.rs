use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::OrderError;

const BOX_COST: i32 = 20;
const BOX_MAX_WEIGHT: i32 = 30;
const BAG_COST: i32 = 5;
const BAG_MAX_WEIGHT: i32 = 10;
const FILM_COST: i32 = 1;

/// Packaging applied to an order at creation time
///
/// Each variant carries a fixed surcharge and an optional weight limit.
/// Film has no limit and can also be added on top of a box or bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    Box,
    Bag,
    Film,
}

impl Packaging {
    pub fn cost(&self) -> i32 {
        match self {
            Packaging::Box => BOX_COST,
            Packaging::Bag => BAG_COST,
            Packaging::Film => FILM_COST,
        }
    }

    fn max_weight(&self) -> Option<i32> {
        match self {
            Packaging::Box => Some(BOX_MAX_WEIGHT),
            Packaging::Bag => Some(BAG_MAX_WEIGHT),
            Packaging::Film => None,
        }
    }

    /// Check that the order weight fits this packaging
    pub fn validate_weight(&self, weight: i32) -> Result<(), OrderError> {
        if let Some(max) = self.max_weight() {
            if weight > max {
                return Err(OrderError::WeightExceedsPackaging);
            }
        }

        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Packaging::Box => "box",
            Packaging::Bag => "bag",
            Packaging::Film => "film",
        }
    }
}

impl fmt::Display for Packaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Packaging {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(Packaging::Box),
            "bag" => Ok(Packaging::Bag),
            "film" => Ok(Packaging::Film),
            other => Err(OrderError::UnknownPackaging(other.to_string())),
        }
    }
}

/// Total packaging surcharge for an order
///
/// Validates the weight against the chosen packaging (and against film,
/// when additional film wrap is requested) and returns the combined cost.
pub fn packaging_surcharge(
    packaging: Option<Packaging>,
    additional_film: bool,
    weight: i32,
) -> Result<i32, OrderError> {
    let mut total = 0;

    if let Some(p) = packaging {
        p.validate_weight(weight)?;
        total += p.cost();
    }

    if additional_film {
        Packaging::Film.validate_weight(weight)?;
        total += Packaging::Film.cost();
    }

    Ok(total)
}
