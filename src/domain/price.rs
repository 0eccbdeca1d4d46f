//! Price observations and validated per-asset price series.

use crate::domain::{AssetId, Decimal, DefinitionError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One long-format price row: the close of `asset_id` on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub asset_id: AssetId,
    pub date: NaiveDate,
    pub price: Decimal,
}

impl PriceRecord {
    pub fn new(asset_id: AssetId, date: NaiveDate, price: Decimal) -> Self {
        Self {
            asset_id,
            date,
            price,
        }
    }
}

/// A dated price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// Price history of one asset.
///
/// Dates are strictly increasing and every price is positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSeries {
    asset_id: AssetId,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Validate and wrap a series; points must already be in date order.
    pub fn new(asset_id: AssetId, points: Vec<PricePoint>) -> Result<Self, DefinitionError> {
        for point in &points {
            if !point.price.is_positive() {
                return Err(DefinitionError::NonPositivePrice {
                    asset: asset_id,
                    date: point.date,
                    price: point.price,
                });
            }
        }

        for pair in points.windows(2) {
            let (previous, current) = (pair[0].date, pair[1].date);
            if current == previous {
                return Err(DefinitionError::DuplicatePriceDate {
                    asset: asset_id,
                    date: current,
                });
            }
            if current < previous {
                return Err(DefinitionError::UnsortedPriceSeries {
                    asset: asset_id,
                    previous,
                    date: current,
                });
            }
        }

        Ok(Self { asset_id, points })
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Latest point dated on or before `target`.
    pub fn at_or_before(&self, target: NaiveDate) -> Option<PricePoint> {
        // Number of points dated <= target; the last of them is the answer.
        let idx = self.points.partition_point(|p| p.date <= target);
        idx.checked_sub(1).map(|i| self.points[i])
    }
}
