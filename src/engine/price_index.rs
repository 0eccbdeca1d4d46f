use crate::domain::{
    AssetId, DefinitionError, PricePoint, PriceRecord, PriceSeries, CURRENCY_SUFFIX_SEPARATOR,
};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Outcome of a nearest-prior-date lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Latest observation dated on or before the target.
    Resolved(PricePoint),
    /// No observation on or before the target, or no series for the asset.
    NotFound,
}

impl Resolution {
    pub fn point(self) -> Option<PricePoint> {
        match self {
            Resolution::Resolved(point) => Some(point),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Immutable per-asset price history with look-ahead-free lookup.
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    series: HashMap<AssetId, PriceSeries>,
}

impl PriceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from validated series. Two series for the same asset are merged
    /// and re-validated, so overlapping dates surface as duplicates.
    pub fn from_series(series: Vec<PriceSeries>) -> Result<Self, DefinitionError> {
        let mut index = Self::new();
        for s in series {
            index.insert(s)?;
        }
        Ok(index)
    }

    /// Group long-format rows per asset, preserving the supplied order.
    ///
    /// Rows for a single asset must already be in increasing date order.
    pub fn from_records(records: &[PriceRecord]) -> Result<Self, DefinitionError> {
        let mut grouped: HashMap<AssetId, Vec<PricePoint>> = HashMap::new();
        for record in records {
            grouped
                .entry(record.asset_id.clone())
                .or_default()
                .push(PricePoint {
                    date: record.date,
                    price: record.price,
                });
        }

        let mut series = HashMap::with_capacity(grouped.len());
        for (asset_id, points) in grouped {
            series.insert(asset_id.clone(), PriceSeries::new(asset_id, points)?);
        }
        Ok(Self { series })
    }

    fn insert(&mut self, incoming: PriceSeries) -> Result<(), DefinitionError> {
        let merged = match self.series.remove(incoming.asset_id()) {
            Some(existing) => {
                let mut points = existing.points().to_vec();
                points.extend_from_slice(incoming.points());
                points.sort_by_key(|p| p.date);
                PriceSeries::new(incoming.asset_id().clone(), points)?
            }
            None => incoming,
        };
        self.series.insert(merged.asset_id().clone(), merged);
        Ok(())
    }

    /// Nearest trading day on or before `target`. Never returns a later date.
    pub fn resolve(&self, asset: &AssetId, target: NaiveDate) -> Resolution {
        self.series
            .get(asset)
            .and_then(|s| s.at_or_before(target))
            .map_or(Resolution::NotFound, Resolution::Resolved)
    }

    /// Series actually replayed for `requested`.
    ///
    /// A currency-suffixed key (`MSFT__CAD`) with no series of its own falls
    /// back to its base symbol (`MSFT`) when that one exists.
    pub fn series_key(&self, requested: &AssetId) -> AssetId {
        if self.contains(requested) {
            return requested.clone();
        }
        match requested.as_str().split_once(CURRENCY_SUFFIX_SEPARATOR) {
            Some((base, _)) if !base.is_empty() => {
                let base = AssetId::new(base);
                if self.contains(&base) {
                    base
                } else {
                    requested.clone()
                }
            }
            _ => requested.clone(),
        }
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.series.contains_key(asset)
    }

    pub fn series(&self, asset: &AssetId) -> Option<&PriceSeries> {
        self.series.get(asset)
    }

    pub fn asset_count(&self) -> usize {
        self.series.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(asset: &str, y: i32, m: u32, d: u32, px: i64) -> PriceRecord {
        PriceRecord::new(AssetId::new(asset), date(y, m, d), Decimal::from(px))
    }

    fn sample_index() -> PriceIndex {
        PriceIndex::from_records(&[
            rec("SPY", 2020, 2, 18, 100),
            rec("TLT", 2020, 2, 18, 50),
            rec("SPY", 2020, 2, 21, 98),
            rec("TLT", 2020, 2, 24, 52),
            rec("SPY", 2020, 3, 23, 70),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_exact_date() {
        let index = sample_index();
        let point = index.resolve(&AssetId::new("SPY"), date(2020, 2, 21)).point().unwrap();
        assert_eq!(point.date, date(2020, 2, 21));
        assert_eq!(point.price, Decimal::from(98));
    }

    #[test]
    fn test_resolve_falls_back_to_prior_trading_day() {
        let index = sample_index();
        let point = index.resolve(&AssetId::new("SPY"), date(2020, 2, 23)).point().unwrap();
        assert_eq!(point.date, date(2020, 2, 21));
    }

    #[test]
    fn test_resolve_never_looks_ahead() {
        let index = sample_index();
        let target = date(2020, 2, 20);
        for asset in ["SPY", "TLT"] {
            let point = index.resolve(&AssetId::new(asset), target).point().unwrap();
            assert!(point.date <= target);
        }
    }

    #[test]
    fn test_resolve_before_series_start_is_not_found() {
        let index = sample_index();
        assert_eq!(
            index.resolve(&AssetId::new("SPY"), date(2020, 2, 17)),
            Resolution::NotFound
        );
    }

    #[test]
    fn test_resolve_unknown_asset_is_not_found() {
        let index = sample_index();
        assert_eq!(
            index.resolve(&AssetId::new("GLD"), date(2020, 3, 1)),
            Resolution::NotFound
        );
        assert!(!index.contains(&AssetId::new("GLD")));
    }

    #[test]
    fn test_from_records_rejects_unsorted_rows() {
        let err = PriceIndex::from_records(&[
            rec("SPY", 2020, 2, 21, 98),
            rec("SPY", 2020, 2, 18, 100),
        ])
        .unwrap_err();
        assert!(matches!(err, DefinitionError::UnsortedPriceSeries { .. }));
    }

    #[test]
    fn test_from_records_rejects_duplicate_dates() {
        let err = PriceIndex::from_records(&[
            rec("SPY", 2020, 2, 18, 100),
            rec("SPY", 2020, 2, 18, 101),
        ])
        .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicatePriceDate { .. }));
    }

    #[test]
    fn test_from_series_merges_disjoint_histories() {
        let early = PriceSeries::new(
            AssetId::new("SPY"),
            vec![PricePoint {
                date: date(2019, 1, 2),
                price: Decimal::from(80),
            }],
        )
        .unwrap();
        let late = PriceSeries::new(
            AssetId::new("SPY"),
            vec![PricePoint {
                date: date(2020, 1, 2),
                price: Decimal::from(90),
            }],
        )
        .unwrap();

        let index = PriceIndex::from_series(vec![late, early]).unwrap();
        assert_eq!(index.asset_count(), 1);
        let series = index.series(&AssetId::new("SPY")).unwrap();
        assert_eq!(series.first_date(), Some(date(2019, 1, 2)));
        assert_eq!(series.points().len(), 2);
    }

    #[test]
    fn test_from_series_rejects_overlapping_dates() {
        let a = PriceSeries::new(
            AssetId::new("SPY"),
            vec![PricePoint {
                date: date(2020, 1, 2),
                price: Decimal::from(80),
            }],
        )
        .unwrap();
        let err = PriceIndex::from_series(vec![a.clone(), a]).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicatePriceDate { .. }));
    }

    #[test]
    fn test_series_key_falls_back_to_base_symbol() {
        let index = PriceIndex::from_records(&[
            rec("MSFT", 2020, 2, 18, 180),
            rec("SHOP__CAD", 2020, 2, 18, 700),
            rec("SHOP", 2020, 2, 18, 520),
        ])
        .unwrap();

        assert_eq!(index.series_key(&AssetId::new("MSFT__CAD")), AssetId::new("MSFT"));
        assert_eq!(index.series_key(&AssetId::new("MSFT")), AssetId::new("MSFT"));
        // An exact series wins over the base symbol.
        assert_eq!(index.series_key(&AssetId::new("SHOP__CAD")), AssetId::new("SHOP__CAD"));
        // Unknown keys are returned unchanged and resolve to NotFound.
        assert_eq!(index.series_key(&AssetId::new("AAPL__USD")), AssetId::new("AAPL__USD"));
        assert_eq!(index.series_key(&AssetId::new("__CAD")), AssetId::new("__CAD"));
    }
}
