//! ### Compute
//! Aggregations over the long load table produced by the `convert` module.

use crate::convert::LoadPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Min/mean/max of one region's load over one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub region: String,
    pub date: NaiveDate,
    pub daily_avg: f64,
    pub daily_min: f64,
    pub daily_max: f64,
}

/// Mean load of one region over some window; one choropleth cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMean {
    pub region: String,
    pub mean_load_mw: f64,
}

struct Summary {
    min: f64,
    mean: f64,
    max: f64,
}

/// Groups by (region, date). Days with no readings for a region simply
/// have no row. Output is ordered by region, then date.
pub fn daily_aggregates<'a>(
    points: impl IntoIterator<Item = &'a LoadPoint>,
) -> Vec<DailyAggregate> {
    let mut groups: BTreeMap<(&str, NaiveDate), Vec<f64>> = BTreeMap::new();
    for point in points {
        groups
            .entry((point.region.as_str(), point.date()))
            .or_default()
            .push(point.load_mw);
    }

    groups
        .into_iter()
        .filter_map(|((region, date), values)| {
            let Summary { min, mean, max } = summarize(values)?;
            Some(DailyAggregate {
                region: region.to_string(),
                date,
                daily_avg: mean,
                daily_min: min,
                daily_max: max,
            })
        })
        .collect()
}

/// Per-region mean over every point given, ordered by region.
pub fn region_means<'a>(points: impl IntoIterator<Item = &'a LoadPoint>) -> Vec<RegionMean> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for point in points {
        groups
            .entry(point.region.as_str())
            .or_default()
            .push(point.load_mw);
    }

    groups
        .into_iter()
        .filter_map(|(region, values)| {
            Some(RegionMean {
                region: region.to_string(),
                mean_load_mw: summarize(values)?.mean,
            })
        })
        .collect()
}

/// Sorting first makes the float sum independent of input order, and the
/// clamp keeps rounding from pushing the mean outside [min, max].
fn summarize(mut values: Vec<f64>) -> Option<Summary> {
    values.sort_by(f64::total_cmp);
    let min = *values.first()?;
    let max = *values.last()?;
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(Summary {
        min,
        mean: mean.clamp(min, max),
        max,
    })
}
