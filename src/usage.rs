//! Usage export loading
//!
//! The export is a CSV with (at least) `Date`, `Cost` and `Quantity`
//! columns. Dates are naive local wall-clock readings; they are localized in
//! the tariff region and tagged with their tariff period.

use crate::error::{HydroError, Result};
use crate::tariff::{TariffPeriod, TouClassifier};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DATE_COLUMN: &str = "Date";
const COST_COLUMN: &str = "Cost";
const QUANTITY_COLUMN: &str = "Quantity";

const DATE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// One interval of metered consumption
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub timestamp: DateTime<Tz>,
    pub cost: f64,
    pub quantity: f64,
    pub tariff: TariffPeriod,
}

/// Cost and quantity totals for one tariff period
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub records: usize,
    pub cost: f64,
    pub quantity: f64,
}

/// Totals per tariff period over a set of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSummary {
    pub periods: BTreeMap<TariffPeriod, PeriodTotals>,
    pub first: Option<DateTime<Tz>>,
    pub last: Option<DateTime<Tz>>,
}

impl UsageSummary {
    /// Fold one record into the totals
    pub fn add(&mut self, record: &UsageRecord) {
        let totals = self.periods.entry(record.tariff).or_default();
        totals.records += 1;
        totals.cost += record.cost;
        totals.quantity += record.quantity;

        if self.first.is_none_or(|first| record.timestamp < first) {
            self.first = Some(record.timestamp);
        }
        if self.last.is_none_or(|last| record.timestamp > last) {
            self.last = Some(record.timestamp);
        }
    }

    pub fn totals(&self, period: TariffPeriod) -> PeriodTotals {
        self.periods.get(&period).copied().unwrap_or_default()
    }

    pub fn total_cost(&self) -> f64 {
        self.periods.values().map(|t| t.cost).sum()
    }

    pub fn total_quantity(&self) -> f64 {
        self.periods.values().map(|t| t.quantity).sum()
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn parse_number(raw: &str, column: &str, row: usize) -> Result<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned.parse::<f64>().map_err(|_| {
        HydroError::validation(
            column.to_string(),
            format!("Row {}: '{}' is not a number", row, raw),
        )
    })
}

/// Parse the raw export into classified records
pub fn parse_export(csv_text: &str, classifier: &TouClassifier) -> Result<Vec<UsageRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            HydroError::structural(format!("Export is missing the '{}' column", name))
        })
    };
    let date_idx = column(DATE_COLUMN)?;
    let cost_idx = column(COST_COLUMN)?;
    let quantity_idx = column(QUANTITY_COLUMN)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        // header is line 1
        let line = i + 2;
        let field = |idx: usize| row.get(idx).unwrap_or_default();

        let raw_date = field(date_idx);
        let naive = parse_timestamp(raw_date).ok_or_else(|| {
            HydroError::validation(
                DATE_COLUMN.to_string(),
                format!("Row {}: unrecognized date '{}'", line, raw_date),
            )
        })?;
        let timestamp = classifier.localize(naive)?;
        records.push(UsageRecord {
            tariff: classifier.classify(&timestamp)?,
            timestamp,
            cost: parse_number(field(cost_idx), COST_COLUMN, line)?,
            quantity: parse_number(field(quantity_idx), QUANTITY_COLUMN, line)?,
        });
    }
    Ok(records)
}

/// Totals per tariff period
pub fn summarize(records: &[UsageRecord]) -> UsageSummary {
    let mut summary = UsageSummary::default();
    for record in records {
        summary.add(record);
    }
    summary
}

/// Calendar bucket size for [`summarize_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binning {
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

impl Binning {
    /// Local wall-clock start of the bucket containing `local`
    pub fn bucket_start(self, local: NaiveDateTime) -> NaiveDateTime {
        let date = local.date();
        let (start, hour) = match self {
            Binning::Hourly => (Some(date), local.hour()),
            Binning::Daily => (Some(date), 0),
            Binning::Monthly => (date.with_day(1), 0),
            Binning::Yearly => (NaiveDate::from_ymd_opt(date.year(), 1, 1), 0),
        };
        start
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap_or(local)
    }

    /// Human-readable bucket label
    pub fn label(self, start: NaiveDateTime) -> String {
        let format = match self {
            Binning::Hourly => "%Y-%m-%d %H:00",
            Binning::Daily => "%Y-%m-%d",
            Binning::Monthly => "%Y-%m",
            Binning::Yearly => "%Y",
        };
        start.format(format).to_string()
    }
}

/// Totals per tariff period for every calendar bucket that has records
///
/// Buckets are keyed by their local wall-clock start, so both readings of a
/// repeated fall-back hour land in the same hourly bucket.
pub fn summarize_by(
    records: &[UsageRecord],
    binning: Binning,
) -> BTreeMap<NaiveDateTime, UsageSummary> {
    let mut buckets: BTreeMap<NaiveDateTime, UsageSummary> = BTreeMap::new();
    for record in records {
        let start = binning.bucket_start(record.timestamp.naive_local());
        buckets.entry(start).or_default().add(record);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_tolerate_currency_formatting() {
        assert_eq!(parse_number("$1,234.50", "Cost", 2).unwrap(), 1234.5);
        assert_eq!(parse_number(" ", "Cost", 2).unwrap(), 0.0);
        assert!(parse_number("abc", "Cost", 2).is_err());
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2019-11-03 01:00:00").is_some());
        assert!(parse_timestamp("2019-11-03 01:00").is_some());
        assert!(parse_timestamp("11/03/2019 01:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
