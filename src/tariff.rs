//! Time-of-use tariff classification
//!
//! Maps a timestamp to the price tier billed for electricity consumed at that
//! moment. Evaluation happens in the civil time of the tariff region:
//!
//! | local time                     | winter (Nov-Apr) | summer (May-Oct) |
//! |--------------------------------|------------------|------------------|
//! | weekend, holiday, 19:00-07:00  | Off-peak         | Off-peak         |
//! | 07:00-11:00, 17:00-19:00       | On-peak          | Mid-peak         |
//! | 11:00-17:00                    | Mid-peak         | On-peak          |
//!
//! The three weekday ranges partition [07:00, 19:00) without overlap.

pub mod holidays;

use crate::config::TariffConfig;
use crate::error::{HydroError, Result};
use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Timelike, Weekday,
};
use chrono_tz::{OffsetComponents, Tz};
use holidays::{CombinedCalendar, FixedHolidays, HolidayCalendar, OntarioHolidays};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Start of the weekday peak window (inclusive hour)
const PEAK_START_HOUR: u32 = 7;
/// End of the weekday peak window (exclusive hour)
const PEAK_END_HOUR: u32 = 19;

/// Price tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TariffPeriod {
    #[serde(rename = "Off-peak")]
    OffPeak,
    #[serde(rename = "Mid-peak")]
    MidPeak,
    #[serde(rename = "On-peak")]
    OnPeak,
}

impl TariffPeriod {
    pub const ALL: [TariffPeriod; 3] = [Self::OnPeak, Self::MidPeak, Self::OffPeak];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OffPeak => "Off-peak",
            Self::MidPeak => "Mid-peak",
            Self::OnPeak => "On-peak",
        }
    }
}

impl fmt::Display for TariffPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Summer,
}

/// Resolution of wall-clock readings that occur twice on the fall-back day
///
/// The export does not mark which occurrence a repeated reading belongs to,
/// so one rule applies to the whole hour. `Standard` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Use the standard-time (second) occurrence
    #[default]
    Standard,
    /// Use the daylight-time (first) occurrence
    Daylight,
    /// Use the earlier instant
    Earliest,
    /// Use the later instant
    Latest,
}

/// The tier for a local civil time, given weekday/holiday status and season
fn period_for(local_hour: u32, weekend_or_holiday: bool, season: Season) -> Result<TariffPeriod> {
    if weekend_or_holiday || !(PEAK_START_HOUR..PEAK_END_HOUR).contains(&local_hour) {
        return Ok(TariffPeriod::OffPeak);
    }
    match (local_hour, season) {
        (7..=10 | 17..=18, Season::Winter) => Ok(TariffPeriod::OnPeak),
        (7..=10 | 17..=18, Season::Summer) => Ok(TariffPeriod::MidPeak),
        (11..=16, Season::Winter) => Ok(TariffPeriod::MidPeak),
        (11..=16, Season::Summer) => Ok(TariffPeriod::OnPeak),
        (hour, season) => Err(HydroError::invariant(format!(
            "No tariff rule covers hour {} in {:?}",
            hour, season
        ))),
    }
}

fn is_standard_time(dt: &DateTime<Tz>) -> bool {
    dt.offset().dst_offset() == Duration::zero()
}

/// Time-of-use classifier for one tariff region
#[derive(Debug)]
pub struct TouClassifier {
    tz: Tz,
    holidays: Box<dyn HolidayCalendar>,
    ambiguity: AmbiguityPolicy,
    winter_months: Vec<u32>,
}

impl TouClassifier {
    /// Classifier with the default season split and ambiguity policy
    pub fn new(tz: Tz, holidays: Box<dyn HolidayCalendar>) -> Self {
        Self {
            tz,
            holidays,
            ambiguity: AmbiguityPolicy::default(),
            winter_months: vec![11, 12, 1, 2, 3, 4],
        }
    }

    /// Toronto with the Ontario holiday calendar
    pub fn ontario() -> Self {
        Self::new(chrono_tz::America::Toronto, Box::new(OntarioHolidays))
    }

    pub fn from_config(config: &TariffConfig) -> Result<Self> {
        let tz: Tz = config.timezone.parse().map_err(|_| {
            HydroError::validation(
                "tariff.timezone",
                &format!("Unknown timezone: '{}'", config.timezone),
            )
        })?;
        let mut calendar = CombinedCalendar::new();
        if config.ontario_holidays {
            calendar = calendar.with(Box::new(OntarioHolidays));
        }
        if !config.extra_holidays.is_empty() {
            calendar = calendar.with(Box::new(FixedHolidays::new(
                config.extra_holidays.iter().copied(),
            )));
        }
        Ok(Self::new(tz, Box::new(calendar))
            .with_ambiguity_policy(config.ambiguous_time)
            .with_winter_months(config.winter_months.clone()))
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub fn with_winter_months(mut self, months: Vec<u32>) -> Self {
        self.winter_months = months;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn ambiguity_policy(&self) -> AmbiguityPolicy {
        self.ambiguity
    }

    pub fn season(&self, month: u32) -> Season {
        if self.winter_months.contains(&month) {
            Season::Winter
        } else {
            Season::Summer
        }
    }

    /// Tier billed at `timestamp`, evaluated in the region's civil time
    ///
    /// Instants whose local wall-clock reading falls outside the calendar
    /// range (the first or last hours of `DateTime::MIN_UTC`/`MAX_UTC`) are
    /// a Validation error.
    pub fn classify<Z: TimeZone>(&self, timestamp: &DateTime<Z>) -> Result<TariffPeriod> {
        let local = self.local_time(timestamp)?;
        let weekend = matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
        let off_day = weekend || self.holidays.is_holiday(local.date());
        period_for(local.hour(), off_day, self.season(local.month()))
    }

    fn local_time<Z: TimeZone>(&self, timestamp: &DateTime<Z>) -> Result<NaiveDateTime> {
        let utc = timestamp.naive_utc();
        let offset = self.tz.offset_from_utc_datetime(&utc).fix();
        utc.checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
            .ok_or_else(|| {
                HydroError::validation(
                    "timestamp",
                    format!("{} has no local time in {}", utc, self.tz.name()),
                )
            })
    }

    /// Attach the region's timezone to a naive wall-clock reading
    ///
    /// Readings repeated by the fall-back transition follow the configured
    /// [`AmbiguityPolicy`]; readings skipped by the spring-forward transition
    /// do not exist and are rejected.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt),
            LocalResult::Ambiguous(earliest, latest) => Ok(match self.ambiguity {
                AmbiguityPolicy::Earliest => earliest,
                AmbiguityPolicy::Latest => latest,
                AmbiguityPolicy::Standard if is_standard_time(&earliest) => earliest,
                AmbiguityPolicy::Standard => latest,
                AmbiguityPolicy::Daylight if is_standard_time(&earliest) => latest,
                AmbiguityPolicy::Daylight => earliest,
            }),
            LocalResult::None => Err(HydroError::validation(
                "timestamp",
                &format!("{} does not exist in {}", naive, self.tz.name()),
            )),
        }
    }
}
