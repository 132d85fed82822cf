//! Public holiday calendars for the tariff classifier
//!
//! Holidays are billed off-peak all day. The calendar is injected into the
//! classifier so the region (and any extra dates) is explicit configuration.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::fmt;

/// Decides whether a civil date is a public holiday
pub trait HolidayCalendar: Send + Sync + fmt::Debug {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Ontario statutory holidays, including weekday substitutes for fixed-date
/// holidays falling on a weekend
#[derive(Debug, Clone, Copy, Default)]
pub struct OntarioHolidays;

/// Western (Gregorian) Easter Sunday, anonymous Gregorian algorithm
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Next Monday for a Saturday or Sunday date
fn next_monday(date: NaiveDate) -> Option<NaiveDate> {
    match date.weekday() {
        Weekday::Sat => date.checked_add_days(Days::new(2)),
        Weekday::Sun => date.checked_add_days(Days::new(1)),
        _ => None,
    }
}

impl OntarioHolidays {
    /// Every holiday of `year` with its name, observed substitutes included
    pub fn holidays_in(year: i32) -> Vec<(NaiveDate, &'static str)> {
        let mut days: Vec<(Option<NaiveDate>, &'static str)> = Vec::new();

        let new_year = NaiveDate::from_ymd_opt(year, 1, 1);
        days.push((new_year, "New Year's Day"));
        days.push((new_year.and_then(next_monday), "New Year's Day (observed)"));

        if year >= 2008 {
            days.push((nth_weekday(year, 2, Weekday::Mon, 3), "Family Day"));
        }

        let good_friday = easter_sunday(year).and_then(|d| d.checked_sub_days(Days::new(2)));
        days.push((good_friday, "Good Friday"));

        // Monday preceding May 25
        let victoria = NaiveDate::from_ymd_opt(year, 5, 24).map(|d| {
            let back = d.weekday().num_days_from_monday();
            d - Days::new(u64::from(back))
        });
        days.push((victoria, "Victoria Day"));

        let canada = NaiveDate::from_ymd_opt(year, 7, 1);
        days.push((canada, "Canada Day"));
        days.push((canada.and_then(next_monday), "Canada Day (observed)"));

        days.push((nth_weekday(year, 8, Weekday::Mon, 1), "Civic Holiday"));
        days.push((nth_weekday(year, 9, Weekday::Mon, 1), "Labour Day"));
        days.push((nth_weekday(year, 10, Weekday::Mon, 2), "Thanksgiving"));

        let christmas = NaiveDate::from_ymd_opt(year, 12, 25);
        let boxing = NaiveDate::from_ymd_opt(year, 12, 26);
        days.push((christmas, "Christmas Day"));
        days.push((boxing, "Boxing Day"));
        // Substitutes land on the first weekdays after the pair not already taken
        if let (Some(christmas), Some(boxing)) = (christmas, boxing) {
            let mut candidate = boxing;
            for (day, name) in [
                (christmas, "Christmas Day (observed)"),
                (boxing, "Boxing Day (observed)"),
            ] {
                if !is_weekend(day) {
                    continue;
                }
                loop {
                    match candidate.checked_add_days(Days::new(1)) {
                        Some(next) => candidate = next,
                        None => break,
                    }
                    if !is_weekend(candidate) {
                        days.push((Some(candidate), name));
                        break;
                    }
                }
            }
        }

        let mut out: Vec<(NaiveDate, &'static str)> = days
            .into_iter()
            .filter_map(|(date, name)| date.map(|d| (d, name)))
            .collect();
        out.sort();
        out
    }
}

impl HolidayCalendar for OntarioHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        Self::holidays_in(date.year())
            .iter()
            .any(|(day, _)| *day == date)
    }
}

/// An explicit set of dates
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays {
    dates: BTreeSet<NaiveDate>,
}

impl FixedHolidays {
    pub fn new<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }
}

impl HolidayCalendar for FixedHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Union of several calendars
#[derive(Debug, Default)]
pub struct CombinedCalendar {
    calendars: Vec<Box<dyn HolidayCalendar>>,
}

impl CombinedCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, calendar: Box<dyn HolidayCalendar>) -> Self {
        self.calendars.push(calendar);
        self
    }
}

impl HolidayCalendar for CombinedCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.calendars.iter().any(|c| c.is_holiday(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2019), Some(ymd(2019, 4, 21)));
        assert_eq!(easter_sunday(2024), Some(ymd(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(ymd(2025, 4, 20)));
    }

    #[test]
    fn ontario_2024() {
        let days: Vec<NaiveDate> = OntarioHolidays::holidays_in(2024)
            .into_iter()
            .map(|(d, _)| d)
            .collect();
        assert_eq!(
            days,
            vec![
                ymd(2024, 1, 1),
                ymd(2024, 2, 19),
                ymd(2024, 3, 29),
                ymd(2024, 5, 20),
                ymd(2024, 7, 1),
                ymd(2024, 8, 5),
                ymd(2024, 9, 2),
                ymd(2024, 10, 14),
                ymd(2024, 12, 25),
                ymd(2024, 12, 26),
            ]
        );
    }

    #[test]
    fn weekend_substitutes() {
        let cal = OntarioHolidays;
        // 2022-01-01 was a Saturday
        assert!(cal.is_holiday(ymd(2022, 1, 3)));
        // 2021-12-25 Saturday, 2021-12-26 Sunday
        assert!(cal.is_holiday(ymd(2021, 12, 27)));
        assert!(cal.is_holiday(ymd(2021, 12, 28)));
        // 2022-12-25 Sunday: Boxing Day Monday, Christmas moves to Tuesday
        assert!(cal.is_holiday(ymd(2022, 12, 26)));
        assert!(cal.is_holiday(ymd(2022, 12, 27)));
        assert!(!cal.is_holiday(ymd(2022, 12, 28)));
        // 2020-12-26 Saturday
        assert!(cal.is_holiday(ymd(2020, 12, 28)));
    }

    #[test]
    fn victoria_day_on_the_24th() {
        // 2021-05-24 was itself a Monday
        assert!(OntarioHolidays.is_holiday(ymd(2021, 5, 24)));
        assert!(!OntarioHolidays.is_holiday(ymd(2021, 5, 17)));
    }

    #[test]
    fn no_family_day_before_2008() {
        assert!(!OntarioHolidays.is_holiday(ymd(2007, 2, 19)));
        assert!(OntarioHolidays.is_holiday(ymd(2008, 2, 18)));
    }

    #[test]
    fn combined_and_fixed() {
        let cal = CombinedCalendar::new()
            .with(Box::new(OntarioHolidays))
            .with(Box::new(FixedHolidays::new([ymd(2024, 12, 24)])));
        assert!(cal.is_holiday(ymd(2024, 12, 24)));
        assert!(cal.is_holiday(ymd(2024, 12, 25)));
        assert!(!cal.is_holiday(ymd(2024, 12, 27)));
    }
}
