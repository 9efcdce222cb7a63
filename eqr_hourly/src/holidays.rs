use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// The six holidays NERC treats as off-peak days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NercHoliday {
    NewYearsDay,
    MemorialDay,
    IndependenceDay,
    LaborDay,
    Thanksgiving,
    ChristmasDay,
}

impl NercHoliday {
    pub const ALL: [NercHoliday; 6] = [
        NercHoliday::NewYearsDay,
        NercHoliday::MemorialDay,
        NercHoliday::IndependenceDay,
        NercHoliday::LaborDay,
        NercHoliday::Thanksgiving,
        NercHoliday::ChristmasDay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NercHoliday::NewYearsDay => "New Year's Day",
            NercHoliday::MemorialDay => "Memorial Day",
            NercHoliday::IndependenceDay => "Independence Day",
            NercHoliday::LaborDay => "Labor Day",
            NercHoliday::Thanksgiving => "Thanksgiving",
            NercHoliday::ChristmasDay => "Christmas Day",
        }
    }

    /// Date the holiday is observed in `year`, `None` outside chrono's range.
    pub fn observed_in(&self, year: i32) -> Option<NaiveDate> {
        match self {
            NercHoliday::NewYearsDay => NaiveDate::from_ymd_opt(year, 1, 1).map(sunday_to_monday),
            NercHoliday::MemorialDay => last_weekday_of_month(year, 5, Weekday::Mon),
            NercHoliday::IndependenceDay => NaiveDate::from_ymd_opt(year, 7, 4).map(sunday_to_monday),
            NercHoliday::LaborDay => NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1),
            NercHoliday::Thanksgiving => NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4),
            NercHoliday::ChristmasDay => NaiveDate::from_ymd_opt(year, 12, 25).map(sunday_to_monday),
        }
    }
}

// NERC moves a Sunday holiday to Monday; Saturday holidays stay put.
fn sunday_to_monday(date: NaiveDate) -> NaiveDate {
    if date.weekday() == Weekday::Sun {
        date + Duration::days(1)
    } else {
        date
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = first_of_next.pred_opt()?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Some(last - Duration::days(i64::from(back)))
}

/// Each NERC holiday with its observed date, in calendar order.
pub fn nerc_holiday_calendar(year: i32) -> Vec<(NercHoliday, NaiveDate)> {
    NercHoliday::ALL
        .iter()
        .filter_map(|holiday| holiday.observed_in(year).map(|date| (*holiday, date)))
        .collect()
}

/// Observed NERC holiday dates for `year`.
pub fn nerc_holidays(year: i32) -> BTreeSet<NaiveDate> {
    nerc_holiday_calendar(year)
        .into_iter()
        .map(|(_, date)| date)
        .collect()
}

pub fn is_nerc_holiday(date: NaiveDate) -> bool {
    NercHoliday::ALL
        .iter()
        .any(|holiday| holiday.observed_in(date.year()) == Some(date))
}
