/// Calendar triggers for scheduled content overrides
///
/// Each trigger owns its own date window, evaluated against local wall time.
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// First year covered by [`LUNAR_NEW_YEAR`]
const FIRST_LUNAR_YEAR: i32 = 2000;

/// Gregorian (month, day) of the first day of the lunar year, 2000..=2050
const LUNAR_NEW_YEAR: [(u32, u32); 51] = [
    (2, 5),   // 2000
    (1, 24),  // 2001
    (2, 12),  // 2002
    (2, 1),   // 2003
    (1, 22),  // 2004
    (2, 9),   // 2005
    (1, 29),  // 2006
    (2, 18),  // 2007
    (2, 7),   // 2008
    (1, 26),  // 2009
    (2, 14),  // 2010
    (2, 3),   // 2011
    (1, 23),  // 2012
    (2, 10),  // 2013
    (1, 31),  // 2014
    (2, 19),  // 2015
    (2, 8),   // 2016
    (1, 28),  // 2017
    (2, 16),  // 2018
    (2, 5),   // 2019
    (1, 25),  // 2020
    (2, 12),  // 2021
    (2, 1),   // 2022
    (1, 22),  // 2023
    (2, 10),  // 2024
    (1, 29),  // 2025
    (2, 17),  // 2026
    (2, 6),   // 2027
    (1, 26),  // 2028
    (2, 13),  // 2029
    (2, 3),   // 2030
    (1, 23),  // 2031
    (2, 11),  // 2032
    (1, 31),  // 2033
    (2, 19),  // 2034
    (2, 8),   // 2035
    (1, 28),  // 2036
    (2, 15),  // 2037
    (2, 4),   // 2038
    (1, 24),  // 2039
    (2, 12),  // 2040
    (2, 1),   // 2041
    (1, 22),  // 2042
    (2, 10),  // 2043
    (1, 30),  // 2044
    (2, 17),  // 2045
    (2, 6),   // 2046
    (1, 26),  // 2047
    (2, 14),  // 2048
    (2, 2),   // 2049
    (1, 23),  // 2050
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarTrigger {
    /// 19:00 on Lunar New Year's Eve until 01:00 on New Year's Day
    ChineseNewYearEve,
    /// 09:00-10:00 on October 1
    October1,
    /// 09:00-10:00 on December 13
    December13,
    /// 09:00-10:00 on September 18
    September18,
}

impl CalendarTrigger {
    pub const ALL: [CalendarTrigger; 4] = [
        CalendarTrigger::ChineseNewYearEve,
        CalendarTrigger::October1,
        CalendarTrigger::December13,
        CalendarTrigger::September18,
    ];

    /// Parse the configuration key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::ChineseNewYearEve => "ChineseNewYearEve",
            Self::October1 => "October1",
            Self::December13 => "December13",
            Self::September18 => "September18",
        }
    }

    pub fn matches(&self, local: &NaiveDateTime) -> bool {
        match self {
            Self::ChineseNewYearEve => is_lunar_new_year_eve(local),
            Self::October1 => is_morning_of(local, 10, 1),
            Self::December13 => is_morning_of(local, 12, 13),
            Self::September18 => is_morning_of(local, 9, 18),
        }
    }
}

/// Lunar New Year's Day for `year`, if covered by the table
pub fn lunar_new_year(year: i32) -> Option<NaiveDate> {
    let index = usize::try_from(year - FIRST_LUNAR_YEAR).ok()?;
    let &(month, day) = LUNAR_NEW_YEAR.get(index)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn is_lunar_new_year_eve(local: &NaiveDateTime) -> bool {
    let date = local.date();
    let hour = local.hour();

    // New year falls between Jan 21 and Feb 20, so the eve shares its Gregorian year.
    let Some(new_year) = lunar_new_year(date.year()) else {
        return false;
    };

    (hour >= 19 && new_year.pred_opt() == Some(date)) || (hour < 1 && new_year == date)
}

fn is_morning_of(local: &NaiveDateTime, month: u32, day: u32) -> bool {
    local.month() == month && local.day() == day && local.hour() == 9
}
