//! Public-holiday lookup for date eligibility.
//!
//! A calendar's country is derived from its IANA timezone on a best-effort
//! basis ([`country_for_timezone`]). Holidays come from a [`HolidaySource`];
//! [`BuiltinHolidays`] computes national holidays from rules (fixed dates,
//! nth weekdays, Easter offsets, equinoxes, weekend observance).
//!
//! Lookups go through a [`HolidayCache`], an explicit read-through cache keyed
//! by country and year that callers construct and pass in. There is no
//! process-wide state.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// ISO 3166-1 alpha-2 country code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Accepts two ASCII letters in either case.
    pub fn new(code: &str) -> Option<Self> {
        match code.as_bytes() {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Some(CountryCode([a.to_ascii_uppercase(), b.to_ascii_uppercase()]))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        // Both bytes are ASCII letters by construction.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ZONE_COUNTRIES: &[(&str, &str)] = &[
    ("America/New_York", "US"),
    ("America/Chicago", "US"),
    ("America/Denver", "US"),
    ("America/Phoenix", "US"),
    ("America/Los_Angeles", "US"),
    ("America/Anchorage", "US"),
    ("America/Detroit", "US"),
    ("America/Boise", "US"),
    ("America/Indiana/Indianapolis", "US"),
    ("Pacific/Honolulu", "US"),
    ("US/Eastern", "US"),
    ("US/Central", "US"),
    ("US/Mountain", "US"),
    ("US/Pacific", "US"),
    ("America/Toronto", "CA"),
    ("America/Vancouver", "CA"),
    ("America/Edmonton", "CA"),
    ("America/Winnipeg", "CA"),
    ("America/Halifax", "CA"),
    ("America/St_Johns", "CA"),
    ("America/Regina", "CA"),
    ("Europe/London", "GB"),
    ("Europe/Belfast", "GB"),
    ("Europe/Dublin", "IE"),
    ("Europe/Berlin", "DE"),
    ("Europe/Busingen", "DE"),
    ("Europe/Paris", "FR"),
    ("Europe/Amsterdam", "NL"),
    ("Europe/Madrid", "ES"),
    ("Atlantic/Canary", "ES"),
    ("Europe/Rome", "IT"),
    ("Europe/Vienna", "AT"),
    ("Europe/Zurich", "CH"),
    ("Asia/Tokyo", "JP"),
    ("Japan", "JP"),
    ("Australia/Sydney", "AU"),
    ("Australia/Melbourne", "AU"),
    ("Australia/Brisbane", "AU"),
    ("Australia/Perth", "AU"),
    ("Australia/Adelaide", "AU"),
    ("Australia/Hobart", "AU"),
    ("Australia/Darwin", "AU"),
    ("Pacific/Auckland", "NZ"),
    ("NZ", "NZ"),
];

/// Best-effort country for an IANA timezone name. `None` for unknown or
/// country-less zones (`UTC`, `Etc/*`), in which case holiday checks are
/// skipped.
pub fn country_for_timezone(timezone: &str) -> Option<CountryCode> {
    let timezone = timezone.trim();
    ZONE_COUNTRIES
        .iter()
        .find(|(zone, _)| *zone == timezone)
        .and_then(|(_, code)| CountryCode::new(code))
}

/// Supplies the set of public holidays of a country in a given year.
pub trait HolidaySource {
    fn holidays(&self, country: CountryCode, year: i32) -> BTreeSet<NaiveDate>;
}

/// How a country moves holidays that land on a weekend.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Observance {
    None,
    /// Saturday is observed on Friday, Sunday on Monday.
    NearestWeekday,
    /// Weekend holidays are observed on the next working day not already a
    /// holiday.
    NextWorkingDay,
    /// Only Sunday holidays move, to the next day that is not a holiday.
    SundayToNextFreeDay,
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Fixed(u32, u32),
    /// nth (1-based) weekday of the month.
    Nth(u32, Weekday, u8),
    Last(u32, Weekday),
    /// The given weekday on or before month/day.
    OnOrBefore(u32, u32, Weekday),
    /// Days relative to Easter Sunday.
    Easter(i64),
    VernalEquinox,
    AutumnalEquinox,
}

struct CountryRules {
    code: &'static str,
    observance: Observance,
    rules: &'static [Rule],
}

use Rule::*;
use Weekday::{Mon, Thu};

const COUNTRY_RULES: &[CountryRules] = &[
    CountryRules {
        code: "US",
        observance: Observance::NearestWeekday,
        rules: &[
            Fixed(1, 1),
            Nth(1, Mon, 3),
            Nth(2, Mon, 3),
            Last(5, Mon),
            Fixed(6, 19),
            Fixed(7, 4),
            Nth(9, Mon, 1),
            Nth(10, Mon, 2),
            Fixed(11, 11),
            Nth(11, Thu, 4),
            Fixed(12, 25),
        ],
    },
    CountryRules {
        code: "CA",
        observance: Observance::NextWorkingDay,
        rules: &[
            Fixed(1, 1),
            Easter(-2),
            OnOrBefore(5, 24, Mon),
            Fixed(7, 1),
            Nth(9, Mon, 1),
            Fixed(9, 30),
            Nth(10, Mon, 2),
            Fixed(11, 11),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "GB",
        observance: Observance::NextWorkingDay,
        rules: &[
            Fixed(1, 1),
            Easter(-2),
            Easter(1),
            Nth(5, Mon, 1),
            Last(5, Mon),
            Last(8, Mon),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "IE",
        observance: Observance::NextWorkingDay,
        rules: &[
            Fixed(1, 1),
            Nth(2, Mon, 1),
            Fixed(3, 17),
            Easter(1),
            Nth(5, Mon, 1),
            Nth(6, Mon, 1),
            Nth(8, Mon, 1),
            Last(10, Mon),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "DE",
        observance: Observance::None,
        rules: &[
            Fixed(1, 1),
            Easter(-2),
            Easter(1),
            Fixed(5, 1),
            Easter(39),
            Easter(50),
            Fixed(10, 3),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "FR",
        observance: Observance::None,
        rules: &[
            Fixed(1, 1),
            Easter(1),
            Fixed(5, 1),
            Fixed(5, 8),
            Easter(39),
            Easter(50),
            Fixed(7, 14),
            Fixed(8, 15),
            Fixed(11, 1),
            Fixed(11, 11),
            Fixed(12, 25),
        ],
    },
    CountryRules {
        code: "NL",
        observance: Observance::None,
        rules: &[
            Fixed(1, 1),
            Easter(-2),
            Easter(0),
            Easter(1),
            Fixed(4, 27),
            Fixed(5, 5),
            Easter(39),
            Easter(49),
            Easter(50),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "ES",
        observance: Observance::None,
        rules: &[
            Fixed(1, 1),
            Fixed(1, 6),
            Easter(-2),
            Fixed(5, 1),
            Fixed(8, 15),
            Fixed(10, 12),
            Fixed(11, 1),
            Fixed(12, 6),
            Fixed(12, 8),
            Fixed(12, 25),
        ],
    },
    CountryRules {
        code: "IT",
        observance: Observance::None,
        rules: &[
            Fixed(1, 1),
            Fixed(1, 6),
            Easter(0),
            Easter(1),
            Fixed(4, 25),
            Fixed(5, 1),
            Fixed(6, 2),
            Fixed(8, 15),
            Fixed(11, 1),
            Fixed(12, 8),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "AT",
        observance: Observance::None,
        rules: &[
            Fixed(1, 1),
            Fixed(1, 6),
            Easter(1),
            Fixed(5, 1),
            Easter(39),
            Easter(50),
            Easter(60),
            Fixed(8, 15),
            Fixed(10, 26),
            Fixed(11, 1),
            Fixed(12, 8),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "CH",
        observance: Observance::None,
        rules: &[
            Fixed(1, 1),
            Easter(-2),
            Easter(1),
            Easter(39),
            Easter(50),
            Fixed(8, 1),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "JP",
        observance: Observance::SundayToNextFreeDay,
        rules: &[
            Fixed(1, 1),
            Nth(1, Mon, 2),
            Fixed(2, 11),
            Fixed(2, 23),
            VernalEquinox,
            Fixed(4, 29),
            Fixed(5, 3),
            Fixed(5, 4),
            Fixed(5, 5),
            Nth(7, Mon, 3),
            Fixed(8, 11),
            Nth(9, Mon, 3),
            AutumnalEquinox,
            Nth(10, Mon, 2),
            Fixed(11, 3),
            Fixed(11, 23),
        ],
    },
    CountryRules {
        code: "AU",
        observance: Observance::NextWorkingDay,
        rules: &[
            Fixed(1, 1),
            Fixed(1, 26),
            Easter(-2),
            Easter(1),
            Fixed(4, 25),
            Nth(6, Mon, 2),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
    CountryRules {
        code: "NZ",
        observance: Observance::NextWorkingDay,
        rules: &[
            Fixed(1, 1),
            Fixed(1, 2),
            Fixed(2, 6),
            Easter(-2),
            Easter(1),
            Fixed(4, 25),
            Nth(6, Mon, 1),
            Nth(10, Mon, 4),
            Fixed(12, 25),
            Fixed(12, 26),
        ],
    },
];

/// Rule-based national public holidays for a fixed set of countries.
/// Unknown countries have no holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinHolidays;

impl BuiltinHolidays {
    /// Countries with built-in rules.
    pub fn countries() -> impl Iterator<Item = CountryCode> {
        COUNTRY_RULES.iter().filter_map(|c| CountryCode::new(c.code))
    }
}

impl HolidaySource for BuiltinHolidays {
    fn holidays(&self, country: CountryCode, year: i32) -> BTreeSet<NaiveDate> {
        let Some(rules) = COUNTRY_RULES.iter().find(|c| c.code == country.as_str()) else {
            return BTreeSet::new();
        };

        let mut fixed = BTreeSet::new();
        let mut movable = BTreeSet::new();
        for rule in rules.rules {
            let Some(date) = rule_date(*rule, year) else {
                continue;
            };
            if matches!(rule, Fixed(..)) {
                fixed.insert(date);
            } else {
                movable.insert(date);
            }
        }

        let mut all: BTreeSet<NaiveDate> = fixed.union(&movable).copied().collect();
        for date in fixed {
            if let Some(observed) = observed_date(rules.observance, date, &all) {
                all.insert(observed);
            }
        }
        all
    }
}

fn rule_date(rule: Rule, year: i32) -> Option<NaiveDate> {
    match rule {
        Fixed(month, day) => NaiveDate::from_ymd_opt(year, month, day),
        Nth(month, weekday, n) => NaiveDate::from_weekday_of_month_opt(year, month, weekday, n),
        Last(month, weekday) => NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
            .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4)),
        OnOrBefore(month, day, weekday) => {
            let anchor = NaiveDate::from_ymd_opt(year, month, day)?;
            let back = (7 + anchor.weekday().num_days_from_monday()
                - weekday.num_days_from_monday())
                % 7;
            anchor.checked_sub_days(Days::new(u64::from(back)))
        }
        Easter(offset) => {
            let easter = easter_sunday(year)?;
            if offset >= 0 {
                easter.checked_add_days(Days::new(offset as u64))
            } else {
                easter.checked_sub_days(Days::new(offset.unsigned_abs()))
            }
        }
        VernalEquinox => equinox_day(year, 20.8431).and_then(|d| NaiveDate::from_ymd_opt(year, 3, d)),
        AutumnalEquinox => equinox_day(year, 23.2488).and_then(|d| NaiveDate::from_ymd_opt(year, 9, d)),
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
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

/// Day of month of the Japanese equinox holiday. The approximation holds for
/// 1980-2099; other years yield `None`.
fn equinox_day(year: i32, base: f64) -> Option<u32> {
    if !(1980..=2099).contains(&year) {
        return None;
    }
    let since = f64::from(year - 1980);
    let day = (base + 0.242194 * since).floor() - (since / 4.0).floor();
    Some(day as u32)
}

fn observed_date(
    observance: Observance,
    date: NaiveDate,
    taken: &BTreeSet<NaiveDate>,
) -> Option<NaiveDate> {
    let weekday = date.weekday();
    match observance {
        Observance::None => None,
        Observance::NearestWeekday => match weekday {
            Weekday::Sat => date.pred_opt(),
            Weekday::Sun => date.succ_opt(),
            _ => None,
        },
        Observance::NextWorkingDay => {
            if !matches!(weekday, Weekday::Sat | Weekday::Sun) {
                return None;
            }
            date.succ_opt()?.iter_days().take(7).find(|d| {
                !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) && !taken.contains(d)
            })
        }
        Observance::SundayToNextFreeDay => {
            if weekday != Weekday::Sun {
                return None;
            }
            date.succ_opt()?.iter_days().take(7).find(|d| !taken.contains(d))
        }
    }
}

type YearKey = (CountryCode, i32);

/// Read-through cache over a [`HolidaySource`], keyed by country and year.
///
/// Safe to share between threads; each (country, year) is computed once.
pub struct HolidayCache<S = BuiltinHolidays> {
    source: S,
    years: Mutex<HashMap<YearKey, Arc<BTreeSet<NaiveDate>>>>,
}

impl<S: HolidaySource> HolidayCache<S> {
    pub fn new(source: S) -> Self {
        HolidayCache {
            source,
            years: Mutex::new(HashMap::new()),
        }
    }

    /// Holidays of `country` in `year`, loading them on first use.
    pub fn holidays(&self, country: CountryCode, year: i32) -> Arc<BTreeSet<NaiveDate>> {
        let mut years = self.years.lock().unwrap_or_else(PoisonError::into_inner);
        years
            .entry((country, year))
            .or_insert_with(|| {
                tracing::debug!(%country, year, "loading holidays");
                Arc::new(self.source.holidays(country, year))
            })
            .clone()
    }

    /// Whether `date` is a holiday or an observed holiday in `country`. A
    /// New Year's Day on a Saturday can be observed on the previous 31 December,
    /// so that date also consults the following year.
    pub fn is_holiday(&self, country: CountryCode, date: NaiveDate) -> bool {
        if self.holidays(country, date.year()).contains(&date) {
            return true;
        }
        date.month() == 12
            && date.day() == 31
            && self.holidays(country, date.year() + 1).contains(&date)
    }

    /// Number of (country, year) entries loaded so far.
    pub fn cached_years(&self) -> usize {
        self.years
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl HolidayCache<BuiltinHolidays> {
    /// A cache over the built-in holiday rules.
    pub fn builtin() -> Self {
        HolidayCache::new(BuiltinHolidays)
    }
}

impl Default for HolidayCache<BuiltinHolidays> {
    fn default() -> Self {
        HolidayCache::builtin()
    }
}

impl<S> fmt::Debug for HolidayCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HolidayCache").finish_non_exhaustive()
    }
}
