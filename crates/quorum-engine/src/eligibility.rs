//! Date eligibility: allowed weekdays combined with holiday policy.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::holidays::{country_for_timezone, HolidayCache, HolidaySource};
use crate::model::{CalendarConfig, HolidaysPolicy};
use crate::time::weekday_index;

/// Decide whether `date` can carry events.
///
/// The holiday country is resolved from `timezone`; when that fails, holiday
/// checks are skipped and only the weekday set is consulted.
///
/// - `Block`: a holiday is rejected outright.
/// - `Allow`: a holiday is accepted outright, whatever its weekday.
/// - Otherwise the date is accepted iff its weekday is allowed. A date with a
///   disallowed weekday is still accepted when `allow_holiday_eves` is set and
///   the following day is a holiday.
pub fn is_allowed<S: HolidaySource>(
    date: NaiveDate,
    timezone: &str,
    allowed_weekdays: &BTreeSet<u8>,
    holidays_policy: HolidaysPolicy,
    allow_holiday_eves: bool,
    holidays: &HolidayCache<S>,
) -> bool {
    let country = country_for_timezone(timezone);
    let is_holiday = |d: NaiveDate| country.is_some_and(|c| holidays.is_holiday(c, d));

    match holidays_policy {
        HolidaysPolicy::Block if is_holiday(date) => return false,
        HolidaysPolicy::Allow if is_holiday(date) => return true,
        _ => {}
    }

    if allowed_weekdays.contains(&weekday_index(date)) {
        return true;
    }

    allow_holiday_eves && date.succ_opt().is_some_and(is_holiday)
}

impl CalendarConfig {
    /// [`is_allowed`] with this calendar's policy, also honouring its date
    /// bounds.
    pub fn is_date_allowed<S: HolidaySource>(
        &self,
        date: NaiveDate,
        holidays: &HolidayCache<S>,
    ) -> bool {
        self.within_bounds(date)
            && is_allowed(
                date,
                &self.timezone,
                &self.allowed_weekdays,
                self.holidays_policy,
                self.allow_holiday_eves,
                holidays,
            )
    }
}

/// Eligible dates in the inclusive range `[start, end]`, in order.
pub fn eligible_dates<'a, S: HolidaySource>(
    config: &'a CalendarConfig,
    start: NaiveDate,
    end: NaiveDate,
    holidays: &'a HolidayCache<S>,
) -> impl Iterator<Item = NaiveDate> + 'a {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
        .filter(move |d| config.is_date_allowed(*d, holidays))
}
