use chrono::NaiveDate;

use crate::domain::{AgeBand, SampleRecord};
use crate::pipeline::processing::dates::parse_date;

/// Lowest day count the age bins were designed for
pub const MIN_BINNED_DAYS: i64 = -20_000;
/// Highest day count the age bins were designed for (2555 weeks)
pub const MAX_BINNED_DAYS: i64 = 2_555 * 7;

/// Bucket an age in days. Intervals are left-exclusive and right-inclusive;
/// anything outside the designed range is clamped to the nearest end bucket.
pub fn band_for_days(days: i64) -> AgeBand {
    // Clamp first so the match below is total over the designed bins
    let days = days.clamp(MIN_BINNED_DAYS + 1, MAX_BINNED_DAYS);
    match days {
        d if d <= 0 => AgeBand::Unborn,
        d if d <= 179 => AgeBand::SixMonthsAndLess,
        d if d <= 364 => AgeBand::ElevenMonthsAndLess,
        d if d <= 1094 => AgeBand::OneToThreeYears,
        d if d <= 2554 => AgeBand::FourToSixYears,
        _ => AgeBand::SevenYearsAndAbove,
    }
}

/// Age band for a birth date as of `today`; no birth date means pregnant/unborn.
pub fn estimate_age(childdob: Option<NaiveDate>, today: NaiveDate) -> AgeBand {
    match childdob {
        Some(dob) => band_for_days((today - dob).num_days()),
        None => AgeBand::PregnantOrUnborn,
    }
}

/// Parse `childdob` (unparseable becomes missing) and assign `estimateage`
pub fn classify_ages(records: &mut [SampleRecord], today: NaiveDate) {
    for record in records.iter_mut() {
        record.childdob = parse_date(&record.childdob_raw);
        record.estimateage = Some(estimate_age(record.childdob, today));
    }
}
