use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

use crate::domain::{RecordStatus, SampleRecord};

/// Oldest `m_date` that is *not* part of the lookback window.
///
/// History rows count only when their `m_date` is strictly after this day.
pub fn lookback_boundary(today: NaiveDate, lookback_days: i64) -> NaiveDate {
    today - Duration::days(lookback_days)
}

/// Outcome counts of one duplicate check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateCheckStats {
    pub valid: usize,
    pub duplicates: usize,
}

/// Mark every record Valid or duplicate by composite key membership in
/// `recent_keys`. Nothing but key equality is compared.
pub fn mark_duplicates(
    records: &mut [SampleRecord],
    recent_keys: &HashSet<String>,
) -> DuplicateCheckStats {
    let mut stats = DuplicateCheckStats::default();
    for record in records.iter_mut() {
        let status = if recent_keys.contains(&record.composite_key) {
            stats.duplicates += 1;
            RecordStatus::DuplicateInLookback
        } else {
            stats.valid += 1;
            RecordStatus::Valid
        };
        record.status = Some(status);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::tests_support::record;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_lookback_boundary() {
        assert_eq!(
            lookback_boundary(today(), 60),
            NaiveDate::from_ymd_opt(2026, 8, 19).unwrap()
        );
    }

    #[test]
    fn test_mark_duplicates_by_key_only() {
        let mut records = vec![
            record("0111", "Formula A", today()),
            record("0111", "Formula B", today()),
            record("0222", "Formula A", today() - Duration::days(300)),
        ];
        let keys: HashSet<String> = ["0111_Formula A", "0222_Formula A"]
            .iter()
            .map(|k| k.to_string())
            .collect();

        let stats = mark_duplicates(&mut records, &keys);

        assert_eq!(records[0].status, Some(RecordStatus::DuplicateInLookback));
        assert_eq!(records[1].status, Some(RecordStatus::Valid));
        // The request's own date plays no part in the decision
        assert_eq!(records[2].status, Some(RecordStatus::DuplicateInLookback));
        assert_eq!(stats, DuplicateCheckStats { valid: 1, duplicates: 2 });
    }

    #[test]
    fn test_empty_history_marks_everything_valid() {
        let mut records = vec![record("0111", "A", today()), record("0111", "A", today())];
        let stats = mark_duplicates(&mut records, &HashSet::new());
        assert_eq!(stats.valid, 2);
        assert!(records.iter().all(|r| r.status == Some(RecordStatus::Valid)));
    }
}
