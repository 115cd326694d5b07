use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::domain::{FinalStatus, PostcodeValidity, RecordStatus, SampleRecord, SummaryRow};
use crate::error::{ReportError, Result};

const STAGE: &str = "summary";

/// A record paired with its position in the sorted dataset
pub type IndexedRecord = (usize, SampleRecord);

/// Earliest and latest `m_date` of the records, if there are any
pub fn date_range<'a>(
    records: impl IntoIterator<Item = &'a SampleRecord>,
) -> Option<(NaiveDate, NaiveDate)> {
    records.into_iter().fold(None, |range, r| match range {
        None => Some((r.m_date, r.m_date)),
        Some((start, end)) => Some((start.min(r.m_date), end.max(r.m_date))),
    })
}

fn require_status(record: &SampleRecord, stage: &'static str) -> Result<RecordStatus> {
    record.status.ok_or_else(|| {
        ReportError::missing_input(
            stage,
            format!("record '{}' has no duplicate status", record.composite_key),
        )
    })
}

/// Records shown as valid in the reports: the first request per mobile number,
/// kept only if it passed the duplicate check. Each keeps its dataset position,
/// which the report sheets use as the `id` column.
///
/// This is a display dedup on `mobileno` and is unrelated to the composite
/// key check that produced `status`.
pub fn display_valid_subset(records: &[SampleRecord]) -> Result<Vec<IndexedRecord>> {
    let mut seen = HashSet::new();
    let mut subset = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        if !seen.insert(record.mobileno.as_str()) {
            continue;
        }
        if require_status(record, "valid_subset")? == RecordStatus::Valid {
            subset.push((idx, record.clone()));
        }
    }
    Ok(subset)
}

/// Aggregate the dataset per product.
///
/// Every row carries the run-wide first and last `m_date`, not the product's own.
pub fn summarize(records: &[SampleRecord]) -> Result<Vec<SummaryRow>> {
    let (start_date, end_date) = date_range(records)
        .ok_or_else(|| ReportError::missing_input(STAGE, "dataset is empty"))?;

    let mut by_product: BTreeMap<&str, SummaryRow> = BTreeMap::new();
    for record in records {
        let status = require_status(record, STAGE)?;
        let postcode = PostcodeValidity::of(&record.postcode);

        let row = by_product
            .entry(record.m_product.as_str())
            .or_insert_with(|| SummaryRow {
                start_date,
                end_date,
                m_product: record.m_product.clone(),
                total_records: 0,
                valid: 0,
                invalid: 0,
                duplicates: 0,
                invalid_postcode: 0,
            });

        row.total_records += 1;
        match FinalStatus::of(status, postcode) {
            FinalStatus::Valid => row.valid += 1,
            FinalStatus::Invalid => row.invalid += 1,
        }
        if status == RecordStatus::DuplicateInLookback {
            row.duplicates += 1;
        }
        if postcode == PostcodeValidity::Invalid {
            row.invalid_postcode += 1;
        }
    }

    Ok(by_product.into_values().collect())
}

/// Distinct products in order of first appearance
pub fn products_in_order<'a>(records: impl IntoIterator<Item = &'a SampleRecord>) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.m_product.as_str()))
        .map(|r| r.m_product.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::tests_support::record;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn with(mut r: SampleRecord, status: RecordStatus, postcode: &str) -> SampleRecord {
        r.status = Some(status);
        r.postcode = postcode.to_string();
        r
    }

    #[test]
    fn test_summary_counts_are_consistent() {
        let records = vec![
            with(record("01", "A", today() - Duration::days(3)), RecordStatus::Valid, "12345"),
            with(record("02", "A", today()), RecordStatus::Valid, "1234"),
            with(record("03", "A", today()), RecordStatus::DuplicateInLookback, "12345"),
            // Both a duplicate and a bad postcode
            with(record("04", "A", today()), RecordStatus::DuplicateInLookback, "9"),
            with(record("05", "B", today() - Duration::days(1)), RecordStatus::Valid, "ABCDE"),
        ];

        let rows = summarize(&records).unwrap();
        assert_eq!(rows.len(), 2);

        let a = &rows[0];
        assert_eq!(a.m_product, "A");
        assert_eq!(a.total_records, 4);
        assert_eq!(a.valid, 1);
        assert_eq!(a.invalid, 3);
        assert_eq!(a.duplicates, 2);
        assert_eq!(a.invalid_postcode, 2);
        assert_eq!(a.total_records, a.valid + a.invalid);

        let b = &rows[1];
        assert_eq!((b.total_records, b.valid, b.invalid), (1, 1, 0));
    }

    #[test]
    fn test_summary_dates_are_run_wide() {
        let records = vec![
            with(record("01", "A", today() - Duration::days(9)), RecordStatus::Valid, "12345"),
            with(record("02", "B", today()), RecordStatus::Valid, "12345"),
        ];
        let rows = summarize(&records).unwrap();
        for row in rows {
            assert_eq!(row.start_date, today() - Duration::days(9));
            assert_eq!(row.end_date, today());
        }
    }

    #[test]
    fn test_summary_needs_statuses_and_rows() {
        assert!(matches!(summarize(&[]), Err(ReportError::MissingInput { .. })));
        let unchecked = vec![record("01", "A", today())];
        assert!(matches!(summarize(&unchecked), Err(ReportError::MissingInput { .. })));
    }

    #[test]
    fn test_display_subset_keeps_first_mobile_occurrence_only() {
        let records = vec![
            with(record("01", "A", today()), RecordStatus::Valid, "12345"),
            with(record("01", "B", today()), RecordStatus::Valid, "12345"),
            // First occurrence is a duplicate, so mobile 02 drops out entirely
            with(record("02", "A", today()), RecordStatus::DuplicateInLookback, "12345"),
            with(record("02", "C", today()), RecordStatus::Valid, "12345"),
            // Bad postcodes still count as display-valid
            with(record("03", "C", today()), RecordStatus::Valid, "1"),
        ];

        let subset = display_valid_subset(&records).unwrap();
        let keys: Vec<(usize, &str)> = subset
            .iter()
            .map(|(idx, r)| (*idx, r.composite_key.as_str()))
            .collect();
        assert_eq!(keys, vec![(0, "01_A"), (4, "03_C")]);
        assert_eq!(products_in_order(subset.iter().map(|(_, r)| r)), vec!["A", "C"]);
    }

    #[test]
    fn test_date_range() {
        assert_eq!(date_range(&Vec::<SampleRecord>::new()), None);
        let records = vec![
            record("01", "A", today() - Duration::days(2)),
            record("02", "A", today()),
        ];
        assert_eq!(date_range(&records), Some((today() - Duration::days(2), today())));
    }
}
