use std::collections::HashMap;
use tracing::{debug, info};

use crate::constants::{self, COLUMN_RENAMES, OPTIONAL_DROPPED_COLUMN, REQUIRED_DROPPED_COLUMNS};
use crate::domain::{composite_key, Dataset, SampleRecord};
use crate::error::{ReportError, Result};
use crate::pipeline::ingestion::RawTable;
use crate::pipeline::processing::dates::parse_date;

/// Column positions of the canonical fields within a validated upload
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn get(&self, canonical: &str) -> usize {
        // An unknown column reads as empty cells
        self.positions.get(canonical).copied().unwrap_or(usize::MAX)
    }
}

/// Check that the upload carries every column the pipeline depends on.
///
/// All fifteen renamed source columns plus `Status` and `Type` must be
/// present. Every missing column is reported at once.
pub fn validate_schema(table: &RawTable) -> Result<ColumnMap> {
    let mut missing = Vec::new();
    let mut positions = HashMap::new();

    for (source, canonical) in COLUMN_RENAMES {
        match table.column_index(source) {
            Some(idx) => {
                positions.insert(canonical, idx);
            }
            None => missing.push(source.to_string()),
        }
    }
    for dropped in REQUIRED_DROPPED_COLUMNS {
        if table.column_index(dropped).is_none() {
            missing.push(dropped.to_string());
        }
    }

    if !missing.is_empty() {
        return Err(ReportError::SchemaMismatch { missing });
    }
    Ok(ColumnMap { positions })
}

/// Rename, drop, type and sort the raw upload into a [`Dataset`].
///
/// `Status` and `Type` are dropped unconditionally and `Photo` when present;
/// any other unknown column is ignored. `childdob` is carried as raw text for
/// the age classifier. The result is sorted by `m_date`, keeping upload order
/// for requests made on the same day.
pub fn normalize(table: &RawTable) -> Result<Dataset> {
    let columns = validate_schema(table)?;
    log_dropped_columns(table);

    let mut dataset = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let text = |canonical: &str| table.cell(row, columns.get(canonical)).trim().to_string();
        // Kept verbatim: postcode validity is a raw character count
        let raw = |canonical: &str| table.cell(row, columns.get(canonical)).to_string();

        let created = text("m_date");
        let m_date = parse_date(&created).ok_or_else(|| {
            // Header is line 1, so data row N sits on line N + 2
            ReportError::Parse(format!(
                "row {}: unparseable Created date '{}'",
                row + 2,
                created
            ))
        })?;

        let mobileno = raw("mobileno");
        let m_product = text("m_product");
        dataset.push(SampleRecord {
            m_date,
            firstname: text("firstname"),
            lastname: text("lastname"),
            email: text("email"),
            composite_key: composite_key(&mobileno, &m_product),
            mobileno,
            address1: text("address1"),
            state: text("state"),
            city: text("city"),
            postcode: raw("postcode"),
            pregnant: parse_flag(&text("pregnant")),
            childname: text("childname"),
            child_gender: text("child_gender"),
            childdob_raw: text("childdob"),
            childdob: None,
            m_source: text("m_source"),
            m_product,
            estimateage: None,
            status: None,
        });
    }

    dataset.sort_by_key(|r| r.m_date);
    Ok(dataset)
}

fn log_dropped_columns(table: &RawTable) {
    if table.column_index(OPTIONAL_DROPPED_COLUMN).is_some() {
        debug!("Dropping {} column", OPTIONAL_DROPPED_COLUMN);
    } else {
        info!("{} column not present, nothing to drop", OPTIONAL_DROPPED_COLUMN);
    }

    for header in &table.headers {
        let known = constants::canonical_column(header).is_some()
            || REQUIRED_DROPPED_COLUMNS.contains(&header.as_str())
            || header == OPTIONAL_DROPPED_COLUMN;
        if !known {
            debug!("Ignoring unexpected column '{}'", header);
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Created,First Name,Last Name,Email,Mobile,Address,State,Town,Zip,Pregnant,Child name,Child gender,Child birth date,Source,Product,Status,Type,Photo";

    fn table(rows: &[&str]) -> RawTable {
        let mut csv = String::from(HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        crate::pipeline::ingestion::read_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_normalize_renames_and_keys() {
        let t = table(&["2026-10-01 09:30:00,Ana,Lee,ana@example.com,0123456789,1 Road,Selangor,Shah Alam,40000,Yes,Bo,F,2025-01-01,web,Formula A,New,Sample,pic.jpg"]);
        let dataset = normalize(&t).unwrap();

        assert_eq!(dataset.len(), 1);
        let r = &dataset[0];
        assert_eq!(r.m_date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(r.firstname, "Ana");
        assert_eq!(r.city, "Shah Alam");
        assert_eq!(r.postcode, "40000");
        assert!(r.pregnant);
        assert_eq!(r.childdob_raw, "2025-01-01");
        assert_eq!(r.composite_key, "0123456789_Formula A");
        assert!(r.status.is_none());
        assert!(r.estimateage.is_none());
    }

    #[test]
    fn test_postcode_and_mobile_keep_padding() {
        let t = table(&["2026-10-01,Ana,,,\" 0111\",,,,\" 9021\",No,,,,,Gold,,,"]);
        let r = &normalize(&t).unwrap()[0];

        assert_eq!(r.postcode, " 9021");
        assert_eq!(crate::domain::PostcodeValidity::of(&r.postcode), crate::domain::PostcodeValidity::Valid);
        assert_eq!(r.mobileno, " 0111");
        assert_eq!(r.composite_key, " 0111_Gold");
    }

    #[test]
    fn test_normalize_sorts_by_date_stably() {
        let t = table(&[
            "2026-10-03,C,,,3,,,,,No,,,,,P,,,",
            "2026-10-01,A,,,1,,,,,No,,,,,P,,,",
            "2026-10-03,D,,,4,,,,,No,,,,,P,,,",
            "2026-10-01 18:00,B,,,2,,,,,No,,,,,P,,,",
        ]);
        let names: Vec<String> = normalize(&t).unwrap().into_iter().map(|r| r.firstname).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_photo_column_is_optional() {
        let csv = "Created,First Name,Last Name,Email,Mobile,Address,State,Town,Zip,Pregnant,Child name,Child gender,Child birth date,Source,Product,Status,Type\n2026-10-01,A,,,1,,,,12345,,,,,,P,,";
        let t = crate::pipeline::ingestion::read_csv(csv.as_bytes()).unwrap();
        assert_eq!(normalize(&t).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_columns_are_all_reported() {
        let csv = "Created,First Name,Last Name,Email,Address,State,Town,Zip,Pregnant,Child name,Child gender,Child birth date,Source,Product,Type\n";
        let t = crate::pipeline::ingestion::read_csv(csv.as_bytes()).unwrap();

        match normalize(&t) {
            Err(ReportError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["Mobile".to_string(), "Status".to_string()]);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_created_date_fails_stage() {
        let t = table(&["yesterday,A,,,1,,,,,No,,,,,P,,,"]);
        match normalize(&t) {
            Err(ReportError::Parse(msg)) => assert!(msg.contains("row 2")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("YES"));
        assert!(parse_flag(" y "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("No"));
        assert!(!parse_flag(""));
    }
}
