use anyhow::Result;
use chrono::NaiveDate;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use sample_report::domain::AgeBand;
use sample_report::pipeline::ingestion::load_table;
use sample_report::pipeline::processing::age::classify_ages;
use sample_report::pipeline::processing::normalize::normalize;

const HEADERS: [&str; 17] = [
    "Created",
    "First Name",
    "Last Name",
    "Email",
    "Mobile",
    "Address",
    "State",
    "Town",
    "Zip",
    "Pregnant",
    "Child name",
    "Child gender",
    "Child birth date",
    "Source",
    "Product",
    "Status",
    "Type",
];

/// One request row with typed cells, the way an exported form upload looks
fn typed_upload() -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let datetime_fmt = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let date_fmt = Format::new().set_num_format("yyyy-mm-dd");

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }

    let created = ExcelDateTime::from_ymd(2026, 10, 1)?.and_hms(9, 30, 0)?;
    sheet.write_datetime_with_format(1, 0, &created, &datetime_fmt)?;
    sheet.write_string(1, 1, "Ana")?;
    sheet.write_string(1, 2, "Lee")?;
    sheet.write_string(1, 3, "ana@example.com")?;
    sheet.write_number(1, 4, 60123456789.0)?;
    sheet.write_string(1, 5, "1 Jalan")?;
    sheet.write_string(1, 6, "Selangor")?;
    sheet.write_string(1, 7, "Shah Alam")?;
    sheet.write_number(1, 8, 40000.0)?;
    sheet.write_string(1, 9, "No")?;
    sheet.write_string(1, 10, "Ed")?;
    sheet.write_string(1, 11, "M")?;
    let dob = ExcelDateTime::from_ymd(2025, 6, 1)?;
    sheet.write_datetime_with_format(1, 12, &dob, &date_fmt)?;
    sheet.write_string(1, 13, "web")?;
    sheet.write_string(1, 14, "Gold")?;
    sheet.write_string(1, 15, "new")?;
    sheet.write_string(1, 16, "lead")?;

    Ok(workbook.save_to_buffer()?)
}

#[test]
fn test_typed_workbook_cells_read_as_text() -> Result<()> {
    let table = load_table("requests.xlsx", &typed_upload()?)?;

    assert_eq!(table.headers, HEADERS.to_vec());
    assert_eq!(table.len(), 1);
    assert_eq!(table.cell(0, 0), "2026-10-01T09:30:00");
    assert_eq!(table.cell(0, 4), "60123456789");
    assert_eq!(table.cell(0, 8), "40000");
    assert_eq!(table.cell(0, 12), "2025-06-01T00:00:00");
    Ok(())
}

#[test]
fn test_typed_workbook_normalizes_and_classifies() -> Result<()> {
    let table = load_table("requests.xlsx", &typed_upload()?)?;
    let mut dataset = normalize(&table)?;
    let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    classify_ages(&mut dataset, today);

    let record = &dataset[0];
    assert_eq!(record.m_date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
    assert_eq!(record.mobileno, "60123456789");
    assert_eq!(record.composite_key, "60123456789_Gold");
    assert_eq!(record.postcode, "40000");
    assert_eq!(record.childdob, NaiveDate::from_ymd_opt(2025, 6, 1));
    // 504 days old
    assert_eq!(record.estimateage, Some(AgeBand::OneToThreeYears));
    assert!(!record.pregnant);
    Ok(())
}
