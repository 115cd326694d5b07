use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};
use std::collections::HashSet;

use crate::constants::{RECORD_COLUMNS, SHEET_ALL_DATA, SHEET_SUMMARY, SHEET_VALID_DATA};
use crate::domain::{SampleRecord, SummaryRow};
use crate::error::Result;
use crate::pipeline::processing::summary::{date_range, products_in_order, IndexedRecord};

const SUMMARY_COLUMNS: [&str; 9] = [
    "id",
    "start_date",
    "end_date",
    "m_product",
    "Total Records",
    "Valid",
    "Invalid",
    "Duplicates",
    "Invalid Postcode",
];

const MAX_SHEET_NAME_CHARS: usize = 31;
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Inputs for the `<date>_wyeth_sample_report.xlsx` workbook
pub struct SampleReport<'a> {
    pub run_date: NaiveDate,
    pub header_rows: u32,
    pub summary: &'a [SummaryRow],
    pub dataset: &'a [SampleRecord],
    pub valid: &'a [IndexedRecord],
}

struct Formats {
    header: Format,
    title: Format,
    date: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold().set_border(FormatBorder::Thin),
            title: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
        }
    }
}

/// Days since the Excel epoch, written as a number with a date format
fn excel_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}

fn long_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

fn write_header_row(sheet: &mut Worksheet, row: u32, columns: &[&str], fmts: &Formats) -> Result<()> {
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *name, &fmts.header)?;
    }
    Ok(())
}

fn write_record_row(
    sheet: &mut Worksheet,
    row: u32,
    id: usize,
    record: &SampleRecord,
    fmts: &Formats,
) -> Result<()> {
    sheet.write_number(row, 0, id as f64)?;
    sheet.write_number_with_format(row, 1, excel_serial(record.m_date), &fmts.date)?;
    let text_cells = [
        &record.firstname,
        &record.lastname,
        &record.email,
        &record.mobileno,
        &record.address1,
        &record.state,
        &record.city,
        &record.postcode,
    ];
    for (offset, value) in text_cells.iter().enumerate() {
        sheet.write_string(row, 2 + offset as u16, value.as_str())?;
    }
    sheet.write_boolean(row, 10, record.pregnant)?;
    sheet.write_string(row, 11, record.childname.as_str())?;
    sheet.write_string(row, 12, record.child_gender.as_str())?;
    if let Some(dob) = record.childdob {
        sheet.write_number_with_format(row, 13, excel_serial(dob), &fmts.date)?;
    }
    sheet.write_string(row, 14, record.m_source.as_str())?;
    sheet.write_string(row, 15, record.m_product.as_str())?;
    sheet.write_string(row, 16, record.composite_key.as_str())?;
    if let Some(age) = record.estimateage {
        sheet.write_string(row, 17, age.label())?;
    }
    if let Some(status) = record.status {
        sheet.write_string(row, 18, status.label())?;
    }
    Ok(())
}

/// Lay down an `id` + record-column table starting at `start_row`
fn write_record_table<'a>(
    sheet: &mut Worksheet,
    start_row: u32,
    rows: impl IntoIterator<Item = (usize, &'a SampleRecord)>,
    fmts: &Formats,
) -> Result<()> {
    let mut columns = vec!["id"];
    columns.extend_from_slice(&RECORD_COLUMNS);
    write_header_row(sheet, start_row, &columns, fmts)?;

    for (offset, (id, record)) in rows.into_iter().enumerate() {
        write_record_row(sheet, start_row + 1 + offset as u32, id, record, fmts)?;
    }
    Ok(())
}

/// Fill the reserved rows above a data table with the report description
fn write_description(
    sheet: &mut Worksheet,
    lines: [String; 4],
    fmts: &Formats,
) -> Result<()> {
    for (row, line) in lines.iter().enumerate() {
        if row == 0 {
            sheet.write_string_with_format(0, 0, line.as_str(), &fmts.title)?;
        } else {
            sheet.write_string(row as u32, 0, line.as_str())?;
        }
    }
    Ok(())
}

fn description_lines(
    title: &str,
    count_label: &str,
    run_date: NaiveDate,
    range: Option<(NaiveDate, NaiveDate)>,
    count: usize,
) -> [String; 4] {
    let (start, end) = match range {
        Some((start, end)) => (long_date(start), long_date(end)),
        None => ("N/A".to_string(), "N/A".to_string()),
    };
    [
        title.to_string(),
        format!("This Report Was Generated On : {}", run_date.format("%Y-%m-%d")),
        format!("The Report Was For The Duration Of : {} until {}", start, end),
        format!("{} : {}", count_label, count),
    ]
}

fn write_summary_sheet(sheet: &mut Worksheet, summary: &[SummaryRow], fmts: &Formats) -> Result<()> {
    write_header_row(sheet, 0, &SUMMARY_COLUMNS, fmts)?;
    for (idx, s) in summary.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_number(row, 0, idx as f64)?;
        sheet.write_number_with_format(row, 1, excel_serial(s.start_date), &fmts.date)?;
        sheet.write_number_with_format(row, 2, excel_serial(s.end_date), &fmts.date)?;
        sheet.write_string(row, 3, s.m_product.as_str())?;
        sheet.write_number(row, 4, s.total_records as f64)?;
        sheet.write_number(row, 5, s.valid as f64)?;
        sheet.write_number(row, 6, s.invalid as f64)?;
        sheet.write_number(row, 7, s.duplicates as f64)?;
        sheet.write_number(row, 8, s.invalid_postcode as f64)?;
    }
    Ok(())
}

/// Render the Summary / All Data / Valid Data workbook
pub fn render_sample_report(report: &SampleReport<'_>) -> Result<Vec<u8>> {
    let fmts = Formats::new();
    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_SUMMARY)?;
        write_summary_sheet(sheet, report.summary, &fmts)?;
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_ALL_DATA)?;
        write_record_table(sheet, report.header_rows, report.dataset.iter().enumerate(), &fmts)?;
        let lines = description_lines(
            "This Is The Auto Generated Report For All Data",
            "The Total Number Of Sample Requests Are",
            report.run_date,
            date_range(report.dataset),
            report.dataset.len(),
        );
        write_description(sheet, lines, &fmts)?;
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_VALID_DATA)?;
        write_record_table(
            sheet,
            report.header_rows,
            report.valid.iter().map(|(id, r)| (*id, r)),
            &fmts,
        )?;
        let lines = description_lines(
            "This Is The Auto Generated Report For All Valid Data",
            "The Total Number Of Valid Sample Requests Are",
            report.run_date,
            date_range(report.valid.iter().map(|(_, r)| r)),
            report.valid.len(),
        );
        write_description(sheet, lines, &fmts)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Render one sheet per product of the valid subset.
///
/// Returns `None` when there is nothing to fulfil, since a workbook needs at
/// least one sheet.
pub fn render_fulfillment_report(valid: &[IndexedRecord], header_rows: u32) -> Result<Option<Vec<u8>>> {
    let products = products_in_order(valid.iter().map(|(_, r)| r));
    if products.is_empty() {
        return Ok(None);
    }

    let fmts = Formats::new();
    let mut workbook = Workbook::new();
    for (product, sheet_name) in products.iter().zip(sheet_names(&products)) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name.as_str())?;
        let rows = valid
            .iter()
            .filter(|(_, r)| &r.m_product == product)
            .map(|(id, r)| (*id, r));
        write_record_table(sheet, header_rows, rows, &fmts)?;
    }

    Ok(Some(workbook.save_to_buffer()?))
}

/// Excel-safe, unique worksheet names for the given products (same order)
pub fn sheet_names(products: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    products
        .iter()
        .map(|product| {
            let base = sanitize_sheet_name(product);
            let mut candidate = base.clone();
            let mut n = 2;
            while !used.insert(candidate.to_lowercase()) {
                let suffix = format!("~{}", n);
                let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
                candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
                n += 1;
            }
            candidate
        })
        .collect()
}

fn sanitize_sheet_name(product: &str) -> String {
    let cleaned: String = product
        .trim()
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    // Excel also rejects names that start or end with an apostrophe
    let cleaned = cleaned.trim_matches('\'').to_string();
    if cleaned.trim().is_empty() {
        "Unnamed".to_string()
    } else {
        cleaned
    }
}
