use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants;

/// Trigger payload for one uploaded object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadEvent {
    pub name: String,
    pub bucket: String,
}

/// One sample request after column renaming
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleRecord {
    pub m_date: NaiveDate,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub mobileno: String,
    pub address1: String,
    pub state: String,
    pub city: String,
    pub postcode: String,
    pub pregnant: bool,
    pub childname: String,
    pub child_gender: String,
    /// Raw text of the birth date column, parsed by the age classifier
    pub childdob_raw: String,
    pub childdob: Option<NaiveDate>,
    pub m_source: String,
    pub m_product: String,
    pub composite_key: String,
    /// Unset until the age classifier has run
    pub estimateage: Option<AgeBand>,
    /// Unset until the duplicate check has run
    pub status: Option<RecordStatus>,
}

/// The records of one upload, ordered by `m_date`
pub type Dataset = Vec<SampleRecord>;

/// Estimated child age bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AgeBand {
    Unborn,
    SixMonthsAndLess,
    ElevenMonthsAndLess,
    OneToThreeYears,
    FourToSixYears,
    SevenYearsAndAbove,
    /// No usable birth date on the request
    PregnantOrUnborn,
}

impl AgeBand {
    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Unborn => "Unborn",
            AgeBand::SixMonthsAndLess => "6 Months and Less",
            AgeBand::ElevenMonthsAndLess => "11 Months and Less",
            AgeBand::OneToThreeYears => "1 Year - 3 Years",
            AgeBand::FourToSixYears => "4 - 6 Years",
            AgeBand::SevenYearsAndAbove => "7 Years Old and Above",
            AgeBand::PregnantOrUnborn => "Pregnant / Unborn",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    Valid,
    DuplicateInLookback,
}

impl RecordStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Valid => constants::STATUS_VALID,
            RecordStatus::DuplicateInLookback => constants::STATUS_DUPLICATE,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Postcode check: exactly five characters, nothing more
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostcodeValidity {
    Valid,
    Invalid,
}

impl PostcodeValidity {
    pub fn of(postcode: &str) -> Self {
        if postcode.chars().count() == constants::POSTCODE_LENGTH {
            PostcodeValidity::Valid
        } else {
            PostcodeValidity::Invalid
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostcodeValidity::Valid => constants::POSTCODE_VALID,
            PostcodeValidity::Invalid => constants::POSTCODE_INVALID,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStatus {
    Valid,
    Invalid,
}

impl FinalStatus {
    pub fn of(status: RecordStatus, postcode: PostcodeValidity) -> Self {
        match (status, postcode) {
            (RecordStatus::Valid, PostcodeValidity::Valid) => FinalStatus::Valid,
            _ => FinalStatus::Invalid,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FinalStatus::Valid => constants::FINAL_VALID,
            FinalStatus::Invalid => constants::FINAL_INVALID,
        }
    }
}

/// Build the dedup identity for a request
pub fn composite_key(mobileno: &str, m_product: &str) -> String {
    format!("{}{}{}", mobileno, constants::COMPOSITE_KEY_SEPARATOR, m_product)
}

/// Per-product aggregate row of the summary sheet
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummaryRow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub m_product: String,
    pub total_records: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub invalid_postcode: usize,
}
