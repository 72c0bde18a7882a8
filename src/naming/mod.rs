//! Date and file naming rules.
//!
//! The source publishes one PDF per day under `<tag>.<YYYYMMDD>.pdf`, where the
//! tag depends on the day of the week. Locally the same file is stored with the
//! date first (`<YYYYMMDD>.<tag>.pdf`) so that a plain directory listing sorts
//! chronologically and the cleanup pass can compare prefixes.

mod edition;

pub use edition::Edition;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Extension shared by remote and local filenames
pub const PDF_EXTENSION: &str = ".pdf";

/// Length of a `YYYYMMDD` date key
pub const DATE_KEY_LEN: usize = 8;

static LOCAL_FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{8}\..+\.pdf$").expect("local filename pattern is valid"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NamingError {
    #[error("Filename {0} does not end in .pdf")]
    MissingExtension(String),

    #[error("Filename {0} needs a variant and a date segment before the extension")]
    TooFewSegments(String),

    #[error("Filename {0} does not carry a YYYYMMDD date segment")]
    InvalidDate(String),
}

/// Current calendar date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The calendar day before `date`
pub fn yesterday(date: NaiveDate) -> Option<NaiveDate> {
    date.pred_opt()
}

/// Render a date as its `YYYYMMDD` key
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Tag for the edition published on `date`
pub fn variant_tag(date: NaiveDate) -> &'static str {
    Edition::for_date(date).tag()
}

/// Name of the file as published by the source: `<tag>.<YYYYMMDD>.pdf`
pub fn remote_filename(variant_tag: &str, date: NaiveDate) -> String {
    format!("{}.{}{}", variant_tag, date_key(date), PDF_EXTENSION)
}

/// Reorder a source filename so the date comes first.
///
/// The date is the last segment before the extension and everything in front
/// of it is the tag, so multi-part tags such as `gdn.quick` survive intact.
pub fn local_filename(remote_filename: &str) -> Result<String, NamingError> {
    let stem = remote_filename
        .strip_suffix(PDF_EXTENSION)
        .ok_or_else(|| NamingError::MissingExtension(remote_filename.to_string()))?;

    let (variant, date) = stem
        .rsplit_once('.')
        .filter(|(variant, _)| !variant.is_empty())
        .ok_or_else(|| NamingError::TooFewSegments(remote_filename.to_string()))?;

    if !is_date_key(date) {
        return Err(NamingError::InvalidDate(remote_filename.to_string()));
    }

    Ok(format!("{}.{}{}", date, variant, PDF_EXTENSION))
}

/// Date prefix of a local filename, or `None` for names the cleanup pass ignores
pub fn date_prefix(local_filename: &str) -> Option<&str> {
    if LOCAL_FILENAME_RE.is_match(local_filename) {
        Some(&local_filename[..DATE_KEY_LEN])
    } else {
        None
    }
}

fn is_date_key(s: &str) -> bool {
    s.len() == DATE_KEY_LEN && s.chars().all(|c| c.is_ascii_digit())
}
