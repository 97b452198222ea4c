use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::internal_error::{InternalError, InternalResult};

pub type DBConnection = Arc<Mutex<Connection>>;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_iso_date(date: &str) -> InternalResult<NaiveDate> {
    NaiveDate::parse_from_str(date, ISO_DATE_FORMAT)
        .map_err(|_| InternalError::Invalid(format!("'{}' is not a YYYY-MM-DD date", date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(
            parse_iso_date("2024-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert!(parse_iso_date("01/02/2024").is_err());
        assert!(parse_iso_date("2024-02-30").is_err());
    }
}
