use super::error::FileError;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MAX_ROW_BYTES: usize = 1024 * 1024;
pub const DEFAULT_PAGE_BUDGET_ROWS: u64 = 200;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Limits and parsing options for the CSV pager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    pub delimiter: char,
    /// Largest raw row accepted, terminator included.
    pub max_row_bytes: usize,
    /// Most source bytes committed to a single page. Unset means 200 rows of
    /// `max_row_bytes`, so the budget follows the row limit wherever it is set.
    pub max_bytes_per_page: Option<u64>,
    /// Deadline for a whole page request, store calls included.
    pub request_timeout_ms: u64,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            delimiter: ',',
            max_row_bytes: DEFAULT_MAX_ROW_BYTES,
            max_bytes_per_page: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl CsvSettings {
    pub fn new(delimiter: char) -> Self {
        CsvSettings {
            delimiter,
            ..Default::default()
        }
    }

    pub fn with_max_row_bytes(mut self, max_row_bytes: usize) -> Self {
        self.max_row_bytes = max_row_bytes;
        self
    }

    pub fn with_max_bytes_per_page(mut self, max_bytes_per_page: u64) -> Self {
        self.max_bytes_per_page = Some(max_bytes_per_page);
        self
    }

    /// The effective page budget.
    pub fn max_bytes_per_page(&self) -> u64 {
        self.max_bytes_per_page.unwrap_or_else(|| {
            (self.max_row_bytes as u64).saturating_mul(DEFAULT_PAGE_BUDGET_ROWS)
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    pub fn validate(&self) -> Result<(), FileError> {
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\r' | '\n') {
            return Err(FileError::InvalidSettings(format!(
                "delimiter {:?} must be a single ASCII character other than a quote or line break",
                self.delimiter
            )));
        }
        if self.max_row_bytes == 0 {
            return Err(FileError::InvalidSettings(
                "max_row_bytes must be greater than zero".into(),
            ));
        }
        // Otherwise a legal row might never fit on a page and paging would stall
        if self.max_bytes_per_page() < self.max_row_bytes as u64 {
            return Err(FileError::InvalidSettings(format!(
                "max_bytes_per_page ({}) must be at least max_row_bytes ({})",
                self.max_bytes_per_page(),
                self.max_row_bytes
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(FileError::InvalidSettings(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let settings = CsvSettings::default();
        assert_eq!(settings.max_row_bytes, 1 << 20);
        assert_eq!(settings.max_bytes_per_page(), 200 << 20);
        assert_eq!(settings.request_timeout(), Duration::from_secs(60));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_budgets_smaller_than_a_row() {
        let settings = CsvSettings::default()
            .with_max_row_bytes(64)
            .with_max_bytes_per_page(63);
        assert!(matches!(
            settings.validate(),
            Err(FileError::InvalidSettings(_))
        ));
    }

    #[test]
    fn rejects_quote_delimiter() {
        assert!(CsvSettings::new('"').validate().is_err());
        assert!(CsvSettings::new('\t').validate().is_ok());
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let settings: CsvSettings =
            serde_json::from_str(r#"{ "delimiter": ";", "max_row_bytes": 4096 }"#).unwrap();
        assert_eq!(settings.delimiter, ';');
        assert_eq!(settings.max_row_bytes, 4096);
        assert_eq!(settings.max_bytes_per_page(), 4096 * 200);

        let settings: CsvSettings =
            serde_json::from_str(r#"{ "max_row_bytes": 4096, "max_bytes_per_page": 5000 }"#)
                .unwrap();
        assert_eq!(settings.max_bytes_per_page(), 5000);
    }

    #[test]
    fn budget_follows_the_row_limit_unless_set() {
        let settings = CsvSettings::default().with_max_row_bytes(64);
        assert_eq!(settings.max_bytes_per_page(), 64 * 200);

        let settings = CsvSettings::default()
            .with_max_bytes_per_page(1000)
            .with_max_row_bytes(64);
        assert_eq!(settings.max_bytes_per_page(), 1000);

        let settings = CsvSettings::default().with_max_row_bytes(usize::MAX);
        assert_eq!(settings.max_bytes_per_page(), u64::MAX);
        assert!(settings.validate().is_ok());
    }
}
