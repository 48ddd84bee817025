use chrono::{DateTime, Utc};

pub const HEADER_ERROR_CLASS: &str = "error.class";
pub const HEADER_ERROR_MESSAGE: &str = "error.message";
pub const HEADER_RETRYABLE: &str = "retryable";
pub const HEADER_FAILED_AT: &str = "ts.failed";

/// A message that could not be ingested, with the reason it failed.
///
/// `payload` is the raw bytes exactly as read from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub payload: Vec<u8>,
    pub error_class: String,
    pub error_message: String,
    pub retryable: bool,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(
        payload: impl Into<Vec<u8>>,
        error_class: impl Into<String>,
        error_message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            payload: payload.into(),
            error_class: error_class.into(),
            error_message: error_message.into(),
            retryable,
            failed_at: Utc::now(),
        }
    }

    /// Metadata headers in publish order. `ts.failed` is Unix epoch millis.
    pub fn headers(&self) -> [(&'static str, String); 4] {
        [
            (HEADER_ERROR_CLASS, self.error_class.clone()),
            (HEADER_ERROR_MESSAGE, self.error_message.clone()),
            (HEADER_RETRYABLE, self.retryable.to_string()),
            (HEADER_FAILED_AT, self.failed_at.timestamp_millis().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_headers() {
        let mut letter = DeadLetter::new(b"{".to_vec(), "serde_json::Error", "EOF", false);
        letter.failed_at = Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap();

        let headers = letter.headers();
        assert_eq!(headers[0], ("error.class", "serde_json::Error".to_string()));
        assert_eq!(headers[1], ("error.message", "EOF".to_string()));
        assert_eq!(headers[2], ("retryable", "false".to_string()));
        assert_eq!(headers[3], ("ts.failed", "1637907739000".to_string()));
        assert_eq!(letter.payload, b"{");
    }
}
