//! Traits for fetching nginx status.

use crate::error::Result;
use crate::metrics::data::RawReading;
use crate::metrics::parser::parse_status;

/// Source of raw stub_status text.
///
/// The HTTP implementation lives in [`crate::metrics::collector`]; tests
/// substitute canned responses.
pub trait StatusSource: Send + Sync {
    /// Fetch one status body.
    fn fetch(&self) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Fetch and parse one reading.
    fn fetch_reading(&self) -> impl std::future::Future<Output = Result<RawReading>> + Send {
        async move {
            let body = self.fetch().await?;
            parse_status(&body)
        }
    }
}
