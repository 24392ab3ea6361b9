use crate::models::quote::QuoteSnapshot;
use crate::errors::Result;
use async_trait::async_trait;

/// Base trait for quote data providers
#[async_trait]
pub trait QuoteScraper {
    /// Short provider name, used in logs and the feed generator tag
    fn provider_name(&self) -> &'static str;

    /// Public page for the symbol, linked from the feed entry
    fn quote_page_url(&self, symbol: &str) -> String;

    /// Fetch the latest quote snapshot for one symbol
    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteSnapshot>;
}
