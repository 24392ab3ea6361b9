use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{FeedError, Result};

pub const DEFAULT_BASE_URL: &str = "https://cm-fy.github.io/ocgn-stock-feed/";
pub const DEFAULT_ENDPOINT: &str = "https://query1.finance.yahoo.com";

pub struct Config {
    pub base_url: String,
    pub symbol: String,
    pub output_dir: PathBuf,
    pub request_timeout: Duration,
    pub icon_path: Option<PathBuf>,
    pub provider_endpoint: String,
    pub emit_rss: bool,
    pub feed_title: String,
    pub feed_subtitle: String,
    pub feed_author: String,
}

impl Config {
    pub fn new() -> Self {
        Self::for_symbol("OCGN")
    }

    /// 以给定股票代码生成默认标题、副标题和图标
    pub fn for_symbol(symbol: &str) -> Self {
        let symbol = symbol.trim().to_uppercase();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("docs"),
            request_timeout: Duration::from_secs(20),
            icon_path: Some(PathBuf::from(format!("{}.png", symbol))),
            provider_endpoint: DEFAULT_ENDPOINT.to_string(),
            emit_rss: true,
            feed_title: format!("{} Stock Price Feed", symbol),
            feed_subtitle: format!(
                "Near-real-time {} stock price updates (including extended hours).",
                symbol
            ),
            feed_author: format!("{} Stock Feed Bot", symbol),
            symbol,
        }
    }

    /// 基础地址统一以 `/` 结尾，方便拼接 `feed.atom` 等文件名
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let trimmed = base_url.trim();
        self.base_url = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.output_dir = PathBuf::from(dir);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_icon_path(mut self, icon: Option<&str>) -> Self {
        self.icon_path = icon.filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        self
    }

    pub fn with_provider_endpoint(mut self, endpoint: &str) -> Self {
        self.provider_endpoint = endpoint.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_emit_rss(mut self, emit_rss: bool) -> Self {
        self.emit_rss = emit_rss;
        self
    }

    /// 图标在输出目录和订阅源中使用的文件名
    pub fn icon_file_name(&self) -> Option<String> {
        self.icon_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
    }

    pub fn feed_url(&self) -> String {
        format!("{}feed.atom", self.base_url)
    }

    pub fn rss_url(&self) -> String {
        format!("{}feed.rss", self.base_url)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(FeedError::ConfigError("symbol must not be empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FeedError::ConfigError(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if !(self.provider_endpoint.starts_with("http://") || self.provider_endpoint.starts_with("https://")) {
            return Err(FeedError::ConfigError(format!(
                "provider endpoint must be http(s): {}",
                self.provider_endpoint
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(FeedError::ConfigError("request timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
