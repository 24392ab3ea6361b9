use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Provider request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),
}

impl FeedError {
    /// 是否可以用占位条目兜底（而不是让整个运行失败）。
    /// 请求构造失败（例如数据源地址写错）每次运行都会重复出现，按致命错误处理。
    pub fn is_recoverable(&self) -> bool {
        match self {
            FeedError::RequestError(e) => !e.is_builder(),
            FeedError::Timeout(_) | FeedError::ProviderUnavailable(_) => true,
            FeedError::IoError(_)
            | FeedError::JsonError(_)
            | FeedError::XmlError(_)
            | FeedError::MalformedResponse(_)
            | FeedError::ConfigError(_)
            | FeedError::DataError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

// 用于从字符串创建错误
impl From<String> for FeedError {
    fn from(s: String) -> Self {
        FeedError::DataError(s)
    }
}

impl From<&str> for FeedError {
    fn from(s: &str) -> Self {
        FeedError::DataError(s.to_string())
    }
}
