// 公开导出的模块，供外部使用
pub mod models;
pub mod feed;
pub mod errors;

// 主程序与脚本使用的模块
pub mod config;
pub mod scrapers;
pub mod services;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use models::quote::{MarketState, OhlcBar, QuoteSnapshot};
pub use feed::{AtomDocument, FeedBuilder, HtmlDocument, RssDocument};
pub use errors::{Result, FeedError};
