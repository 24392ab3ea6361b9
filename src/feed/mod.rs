//! 订阅源渲染
//!
//! `FeedBuilder` 把一次行情快照渲染成 Atom 订阅源、HTML 页面以及 RSS 订阅源。
//! 拿不到可用行情时（数据源失败或缺少价格），三种文档都会输出一个
//! 明确标记的占位条目，保证输出文件始终是合法文档。

pub mod atom;
pub mod html;
pub mod reader;
pub mod rss;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::errors::Result;
use crate::models::quote::QuoteSnapshot;
use crate::util::{
    entry_stamp, format_percent, format_price, format_signed, format_volume, iso_utc,
};

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const GENERATOR: &str = concat!("ticker_feed ", env!("CARGO_PKG_VERSION"));

/// Rendered Atom XML (RFC 4287), UTF-8
#[derive(Debug, Clone, PartialEq)]
pub struct AtomDocument(String);

/// Rendered static HTML page
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlDocument(String);

/// Rendered RSS 2.0 XML
#[derive(Debug, Clone, PartialEq)]
pub struct RssDocument(String);

macro_rules! document_accessors {
    ($($name:ident),*) => {
        $(
            impl $name {
                pub fn as_str(&self) -> &str {
                    &self.0
                }

                pub fn into_string(self) -> String {
                    self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

document_accessors!(AtomDocument, HtmlDocument, RssDocument);

/// 一个条目的全部文本，Atom / RSS / HTML 共用
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content_html: String,
    pub link: String,
    pub published: DateTime<Utc>,
    pub placeholder: bool,
}

/// Channel-level metadata shared by the renderers
#[derive(Debug, Clone)]
pub struct FeedBuilder {
    pub symbol: String,
    pub base_url: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub icon: Option<String>,
    pub quote_page_url: String,
}

impl FeedBuilder {
    pub fn new(config: &Config, quote_page_url: &str) -> Self {
        Self {
            symbol: config.symbol.clone(),
            base_url: config.base_url.clone(),
            title: config.feed_title.clone(),
            subtitle: config.feed_subtitle.clone(),
            author: config.feed_author.clone(),
            icon: config.icon_file_name(),
            quote_page_url: quote_page_url.to_string(),
        }
    }

    pub fn feed_url(&self) -> String {
        format!("{}feed.atom", self.base_url)
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon.as_ref().map(|icon| format!("{}{}", self.base_url, icon))
    }

    /// 渲染 Atom 与 HTML。`quote` 为 None 或缺少价格时输出占位条目。
    pub fn render(
        &self,
        quote: Option<&QuoteSnapshot>,
        generated_at: DateTime<Utc>,
    ) -> Result<(AtomDocument, HtmlDocument)> {
        let quote = usable(quote);
        let entry = self.entry(quote.as_ref(), generated_at);
        let atom = atom::write_atom(self, &entry, generated_at)?;
        let html = html::write_html(self, quote.as_ref(), &entry, generated_at);
        Ok((atom, html))
    }

    pub fn render_rss(
        &self,
        quote: Option<&QuoteSnapshot>,
        generated_at: DateTime<Utc>,
    ) -> Result<RssDocument> {
        let quote = usable(quote);
        let entry = self.entry(quote.as_ref(), generated_at);
        rss::write_rss(self, &entry, generated_at)
    }

    /// 构造条目文本；`quote` 必须已经过 `usable` 过滤
    fn entry(&self, quote: Option<&QuoteSnapshot>, generated_at: DateTime<Utc>) -> FeedEntry {
        match quote {
            Some(q) => self.quote_entry(q),
            None => self.placeholder_entry(generated_at),
        }
    }

    fn quote_entry(&self, quote: &QuoteSnapshot) -> FeedEntry {
        let price = quote.headline_price().map(format_price).unwrap_or_default();
        let state = quote.market_state.as_ref();
        let change = headline_change_text(quote);

        let title = match &change {
            Some(c) => format!("{}: ${} ({}) [{}]", quote.symbol, price, c, state),
            None => format!("{}: ${} [{}]", quote.symbol, price, state),
        };
        let summary = match &change {
            Some(c) => format!("{} {} ({}) {} at {}", quote.symbol, price, c, state, iso_utc(&quote.timestamp)),
            None => format!("{} {} {} at {}", quote.symbol, price, state, iso_utc(&quote.timestamp)),
        };

        FeedEntry {
            id: format!(
                "{}#{}-{}",
                self.base_url,
                quote.symbol,
                entry_stamp(&quote.timestamp)
            ),
            title,
            summary,
            content_html: quote_content_html(quote),
            link: self.quote_page_url.clone(),
            published: quote.timestamp,
            placeholder: false,
        }
    }

    fn placeholder_entry(&self, generated_at: DateTime<Utc>) -> FeedEntry {
        let summary = format!(
            "Quote data for {} is currently unavailable. The feed will refresh on the next scheduled run.",
            self.symbol
        );
        FeedEntry {
            id: format!("{}#{}-unavailable", self.base_url, self.symbol),
            title: format!("{}: quote data unavailable", self.symbol),
            content_html: format!(
                "<div>\n<h2>{} Stock Price Update</h2>\n<p><strong>Data unavailable.</strong> {}</p>\n<p><strong>Checked (UTC):</strong> {}</p>\n</div>",
                escape_html(&self.symbol),
                escape_html(&summary),
                iso_utc(&generated_at)
            ),
            summary,
            link: self.quote_page_url.clone(),
            published: generated_at,
            placeholder: true,
        }
    }
}

/// 清洗后仍然有价格的快照才会被渲染
fn usable(quote: Option<&QuoteSnapshot>) -> Option<QuoteSnapshot> {
    quote.map(QuoteSnapshot::sanitized).filter(QuoteSnapshot::is_renderable)
}

/// `+0.03, +2.50%`；缺少昨收时返回 None
fn change_text(quote: &QuoteSnapshot) -> Option<String> {
    let change = quote.change()?;
    Some(match quote.change_percent() {
        Some(pct) => format!("{}, {}", format_signed(change), format_percent(pct)),
        None => format_signed(change),
    })
}

/// 标题和摘要使用当前价格（盘前/盘后时为盘前/盘后价）
fn headline_change_text(quote: &QuoteSnapshot) -> Option<String> {
    let (change, pct) = quote.headline_change()?;
    Some(match pct {
        Some(pct) => format!("{}, {}", format_signed(change), format_percent(pct)),
        None => format_signed(change),
    })
}

fn quote_content_html(quote: &QuoteSnapshot) -> String {
    let mut html = String::from("<div>\n");
    html.push_str(&format!("<h2>{} Stock Price Update</h2>\n", escape_html(&quote.symbol)));
    if let Some(price) = quote.price {
        html.push_str(&format!("<p><strong>Price:</strong> ${}</p>\n", format_price(price)));
    }
    if let Some(change) = change_text(quote) {
        html.push_str(&format!("<p><strong>Change:</strong> {}</p>\n", change));
    }
    if let Some(prev) = quote.previous_close {
        html.push_str(&format!("<p><strong>Previous Close:</strong> ${}</p>\n", format_price(prev)));
    }
    html.push_str(&format!("<p><strong>Market State:</strong> {}</p>\n", quote.market_state));
    if let Some(bar) = quote.bar {
        html.push_str(&format!(
            "<p><strong>Open:</strong> ${} <strong>High:</strong> ${} <strong>Low:</strong> ${} <strong>Close:</strong> ${} <strong>Volume:</strong> {}</p>\n",
            format_price(bar.open),
            format_price(bar.high),
            format_price(bar.low),
            format_price(bar.close),
            format_volume(bar.volume)
        ));
    }
    if let Some(ext) = quote.extended_price {
        let label = extended_label(quote);
        match quote.extended_change() {
            Some((change, pct)) => html.push_str(&format!(
                "<p><strong>{}:</strong> ${} ({}, {})</p>\n",
                label,
                format_price(ext),
                format_signed(change),
                format_percent(pct)
            )),
            None => html.push_str(&format!("<p><strong>{}:</strong> ${}</p>\n", label, format_price(ext))),
        }
    }
    html.push_str(&format!("<p><strong>Timestamp (UTC):</strong> {}</p>\n", iso_utc(&quote.timestamp)));
    html.push_str("</div>");
    html
}

pub(crate) fn extended_label(quote: &QuoteSnapshot) -> &'static str {
    match quote.market_state {
        crate::models::quote::MarketState::Pre => "Pre-Market",
        crate::models::quote::MarketState::Post => "After Hours",
        _ => "Extended Hours",
    }
}

/// HTML 文本转义（同时适用于属性值）
pub fn escape_html(raw: &str) -> String {
    quick_xml::escape::escape(raw).into_owned()
}
