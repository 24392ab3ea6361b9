use chrono::{DateTime, Utc};

use crate::feed::{escape_html, extended_label, FeedBuilder, FeedEntry, HtmlDocument};
use crate::models::quote::QuoteSnapshot;
use crate::util::{format_percent, format_price, format_signed, format_volume, iso_utc};

fn row(label: &str, value: &str) -> String {
    format!("<tr><th>{}</th><td>{}</td></tr>\n", escape_html(label), escape_html(value))
}

fn quote_table(quote: &QuoteSnapshot) -> String {
    let mut rows = String::new();
    if let Some(price) = quote.price {
        rows.push_str(&row("Price", &format!("${}", format_price(price))));
    }
    if let Some(change) = quote.change() {
        rows.push_str(&row("Change", &format_signed(change)));
    }
    if let Some(pct) = quote.change_percent() {
        rows.push_str(&row("Change %", &format_percent(pct)));
    }
    if let Some(prev) = quote.previous_close {
        rows.push_str(&row("Previous Close", &format!("${}", format_price(prev))));
    }
    rows.push_str(&row("Market State", quote.market_state.as_ref()));
    if let Some(bar) = quote.bar {
        rows.push_str(&row("Open", &format!("${}", format_price(bar.open))));
        rows.push_str(&row("High", &format!("${}", format_price(bar.high))));
        rows.push_str(&row("Low", &format!("${}", format_price(bar.low))));
        rows.push_str(&row("Close", &format!("${}", format_price(bar.close))));
        rows.push_str(&row("Volume", &format_volume(bar.volume)));
    }
    if let Some(ext) = quote.extended_price {
        let value = match quote.extended_change() {
            Some((change, pct)) => format!(
                "${} ({}, {})",
                format_price(ext),
                format_signed(change),
                format_percent(pct)
            ),
            None => format!("${}", format_price(ext)),
        };
        rows.push_str(&row(extended_label(quote), &value));
    }
    rows.push_str(&row("Timestamp (UTC)", &iso_utc(&quote.timestamp)));
    format!("<table class=\"quote\">\n{}</table>\n", rows)
}

/// 渲染静态首页；`quote` 为 None 时显示数据不可用提示
pub fn write_html(
    builder: &FeedBuilder,
    quote: Option<&QuoteSnapshot>,
    entry: &FeedEntry,
    generated_at: DateTime<Utc>,
) -> HtmlDocument {
    let title = escape_html(&builder.title);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    if let Some(icon) = &builder.icon {
        html.push_str(&format!(
            "<link rel=\"icon\" type=\"image/png\" href=\"{}\">\n",
            escape_html(icon)
        ));
    }
    html.push_str(&format!(
        "<link rel=\"alternate\" type=\"application/atom+xml\" title=\"{}\" href=\"feed.atom\">\n",
        title
    ));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", title));
    html.push_str(&format!("<p>{}</p>\n", escape_html(&builder.subtitle)));

    match quote {
        Some(q) => {
            html.push_str(&format!("<h2>{}</h2>\n", escape_html(&entry.title)));
            html.push_str(&quote_table(q));
        }
        None => {
            html.push_str(&format!(
                "<h2 class=\"placeholder\">{}</h2>\n<p>{}</p>\n",
                escape_html(&entry.title),
                escape_html(&entry.summary)
            ));
        }
    }

    html.push_str(&format!(
        "<p><small>Generated {} &middot; data via <a href=\"{}\">{}</a></small></p>\n",
        iso_utc(&generated_at),
        escape_html(&entry.link),
        escape_html(&builder.symbol)
    ));
    html.push_str("<p><a href=\"feed.atom\">Atom feed</a> | <a href=\"feed.rss\">RSS2 feed</a></p>\n");
    html.push_str("</body>\n</html>\n");

    HtmlDocument(html)
}
