use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;

use crate::errors::{FeedError, Result};

/// 从 Atom 文档中读回的订阅源
#[derive(Debug, Clone, Default)]
pub struct AtomFeed {
    pub title: String,
    pub updated: String,
    pub entries: Vec<AtomEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct AtomEntry {
    pub id: String,
    pub title: String,
    pub published: String,
    pub updated: String,
    pub summary: String,
    pub content: String,
}

/// 一行 CSV：发布时间与标题中的价格
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub published: String,
    pub price: String,
}

/// Parse an Atom document. Mismatched tags or a root element other than
/// `feed` are errors, so this doubles as a well-formedness check.
pub fn parse_atom(xml: &str) -> Result<AtomFeed> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<String> = Vec::new();
    let mut feed = AtomFeed::default();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if path.is_empty() {
                    if name != "feed" || saw_root {
                        return Err(FeedError::DataError(format!("unexpected root element <{}>", name)));
                    }
                    saw_root = true;
                }
                if name == "entry" && path.len() == 1 {
                    feed.entries.push(AtomEntry::default());
                }
                path.push(name);
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                append_text(&mut feed, &path, &text);
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                append_text(&mut feed, &path, &String::from_utf8_lossy(&raw));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedError::DataError("document has no <feed> element".to_string()));
    }
    if !path.is_empty() {
        return Err(FeedError::DataError(format!("unclosed element <{}>", path.join("/"))));
    }
    Ok(feed)
}

fn append_text(feed: &mut AtomFeed, path: &[String], text: &str) {
    let names: Vec<&str> = path.iter().map(String::as_str).collect();
    let target = match names.as_slice() {
        ["feed", "title"] => &mut feed.title,
        ["feed", "updated"] => &mut feed.updated,
        ["feed", "entry", field] => {
            let Some(entry) = feed.entries.last_mut() else {
                return;
            };
            match *field {
                "id" => &mut entry.id,
                "title" => &mut entry.title,
                "published" => &mut entry.published,
                "updated" => &mut entry.updated,
                "summary" => &mut entry.summary,
                "content" => &mut entry.content,
                _ => return,
            }
        }
        _ => return,
    };
    target.push_str(text.trim());
}

/// 把条目转换为按发布时间排序的 `published,price` 行；
/// 标题中没有 `$价格` 的条目价格为空（占位条目即如此）。
pub fn price_rows(feed: &AtomFeed) -> Result<Vec<PriceRow>> {
    let price_re = Regex::new(r"\$([0-9]+(?:\.[0-9]+)?)")
        .map_err(|e| FeedError::DataError(e.to_string()))?;

    let mut rows: Vec<PriceRow> = feed
        .entries
        .iter()
        .filter(|e| !e.published.is_empty() && !e.title.is_empty())
        .map(|e| {
            let title = e.title.split_whitespace().collect::<Vec<_>>().join(" ");
            PriceRow {
                published: e.published.clone(),
                price: price_re
                    .captures(&title)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            }
        })
        .collect();

    rows.sort_by(|a, b| a.published.cmp(&b.published));
    Ok(rows)
}
