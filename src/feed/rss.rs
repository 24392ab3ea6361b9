use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, BytesText, Event};

use crate::errors::Result;
use crate::feed::atom::{end, finish, new_writer, start, text_element};
use crate::feed::{FeedBuilder, FeedEntry, RssDocument, GENERATOR};
use crate::util::rfc2822_utc;

/// RSS 2.0 companion feed with the same single item as the Atom feed
pub fn write_rss(
    builder: &FeedBuilder,
    entry: &FeedEntry,
    generated_at: DateTime<Utc>,
) -> Result<RssDocument> {
    let mut writer = new_writer()?;

    start(&mut writer, BytesStart::new("rss").with_attributes([("version", "2.0")]))?;
    start(&mut writer, BytesStart::new("channel"))?;
    text_element(&mut writer, "title", &builder.title)?;
    text_element(&mut writer, "link", &builder.base_url)?;
    text_element(&mut writer, "description", &builder.subtitle)?;
    text_element(&mut writer, "lastBuildDate", &rfc2822_utc(&generated_at))?;
    text_element(&mut writer, "generator", GENERATOR)?;
    if let Some(icon) = builder.icon_url() {
        start(&mut writer, BytesStart::new("image"))?;
        text_element(&mut writer, "url", &icon)?;
        text_element(&mut writer, "title", &builder.title)?;
        text_element(&mut writer, "link", &builder.base_url)?;
        end(&mut writer, "image")?;
    }

    start(&mut writer, BytesStart::new("item"))?;
    text_element(&mut writer, "title", &entry.title)?;
    text_element(&mut writer, "link", &entry.link)?;
    start(
        &mut writer,
        BytesStart::new("guid").with_attributes([("isPermaLink", "false")]),
    )?;
    writer.write_event(Event::Text(BytesText::new(&entry.id)))?;
    end(&mut writer, "guid")?;
    text_element(&mut writer, "pubDate", &rfc2822_utc(&entry.published))?;
    text_element(&mut writer, "description", &entry.content_html)?;
    end(&mut writer, "item")?;

    end(&mut writer, "channel")?;
    end(&mut writer, "rss")?;
    Ok(RssDocument(finish(writer)?))
}
