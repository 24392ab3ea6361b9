use std::io::Write;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::errors::{FeedError, Result};
use crate::feed::{AtomDocument, FeedBuilder, FeedEntry, ATOM_NS, GENERATOR};
use crate::util::iso_utc;

/// `<name>text</name>`
pub(crate) fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

pub(crate) fn start<W: Write>(writer: &mut Writer<W>, element: BytesStart) -> Result<()> {
    writer.write_event(Event::Start(element))?;
    Ok(())
}

pub(crate) fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

pub(crate) fn empty<W: Write>(writer: &mut Writer<W>, element: BytesStart) -> Result<()> {
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

pub(crate) fn new_writer() -> Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(writer)
}

pub(crate) fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| FeedError::DataError(e.to_string()))
}

fn author<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    start(writer, BytesStart::new("author"))?;
    text_element(writer, "name", name)?;
    end(writer, "author")
}

/// 写出只含一个条目的 Atom 订阅源
pub fn write_atom(
    builder: &FeedBuilder,
    entry: &FeedEntry,
    generated_at: DateTime<Utc>,
) -> Result<AtomDocument> {
    let feed_url = builder.feed_url();
    let mut writer = new_writer()?;

    start(
        &mut writer,
        BytesStart::new("feed").with_attributes([("xmlns", ATOM_NS), ("xml:lang", "en")]),
    )?;
    text_element(&mut writer, "title", &builder.title)?;
    text_element(&mut writer, "subtitle", &builder.subtitle)?;
    empty(
        &mut writer,
        BytesStart::new("link").with_attributes([
            ("href", feed_url.as_str()),
            ("rel", "self"),
            ("type", "application/atom+xml"),
        ]),
    )?;
    empty(
        &mut writer,
        BytesStart::new("link").with_attributes([
            ("href", builder.base_url.as_str()),
            ("rel", "alternate"),
            ("type", "text/html"),
        ]),
    )?;
    text_element(&mut writer, "id", &feed_url)?;
    text_element(&mut writer, "updated", &iso_utc(&generated_at))?;
    author(&mut writer, &builder.author)?;
    text_element(&mut writer, "generator", GENERATOR)?;
    if let Some(icon) = builder.icon_url() {
        text_element(&mut writer, "icon", &icon)?;
        text_element(&mut writer, "logo", &icon)?;
    }

    start(&mut writer, BytesStart::new("entry"))?;
    text_element(&mut writer, "title", &entry.title)?;
    empty(
        &mut writer,
        BytesStart::new("link").with_attributes([
            ("href", entry.link.as_str()),
            ("rel", "alternate"),
            ("type", "text/html"),
        ]),
    )?;
    text_element(&mut writer, "id", &entry.id)?;
    text_element(&mut writer, "published", &iso_utc(&entry.published))?;
    text_element(&mut writer, "updated", &iso_utc(&entry.published))?;
    author(&mut writer, &builder.author)?;
    text_element(&mut writer, "summary", &entry.summary)?;
    start(&mut writer, BytesStart::new("content").with_attributes([("type", "html")]))?;
    writer.write_event(Event::Text(BytesText::new(&entry.content_html)))?;
    end(&mut writer, "content")?;
    end(&mut writer, "entry")?;

    end(&mut writer, "feed")?;
    Ok(AtomDocument(finish(writer)?))
}
