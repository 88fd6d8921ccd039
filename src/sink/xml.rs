//! XML marshalling of the output document.
//!
//! Start URLs and selector ids land in attributes (`url=`, `key=`) rather
//! than element names, since neither is a valid XML name in general:
//!
//! ```xml
//! <document>
//!  <page url="http://x/">
//!   <entry key="title">Hello</entry>
//!   <entry key="links"><item>http://x/a</item></entry>
//!  </page>
//! </document>
//! ```

use crate::error::ScrapeError;
use crate::sink::Document;
use crate::value::Value;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt::Display;
use std::io::Cursor;

pub fn empty_document() -> String {
    "<document/>".to_string()
}

fn marshal_err(e: impl Display) -> ScrapeError {
    ScrapeError::Sink(format!("xml marshalling: {e}"))
}

pub fn document_to_xml(document: &Document) -> Result<String, ScrapeError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 1);

    writer
        .write_event(Event::Start(BytesStart::new("document")))
        .map_err(marshal_err)?;
    for (url, output) in document {
        let mut page = BytesStart::new("page");
        page.push_attribute(("url", url.as_str()));
        writer.write_event(Event::Start(page)).map_err(marshal_err)?;
        write_value(&mut writer, output)?;
        writer
            .write_event(Event::End(BytesEnd::new("page")))
            .map_err(marshal_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("document")))
        .map_err(marshal_err)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(marshal_err)
}

fn write_value(writer: &mut Writer<Cursor<Vec<u8>>>, value: &Value) -> Result<(), ScrapeError> {
    match value {
        Value::Text(s) => {
            writer
                .write_event(Event::Text(BytesText::new(s)))
                .map_err(marshal_err)?;
        }
        Value::List(items) => {
            for item in items {
                writer
                    .write_event(Event::Start(BytesStart::new("item")))
                    .map_err(marshal_err)?;
                write_value(writer, item)?;
                writer
                    .write_event(Event::End(BytesEnd::new("item")))
                    .map_err(marshal_err)?;
            }
        }
        Value::Map(entries) => {
            for (key, entry) in entries {
                let mut start = BytesStart::new("entry");
                start.push_attribute(("key", key.as_str()));
                writer.write_event(Event::Start(start)).map_err(marshal_err)?;
                write_value(writer, entry)?;
                writer
                    .write_event(Event::End(BytesEnd::new("entry")))
                    .map_err(marshal_err)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_document() {
        let xml = document_to_xml(&Document::new()).unwrap();
        assert!(xml.starts_with("<document>"));
        assert!(xml.trim_end().ends_with("</document>"));
    }

    #[test]
    fn test_nested_maps_and_lists() {
        let mut table = BTreeMap::new();
        table.insert(
            "header".to_string(),
            Value::list_of(vec!["h1".into(), "h2".into()]),
        );
        let mut output = BTreeMap::new();
        output.insert("t".to_string(), Value::Map(table));
        let mut document = Document::new();
        document.insert("http://x/".to_string(), Value::Map(output));

        let xml = document_to_xml(&document).unwrap();
        assert!(xml.contains(r#"<entry key="t">"#));
        assert!(xml.contains(r#"<entry key="header">"#));
        assert!(xml.contains("<item>h1</item>"));
    }

    #[test]
    fn test_attribute_escaping() {
        let mut document = Document::new();
        document.insert(
            "http://x/?a=1&b=2".to_string(),
            Value::Map(BTreeMap::new()),
        );
        let xml = document_to_xml(&document).unwrap();
        assert!(xml.contains(r#"url="http://x/?a=1&amp;b=2""#));
    }
}
