//! Event-driven XML scanning.
//!
//! Scanners are small state machines fed with element-start, text and
//! element-end events. The same scanner can be driven from an in-memory
//! document or from a network byte stream, chunk by chunk.

use std::{io, pin::Pin};

use bytes::Bytes;
use futures::Stream;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use tokio_util::io::StreamReader;

use crate::error::LookupError;

/// Response body as it arrives from the network.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Consumer of XML events that produces a value once the document ends.
pub trait XmlScanner {
    /// Value produced at the end of the document.
    type Output;

    /// An element opened. Self-closing elements are reported as a start
    /// immediately followed by an end.
    fn start(&mut self, element: &BytesStart<'_>);

    /// Text content of the innermost open element.
    fn text(&mut self, _text: &str) {}

    /// An element closed.
    fn end(&mut self, name: &[u8]);

    /// The document ended.
    fn finish(self) -> Self::Output;
}

/// Read an attribute value by name.
pub fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

/// Scan a complete document held in memory.
pub fn scan_str<S: XmlScanner>(document: &str, mut scanner: S) -> Result<S::Output, LookupError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);
    loop {
        let event = reader.read_event()?;
        if !dispatch(&mut scanner, event)? {
            break;
        }
    }
    Ok(scanner.finish())
}

/// Scan a document while it streams in.
pub async fn scan_stream<S: XmlScanner>(
    body: ByteStream,
    mut scanner: S,
) -> Result<S::Output, LookupError> {
    let mut reader = Reader::from_reader(StreamReader::new(body));
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into_async(&mut buf).await?;
        if !dispatch(&mut scanner, event)? {
            break;
        }
        buf.clear();
    }
    Ok(scanner.finish())
}

/// Forward one event; returns `false` once the document is exhausted.
fn dispatch<S: XmlScanner>(scanner: &mut S, event: Event<'_>) -> Result<bool, LookupError> {
    match event {
        Event::Start(element) => scanner.start(&element),
        Event::Empty(element) => {
            scanner.start(&element);
            scanner.end(element.name().as_ref());
        }
        Event::Text(text) => {
            let text = text.unescape().map_err(quick_xml::Error::from)?;
            scanner.text(&text);
        }
        Event::CData(data) => scanner.text(&String::from_utf8_lossy(&data)),
        Event::End(element) => scanner.end(element.name().as_ref()),
        Event::Eof => return Ok(false),
        _ => {}
    }
    Ok(true)
}
