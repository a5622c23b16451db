#![forbid(unsafe_code)]

//! XML writing for new markup spliced into documents.

use firma_core::Error;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// A minimal element writer over `quick_xml::Writer`.  Attribute values and
/// text are escaped; no indentation is added.
pub struct XmlWriter {
    writer: quick_xml::Writer<Vec<u8>>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            writer: quick_xml::Writer::new(Vec::new()),
        }
    }

    /// Start an element with the given name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        let start = element_start(name, attrs);
        self.write(Event::Start(start))
    }

    /// Write an empty element (self-closing).
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        let start = element_start(name, attrs);
        self.write(Event::Empty(start))
    }

    pub fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    pub fn write_text(&mut self, text: &str) -> Result<(), Error> {
        self.write(Event::Text(BytesText::new(text)))
    }

    /// `<name attrs>text</name>`
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), Error> {
        self.start_element(name, attrs)?;
        if !text.is_empty() {
            self.write_text(text)?;
        }
        self.end_element(name)
    }

    pub fn into_string(self) -> Result<String, Error> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::XmlStructure(format!("writer produced invalid UTF-8: {e}")))
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), Error> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlStructure(format!("XML write failed: {e}")))
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn element_start<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attrs {
        start.push_attribute((*key, *value));
    }
    start
}
