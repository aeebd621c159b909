//! XML helpers: a small builder for OOXML parts and quick-xml readers.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// XML declaration used by every Office Open XML part.
pub const XML_DECLARATION: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

/// Parse an XML string and extract text content of a specific element.
pub fn extract_text(xml: &str, tag_name: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut results = Vec::new();
    let mut in_target = false;
    let mut buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if local_name == tag_name {
                    in_target = true;
                    buf.clear();
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_target {
                    if let Ok(text) = e.unescape() {
                        buf.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if local_name == tag_name && in_target {
                    results.push(buf.clone());
                    in_target = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    results
}

/// Extract attributes of every occurrence of a tag, keyed by local name.
pub fn extract_attributes(xml: &str, tag_name: &str) -> Vec<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut results = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if local_name == tag_name {
                    let mut attrs = HashMap::new();
                    for attr in e.attributes().flatten() {
                        let key =
                            String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        attrs.insert(key, value);
                    }
                    results.push(attrs);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    results
}

/// Simple XML builder for generating the parts of a DOCX package.
pub struct XmlBuilder {
    content: String,
    indent_level: usize,
    indent: bool,
}

impl XmlBuilder {
    pub fn new() -> Self {
        let mut content = String::from(XML_DECLARATION);
        content.push('\n');
        Self {
            content,
            indent_level: 0,
            indent: true,
        }
    }

    /// A builder that emits no indentation or newlines. Used for
    /// `word/document.xml`, which can get large.
    pub fn compact() -> Self {
        Self {
            content: String::from(XML_DECLARATION),
            indent_level: 0,
            indent: false,
        }
    }

    /// A compact builder without the XML declaration, for pieces that are
    /// spliced into a larger part with [`raw`](Self::raw).
    pub fn fragment() -> Self {
        Self {
            content: String::new(),
            indent_level: 0,
            indent: false,
        }
    }

    pub fn open_tag(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.indent();
        self.content.push('<');
        self.content.push_str(name);
        self.push_attrs(attrs);
        self.content.push('>');
        self.newline();
        self.indent_level += 1;
        self
    }

    pub fn close_tag(&mut self, name: &str) -> &mut Self {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.indent();
        self.content.push_str("</");
        self.content.push_str(name);
        self.content.push('>');
        self.newline();
        self
    }

    pub fn empty_tag(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.indent();
        self.content.push('<');
        self.content.push_str(name);
        self.push_attrs(attrs);
        self.content.push_str("/>");
        self.newline();
        self
    }

    pub fn text_element(&mut self, name: &str, text: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.indent();
        self.content.push('<');
        self.content.push_str(name);
        self.push_attrs(attrs);
        self.content.push('>');
        self.content.push_str(&escape_xml_text(text));
        self.content.push_str("</");
        self.content.push_str(name);
        self.content.push('>');
        self.newline();
        self
    }

    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.content.push_str(text);
        self
    }

    pub fn build(self) -> String {
        self.content
    }

    fn push_attrs(&mut self, attrs: &[(&str, &str)]) {
        for (key, value) in attrs {
            self.content.push(' ');
            self.content.push_str(key);
            self.content.push_str("=\"");
            self.content.push_str(&escape_xml_attr(value));
            self.content.push('"');
        }
    }

    fn indent(&mut self) {
        if !self.indent {
            return;
        }
        for _ in 0..self.indent_level {
            self.content.push_str("  ");
        }
    }

    fn newline(&mut self) {
        if self.indent {
            self.content.push('\n');
        }
    }
}

impl Default for XmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop characters XML 1.0 does not allow (C0 controls other than tab,
/// newline and carriage return). PDF text extraction produces them often.
fn strip_invalid_chars(s: &str) -> std::borrow::Cow<'_, str> {
    let invalid = |c: char| {
        (c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')) || matches!(c, '\u{FFFE}' | '\u{FFFF}')
    };
    if s.chars().any(invalid) {
        std::borrow::Cow::Owned(s.chars().filter(|&c| !invalid(c)).collect())
    } else {
        std::borrow::Cow::Borrowed(s)
    }
}

/// Escape special characters in XML text content.
pub fn escape_xml_text(s: &str) -> String {
    strip_invalid_chars(s)
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape special characters in XML attribute values.
pub fn escape_xml_attr(s: &str) -> String {
    strip_invalid_chars(s)
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
