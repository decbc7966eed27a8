//! # XML Reading and Writing
//!
//! Repository documents (`maven-metadata.xml`, `archetype-catalog.xml`,
//! POMs) are small, element-only XML. This module writes them with stable
//! two-space indentation and reads them into a plain element tree.
//!
//! The reader ignores attributes, namespaces prefixes, comments, processing
//! instructions and DOCTYPE declarations; it decodes the predefined entities,
//! numeric character references and CDATA sections.

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Indenting writer for element-only documents.
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
    open: Vec<String>,
}

impl XmlWriter {
    /// Start a document with the standard declaration.
    pub fn new() -> Self {
        Self {
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            open: Vec::new(),
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.open.len() {
            self.out.push_str("  ");
        }
    }

    /// Open an element.
    pub fn start(&mut self, tag: &str) -> &mut Self {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push_str(">\n");
        self.open.push(tag.to_string());
        self
    }

    /// Close the innermost open element.
    pub fn end(&mut self) -> &mut Self {
        if let Some(tag) = self.open.pop() {
            self.indent();
            self.out.push_str("</");
            self.out.push_str(&tag);
            self.out.push_str(">\n");
        }
        self
    }

    /// Write `<tag>value</tag>`.
    pub fn text(&mut self, tag: &str, value: &str) -> &mut Self {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.out.push_str(&escape(value));
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
        self
    }

    /// Write `<tag>value</tag>` when the value is present.
    pub fn opt_text(&mut self, tag: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.text(tag, value);
        }
        self
    }

    /// Close any open elements and return the document.
    pub fn finish(mut self) -> String {
        while !self.open.is_empty() {
            self.end();
        }
        self.out
    }
}

/// Escape text content.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// An element with its text content and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name (namespace prefix removed).
    pub name: String,
    /// Concatenated, entity-decoded character data directly inside this element.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child with the given name, if non-empty.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Follow a path of child names.
    pub fn descend(&self, path: &[&str]) -> Option<&Element> {
        let mut current = self;
        for name in path {
            current = current.child(name)?;
        }
        Some(current)
    }
}

/// Parse a document and return its root element.
pub fn parse(document: &str, input: &str) -> Result<Element, StoreError> {
    let mut parser = Parser {
        document,
        input: input.trim_start_matches('\u{feff}'),
        pos: 0,
    };
    parser.skip_prolog()?;
    let root = parser.element()?;
    Ok(root)
}

struct Parser<'a> {
    document: &'a str,
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn err(&self, reason: impl Into<String>) -> StoreError {
        StoreError::invalid_document(self.document, format!("{} at byte {}", reason.into(), self.pos))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn skip_past(&mut self, terminator: &str) -> Result<(), StoreError> {
        match self.rest().find(terminator) {
            Some(index) => {
                self.pos += index + terminator.len();
                Ok(())
            }
            None => Err(self.err(format!("unterminated construct, expected {terminator:?}"))),
        }
    }

    /// Skip declarations, comments and DOCTYPE before the root element.
    fn skip_prolog(&mut self) -> Result<(), StoreError> {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<!") {
                self.skip_past(">")?;
            } else if rest.starts_with('<') {
                return Ok(());
            } else {
                return Err(self.err("expected root element"));
            }
        }
    }

    fn element(&mut self) -> Result<Element, StoreError> {
        if !self.rest().starts_with('<') {
            return Err(self.err("expected '<'"));
        }
        self.pos += 1;
        let tag_end = self
            .rest()
            .find('>')
            .ok_or_else(|| self.err("unterminated start tag"))?;
        let tag = &self.rest()[..tag_end];
        self.pos += tag_end + 1;

        let self_closing = tag.ends_with('/');
        let tag = tag.trim_end_matches('/');
        let qualified = tag.split_whitespace().next().unwrap_or_default();
        if qualified.is_empty() {
            return Err(self.err("empty tag name"));
        }
        let mut element = Element {
            name: local_name(qualified).to_string(),
            ..Element::default()
        };
        if self_closing {
            return Ok(element);
        }

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.err(format!("unclosed element <{qualified}>")));
            }
            if rest.starts_with("</") {
                let close_end = rest.find('>').ok_or_else(|| self.err("unterminated end tag"))?;
                let closing = rest[2..close_end].trim();
                if closing != qualified {
                    return Err(self.err(format!(
                        "mismatched end tag </{closing}> for <{qualified}>"
                    )));
                }
                self.pos += close_end + 1;
                return Ok(element);
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let end = self
                    .rest()
                    .find("]]>")
                    .ok_or_else(|| self.err("unterminated CDATA"))?;
                element.text.push_str(&self.rest()[..end]);
                self.pos += end + 3;
            } else if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with('<') {
                let child = self.element()?;
                element.children.push(child);
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                element.text.push_str(&decode_entities(&rest[..end]));
                self.pos += end;
            }
        }
    }
}

fn local_name(qualified: &str) -> &str {
    match qualified.rfind(':') {
        Some(index) => &qualified[index + 1..],
        None => qualified,
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let Some(semi) = after.find(';') else {
            out.push_str(after);
            return out;
        };
        let entity = &after[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => entity[1..].parse().ok().and_then(char::from_u32),
            _ => None,
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&after[..=semi]),
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_indents_and_escapes() {
        let mut w = XmlWriter::new();
        w.start("metadata").text("groupId", "a&b").start("versioning");
        w.text("latest", "1.0");
        let xml = w.finish();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <metadata>\n  <groupId>a&amp;b</groupId>\n  <versioning>\n    \
             <latest>1.0</latest>\n  </versioning>\n</metadata>\n"
        );
    }

    #[test]
    fn reader_handles_prolog_comments_and_namespaces() {
        let doc = r#"<?xml version="1.0"?>
<!-- generated -->
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="x">
  <modelVersion>4.0.0</modelVersion>
  <!-- inline comment -->
  <name>Tom &amp; Jerry &#x41;&#66;</name>
  <description><![CDATA[<b>bold</b>]]></description>
  <empty/>
</project>"#;
        let root = parse("pom", doc).unwrap();
        assert_eq!(root.name, "project");
        assert_eq!(root.child_text("modelVersion").as_deref(), Some("4.0.0"));
        assert_eq!(root.child_text("name").as_deref(), Some("Tom & Jerry AB"));
        assert_eq!(root.child_text("description").as_deref(), Some("<b>bold</b>"));
        assert!(root.child("empty").is_some());
        assert!(root.child_text("empty").is_none());
    }

    #[test]
    fn reader_rejects_mismatched_tags() {
        let err = parse("metadata", "<a><b></a></b>").unwrap_err();
        assert!(err.to_string().contains("mismatched"));
    }

    #[test]
    fn reader_rejects_truncated_document() {
        assert!(parse("metadata", "<metadata><versioning>").is_err());
        assert!(parse("metadata", "not xml").is_err());
    }

    #[test]
    fn descend_follows_paths() {
        let root = parse("x", "<a><b><c>deep</c></b></a>").unwrap();
        assert_eq!(root.descend(&["b", "c"]).map(|e| e.text.as_str()), Some("deep"));
        assert!(root.descend(&["b", "missing"]).is_none());
    }

    #[test]
    fn unknown_entities_are_kept_verbatim() {
        assert_eq!(decode_entities("a &nbsp; b"), "a &nbsp; b");
        assert_eq!(decode_entities("trailing &amp"), "trailing &amp");
    }
}
