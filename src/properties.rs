/*!
 * String property sets and their two file encodings.
 *
 * - Text: one `key=value` (or `key:value`, `key value`) pair per logical line,
 *   `#`/`!` comment lines, backslash escapes and line continuations.
 * - XML: a `<properties>` root holding `<entry key="...">value</entry>` elements
 *   and an optional `<comment>`.
 *
 * Text sources are read as UTF-8; characters outside printable ASCII are
 * written back as `\uXXXX` escapes.
 */

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{BufRead, Read, Write};
use std::str::FromStr;

use log::trace;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::ConfigError;

/// Document type written ahead of the XML root element
const XML_DOCTYPE: &str = r#"properties SYSTEM "http://java.sun.com/dtd/properties.dtd""#;

/// A set of string keys mapped to string values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Store `value` under `key`, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Read a text property set from a stream
    pub fn load<R: Read>(mut reader: R) -> Result<Self, ConfigError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        text.parse()
    }

    /// Write the property set in text form, preceded by an optional comment
    /// and a timestamp line
    pub fn store<W: Write>(&self, mut writer: W, comment: Option<&str>) -> Result<(), ConfigError> {
        if let Some(comment) = comment {
            for line in comment.lines() {
                writeln!(writer, "#{}", line)?;
            }
        }
        writeln!(writer, "#{}", chrono::Local::now().format("%a %b %d %H:%M:%S %Z %Y"))?;

        for (key, value) in &self.entries {
            writeln!(writer, "{}={}", escape(key, true), escape(value, false))?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Read an XML property list from a stream
    pub fn load_from_xml<R: BufRead>(reader: R) -> Result<Self, ConfigError> {
        let mut xml = Reader::from_reader(reader);
        let mut buf = Vec::new();
        let mut properties = Properties::new();
        let mut open_entry: Option<(String, String)> = None;
        let mut seen_root = false;

        loop {
            match xml.read_event_into(&mut buf)? {
                Event::Start(element) => match element.name().as_ref() {
                    b"properties" => seen_root = true,
                    b"entry" => open_entry = Some((entry_key(&element)?, String::new())),
                    _ => {}
                },
                Event::Empty(element) => match element.name().as_ref() {
                    b"properties" => seen_root = true,
                    b"entry" => {
                        properties.set(entry_key(&element)?, "");
                    }
                    _ => {}
                },
                Event::Text(text) => {
                    if let Some((_, value)) = open_entry.as_mut() {
                        value.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some((_, value)) = open_entry.as_mut() {
                        value.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::End(element) if element.name().as_ref() == b"entry" => {
                    if let Some((key, value)) = open_entry.take() {
                        trace!("Loaded XML property '{}'", key);
                        properties.set(key, value);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(ConfigError::Xml("missing <properties> root element".to_string()));
        }

        Ok(properties)
    }

    /// Write the property set as an XML property list
    pub fn store_to_xml<W: Write>(&self, writer: W, comment: Option<&str>) -> Result<(), ConfigError> {
        let mut xml = Writer::new_with_indent(writer, b' ', 2);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
        xml.write_event(Event::DocType(BytesText::from_escaped(XML_DOCTYPE)))?;
        xml.write_event(Event::Start(BytesStart::new("properties")))?;

        if let Some(comment) = comment {
            xml.create_element("comment")
                .write_text_content(BytesText::new(comment))?;
        }

        for (key, value) in &self.entries {
            xml.create_element("entry")
                .with_attribute(("key", key.as_str()))
                .write_text_content(BytesText::new(value))?;
        }

        xml.write_event(Event::End(BytesEnd::new("properties")))?;

        let mut writer = xml.into_inner();
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl FromStr for Properties {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut properties = Properties::new();
        let mut lines = split_lines(text).into_iter().enumerate();

        while let Some((index, line)) = lines.next() {
            let line = line.trim_start_matches(is_blank);
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let mut logical = line.to_string();
            while has_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                    None => break,
                }
            }

            let (key, value) = split_pair(&logical);
            let line_number = index + 1;
            properties.set(unescape(key, line_number)?, unescape(value, line_number)?);
        }

        Ok(properties)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn entry_key(element: &BytesStart<'_>) -> Result<String, ConfigError> {
    let attribute = element
        .try_get_attribute("key")?
        .ok_or_else(|| ConfigError::Xml("<entry> without a 'key' attribute".to_string()))?;
    Ok(attribute.unescape_value()?.into_owned())
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// An odd number of trailing backslashes joins the next line
fn has_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line into its raw (still escaped) key and value
fn split_pair(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let mut rest = line[key_end..].trim_start_matches(is_blank);
    if let Some(stripped) = rest.strip_prefix(|c| c == '=' || c == ':') {
        rest = stripped.trim_start_matches(is_blank);
    }

    (&line[..key_end], rest)
}

fn unescape(raw: &str, line: usize) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut units: Vec<u16> = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            let unit = u16::from_str_radix(&hex, 16)
                .ok()
                .filter(|_| hex.len() == 4)
                .ok_or_else(|| ConfigError::Properties {
                    line,
                    message: format!("malformed \\uXXXX escape '\\u{}'", hex),
                })?;
            // Consecutive escapes may form a surrogate pair
            units.push(unit);
            continue;
        }

        flush_utf16(&mut units, &mut out);
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    flush_utf16(&mut units, &mut out);
    Ok(out)
}

/// Decode pending UTF-16 units; unpaired surrogates become U+FFFD
fn flush_utf16(units: &mut Vec<u16>, out: &mut String) {
    for decoded in char::decode_utf16(units.drain(..)) {
        out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
    }
}

/// Split on `\n`, `\r\n` or a lone `\r`
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        match rest.find(|c: char| c == '\r' || c == '\n') {
            Some(i) => {
                lines.push(&rest[..i]);
                let terminator = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[i + terminator..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }

    lines
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());

    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if !(' '..='~').contains(&c) => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    let _ = write!(out, "\\u{:04X}", unit);
                }
            }
            c => out.push(c),
        }
    }

    out
}
