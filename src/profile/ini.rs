//! Minimal INI document that keeps the original file layout.
//!
//! Only what the AWS shared files use is understood: `[section]` headers,
//! `key = value` (or `key: value`) pairs and full-line `#`/`;` comments.
//! Every line is kept verbatim unless [`IniDocument::set`] rewrites it, so a
//! rewrite touches nothing but the values it was asked to change.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Section { name: String, raw: String },
    Entry { key: String, value: String, raw: String },
    Other(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            return Line::Other(raw.to_string());
        }

        if let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return Line::Section {
                name: inner.trim().to_string(),
                raw: raw.to_string(),
            };
        }

        // The earliest delimiter wins so ARNs (`arn:aws:...`) stay intact after `=`.
        let delimiter = trimmed.find(|c: char| c == '=' || c == ':');
        match delimiter {
            Some(idx) => {
                let key = trimmed[..idx].trim();
                if key.is_empty() {
                    return Line::Other(raw.to_string());
                }
                Line::Entry {
                    key: key.to_string(),
                    value: trimmed[idx + 1..].trim().to_string(),
                    raw: raw.to_string(),
                }
            }
            None => Line::Other(raw.to_string()),
        }
    }

    fn raw(&self) -> &str {
        match self {
            Line::Section { raw, .. } | Line::Entry { raw, .. } => raw,
            Line::Other(raw) => raw,
        }
    }
}

/// Parsed INI file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    lines: Vec<Line>,
}

impl IniDocument {
    /// Parse a document. Parsing never fails; unrecognised lines are kept as-is.
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(Line::parse).collect(),
        }
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section_header(section).is_some()
    }

    /// Value of `key` in the first `[section]` block. A key repeated within
    /// the block takes its last value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let (start, end) = self.section_span(section)?;
        self.lines[start..end].iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// All key/value pairs of the first `[section]` block, in file order.
    pub fn entries(&self, section: &str) -> Vec<(&str, &str)> {
        let Some((start, end)) = self.section_span(section) else {
            return Vec::new();
        };
        self.lines[start..end]
            .iter()
            .filter_map(|line| match line {
                Line::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Set `key` in `[section]`, creating the key or the section when missing.
    ///
    /// An existing key is rewritten in place (its last occurrence, the one
    /// [`IniDocument::get`] reads); a new key is placed after the last entry
    /// of the section.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let rendered = format!("{key} = {value}");

        let Some((start, end)) = self.section_span(section) else {
            if self.lines.last().is_some_and(|line| !line.raw().trim().is_empty()) {
                self.lines.push(Line::Other(String::new()));
            }
            self.lines.push(Line::Section {
                name: section.to_string(),
                raw: format!("[{section}]"),
            });
            self.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
                raw: rendered,
            });
            return;
        };

        let existing = (start..end).rev().find(
            |&idx| matches!(&self.lines[idx], Line::Entry { key: k, .. } if k == key),
        );

        let entry = Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
            raw: rendered,
        };

        match existing {
            Some(idx) => self.lines[idx] = entry,
            None => {
                let insert_at = (start..end)
                    .rev()
                    .find(|&idx| matches!(self.lines[idx], Line::Entry { .. }))
                    .map_or(start, |idx| idx + 1);
                self.lines.insert(insert_at, entry);
            }
        }
    }

    fn section_header(&self, section: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| matches!(line, Line::Section { name, .. } if name == section))
    }

    /// Line range holding the body of the first `[section]` block.
    fn section_span(&self, section: &str) -> Option<(usize, usize)> {
        let header = self.section_header(section)?;
        let start = header + 1;
        let end = self.lines[start..]
            .iter()
            .position(|line| matches!(line, Line::Section { .. }))
            .map_or(self.lines.len(), |offset| start + offset);
        Some((start, end))
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.raw())?;
        }
        Ok(())
    }
}
