//! Assembly of the final dump script.

use std::fmt;

/// Accumulates rendered sections in generation order.
#[derive(Debug)]
pub struct DocumentBuilder {
    buffer: String,
}

impl DocumentBuilder {
    /// Starts a document with the generator banner.
    ///
    /// The banner carries no trailing newline; every rendered section opens
    /// with its own blank line.
    pub fn with_banner(tool: &str, version: &str, timestamp: &str) -> Self {
        let buffer = format!("--\n-- Generated by {tool} {version}\n-- Date: {timestamp}\n--");
        Self { buffer }
    }

    /// Appends one rendered section verbatim.
    pub fn push_section(&mut self, section: &str) {
        self.buffer.push_str(section);
    }

    pub fn finish(self) -> ExportDocument {
        ExportDocument { text: self.buffer }
    }
}

/// The completed dump script, immutable once assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    text: String,
}

impl ExportDocument {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for ExportDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
