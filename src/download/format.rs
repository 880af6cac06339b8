//! Column output formats and the bitmask over them.

use std::fmt;

use crate::error::{Error, Result};

/// A single column output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Rendered page as PDF.
    Document,
    /// Article text as Markdown.
    Text,
    /// Narration audio as MP3.
    Audio,
}

impl Format {
    /// All formats, in bit order.
    pub const ALL: [Format; 3] = [Format::Document, Format::Text, Format::Audio];

    /// Bit of this format inside a [`FormatMask`].
    pub const fn bit(self) -> u8 {
        match self {
            Format::Document => 1,
            Format::Text => 2,
            Format::Audio => 4,
        }
    }

    /// File suffix including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Document => ".pdf",
            Format::Text => ".md",
            Format::Audio => ".mp3",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Document => write!(f, "document"),
            Format::Text => write!(f, "text"),
            Format::Audio => write!(f, "audio"),
        }
    }
}

/// Set of column formats, either requested or already present on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatMask(u8);

impl FormatMask {
    pub const EMPTY: FormatMask = FormatMask(0);
    pub const DOCUMENT: FormatMask = FormatMask(Format::Document.bit());
    pub const TEXT: FormatMask = FormatMask(Format::Text.bit());
    pub const AUDIO: FormatMask = FormatMask(Format::Audio.bit());
    pub const ALL: FormatMask = FormatMask(7);

    /// Mask from raw bits; bits outside the three formats are dropped.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        FormatMask(bits & Self::ALL.0)
    }

    /// Validate a user-requested mask: at least one format, nothing unknown.
    pub fn parse_requested(bits: u8) -> Result<Self> {
        if bits == 0 || bits > Self::ALL.0 {
            return Err(Error::validation(
                "output",
                format!(
                    "Output must be between 1 and 7 (1 pdf, 2 markdown, 4 audio), got {}",
                    bits
                ),
            ));
        }
        Ok(FormatMask(bits))
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, format: Format) -> bool {
        self.0 & format.bit() != 0
    }

    pub fn insert(&mut self, format: Format) {
        self.0 |= format.bit();
    }

    pub const fn wants_document(self) -> bool {
        self.contains(Format::Document)
    }

    pub const fn wants_text(self) -> bool {
        self.contains(Format::Text)
    }

    pub const fn wants_audio(self) -> bool {
        self.contains(Format::Audio)
    }

    /// Formats in this mask, in bit order.
    pub fn formats(self) -> impl Iterator<Item = Format> {
        Format::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl From<Format> for FormatMask {
    fn from(format: Format) -> Self {
        FormatMask(format.bit())
    }
}

impl fmt::Display for FormatMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.formats().map(|f| f.to_string()).collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}

/// Formats still to produce: requested and not yet on disk.
pub const fn missing(requested: FormatMask, existing: FormatMask) -> FormatMask {
    FormatMask(requested.0 & !existing.0 & FormatMask::ALL.0)
}
