//! Structured document model used for previews and document reconstruction

use serde::{Deserialize, Serialize};

/// Ordered sequence of blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub blocks: Vec<Block>,
}

/// A paragraph or a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Paragraph(Paragraph),
    Table(TableBlock),
}

/// Paragraph style tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphStyle {
    /// Heading level 1..=3
    Heading(u8),
    #[default]
    Body,
}

impl ParagraphStyle {
    /// Map a word-processing style id or name ("Heading1", "heading 2", "Title")
    pub fn from_style_name(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        if normalized == "title" {
            return Self::Heading(1);
        }
        match normalized
            .strip_prefix("heading")
            .and_then(|level| level.parse::<u8>().ok())
        {
            Some(level @ 1..=3) => Self::Heading(level),
            _ => Self::Body,
        }
    }

    /// Style id written to documents, if any
    pub fn style_id(&self) -> Option<String> {
        match self {
            Self::Heading(level) => Some(format!("Heading{}", level)),
            Self::Body => None,
        }
    }
}

/// Contiguous span of text sharing the same formatting flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Whether two runs carry identical formatting
    pub fn same_format(&self, other: &Run) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.underline == other.underline
    }
}

/// Paragraph with styled runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(style: ParagraphStyle) -> Self {
        Self {
            style,
            runs: Vec::new(),
        }
    }

    /// Append a run, merging it into the previous one when formatting matches
    pub fn push_run(&mut self, run: Run) {
        if run.text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.same_format(&run) => last.text.push_str(&run.text),
            _ => self.runs.push(run),
        }
    }

    /// Concatenated run text
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

/// Table block; the first row is the header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    pub rows: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_names() {
        assert_eq!(ParagraphStyle::from_style_name("Heading1"), ParagraphStyle::Heading(1));
        assert_eq!(ParagraphStyle::from_style_name("heading 2"), ParagraphStyle::Heading(2));
        assert_eq!(ParagraphStyle::from_style_name("Heading3"), ParagraphStyle::Heading(3));
        assert_eq!(ParagraphStyle::from_style_name("Title"), ParagraphStyle::Heading(1));
        assert_eq!(ParagraphStyle::from_style_name("Heading4"), ParagraphStyle::Body);
        assert_eq!(ParagraphStyle::from_style_name("Normal"), ParagraphStyle::Body);
    }

    #[test]
    fn test_push_run_merges_same_format() {
        let mut p = Paragraph::new(ParagraphStyle::Body);
        p.push_run(Run::plain("Hello "));
        p.push_run(Run::plain("world"));
        p.push_run(Run {
            text: "!".into(),
            bold: true,
            ..Default::default()
        });
        p.push_run(Run::plain(""));

        assert_eq!(p.runs.len(), 2);
        assert_eq!(p.text(), "Hello world!");
        assert!(!p.is_blank());
    }
}
