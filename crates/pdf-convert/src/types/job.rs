//! Conversion job and output format types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Requested output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Editable word-processing document (.docx)
    #[serde(rename = "docx")]
    Document,
    /// Comma-separated values (.csv)
    #[serde(rename = "csv")]
    Csv,
    /// Single-sheet workbook (.xlsx)
    #[serde(rename = "xlsx")]
    Spreadsheet,
}

impl OutputFormat {
    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Document => "docx",
            Self::Csv => "csv",
            Self::Spreadsheet => "xlsx",
        }
    }

    /// Detect format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "docx" => Some(Self::Document),
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Detect format from a stored artifact name
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim()).ok_or_else(|| Error::invalid_input("Invalid format"))
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A single conversion request. Only the files it names outlive it.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Unique token salting every file name of this job
    pub token: String,
    /// Sanitized name of the uploaded file
    pub original_filename: String,
    /// Requested output format
    pub format: OutputFormat,
    /// Where the uploaded PDF is stored
    pub upload_path: PathBuf,
    /// Where the converted artifact is stored
    pub output_path: PathBuf,
}

impl ConversionJob {
    /// Create a job with a fresh token for the given upload
    pub fn new(
        filename: &str,
        format: OutputFormat,
        uploads_dir: &Path,
        converted_dir: &Path,
    ) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        let original_filename = secure_filename(filename);
        let output_filename = output_filename_for(&original_filename, format);

        Self {
            upload_path: uploads_dir.join(format!("{}_{}", token, original_filename)),
            output_path: converted_dir.join(format!("{}_{}", token, output_filename)),
            token,
            original_filename,
            format,
        }
    }

    /// User-facing name of the converted file, e.g. `report.csv`
    pub fn output_filename(&self) -> String {
        output_filename_for(&self.original_filename, self.format)
    }

    /// Stored artifact name, e.g. `{token}_report.csv`
    pub fn artifact_name(&self) -> String {
        format!("{}_{}", self.token, self.output_filename())
    }
}

fn output_filename_for(original: &str, format: OutputFormat) -> String {
    let stem = Path::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    format!("{}.{}", stem, format.extension())
}

/// Reduce an uploaded file name to a safe, flat ASCII name
pub fn secure_filename(filename: &str) -> String {
    // Browsers on Windows may send the full client path
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            cleaned.push(c);
        } else if c.is_whitespace() {
            cleaned.push('_');
        }
    }

    let cleaned = cleaned.trim_start_matches(['.', '_']).to_string();
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}
