//! Response types for the HTTP surface

use serde::{Deserialize, Serialize};

use super::job::{ConversionJob, OutputFormat};

/// Successful conversion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResponse {
    /// User-facing output filename, e.g. `report.csv`
    pub filename: String,
    /// Absolute URL serving the artifact as an attachment
    pub download_url: String,
    /// Absolute URL serving the HTML preview
    pub preview_url: String,
    /// Output format
    pub format: OutputFormat,
}

impl ConvertResponse {
    /// Build the response for a finished job using the given base URL
    pub fn for_job(job: &ConversionJob, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let artifact = job.artifact_name();
        Self {
            filename: job.output_filename(),
            download_url: format!("{}/download/{}", base, artifact),
            preview_url: format!("{}/preview_output/{}", base, artifact),
            format: job.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_response_urls() {
        let job = ConversionJob::new(
            "report.pdf",
            OutputFormat::Csv,
            Path::new("up"),
            Path::new("out"),
        );
        let response = ConvertResponse::for_job(&job, "http://localhost:5000/");

        assert_eq!(response.filename, "report.csv");
        assert_eq!(
            response.download_url,
            format!("http://localhost:5000/download/{}_report.csv", job.token)
        );
        assert_eq!(
            response.preview_url,
            format!("http://localhost:5000/preview_output/{}_report.csv", job.token)
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["format"], "csv");
    }
}
