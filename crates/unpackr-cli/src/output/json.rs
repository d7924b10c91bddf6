//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use unpackr_core::ExtractionResult;

pub struct JsonFormatter;

#[derive(Debug, Serialize)]
struct ExtractionOutput {
    archive: String,
    output_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    files_extracted: usize,
    directories_created: usize,
    entries_skipped: usize,
    bytes_written: u64,
    volumes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    truncated: bool,
    duration_ms: u128,
    warnings: Vec<String>,
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }

    fn entry(result: &ExtractionResult) -> JsonOutput<ExtractionOutput> {
        let report = &result.report;
        let data = ExtractionOutput {
            archive: result.job.source.display().to_string(),
            output_dir: result.job.output_dir.display().to_string(),
            format: report.format.map(|f| f.to_string()),
            files_extracted: report.files_extracted(),
            directories_created: report.directories_created,
            entries_skipped: report.entries_skipped,
            bytes_written: report.bytes_written,
            volumes: report
                .volumes
                .iter()
                .map(|v| v.display().to_string())
                .collect(),
            password: report.password.map(|p| p.to_string()),
            truncated: report.truncated,
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        };

        match &result.error {
            None => JsonOutput::success("extract", data),
            Some(error) => JsonOutput::failure("extract", data, error.to_string()),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_results(&self, results: &[ExtractionResult]) -> Result<()> {
        let entries: Vec<_> = results.iter().map(Self::entry).collect();
        Self::output(&entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use unpackr_core::ExtractionError;
    use unpackr_core::ExtractionJob;
    use unpackr_core::ExtractionReport;
    use unpackr_core::PasswordUsed;

    #[test]
    fn test_success_entry_structure() {
        let mut report = ExtractionReport::new();
        report.bytes_written = 10;
        report.password = Some(PasswordUsed { index: 2, total: 2 });
        let result = ExtractionResult {
            job: ExtractionJob::new("a.rar", "out"),
            report,
            error: None,
        };

        let json = serde_json::to_value(JsonFormatter::entry(&result)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["archive"], "a.rar");
        assert_eq!(json["data"]["bytes_written"], 10);
        assert_eq!(json["data"]["password"], "password 2 of 2");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_entry_structure() {
        let result = ExtractionResult {
            job: ExtractionJob::new("b.zip", "out"),
            report: ExtractionReport::new(),
            error: Some(ExtractionError::NoCompressedFiles {
                path: "b.zip".into(),
            }),
        };

        let json = serde_json::to_value(JsonFormatter::entry(&result)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "no compressed files found in b.zip");
        assert_eq!(json["data"]["files_extracted"], 0);
    }
}
