//! Output formatting for CLI commands.
//!
//! Results are printed either as human-readable text or as a single JSON object.

use anyhow::Result;
use embedref_core::{Embed, KeeperReplacement, KeeperUri, Path, Replacement, S3UploadTarget};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// `data` is serialized in JSON mode; `text_fn` is only called in text mode.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        let mut out = self.stdout.lock();
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(out, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(out, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

/// Pretty-print a document followed by a newline.
pub fn document_text(document: &Value) -> String {
    match serde_json::to_string_pretty(document) {
        Ok(json) => format!("{}\n", json),
        Err(_) => String::new(),
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `embeds` command.
#[derive(Debug, Serialize)]
pub struct EmbedsOutput {
    pub success: bool,
    pub result_code: u8,
    pub embeds: Vec<Embed>,
}

/// Output for commands that only rewrite the document (`strip`).
#[derive(Debug, Serialize)]
pub struct RewriteOutput {
    pub success: bool,
    pub result_code: u8,
    pub rewritten: usize,
    pub document: Value,
}

/// One externalized payload, without its bytes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementInfo {
    pub path: Path,
    pub hash: String,
    pub mimetype: String,
    pub size: usize,
    pub host: String,
    pub bucket: String,
    pub key: String,
    pub s3_url: String,
}

impl From<Replacement> for ReplacementInfo {
    fn from(replacement: Replacement) -> Self {
        Self {
            size: replacement.body.len(),
            path: replacement.path,
            hash: replacement.hash,
            mimetype: replacement.mimetype,
            host: replacement.host,
            bucket: replacement.bucket,
            key: replacement.key,
            s3_url: replacement.s3_url,
        }
    }
}

/// Output for `externalize` command.
#[derive(Debug, Serialize)]
pub struct ExternalizeOutput {
    pub success: bool,
    pub result_code: u8,
    pub replacements: Vec<ReplacementInfo>,
    pub document: Value,
}

/// Output for `keepers` command.
#[derive(Debug, Serialize)]
pub struct KeepersOutput {
    pub success: bool,
    pub result_code: u8,
    pub replacements: Vec<KeeperReplacement>,
    pub document: Value,
}

/// Output for `keeper parse` command.
#[derive(Debug, Serialize)]
pub struct KeeperParseOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub keeper: KeeperUri,
}

/// Output for `keeper build` command.
#[derive(Debug, Serialize)]
pub struct KeeperBuildOutput {
    pub success: bool,
    pub result_code: u8,
    pub uri: String,
}

/// Output for `target` command.
#[derive(Debug, Serialize)]
pub struct TargetOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub target: S3UploadTarget,
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedref_core::{ReplaceOptions, replace_data_urls};
    use serde_json::json;

    #[test]
    fn test_replacement_info_reports_size() {
        let mut document = json!({ "a": "data:text/plain;base64,aGk=" });
        let replacements = replace_data_urls(&mut document, &ReplaceOptions::new("b")).unwrap();
        let info = ReplacementInfo::from(replacements[0].clone());
        assert_eq!(info.size, 2);

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["size"], json!(2));
        assert_eq!(value["path"], json!("a"));
        assert_eq!(value["s3Url"], json!(format!("https://b.s3.amazonaws.com/{}", info.hash)));
        assert!(value.get("body").is_none());
    }

    #[test]
    fn test_target_output_flattens_target() {
        let output = TargetOutput {
            success: true,
            result_code: 0,
            target: S3UploadTarget {
                host: "b.s3.amazonaws.com".to_string(),
                s3_url: "https://b.s3.amazonaws.com/k".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "success": true,
                "result_code": 0,
                "host": "b.s3.amazonaws.com",
                "s3Url": "https://b.s3.amazonaws.com/k",
            })
        );
    }
}
