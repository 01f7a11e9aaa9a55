//! Export formats and delivery of export payloads
//!
//! An export is materialized as an [`ExportArtifact`] (file name, content
//! type, body) and handed to an [`ExportSink`]. Sinks are the only place
//! where exported data leaves the process; swap [`FileSink`] for an upload
//! or any other persistence without touching the recorder.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, ResultExt, ShopSenseError};

use super::recorder::SessionRecorder;

/// Prefix of generated export file names
pub const DEFAULT_FILE_PREFIX: &str = "experiment-data";

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Full structured report
    #[default]
    Json,
    /// Summary rows
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ShopSenseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ShopSenseError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A named payload ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Destination for export payloads
pub trait ExportSink {
    /// Persist `payload` under `name`
    fn emit(&mut self, name: &str, content_type: &str, payload: &[u8]) -> Result<()>;
}

/// Writes payloads as files in a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for FileSink {
    fn emit(&mut self, name: &str, content_type: &str, payload: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create export directory {:?}", self.dir))?;

        let path = self.dir.join(name);
        fs::write(&path, payload).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Exported {} ({}, {} bytes)", path.display(), content_type, payload.len());
        Ok(())
    }
}

/// A payload captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedPayload {
    pub name: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

/// Keeps payloads in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub emitted: Vec<EmittedPayload>,
}

impl ExportSink for MemorySink {
    fn emit(&mut self, name: &str, content_type: &str, payload: &[u8]) -> Result<()> {
        self.emitted.push(EmittedPayload {
            name: name.to_string(),
            content_type: content_type.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

impl SessionRecorder {
    /// Default file stem: `experiment-data-<sessionId>`
    pub fn default_file_stem(&self) -> String {
        format!("{}-{}", DEFAULT_FILE_PREFIX, self.session_id())
    }

    /// Build an export artifact, JSON pretty-printed
    ///
    /// Unsupported formats are logged and produce `None`.
    pub fn export_artifact(&self, format: &str, file_stem: Option<&str>) -> Option<ExportArtifact> {
        self.build_artifact(format, file_stem, true)
    }

    /// Export and deliver through `sink`
    ///
    /// Returns the delivered file name, or `None` when the format is not
    /// supported. Sink failures are returned as errors.
    pub fn download(
        &self,
        format: &str,
        file_stem: Option<&str>,
        sink: &mut dyn ExportSink,
    ) -> Result<Option<String>> {
        self.download_as(format, file_stem, true, sink)
    }

    /// Like [`download`](Self::download) with control over JSON layout
    pub fn download_as(
        &self,
        format: &str,
        file_stem: Option<&str>,
        pretty: bool,
        sink: &mut dyn ExportSink,
    ) -> Result<Option<String>> {
        let Some(artifact) = self.build_artifact(format, file_stem, pretty) else {
            return Ok(None);
        };

        sink.emit(&artifact.file_name, artifact.content_type, artifact.body.as_bytes())?;
        Ok(Some(artifact.file_name))
    }

    fn build_artifact(
        &self,
        format: &str,
        file_stem: Option<&str>,
        pretty: bool,
    ) -> Option<ExportArtifact> {
        let format = match format.parse::<ExportFormat>() {
            Ok(format) => format,
            Err(e) => {
                tracing::error!("{}", e);
                return None;
            }
        };

        let body = match format {
            ExportFormat::Json => match self.export_serialized(pretty) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize session {}: {}", self.session_id(), e);
                    return None;
                }
            },
            ExportFormat::Csv => self.export_summary_csv(),
        };

        let stem = file_stem
            .map(str::to_string)
            .unwrap_or_else(|| self.default_file_stem());

        Some(ExportArtifact {
            file_name: format!("{}.{}", stem, format.extension()),
            content_type: format.content_type(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn recorder() -> SessionRecorder {
        SessionRecorder::new(SessionConfig::new("P01").with_session_id("S42"))
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(" CSV ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ShopSenseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_artifact_names() {
        let recorder = recorder();
        let json = recorder.export_artifact("json", None).unwrap();
        assert_eq!(json.file_name, "experiment-data-S42.json");
        assert_eq!(json.content_type, "application/json");

        let csv = recorder.export_artifact("csv", Some("p01-run2")).unwrap();
        assert_eq!(csv.file_name, "p01-run2.csv");
        assert!(csv.body.starts_with("Category,Metric,Value"));
    }

    #[test]
    fn test_unsupported_format_yields_nothing() {
        let recorder = recorder();
        let mut sink = MemorySink::default();
        assert!(recorder.export_artifact("xlsx", None).is_none());
        assert_eq!(recorder.download("xlsx", None, &mut sink).unwrap(), None);
        assert!(sink.emitted.is_empty());
    }

    #[test]
    fn test_memory_sink_download() {
        let recorder = recorder();
        let mut sink = MemorySink::default();
        let name = recorder.download("json", None, &mut sink).unwrap();

        assert_eq!(name.as_deref(), Some("experiment-data-S42.json"));
        assert_eq!(sink.emitted.len(), 1);
        assert_eq!(sink.emitted[0].content_type, "application/json");
        let parsed: serde_json::Value = serde_json::from_slice(&sink.emitted[0].payload).unwrap();
        assert_eq!(parsed["metadata"]["sessionId"], "S42");
    }

    #[test]
    fn test_file_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let mut sink = FileSink::new(&out);

        let recorder = recorder();
        recorder.download("csv", None, &mut sink).unwrap();

        let written = fs::read_to_string(out.join("experiment-data-S42.csv")).unwrap();
        assert!(written.contains("Metadata,SessionID,S42"));
    }

    #[test]
    fn test_compact_download() {
        let recorder = recorder();
        let mut sink = MemorySink::default();
        recorder.download_as("json", Some("compact"), false, &mut sink).unwrap();

        let body = String::from_utf8(sink.emitted[0].payload.clone()).unwrap();
        assert!(!body.contains('\n'));
        let parsed = crate::session::StructuredReport::from_json(&body).unwrap();
        assert_eq!(parsed.metadata.session_id, "S42");
    }
}
