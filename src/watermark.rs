// ABOUTME: Export watermark persisted as `_timestamp.txt` in the export directory
// ABOUTME: Decides which remote documents changed since the last completed run

use crate::storage::{write_atomic, ExportPaths};
use crate::{DocumentSummary, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use tracing::{info, warn};

const WATERMARK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Reads the previous run's watermark. A missing or unreadable file means
/// "export everything" and yields the Unix epoch.
pub fn read_watermark(paths: &ExportPaths) -> DateTime<Utc> {
    let content = match fs::read_to_string(&paths.watermark_file) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(
                path = %paths.watermark_file.display(),
                "no watermark found, exporting every document"
            );
            return DateTime::UNIX_EPOCH;
        }
        Err(e) => {
            warn!(
                path = %paths.watermark_file.display(),
                error = %e,
                "cannot read watermark, exporting every document"
            );
            return DateTime::UNIX_EPOCH;
        }
    };

    match parse_watermark(content.trim()) {
        Some(ts) => {
            info!(watermark = %format_watermark(ts), "read watermark");
            ts
        }
        None => {
            warn!(
                value = %content.trim(),
                "unparsable watermark, exporting every document"
            );
            DateTime::UNIX_EPOCH
        }
    }
}

pub fn write_watermark(paths: &ExportPaths, timestamp: DateTime<Utc>) -> Result<()> {
    let value = format_watermark(timestamp);
    write_atomic(&paths.watermark_file, value.as_bytes())?;
    info!(watermark = %value, "wrote watermark");
    Ok(())
}

/// A document qualifies when either its metadata or its body changed after
/// the watermark.
pub fn qualifies(doc: &DocumentSummary, watermark: DateTime<Utc>) -> bool {
    doc.updated_at > watermark || doc.content_updated_at.is_some_and(|ts| ts > watermark)
}

pub fn format_watermark(timestamp: DateTime<Utc>) -> String {
    timestamp.format(WATERMARK_FORMAT).to_string()
}

fn parse_watermark(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
