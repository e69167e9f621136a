//! Upload notifications delivered by the object store, and the names derived
//! from the uploaded object.

use crate::errors::{Result, WorkflowError};
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// A standalone `20xx` token anywhere in the title.
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid year regex"));

#[derive(Deserialize)]
struct S3Event {
    #[serde(rename = "Records")]
    records: Vec<S3EventRecord>,
}

#[derive(Deserialize)]
struct S3EventRecord {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Deserialize)]
struct S3Object {
    key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadNotification {
    pub bucket: String,
    /// Decoded object key
    pub object_key: String,
}

impl UploadNotification {
    /// Builds a notification from the raw, form-encoded object key.
    pub fn new(bucket: impl Into<String>, raw_key: &str) -> Result<Self> {
        Ok(UploadNotification {
            bucket: bucket.into(),
            object_key: decode_key(raw_key)?,
        })
    }

    /// Parses a storage event document. Only the first record is used.
    pub fn from_s3_event(body: &[u8]) -> Result<Self> {
        let event: S3Event = serde_json::from_slice(body)
            .map_err(|e| WorkflowError::Validation(format!("malformed upload event: {e}")))?;

        let record = event
            .records
            .into_iter()
            .next()
            .ok_or_else(|| WorkflowError::Validation("upload event has no records".into()))?;

        Self::new(record.s3.bucket.name, &record.s3.object.key)
    }

    /// File name of the object without its extension.
    pub fn dashboard_title(&self) -> &str {
        let file_name = self
            .object_key
            .rsplit('/')
            .next()
            .unwrap_or(&self.object_key);
        strip_extension(file_name)
    }

    /// Public location of the uploaded object. The key is inserted as decoded.
    pub fn object_url(&self) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, self.object_key)
    }
}

fn decode_key(raw_key: &str) -> Result<String> {
    let plus_decoded = raw_key.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| WorkflowError::Validation(format!("object key is not valid UTF-8: {e}")))
}

// Leading dots belong to the name: ".env" has no extension.
fn strip_extension(file_name: &str) -> &str {
    let stem_start = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name[stem_start..].rfind('.') {
        Some(dot) => &file_name[..stem_start + dot],
        None => file_name,
    }
}

pub fn extract_year(title: &str) -> Option<&str> {
    YEAR_RE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn folder_title(prefix: &str, year: &str) -> String {
    format!("{prefix}{year}")
}
