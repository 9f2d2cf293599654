//! Turn grader attachments into file bytes.
//!
//! Only inline `data:<mime>;base64,<payload>` URIs are materialized. Remote
//! URLs are accepted by the request schema but not fetched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pagesmith_common::Attachment;
use regex::Regex;

static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(?P<mime>[\w/+.-]+);base64,(?P<b64>[A-Za-z0-9+/=]+)$")
        .expect("data URI pattern is valid")
});

/// What happened to one attachment.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodedAttachment {
    Decoded { name: String, bytes: Vec<u8> },
    Skipped { name: String, reason: SkipReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingName,
    MalformedDataUri,
    InvalidBase64,
    RemoteUrl,
    /// Empty, `.` or `..` path segment; the name would not map to one repo path.
    UnsafeName,
}

/// Classify a single attachment without failing.
pub fn decode_attachment(attachment: &Attachment) -> DecodedAttachment {
    let name = attachment.name.as_str();
    if name.trim().is_empty() {
        return DecodedAttachment::Skipped {
            name: String::new(),
            reason: SkipReason::MissingName,
        };
    }
    let skipped = |reason| DecodedAttachment::Skipped {
        name: name.to_string(),
        reason,
    };

    if !is_safe_path(name) {
        return skipped(SkipReason::UnsafeName);
    }
    if !attachment.url.starts_with("data:") {
        return skipped(SkipReason::RemoteUrl);
    }
    let Some(caps) = DATA_URI_RE.captures(&attachment.url) else {
        return skipped(SkipReason::MalformedDataUri);
    };
    match STANDARD.decode(&caps["b64"]) {
        Ok(bytes) => DecodedAttachment::Decoded {
            name: name.to_string(),
            bytes,
        },
        Err(_) => skipped(SkipReason::InvalidBase64),
    }
}

fn is_safe_path(name: &str) -> bool {
    name.split('/')
        .all(|segment| !matches!(segment, "" | "." | ".."))
}

/// Decode every usable attachment into `{filename: bytes}`.
///
/// Later entries with the same name replace earlier ones.
pub fn decode_attachments(attachments: &[Attachment]) -> BTreeMap<String, Vec<u8>> {
    attachments
        .iter()
        .map(decode_attachment)
        .fold(BTreeMap::new(), |mut out, outcome| {
            match outcome {
                DecodedAttachment::Decoded { name, bytes } => {
                    out.insert(name, bytes);
                }
                DecodedAttachment::Skipped { name, reason } => {
                    tracing::debug!(attachment = %name, ?reason, "skipping attachment");
                }
            }
            out
        })
}
