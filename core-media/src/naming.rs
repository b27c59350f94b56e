//! Local file names for fetched images.

use sha2::{Digest, Sha256};
use url::Url;

const MAX_NAME_LEN: usize = 200;

/// Prefix `file://` onto bare paths.
pub fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("file://{}", url)
    }
}

/// Only these schemes are ever requested.
pub fn is_fetchable_scheme(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "file"),
        Err(_) => false,
    }
}

/// `filename=` value of a Content-Disposition header.
///
/// One leading and one trailing quote (single or double) are removed.
/// Directory components are dropped so the name cannot escape the
/// destination directory.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?;

    let raw = raw
        .strip_prefix(['"', '\''])
        .unwrap_or(raw);
    let raw = raw
        .strip_suffix(['"', '\''])
        .unwrap_or(raw);

    let name = sanitize(raw.rsplit(['/', '\\']).next().unwrap_or(raw));
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// File name derived from the last path segment of `url`.
///
/// Query and fragment are ignored, the segment is percent-decoded and
/// sanitized. URLs without a usable segment get a name hashed from the URL.
pub fn local_name_from_url(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_default();

    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);

    let name = sanitize(&decoded);
    if name.is_empty() {
        hashed_name(url)
    } else {
        name
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.');
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

fn hashed_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("{}.jpg", hex)
}
