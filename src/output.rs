//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! 3f2a-9c → webp (width=50)
//!     Source: transformed
//!     Type: image/webp
//!     Wrote 2184 bytes to 3f2a-9c.webp
//! ```
//!
//! ## Locate
//!
//! ```text
//! 3f2a-9c (2 originals)
//!     001 3f2a-9c.jpg (jpeg)
//!     002 3f2a-9c.tiff (unsupported)
//! ```
//!
//! ## Errors
//!
//! ```text
//! 404 Not Found: asset 3f2a-9c not found
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout or stderr.
//! Format functions are pure: no I/O, no side effects.

use crate::delivery::{DeliveryError, Source};
use crate::imaging::ImageFormat;
use crate::request::AssetRequest;
use std::path::{Path, PathBuf};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Requested dimensions as `width=W, height=H`, or `None` for native size.
fn dimensions_label(width: Option<u32>, height: Option<u32>) -> Option<String> {
    let parts: Vec<String> = [("width", width), ("height", height)]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| format!("{k}={v}")))
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Fetch
// ============================================================================

/// Format the result of one `fetch`.
pub fn format_delivery(
    request: &AssetRequest,
    format: ImageFormat,
    source: Source,
    bytes_written: u64,
    dest: &Path,
) -> Vec<String> {
    let header = match dimensions_label(request.width(), request.height()) {
        Some(dims) => format!("{} → {} ({})", request.asset_id(), format, dims),
        None => format!("{} → {}", request.asset_id(), format),
    };
    vec![
        header,
        format!("{}Source: {}", indent(1), source),
        format!("{}Type: {}", indent(1), format.mime_type()),
        format!(
            "{}Wrote {} bytes to {}",
            indent(1),
            bytes_written,
            dest.display()
        ),
    ]
}

pub fn print_delivery(
    request: &AssetRequest,
    format: ImageFormat,
    source: Source,
    bytes_written: u64,
    dest: &Path,
) {
    for line in format_delivery(request, format, source, bytes_written, dest) {
        println!("{}", line);
    }
}

// ============================================================================
// Locate
// ============================================================================

/// Format the candidate originals for one asset id.
pub fn format_candidates(asset_id: &str, candidates: &[PathBuf]) -> Vec<String> {
    if candidates.is_empty() {
        return vec![format!("{} (no originals)", asset_id)];
    }
    let noun = if candidates.len() == 1 {
        "original"
    } else {
        "originals"
    };
    let mut lines = vec![format!("{} ({} {})", asset_id, candidates.len(), noun)];
    for (i, path) in candidates.iter().enumerate() {
        let format = ImageFormat::from_path(path)
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unsupported".to_string());
        lines.push(format!(
            "{}{} {} ({})",
            indent(1),
            format_index(i + 1),
            file_label(path),
            format
        ));
    }
    lines
}

pub fn print_candidates(asset_id: &str, candidates: &[PathBuf]) {
    for line in format_candidates(asset_id, candidates) {
        println!("{}", line);
    }
}

// ============================================================================
// Errors
// ============================================================================

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        404 => "Not Found",
        501 => "Not Implemented",
        _ => "Internal Server Error",
    }
}

/// Format a delivery failure with its HTTP status class.
pub fn format_error(err: &DeliveryError) -> Vec<String> {
    let status = err.status_code();
    vec![format!("{} {}: {}", status, reason_phrase(status), err)]
}

pub fn print_error(err: &DeliveryError) {
    for line in format_error(err) {
        eprintln!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestError;

    fn req(file: &str, w: Option<u32>, h: Option<u32>) -> AssetRequest {
        AssetRequest::parse(file, None, w, h).unwrap()
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn dimensions_label_variants() {
        assert_eq!(dimensions_label(None, None), None);
        assert_eq!(dimensions_label(Some(50), None).as_deref(), Some("width=50"));
        assert_eq!(
            dimensions_label(Some(50), Some(25)).as_deref(),
            Some("width=50, height=25")
        );
    }

    #[test]
    fn delivery_with_dimensions() {
        let lines = format_delivery(
            &req("3f2a-9c.webp", Some(50), None),
            ImageFormat::Webp,
            Source::Transformed,
            2184,
            Path::new("3f2a-9c.webp"),
        );
        assert_eq!(
            lines,
            vec![
                "3f2a-9c → webp (width=50)",
                "    Source: transformed",
                "    Type: image/webp",
                "    Wrote 2184 bytes to 3f2a-9c.webp",
            ]
        );
    }

    #[test]
    fn delivery_native_size_from_cache() {
        let lines = format_delivery(
            &req("ab.jpg", None, None),
            ImageFormat::Jpeg,
            Source::Cache,
            10,
            Path::new("out.jpg"),
        );
        assert_eq!(lines[0], "ab → jpeg");
        assert_eq!(lines[1], "    Source: cache");
        assert_eq!(lines[2], "    Type: image/jpeg");
    }

    #[test]
    fn candidates_listed_with_formats() {
        let lines = format_candidates(
            "ab",
            &[PathBuf::from("/o/ab.jpg"), PathBuf::from("/o/ab.tiff")],
        );
        assert_eq!(
            lines,
            vec![
                "ab (2 originals)",
                "    001 ab.jpg (jpeg)",
                "    002 ab.tiff (unsupported)",
            ]
        );
    }

    #[test]
    fn single_candidate_is_singular() {
        let lines = format_candidates("ab", &[PathBuf::from("/o/ab.png")]);
        assert_eq!(lines[0], "ab (1 original)");
    }

    #[test]
    fn no_candidates() {
        assert_eq!(format_candidates("ab", &[]), vec!["ab (no originals)"]);
    }

    #[test]
    fn error_lines_carry_status() {
        let lines = format_error(&DeliveryError::AssetNotFound("ab".into()));
        assert_eq!(lines, vec!["404 Not Found: asset ab not found"]);

        let lines = format_error(&DeliveryError::UnsupportedFormat("bmp".into()));
        assert!(lines[0].starts_with("501 Not Implemented"));

        let lines = format_error(&DeliveryError::from(RequestError::InvalidAssetName(
            "X".into(),
        )));
        assert!(lines[0].starts_with("400 Bad Request"));
    }
}
