//! File helpers shared by the chat editor and the completions layer:
//! language/extension lookup tables, size formatting, and a cancellable
//! chunked copy for model downloads.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{GraftError, Result};

const EXTENSION_LANGUAGE_RESOURCE: &str =
    include_str!("../../resources/file_extension_language_mappings.json");
const LANGUAGE_EXTENSION_RESOURCE: &str =
    include_str!("../../resources/language_file_extension_mappings.json");

#[derive(Debug, Deserialize)]
struct FileExtensionLanguage {
    extension: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct LanguageFileExtensions {
    name: String,
    extensions: Vec<String>,
}

fn extension_language_mappings() -> &'static [FileExtensionLanguage] {
    static MAPPINGS: OnceLock<Vec<FileExtensionLanguage>> = OnceLock::new();
    MAPPINGS.get_or_init(|| {
        serde_json::from_str(EXTENSION_LANGUAGE_RESOURCE)
            .unwrap_or_else(|e| panic!("malformed extension mapping resource: {e}"))
    })
}

fn language_extension_mappings() -> &'static [LanguageFileExtensions] {
    static MAPPINGS: OnceLock<Vec<LanguageFileExtensions>> = OnceLock::new();
    MAPPINGS.get_or_init(|| {
        serde_json::from_str(LANGUAGE_EXTENSION_RESOURCE)
            .unwrap_or_else(|e| panic!("malformed language mapping resource: {e}"))
    })
}

/// Read a file to a string; failures are logged and yield an empty string.
pub fn read_content(path: impl AsRef<Path>) -> String {
    match std::fs::read_to_string(path.as_ref()) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("failed to read {}: {e}", path.as_ref().display());
            String::new()
        }
    }
}

/// The extension of a file name, without the dot. Empty when there is none.
pub fn file_extension(file_name: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"[^.]+$").unwrap_or_else(|e| panic!("{e}")));
    if !file_name.contains('.') {
        return String::new();
    }
    pattern
        .find(file_name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Language display name for a file extension (without dot), if known.
pub fn language_for_extension(extension: &str) -> Option<String> {
    extension_language_mappings()
        .iter()
        .find(|m| m.extension.eq_ignore_ascii_case(extension))
        .map(|m| m.value.clone())
}

/// Map a language name (or a bare extension) to `(language, extension)`.
/// Falls back to `("Text", ".txt")` like the original lookup tables.
pub fn find_language_extension_mapping(language: &str) -> (String, String) {
    let default = ("Text".to_string(), ".txt".to_string());

    if let Some(found) = first_extension_for_language(language) {
        return found;
    }

    // The "language" may actually be an extension; map it back first.
    extension_language_mappings()
        .iter()
        .find(|m| m.extension.eq_ignore_ascii_case(language))
        .and_then(|m| first_extension_for_language(&m.value))
        .unwrap_or(default)
}

fn first_extension_for_language(language: &str) -> Option<(String, String)> {
    language_extension_mappings()
        .iter()
        .find(|m| {
            m.name.eq_ignore_ascii_case(language)
                && m.extensions.iter().any(|e| !e.trim().is_empty())
        })
        .map(|m| {
            let extension = m
                .extensions
                .iter()
                .find(|e| !e.trim().is_empty())
                .cloned()
                .unwrap_or_default();
            (m.name.clone(), extension)
        })
}

/// Media type for an image attachment. Only PNG and JPEG are supported;
/// anything else is an invalid-input error the caller must handle up front.
pub fn image_media_type(file_name: &str) -> Result<String> {
    match file_extension(file_name).to_lowercase().as_str() {
        "png" => Ok("image/png".to_string()),
        "jpg" | "jpeg" => Ok("image/jpeg".to_string()),
        other => Err(GraftError::invalid_input(format!(
            "unsupported image type: {other}"
        ))),
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let formatted = format!("{size:.2}");
    let formatted = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", formatted, UNITS[unit])
}

pub fn format_count(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{}M", value / 1_000_000)
    } else if value >= 1_000 {
        format!("{}K", value / 1_000)
    } else {
        value.to_string()
    }
}

/// Whether the file decodes as UTF-8 text.
pub fn is_utf8_file(path: impl AsRef<Path>) -> bool {
    match std::fs::read(path.as_ref()) {
        Ok(bytes) => std::str::from_utf8(&bytes).is_ok(),
        Err(_) => false,
    }
}

/// Chunked copy with byte progress and a polled cancel flag. Cancellation
/// stops the copy early without an error; the caller compares the returned
/// byte count against the expected total.
pub fn copy_with_progress(
    mut reader: impl Read,
    mut writer: impl Write,
    total_size: u64,
    mut progress: impl FnMut(u64, f64),
    cancelled: &AtomicBool,
) -> Result<u64> {
    let mut buffer = [0u8; 10 * 1024];
    let mut bytes_copied: u64 = 0;

    loop {
        if cancelled.load(Ordering::Relaxed) {
            break;
        }
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
        bytes_copied += read as u64;

        let fraction = if total_size > 0 {
            bytes_copied as f64 / total_size as f64
        } else {
            0.0
        };
        progress(bytes_copied, fraction);
    }

    writer.flush()?;
    Ok(bytes_copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_of_plain_name_is_empty() {
        assert_eq!(file_extension("Makefile"), "");
        assert_eq!(file_extension("lib.rs"), "rs");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
    }

    #[test]
    fn language_mapping_round_trips() {
        assert_eq!(
            find_language_extension_mapping("Rust"),
            ("Rust".to_string(), ".rs".to_string())
        );
        // Extensions map back through the language table.
        assert_eq!(
            find_language_extension_mapping("py"),
            ("Python".to_string(), ".py".to_string())
        );
        // Unknown languages fall back to plain text.
        assert_eq!(
            find_language_extension_mapping("Klingon"),
            ("Text".to_string(), ".txt".to_string())
        );
    }

    #[test]
    fn image_media_type_rejects_unsupported() {
        assert_eq!(image_media_type("shot.png").unwrap(), "image/png");
        assert_eq!(image_media_type("shot.JPG").unwrap(), "image/jpeg");
        assert!(image_media_type("shot.gif").is_err());
    }

    #[test]
    fn file_sizes_render_human_readable() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2 KB");
        assert_eq!(format_file_size(1_572_864), "1.5 MB");
    }

    #[test]
    fn counts_abbreviate() {
        assert_eq!(format_count(950), "950");
        assert_eq!(format_count(1_500), "1K");
        assert_eq!(format_count(3_000_000), "3M");
    }

    #[test]
    fn copy_stops_when_cancelled() {
        let data = vec![7u8; 64 * 1024];
        let mut out = Vec::new();
        let cancelled = AtomicBool::new(true);
        let copied = copy_with_progress(&data[..], &mut out, data.len() as u64, |_, _| {}, &cancelled)
            .unwrap();
        assert_eq!(copied, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn copy_reports_progress() {
        let data = vec![1u8; 25 * 1024];
        let mut out = Vec::new();
        let cancelled = AtomicBool::new(false);
        let mut fractions = Vec::new();
        let copied = copy_with_progress(
            &data[..],
            &mut out,
            data.len() as u64,
            |_, fraction| fractions.push(fraction),
            &cancelled,
        )
        .unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
        assert!((fractions.last().copied().unwrap_or(0.0) - 1.0).abs() < 1e-9);
    }
}
