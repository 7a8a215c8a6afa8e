use anyhow::{bail, Context};
use base64::Engine;
use ideaboard_core::calendar::{parse_feed, CalendarOccurrence};
use std::fs;
use std::path::Path;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
];

pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
        .map(|(_, mime)| *mime)
}

/// Reads an image file into a `data:` URL.
pub fn image_data_url(path: &Path) -> anyhow::Result<String> {
    let Some(mime) = image_mime_type(path) else {
        bail!("{} is not a supported image type", path.display());
    };
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{payload}"))
}

pub fn read_envelope(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Writes the sealed text as is; the file holds nothing else.
pub fn write_envelope(path: &Path, sealed: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, sealed).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_calendar_feed(path: &Path) -> anyhow::Result<Vec<CalendarOccurrence>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read calendar feed {}", path.display()))?;
    parse_feed(&raw).with_context(|| format!("calendar feed {} is invalid", path.display()))
}
