// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The fixed, closed MIME lookup table (spec §4.E/§6 "MIME table").
//!
//! Detection is purely extension-based and deterministic: unknown
//! extensions (including no extension at all) fall back to
//! `application/octet-stream`.

/// Category derived from a MIME string, used by text-only commands to
/// refuse binary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Text,
    Image,
    Video,
    Audio,
    Archive,
    Binary,
}

/// Extension -> MIME type. Kept sorted by extension for readability; lookup
/// is a linear scan since the table is small and write-once.
const TABLE: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("mjs", "text/javascript"),
    ("ts", "text/x-typescript"),
    ("jsx", "text/jsx"),
    ("tsx", "text/tsx"),
    ("xml", "text/xml"),
    ("yaml", "text/yaml"),
    ("yml", "text/yaml"),
    ("toml", "text/x-toml"),
    ("ini", "text/plain"),
    ("cfg", "text/plain"),
    ("conf", "text/plain"),
    ("log", "text/plain"),
    ("sh", "text/x-shellscript"),
    ("bash", "text/x-shellscript"),
    ("zsh", "text/x-shellscript"),
    ("py", "text/x-python"),
    ("rb", "text/x-ruby"),
    ("rs", "text/x-rust"),
    ("go", "text/x-go"),
    ("c", "text/x-c"),
    ("h", "text/x-c"),
    ("cpp", "text/x-c++"),
    ("hpp", "text/x-c++"),
    ("java", "text/x-java"),
    ("json", "application/json"),
    ("jsonl", "application/json"),
    ("sql", "text/x-sql"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("avif", "image/avif"),
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("aac", "audio/aac"),
    ("m4a", "audio/mp4"),
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    ("tgz", "application/gzip"),
    ("bz2", "application/x-bzip2"),
    ("7z", "application/x-7z-compressed"),
    ("rar", "application/vnd.rar"),
    ("pdf", "application/pdf"),
    ("wasm", "application/wasm"),
    ("bin", "application/octet-stream"),
    ("exe", "application/octet-stream"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Detect a MIME type from a path's extension (case-insensitive).
pub fn detect(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().filter(|e| *e != path).unwrap_or("");
    let ext_lower = ext.to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(e, _)| *e == ext_lower)
        .map(|(_, m)| *m)
        .unwrap_or(DEFAULT_MIME)
}

/// Derive the coarse category used by text-only commands (spec §4.E / §6).
pub fn category(mime: &str) -> Category {
    const ARCHIVE_MIMES: &[&str] = &[
        "application/zip",
        "application/x-tar",
        "application/gzip",
        "application/x-bzip2",
        "application/x-7z-compressed",
        "application/vnd.rar",
    ];
    if mime.starts_with("text/") || mime == "application/json" {
        Category::Text
    } else if mime.starts_with("image/") {
        Category::Image
    } else if mime.starts_with("video/") {
        Category::Video
    } else if mime.starts_with("audio/") {
        Category::Audio
    } else if ARCHIVE_MIMES.contains(&mime) {
        Category::Archive
    } else {
        Category::Binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extension_maps() {
        assert_eq!(detect("/a/b/file.txt"), "text/plain");
        assert_eq!(detect("report.JSON"), "application/json");
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(detect("/a/b/file.qqq"), DEFAULT_MIME);
        assert_eq!(detect("noext"), DEFAULT_MIME);
    }

    #[test]
    fn categories() {
        assert_eq!(category("text/plain"), Category::Text);
        assert_eq!(category("application/json"), Category::Text);
        assert_eq!(category("image/png"), Category::Image);
        assert_eq!(category("application/zip"), Category::Archive);
        assert_eq!(category("application/octet-stream"), Category::Binary);
    }
}
