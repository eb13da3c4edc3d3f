//! MIME type detection for served files.
//!
//! Covers the preview page (html, scripts, styles) and every extension a
//! project category accepts.

use std::path::Path;

/// MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const MARKDOWN: &str = "text/markdown; charset=utf-8";
    pub const CSV: &str = "text/csv; charset=utf-8";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    // Audio
    pub const MP3: &str = "audio/mpeg";
    pub const WAV: &str = "audio/wav";
    pub const OGG_AUDIO: &str = "audio/ogg";
    pub const FLAC: &str = "audio/flac";

    // Models
    pub const GLB: &str = "model/gltf-binary";
    pub const OBJ: &str = "model/obj";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
}

/// Guess MIME type from file extension.
pub fn from_path(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess MIME type from file extension string (case-insensitive).
pub fn from_extension(ext: Option<&str>) -> &'static str {
    let Some(ext) = ext.map(str::to_ascii_lowercase) else {
        return types::OCTET_STREAM;
    };

    match ext.as_str() {
        "html" | "htm" => types::HTML,
        "css" => types::CSS,
        "js" | "mjs" => types::JAVASCRIPT,
        "json" | "map" => types::JSON,
        "txt" | "ms" => types::PLAIN,
        "md" => types::MARKDOWN,
        "csv" => types::CSV,

        "png" => types::PNG,
        "jpg" | "jpeg" => types::JPEG,
        "svg" => types::SVG,
        "ico" => types::ICO,

        "mp3" => types::MP3,
        "wav" => types::WAV,
        "ogg" | "oga" => types::OGG_AUDIO,
        "flac" => types::FLAC,

        "glb" => types::GLB,
        "obj" => types::OBJ,

        "woff" => types::WOFF,
        "woff2" => types::WOFF2,
        "ttf" => types::TTF,
        "wasm" => types::WASM,

        _ => types::OCTET_STREAM,
    }
}
