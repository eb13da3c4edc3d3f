//! HTTP response helpers.

use crate::utils::mime::types::{JSON, PLAIN};
use anyhow::{Result, anyhow};
use serde::Serialize;
use std::{
    fs,
    io::{Read, Seek, SeekFrom},
    path::Path,
};
use tiny_http::{Header, Method, Request, Response, StatusCode};

/// Respond with a file from disk.
///
/// Honors `Range` so the preview can seek inside sounds and music.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    if let Some(range) = get_range_header(&request) {
        return respond_range(request, path, content_type, &range);
    }

    match fs::read(path) {
        Ok(body) => send_body(request, 200, content_type, body),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => respond_not_found(request),
        Err(e) => {
            crate::log!("serve"; "failed to read {}: {}", path.display(), e);
            respond_not_found(request)
        }
    }
}

/// Respond with a 206 slice of `path`, or 416 when the range is unusable.
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
) -> Result<()> {
    let file_size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            crate::log!("serve"; "failed to stat {}: {}", path.display(), e);
            return respond_not_found(request);
        }
    };

    let Some((start, end)) = parse_range(range, file_size) else {
        let response = Response::empty(StatusCode(416))
            .with_header(header("Content-Range", format!("bytes */{file_size}").as_bytes())?);
        request.respond(response)?;
        return Ok(());
    };
    let length = end - start + 1;

    let file = match open_at(path, start) {
        Ok(file) => file,
        Err(e) => {
            crate::log!("serve"; "failed to open {}: {}", path.display(), e);
            return respond_not_found(request);
        }
    };
    let response = Response::new(
        StatusCode(206),
        vec![
            header("Content-Type", content_type.as_bytes())?,
            header(
                "Content-Range",
                format!("bytes {start}-{end}/{file_size}").as_bytes(),
            )?,
            header("Accept-Ranges", b"bytes")?,
        ],
        file.take(length),
        usize::try_from(length).ok(),
        None,
    );

    request.respond(response)?;
    Ok(())
}

fn open_at(path: &Path, offset: u64) -> std::io::Result<fs::File> {
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(file)
}

/// Parse a `bytes=start-end` header value into an inclusive byte range.
fn parse_range(range: &str, file_size: u64) -> Option<(u64, u64)> {
    if file_size == 0 {
        return None;
    }
    let last = file_size - 1;
    let value = range.trim().strip_prefix("bytes=").unwrap_or(range).trim();
    let (start, end) = value.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    let (start, end) = match (start.is_empty(), end.is_empty()) {
        // "0-499"
        (false, false) => (start.parse::<u64>().ok()?, end.parse::<u64>().ok()?.min(last)),
        // "500-"
        (false, true) => (start.parse::<u64>().ok()?, last),
        // "-500"
        (true, false) => {
            let suffix: u64 = end.parse().ok()?;
            (file_size.saturating_sub(suffix), last)
        }
        (true, true) => return None,
    };

    (start <= end).then_some((start, end))
}

fn get_range_header(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case("range"))
        .map(|h| h.value.to_string())
}

/// Respond with a JSON document.
pub fn respond_json<T: Serialize>(request: Request, status: u16, value: &T) -> Result<()> {
    let body = serde_json::to_vec(value)?;
    send_body(request, status, JSON, body)
}

/// 404 for an unresolvable project.
pub fn respond_project_not_found(request: Request) -> Result<()> {
    respond_json(
        request,
        404,
        &serde_json::json!({ "error": "Project not found" }),
    )
}

/// 403 for a path escaping its category directory.
pub fn respond_forbidden(request: Request) -> Result<()> {
    send_body(request, 403, PLAIN, b"Access denied".to_vec())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, PLAIN);
    }
    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(header("Content-Type", content_type.as_bytes())?);
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type.as_bytes())?)
        .with_header(header("Cache-Control", b"no-cache")?);
    request.respond(response)?;
    Ok(())
}

fn header(key: &'static str, value: &[u8]) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value).map_err(|()| anyhow!("invalid header `{key}`"))
}
