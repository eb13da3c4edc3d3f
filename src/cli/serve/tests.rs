use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use tempfile::TempDir;
use tiny_http::{Request, Server};

use super::{ServeState, dispatch, response};
use crate::project::descriptor::DESCRIPTOR_FILE;
use crate::project::{ConfigStore, ProjectResolver};

const WS_PORT: u16 = 35729;

// ============================================================================
// Helpers
// ============================================================================

/// Serve exactly one request with `handler` and return the raw response.
fn round_trip<F>(raw: &str, handler: F) -> String
where
    F: FnOnce(Request) -> Result<()> + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let worker = thread::spawn(move || {
        let request = server.recv().unwrap();
        handler(request).unwrap();
    });

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).unwrap();
    worker.join().unwrap();
    reply
}

fn get(url: &str) -> String {
    format!("GET {url} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
}

fn get_range(url: &str, range: &str) -> String {
    format!("GET {url} HTTP/1.1\r\nHost: localhost\r\nRange: {range}\r\nConnection: close\r\n\r\n")
}

fn request(state: ServeState, url: &str, shutting_down: bool) -> String {
    round_trip(&get(url), move |req| dispatch(req, &state, shutting_down))
}

fn state_for(root: &Path) -> ServeState {
    ServeState {
        store: Arc::new(ConfigStore::new()),
        resolver: ProjectResolver::new(Some(root.to_path_buf()), root.to_path_buf()),
        static_dir: None,
        ws_port: WS_PORT,
    }
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(DESCRIPTOR_FILE),
        "[meta]\nname = \"Game\"\nslug = \"game1\"\n",
    )
    .unwrap();
    for dir in ["ms", "sounds", "music", "sprites"] {
        fs::create_dir_all(temp.path().join(dir)).unwrap();
    }
    temp
}

fn status_line(reply: &str) -> &str {
    reply.lines().next().unwrap_or_default()
}

fn body(reply: &str) -> &str {
    reply.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}

// ============================================================================
// API routes
// ============================================================================

#[test]
fn test_file_served() {
    let temp = project();
    fs::write(temp.path().join("ms/main.ms"), "print(1)").unwrap();

    let reply = request(state_for(temp.path()), "/api/file/game1/main.ms", false);
    assert!(status_line(&reply).contains("200"), "{reply}");
    assert_eq!(body(&reply), "print(1)");
}

#[test]
fn test_encoded_traversal_is_forbidden() {
    let temp = project();

    let reply = request(
        state_for(temp.path()),
        "/api/file/game1/..%2F..%2Fetc%2Fpasswd",
        false,
    );
    assert!(status_line(&reply).contains("403"), "{reply}");
    assert_eq!(body(&reply), "Access denied");
}

#[test]
fn test_missing_file_is_not_found() {
    let temp = project();

    let reply = request(state_for(temp.path()), "/api/file/game1/nope.ms", false);
    assert!(status_line(&reply).contains("404"), "{reply}");
}

#[test]
fn test_sound_without_extension_falls_back() {
    let temp = project();
    fs::write(temp.path().join("sounds/jump.ogg"), "ogg-bytes").unwrap();

    let reply = request(state_for(temp.path()), "/api/sound/game1/jump", false);
    assert!(status_line(&reply).contains("200"), "{reply}");
    assert_eq!(body(&reply), "ogg-bytes");
}

#[test]
fn test_project_info_over_http() {
    let temp = project();
    fs::write(temp.path().join("ms/main.ms"), "x").unwrap();

    let reply = request(state_for(temp.path()), "/api/project/game1", false);
    assert!(status_line(&reply).contains("200"), "{reply}");
    let info: serde_json::Value = serde_json::from_str(body(&reply)).unwrap();
    assert_eq!(info["slug"], "game1");
    assert_eq!(info["wsPort"], WS_PORT);
}

#[test]
fn test_malformed_descriptor_is_project_not_found() {
    let temp = project();
    fs::write(temp.path().join(DESCRIPTOR_FILE), "[meta\nname=").unwrap();

    let reply = request(state_for(temp.path()), "/api/project/game1", false);
    assert!(status_line(&reply).contains("404"), "{reply}");
    let error: serde_json::Value = serde_json::from_str(body(&reply)).unwrap();
    assert_eq!(error["error"], "Project not found");
}

#[test]
fn test_no_project_is_project_not_found() {
    let temp = TempDir::new().unwrap();
    let empty = temp.path().join("a/b/c/d/e");
    fs::create_dir_all(&empty).unwrap();
    let state = ServeState {
        store: Arc::new(ConfigStore::new()),
        resolver: ProjectResolver::new(Some(empty.clone()), empty),
        static_dir: None,
        ws_port: WS_PORT,
    };

    let reply = request(state, "/api/file/game1/main.ms", false);
    assert!(status_line(&reply).contains("404"), "{reply}");
    let error: serde_json::Value = serde_json::from_str(body(&reply)).unwrap();
    assert_eq!(error["error"], "Project not found");
}

#[test]
fn test_shutting_down_is_unavailable() {
    let temp = project();
    fs::write(temp.path().join("ms/main.ms"), "x").unwrap();

    let reply = request(state_for(temp.path()), "/api/file/game1/main.ms", true);
    assert!(status_line(&reply).contains("503"), "{reply}");
}

// ============================================================================
// Static files and read failures
// ============================================================================

#[test]
fn test_unknown_route_without_static_dir() {
    let temp = project();

    let reply = request(state_for(temp.path()), "/index.html", false);
    assert!(status_line(&reply).contains("404"), "{reply}");
}

#[test]
fn test_static_dir_served() {
    let temp = project();
    let site = TempDir::new().unwrap();
    fs::write(site.path().join("index.html"), "<p>hi</p>").unwrap();
    let state = ServeState {
        static_dir: Some(site.path().to_path_buf()),
        ..state_for(temp.path())
    };

    let reply = request(state, "/index.html", false);
    assert!(status_line(&reply).contains("200"), "{reply}");
    assert_eq!(body(&reply), "<p>hi</p>");
}

#[test]
fn test_unreadable_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    // Opening a directory succeeds but reading it fails
    let dir = temp.path().join("level.ms");
    fs::create_dir_all(&dir).unwrap();

    let reply = round_trip(&get("/level.ms"), move |req| response::respond_file(req, &dir));
    assert!(status_line(&reply).contains("404"), "{reply}");
    assert_eq!(body(&reply), "404 Not Found");
}

#[cfg(unix)]
#[test]
fn test_range_on_dangling_link_is_not_found() {
    let temp = TempDir::new().unwrap();
    let link: PathBuf = temp.path().join("theme.mp3");
    std::os::unix::fs::symlink(temp.path().join("gone.mp3"), &link).unwrap();

    let reply = round_trip(&get_range("/theme.mp3", "bytes=0-9"), move |req| {
        response::respond_file(req, &link)
    });
    assert!(status_line(&reply).contains("404"), "{reply}");
}

#[test]
fn test_range_served_partially() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("theme.mp3");
    fs::write(&path, "0123456789").unwrap();

    let reply = round_trip(&get_range("/theme.mp3", "bytes=2-5"), move |req| {
        response::respond_file(req, &path)
    });
    assert!(status_line(&reply).contains("206"), "{reply}");
    assert_eq!(body(&reply), "2345");
}
