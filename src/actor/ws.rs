//! WebSocket client connections.
//!
//! Adapts a tungstenite socket to [`ClientConn`]. The handshake runs in
//! blocking mode; afterwards the socket is switched to non-blocking so the
//! reader loop can poll every client without stalling.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tungstenite::WebSocket;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::protocol::Message;

use super::bus::{ClientConn, Incoming};

/// Upper bound for a client to finish the handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// An accepted WebSocket client.
pub struct WsConn {
    ws: WebSocket<TcpStream>,
}

/// Perform the server handshake on a raw stream.
///
/// Returns the `project` query parameter of the request URI, if any.
pub fn accept(stream: TcpStream) -> Result<(Option<String>, WsConn)> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

    let mut slug = None;
    let ws = tungstenite::accept_hdr(stream, |request: &Request, response: Response| {
        slug = request.uri().query().and_then(project_from_query);
        Ok::<_, ErrorResponse>(response)
    })
    .map_err(|e| anyhow!("handshake failed: {}", e))?;

    ws.get_ref().set_read_timeout(None)?;
    ws.get_ref().set_nonblocking(true)?;

    Ok((slug, WsConn { ws }))
}

/// Extract `project` from a query string (`project=game1&x=y`).
pub fn project_from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "project")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn is_would_block(e: &tungstenite::Error) -> bool {
    matches!(e, tungstenite::Error::Io(io) if io.kind() == ErrorKind::WouldBlock)
}

impl ClientConn for WsConn {
    fn send_text(&mut self, text: &str) -> std::io::Result<()> {
        match self.ws.send(Message::Text(text.to_owned().into())) {
            Ok(()) => Ok(()),
            // Frame stays queued and is flushed on the next poll
            Err(e) if is_would_block(&e) => Ok(()),
            Err(e) => Err(std::io::Error::other(e.to_string())),
        }
    }

    fn poll(&mut self) -> Incoming {
        let incoming = match self.ws.read() {
            Ok(Message::Text(text)) => Incoming::Text(text.as_str().to_owned()),
            Ok(Message::Close(_)) => Incoming::Closed,
            Ok(_) => Incoming::Idle,
            Err(e) if is_would_block(&e) => Incoming::Idle,
            Err(e) => {
                crate::debug!("ws"; "read failed: {}", e);
                Incoming::Closed
            }
        };

        if incoming == Incoming::Idle {
            if let Err(e) = self.ws.flush() {
                if !is_would_block(&e) {
                    return Incoming::Closed;
                }
            }
        }
        incoming
    }

    fn close(&mut self) {
        let _ = self.ws.close(None);
        let _ = self.ws.flush();
    }
}
