use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::error::GameError;
use crate::protocol::GameRequest;
use crate::service::GameService;

const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Header carrying the user id the fronting auth layer has verified.
const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Lightweight JSON API for the game operations.
pub async fn start(addr: SocketAddr, service: Arc<GameService>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP API listening on http://{}", addr);
    serve(listener, service).await;
    Ok(())
}

pub async fn serve(listener: TcpListener, service: Arc<GameService>) {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("HTTP API accept error: {}", e);
                continue;
            }
        };

        let service = service.clone();
        tokio::spawn(async move {
            handle_connection(stream, service).await;
        });
    }
}

async fn handle_connection(mut stream: TcpStream, service: Arc<GameService>) {
    let request = match read_request(&mut stream).await {
        Ok(Some(req)) => req,
        Ok(None) => return,
        Err(e) => {
            warn!("Malformed HTTP request: {}", e);
            let body = GameError::BadRequest(e).to_body();
            let json = serde_json::to_string(&body).unwrap_or_default();
            let _ = stream.write_all(format_response(400, &json).as_bytes()).await;
            return;
        }
    };

    // Store access locks and writes files, so keep it off the async workers.
    let (status, body) = match tokio::task::spawn_blocking(move || route(&service, &request)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("HTTP handler failed: {}", e);
            let body = GameError::Storage(e.to_string()).to_body();
            (500, serde_json::to_string(&body).unwrap_or_default())
        }
    };
    let _ = stream.write_all(format_response(status, &body).as_bytes()).await;
}

/// Reads one request. `Ok(None)` means the peer closed before sending anything.
async fn read_request(stream: &mut TcpStream) -> Result<Option<HttpRequest>, String> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(head_end) = find_head_end(&buf) {
            let (mut request, content_length) = parse_head(&buf[..head_end])?;
            let body_start = head_end + 4;
            let body_end = body_start
                .checked_add(content_length)
                .filter(|&end| end <= MAX_REQUEST_BYTES)
                .ok_or_else(|| "request too large".to_string())?;
            while buf.len() < body_end {
                let n = stream.read(&mut chunk).await.map_err(|e| e.to_string())?;
                if n == 0 {
                    return Err("connection closed mid-body".to_string());
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            request.body = buf[body_start..body_end].to_vec();
            return Ok(Some(request));
        }

        if buf.len() > MAX_REQUEST_BYTES {
            return Err("request head too large".to_string());
        }
        let n = stream.read(&mut chunk).await.map_err(|e| e.to_string())?;
        if n == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err("connection closed mid-head".to_string())
            };
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_head(head: &[u8]) -> Result<(HttpRequest, usize), String> {
    let head = std::str::from_utf8(head).map_err(|_| "request head is not UTF-8".to_string())?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or("empty request")?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or("missing method")?.to_string();
    let target = parts.next().ok_or("missing path")?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = Vec::new();
    let mut content_length = 0;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim().to_string(), value.trim().to_string());
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .parse()
                .map_err(|_| format!("bad Content-Length {:?}", value))?;
        }
        headers.push((name, value));
    }

    Ok((
        HttpRequest {
            method,
            path,
            headers,
            body: Vec::new(),
        },
        content_length,
    ))
}

fn json_error(e: &GameError) -> (u16, String) {
    let body = serde_json::to_string(&e.to_body()).unwrap_or_default();
    (e.http_status(), body)
}

fn json_ok<T: serde::Serialize>(value: &T) -> (u16, String) {
    match serde_json::to_string(value) {
        Ok(body) => (200, body),
        Err(e) => json_error(&GameError::Storage(e.to_string())),
    }
}

/// Maps a request to a status code and JSON body.
pub fn route(service: &GameService, request: &HttpRequest) -> (u16, String) {
    if request.method == "OPTIONS" {
        return (204, String::new());
    }

    let op = match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/whoami") => "whoami",
        ("POST", "/api/login") => "login",
        ("GET", "/api/getGameState") => "getGameState",
        ("POST", "/api/buildMachine") => "buildMachine",
        ("POST", "/api/upgradeMachine") => "upgradeMachine",
        ("POST", "/api/activateMachine") => "activateMachine",
        ("POST", "/api/syncLayout") => "syncLayout",
        _ => {
            let body = serde_json::json!({ "error": "Not found", "code": "route_not_found" });
            return (404, body.to_string());
        }
    };

    let Some(user_id) = request.header(USER_HEADER).filter(|u| !u.is_empty()) else {
        if op == "whoami" {
            return (200, serde_json::json!({ "loggedIn": false }).to_string());
        }
        return json_error(&GameError::Unauthenticated);
    };

    let mut body = if request.body.is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_slice::<Value>(&request.body) {
            Ok(v @ Value::Object(_)) => v,
            Ok(_) => return json_error(&GameError::BadRequest("body must be a JSON object".into())),
            Err(e) => return json_error(&GameError::BadRequest(e.to_string())),
        }
    };

    match op {
        "whoami" => match service.whoami(user_id) {
            Ok(who) => json_ok(&who),
            Err(e) => json_error(&e),
        },
        "login" => {
            let first_name = body
                .get("firstName")
                .and_then(Value::as_str)
                .map(str::to_string);
            match service.register_user(user_id, first_name) {
                Ok(created) => json_ok(&serde_json::json!({ "status": "ok", "created": created })),
                Err(e) => json_error(&e),
            }
        }
        _ => {
            body["op"] = Value::String(op.to_string());
            let request = match serde_json::from_value::<GameRequest>(body) {
                Ok(r) => r,
                Err(e) => return json_error(&GameError::BadRequest(e.to_string())),
            };
            match service.dispatch(user_id, request) {
                Ok(response) => json_ok(&response),
                Err(e) => json_error(&e),
            }
        }
    }
}

fn format_response(status: u16, body: &str) -> String {
    let reason = match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    format!(
        "HTTP/1.1 {} {}\r\n\
        Content-Type: application/json\r\n\
        Access-Control-Allow-Origin: *\r\n\
        Access-Control-Allow-Methods: POST, GET, OPTIONS\r\n\
        Access-Control-Allow-Headers: Content-Type, X-User-Id\r\n\
        Content-Length: {}\r\n\
        Connection: close\r\n\
        \r\n\
        {}",
        status,
        reason,
        body.len(),
        body,
    )
}
