//! Request dispatch: the task API, the generated pages, and static files.
//!
//! Dispatch is a pure function from method/url/body to a response value so
//! the routing table can be exercised without sockets; the tiny_http loop in
//! main.rs does the actual I/O.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tiny_http::Method;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::CliError;
use crate::pages;
use crate::task::{self, ActionRequest, TaskCli};

const MIME_TYPES: [(&str, &str); 10] = [
    ("html", "text/html; charset=utf-8"),
    ("js", "application/javascript"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("csv", "text/csv"),
    ("ledger", "text/plain"),
    ("webmanifest", "application/manifest+json"),
];

const FALLBACK_MIME: &str = "application/octet-stream";

/// Response value handed back to the serve loop.
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub extra_headers: Vec<(&'static str, &'static str)>,
}

fn json<T: serde::Serialize>(status: u16, value: &T) -> HttpResponse {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    HttpResponse {
        status,
        content_type: "application/json",
        body,
        extra_headers: Vec::new(),
    }
}

fn json_error(status: u16, message: &str) -> HttpResponse {
    json(status, &serde_json::json!({ "error": message }))
}

fn html(page: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        content_type: "text/html; charset=utf-8",
        body: page.as_bytes().to_vec(),
        extra_headers: Vec::new(),
    }
}

fn not_found() -> HttpResponse {
    HttpResponse {
        status: 404,
        content_type: "text/plain",
        body: b"Not found".to_vec(),
        extra_headers: Vec::new(),
    }
}

/// Dispatches a request and stamps the wildcard CORS header on whatever
/// comes back; the deployment is a trusted local network and the generated
/// pages fetch across tools.
pub fn handle_request(
    method: &Method,
    url: &str,
    body: &[u8],
    config: &ServerConfig,
    cli: &dyn TaskCli,
) -> HttpResponse {
    let mut resp = route(method, url, body, config, cli);
    resp.extra_headers.push(("Access-Control-Allow-Origin", "*"));
    resp
}

/// Routing table, first match wins. Only the API dispatches on method; the
/// page and file routes answer any verb, as the original server did.
fn route(
    method: &Method,
    url: &str,
    body: &[u8],
    config: &ServerConfig,
    cli: &dyn TaskCli,
) -> HttpResponse {
    let path = url.split('?').next().unwrap_or(url);

    if path.starts_with("/api/tasks") {
        return handle_task_api(method, url, body, config, cli);
    }

    match path {
        "/" => html(pages::INDEX_HTML),
        "/timer" => serve_file(&config.root.join("timer").join("timer.html")),
        "/pos" | "/pos/" => serve_file(&config.root.join("pos-panaderia").join("index.html")),
        "/calendario" | "/calendario/" => {
            serve_file(&config.root.join("calendario-semana").join("index.html"))
        }
        "/taskwarrior" | "/taskwarrior/" => html(pages::TASKWARRIOR_HTML),
        _ => {
            let (base, rest) = match path.strip_prefix("/pos/") {
                Some(rest) => (config.root.join("pos-panaderia"), rest),
                None => (config.root.clone(), path),
            };
            match sanitize(rest) {
                Some(rel) => serve_file(&base.join(rel)),
                None => not_found(),
            }
        }
    }
}

fn handle_task_api(
    method: &Method,
    url: &str,
    body: &[u8],
    config: &ServerConfig,
    cli: &dyn TaskCli,
) -> HttpResponse {
    match method {
        Method::Get => {
            let filter = query_param(url, "filter").unwrap_or_default();
            match task::export_tasks(cli, &filter) {
                Ok(tasks) => json(200, &tasks),
                Err(e @ CliError::TimedOut { .. }) if config.strict => {
                    json_error(504, &e.to_string())
                }
                Err(e) if config.strict => json_error(502, &e.to_string()),
                Err(e) => {
                    warn!(error = %e, filter = %filter, "task export failed, returning empty list");
                    json(200, &Vec::<task::Task>::new())
                }
            }
        }
        Method::Post => {
            let request: ActionRequest = match serde_json::from_slice(body) {
                Ok(r) => r,
                Err(e) => return json_error(400, &format!("invalid JSON body: {e}")),
            };
            match task::mutation_args(&request) {
                Ok(args) => match cli.run(&args) {
                    Ok(_) => json(200, &serde_json::json!({ "ok": true })),
                    Err(e @ CliError::CommandFailed { .. }) => json_error(400, &e.to_string()),
                    Err(e @ CliError::TimedOut { .. }) => json_error(504, &e.to_string()),
                    Err(e) => json_error(500, &e.to_string()),
                },
                Err(reason) if config.strict => json_error(400, &reason),
                Err(reason) => {
                    debug!(action = %request.action, %reason, "action skipped");
                    json(200, &serde_json::json!({ "ok": true }))
                }
            }
        }
        _ => json_error(405, "Method not allowed"),
    }
}

fn query_param(url: &str, key: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    for part in query.split('&') {
        let (k, v) = part.split_once('=').unwrap_or((part, ""));
        if k == key {
            let v = v.replace('+', " ");
            return Some(match urlencoding::decode(&v) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => v,
            });
        }
    }
    None
}

/// Normalizes a request path into a relative path with no parent or rooted
/// components; None means the path tried to escape the root.
fn sanitize(raw: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(raw.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    MIME_TYPES
        .iter()
        .find(|(known, _)| ext.eq_ignore_ascii_case(known))
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_MIME)
}

fn serve_file(path: &Path) -> HttpResponse {
    if !path.is_file() {
        return not_found();
    }
    match fs::read(path) {
        Ok(data) => HttpResponse {
            status: 200,
            content_type: content_type_for(path),
            body: data,
            extra_headers: Vec::new(),
        },
        Err(err) => HttpResponse {
            status: 500,
            content_type: "text/plain",
            body: err.to_string().into_bytes(),
            extra_headers: Vec::new(),
        },
    }
}
