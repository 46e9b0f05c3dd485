//! Local tools server: serves static single-page tools from a root
//! directory and bridges the Taskwarrior CLI to a JSON API at /api/tasks.

mod config;
mod error;
mod pages;
mod routes;
mod task;

use std::io;
use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Method, Response, Server};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::ServerConfig;
use error::CliError;
use task::{TaskCli, TaskwarriorCli};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn main() -> io::Result<()> {
    let mut server_config = ServerConfig::from_env();
    match server_config.apply_args(std::env::args().skip(1)) {
        Ok(true) => {
            config::print_help();
            return Ok(());
        }
        Ok(false) => {}
        Err(msg) => {
            eprintln!("{}\n", msg);
            config::print_help();
            std::process::exit(1);
        }
    }

    init_tracing();

    if !server_config.root.is_dir() {
        error!(root = %server_config.root.display(), "static root directory does not exist");
        std::process::exit(1);
    }

    let cli = TaskwarriorCli::new(
        &server_config.task_bin,
        server_config.taskrc.clone(),
        server_config.taskdata.clone(),
        server_config.cli_timeout,
    );
    match cli.check_available() {
        Ok(()) => {}
        Err(e @ CliError::NotFound) => {
            error!(bin = %server_config.task_bin, error = %e, "task binary unavailable");
            std::process::exit(1);
        }
        Err(e) => {
            error!(bin = %server_config.task_bin, error = %e, "task binary failed startup probe");
            std::process::exit(1);
        }
    }
    if !server_config.taskrc.is_file() {
        warn!(taskrc = %server_config.taskrc.display(), "taskrc not found, task will use its defaults");
    }
    if !server_config.taskdata.is_dir() {
        warn!(taskdata = %server_config.taskdata.display(), "task data directory not found, task will create it");
    }

    let server = Server::http((server_config.host.as_str(), server_config.port))
        .map_err(io::Error::other)?;
    info!(
        "tools server listening on http://{}:{}",
        server_config.host, server_config.port
    );

    let server = Arc::new(server);
    let server_config = Arc::new(server_config);
    let cli = Arc::new(cli);

    let mut handles = Vec::new();
    for _ in 0..server_config.workers {
        let server = Arc::clone(&server);
        let server_config = Arc::clone(&server_config);
        let cli = Arc::clone(&cli);
        handles.push(thread::spawn(move || {
            worker_loop(&server, &server_config, cli.as_ref())
        }));
    }
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

/// Pulls requests off the shared listener; a blocking CLI call only stalls
/// this one thread.
fn worker_loop(server: &Server, server_config: &ServerConfig, cli: &dyn TaskCli) {
    loop {
        let mut request = match server.recv() {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "listener closed");
                break;
            }
        };

        let method = request.method().clone();
        let url = request.url().to_string();
        let mut body = Vec::new();
        if method == Method::Post || method == Method::Put {
            let _ = request.as_reader().read_to_end(&mut body);
        }
        debug!(method = %method, url = %url, "request");

        let resp = routes::handle_request(&method, &url, &body, server_config, cli);

        let mut response = Response::from_data(resp.body)
            .with_status_code(resp.status)
            .with_header(Header::from_bytes("Content-Type", resp.content_type).unwrap());
        for (name, value) in resp.extra_headers {
            response = response.with_header(Header::from_bytes(name, value).unwrap());
        }

        let _ = request.respond(response);
    }
}
