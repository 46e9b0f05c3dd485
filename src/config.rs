//! Process configuration: flags over environment over defaults.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root directory for static tool pages.
    pub root: PathBuf,
    /// Handed to the task binary via TASKRC; never request-derived.
    pub taskrc: PathBuf,
    /// Handed to the task binary via TASKDATA; never request-derived.
    pub taskdata: PathBuf,
    pub task_bin: String,
    /// Strict mode reports bad actions and CLI failures instead of the
    /// original silent ok/empty-list behavior.
    pub strict: bool,
    pub cli_timeout: Duration,
    pub workers: usize,
}

fn home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            root: PathBuf::from("."),
            taskrc: home().join(".taskrc"),
            taskdata: home().join(".task"),
            task_bin: "task".to_string(),
            strict: false,
            cli_timeout: Duration::from_secs(30),
            workers: 4,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = env_parse::<u16>("TOOLS_PORT") {
            config.port = port;
        }
        if let Ok(root) = std::env::var("TOOLS_ROOT") {
            config.root = PathBuf::from(root);
        }
        if let Ok(taskrc) = std::env::var("TASKRC") {
            config.taskrc = PathBuf::from(taskrc);
        }
        if let Ok(taskdata) = std::env::var("TASKDATA") {
            config.taskdata = PathBuf::from(taskdata);
        }
        if let Ok(bin) = std::env::var("TOOLS_TASK_BIN") {
            config.task_bin = bin;
        }
        if let Ok(raw) = std::env::var("TOOLS_STRICT") {
            if let Ok(v) = parse_bool(&raw) {
                config.strict = v;
            }
        }
        if let Some(secs) = env_parse::<u64>("TOOLS_CLI_TIMEOUT") {
            config.cli_timeout = Duration::from_secs(secs);
        }
        if let Some(workers) = env_parse::<usize>("TOOLS_WORKERS") {
            config.workers = workers.max(1);
        }
        config
    }

    /// Applies command-line flags on top; returns true if help was asked for.
    pub fn apply_args(
        &mut self,
        mut args: impl Iterator<Item = String>,
    ) -> Result<bool, String> {
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-t" | "--target" => {
                    self.root = PathBuf::from(take_value(&mut args, &arg)?);
                }
                "-p" | "--port" => {
                    self.port = parse_value(&mut args, &arg)?;
                }
                "--taskrc" => {
                    self.taskrc = PathBuf::from(take_value(&mut args, &arg)?);
                }
                "--taskdata" => {
                    self.taskdata = PathBuf::from(take_value(&mut args, &arg)?);
                }
                "--task-bin" => {
                    self.task_bin = take_value(&mut args, &arg)?;
                }
                "--strict" => {
                    self.strict = true;
                }
                "--timeout" => {
                    self.cli_timeout = Duration::from_secs(parse_value(&mut args, &arg)?);
                }
                "--workers" => {
                    self.workers = parse_value::<usize>(&mut args, &arg)?.max(1);
                }
                "--host" => {
                    self.host = take_value(&mut args, &arg)?;
                }
                "-h" | "--help" => return Ok(true),
                _ => return Err(format!("Unknown argument: {}", arg)),
            }
        }
        Ok(false)
    }
}

fn take_value(args: &mut impl Iterator<Item = String>, name: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("Missing value for {}", name))
}

fn parse_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    name: &str,
) -> Result<T, String> {
    let raw = take_value(args, name)?;
    raw.parse()
        .map_err(|_| format!("Invalid value for {}: {}", name, raw))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid boolean: {}", value)),
    }
}

pub fn print_help() {
    println!(
        r#"Local tools server with Taskwarrior HTTP bridge

Usage:
  tools-server [options]

Options:
  -t, --target <dir>    Root directory for static tool pages (default: . or TOOLS_ROOT)
  -p, --port <port>     Port to bind (default: 8080 or TOOLS_PORT)
      --host <addr>     Bind address (default: 0.0.0.0)
      --taskrc <file>   Taskwarrior rc file (default: ~/.taskrc or TASKRC)
      --taskdata <dir>  Taskwarrior data directory (default: ~/.task or TASKDATA)
      --task-bin <bin>  Task binary to invoke (default: task or TOOLS_TASK_BIN)
      --strict          Report bad actions and CLI failures instead of
                        silently degrading (default: off or TOOLS_STRICT)
      --timeout <secs>  Kill task invocations after this bound (default: 30)
      --workers <n>     HTTP worker threads (default: 4)
  -h, --help            Show this help message

Environment:
  TOOLS_PORT, TOOLS_ROOT, TASKRC, TASKDATA, TOOLS_TASK_BIN, TOOLS_STRICT,
  TOOLS_CLI_TIMEOUT, TOOLS_WORKERS, RUST_LOG
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> impl Iterator<Item = String> {
        args.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn flags_override_defaults() {
        let mut config = ServerConfig::default();
        let help = config
            .apply_args(argv(&[
                "-p", "9000", "--target", "/srv/tools", "--strict", "--timeout", "5",
                "--task-bin", "/opt/task",
            ]))
            .unwrap();
        assert!(!help);
        assert_eq!(config.port, 9000);
        assert_eq!(config.root, PathBuf::from("/srv/tools"));
        assert!(config.strict);
        assert_eq!(config.cli_timeout, Duration::from_secs(5));
        assert_eq!(config.task_bin, "/opt/task");
    }

    #[test]
    fn help_flag_short_circuits() {
        let mut config = ServerConfig::default();
        assert!(config.apply_args(argv(&["--help"])).unwrap());
    }

    #[test]
    fn missing_value_is_reported() {
        let mut config = ServerConfig::default();
        let err = config.apply_args(argv(&["--port"])).unwrap_err();
        assert!(err.contains("--port"));
    }

    #[test]
    fn bad_port_is_reported() {
        let mut config = ServerConfig::default();
        assert!(config.apply_args(argv(&["-p", "lots"])).is_err());
    }

    #[test]
    fn unknown_flag_is_reported() {
        let mut config = ServerConfig::default();
        let err = config.apply_args(argv(&["--frobnicate"])).unwrap_err();
        assert!(err.contains("--frobnicate"));
    }

    #[test]
    fn workers_never_drop_to_zero() {
        let mut config = ServerConfig::default();
        config.apply_args(argv(&["--workers", "0"])).unwrap();
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("Yes"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }
}
