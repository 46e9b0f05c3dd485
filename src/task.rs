//! Taskwarrior bridge: subprocess invoker plus the argument/export adapter.
//!
//! The external `task` binary owns all task data; this module only shapes
//! HTTP-level requests into argument vectors and parses `export` JSON back
//! into records. Arguments are always passed as a discrete vector, never a
//! shell string, so metacharacters in descriptions cannot escape into the
//! shell.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::error::{CliError, CliResult};

/// Cap on captured stdout; large exports fit well under this.
pub const MAX_OUTPUT: usize = 50 * 1024 * 1024;

/// Listing filter applied when the client sends none.
pub const DEFAULT_FILTER: &str = "status:pending";

/// Overrides prepended to every invocation: no interactive confirmation,
/// no bulk-operation prompts, dependencies exported as JSON arrays.
const SAFETY_OVERRIDES: [&str; 3] = [
    "rc.confirmation=no",
    "rc.bulk=0",
    "rc.json.depends.array=yes",
];

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// One task record as exported by the external tool. Fields this server
/// does not interpret are kept in `extra` so they survive the round trip.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Task {
    pub uuid: String,
    pub description: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Annotation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Annotation {
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inbound mutation request from the HTTP client.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub description: Option<String>,
    pub project: Option<String>,
    pub due: Option<String>,
    pub tags: Option<Vec<String>>,
    pub uuid: Option<String>,
    pub modifications: Option<String>,
    pub text: Option<String>,
}

/// Seam between the HTTP layer and the external binary; tests script it.
pub trait TaskCli {
    fn run(&self, args: &[String]) -> CliResult<String>;
}

/// Invoker for the real taskwarrior binary.
pub struct TaskwarriorCli {
    bin: String,
    taskrc: PathBuf,
    taskdata: PathBuf,
    timeout: Duration,
}

impl TaskwarriorCli {
    pub fn new(bin: &str, taskrc: PathBuf, taskdata: PathBuf, timeout: Duration) -> Self {
        Self {
            bin: bin.to_string(),
            taskrc,
            taskdata,
            timeout,
        }
    }

    /// Startup probe: the binary must run and exit 0.
    pub fn check_available(&self) -> CliResult<()> {
        self.run(&["--version".to_string()])?;
        Ok(())
    }
}

impl TaskCli for TaskwarriorCli {
    fn run(&self, args: &[String]) -> CliResult<String> {
        debug!(bin = %self.bin, args = ?args, "executing task command");

        let mut child = Command::new(&self.bin)
            .args(SAFETY_OVERRIDES)
            .args(args)
            .env("TASKRC", &self.taskrc)
            .env("TASKDATA", &self.taskdata)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CliError::NotFound
                } else {
                    CliError::Spawn(e)
                }
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            CliError::Spawn(std::io::Error::other("stdout pipe not captured"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            CliError::Spawn(std::io::Error::other("stderr pipe not captured"))
        })?;

        // Drain the pipes off-thread so a chatty child cannot deadlock the
        // try_wait loop below. Bytes past the cap are read and discarded so
        // an oversized writer still runs to completion instead of blocking
        // on a full pipe.
        let out_reader =
            std::thread::spawn(move || drain_capped(&mut stdout, MAX_OUTPUT));
        let err_reader =
            std::thread::spawn(move || drain_capped(&mut stderr, MAX_OUTPUT));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        let secs = self.timeout.as_secs();
                        error!(secs, "task command timed out, child killed");
                        return Err(CliError::TimedOut { secs });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        };

        let (out_buf, out_truncated) = out_reader
            .join()
            .map_err(|_| CliError::Spawn(std::io::Error::other("stdout reader panicked")))?;
        let (err_buf, _) = err_reader
            .join()
            .map_err(|_| CliError::Spawn(std::io::Error::other("stderr reader panicked")))?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&err_buf).trim().to_string();
            let code = status.code().unwrap_or(-1);
            error!(code, stderr = %stderr, "task command failed");
            return Err(CliError::CommandFailed { code, stderr });
        }
        if out_truncated {
            return Err(CliError::OutputTooLarge { limit: MAX_OUTPUT });
        }
        Ok(String::from_utf8_lossy(&out_buf).into_owned())
    }
}

/// Reads a stream to EOF, keeping at most `cap` bytes and discarding the
/// rest; the truncated flag reports whether anything was discarded.
fn drain_capped<R: Read>(reader: &mut R, cap: usize) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = cap.saturating_sub(buf.len());
                if n > room {
                    truncated = true;
                }
                buf.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    (buf, truncated)
}

/// Argument vector for a list: the filter expression in the tool's own
/// grammar, whitespace-split, followed by `export`.
pub fn list_args(filter: &str) -> Vec<String> {
    let filter = if filter.trim().is_empty() {
        DEFAULT_FILTER
    } else {
        filter
    };
    let mut args: Vec<String> = filter.split_whitespace().map(str::to_string).collect();
    args.push("export".to_string());
    args
}

/// Argument vector for a mutation, or a message naming what is wrong with
/// the request (unknown action, missing required field).
pub fn mutation_args(req: &ActionRequest) -> Result<Vec<String>, String> {
    match req.action.as_str() {
        "add" => {
            let description = req
                .description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| "add requires a description".to_string())?;
            let mut args = vec!["add".to_string(), description.to_string()];
            if let Some(project) = &req.project {
                args.push(format!("project:{project}"));
            }
            if let Some(due) = &req.due {
                args.push(format!("due:{due}"));
            }
            if let Some(tags) = &req.tags {
                for tag in tags {
                    args.push(format!("+{tag}"));
                }
            }
            Ok(args)
        }
        "done" | "delete" | "start" | "stop" => {
            let uuid = require_uuid(req)?;
            Ok(vec![uuid.to_string(), req.action.clone()])
        }
        "modify" => {
            let uuid = require_uuid(req)?;
            let mut args = vec![uuid.to_string(), "modify".to_string()];
            if let Some(modifications) = &req.modifications {
                args.extend(modifications.split_whitespace().map(str::to_string));
            }
            Ok(args)
        }
        "annotate" => {
            let uuid = require_uuid(req)?;
            let mut args = vec![uuid.to_string(), "annotate".to_string()];
            if let Some(text) = &req.text {
                if !text.is_empty() {
                    args.push(text.clone());
                }
            }
            Ok(args)
        }
        other => Err(format!("unknown action '{other}'")),
    }
}

fn require_uuid(req: &ActionRequest) -> Result<&str, String> {
    req.uuid
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| format!("{} requires a uuid", req.action))
}

/// Run a list and parse the export output, preserving record order.
pub fn export_tasks(cli: &dyn TaskCli, filter: &str) -> CliResult<Vec<Task>> {
    let raw = cli.run(&list_args(filter))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// TaskCli fake that records every argument vector it receives and
    /// replays one scripted response.
    pub struct ScriptedCli {
        response: CliResult<String>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedCli {
        pub fn ok(output: &str) -> Self {
            Self {
                response: Ok(output.to_string()),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn err(error: CliError) -> Self {
            Self {
                response: Err(error),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    impl TaskCli for ScriptedCli {
        fn run(&self, args: &[String]) -> CliResult<String> {
            self.calls.borrow_mut().push(args.to_vec());
            match &self.response {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(clone_error(e)),
            }
        }
    }

    fn clone_error(e: &CliError) -> CliError {
        match e {
            CliError::NotFound => CliError::NotFound,
            CliError::CommandFailed { code, stderr } => CliError::CommandFailed {
                code: *code,
                stderr: stderr.clone(),
            },
            CliError::TimedOut { secs } => CliError::TimedOut { secs: *secs },
            CliError::OutputTooLarge { limit } => CliError::OutputTooLarge { limit: *limit },
            CliError::Spawn(err) => {
                CliError::Spawn(std::io::Error::new(err.kind(), err.to_string()))
            }
            CliError::Parse(_) => CliError::Parse(
                serde_json::from_str::<Value>("not json").expect_err("invalid json"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedCli;
    use super::*;

    fn req(action: &str) -> ActionRequest {
        ActionRequest {
            action: action.to_string(),
            description: None,
            project: None,
            due: None,
            tags: None,
            uuid: None,
            modifications: None,
            text: None,
        }
    }

    #[test]
    fn list_args_defaults_to_pending() {
        assert_eq!(list_args(""), vec!["status:pending", "export"]);
        assert_eq!(list_args("   "), vec!["status:pending", "export"]);
    }

    #[test]
    fn list_args_splits_filter_words() {
        assert_eq!(
            list_args("status:pending +next"),
            vec!["status:pending", "+next", "export"]
        );
    }

    #[test]
    fn add_builds_full_argument_vector() {
        let mut r = req("add");
        r.description = Some("Buy milk".to_string());
        r.project = Some("home.errands".to_string());
        r.due = Some("20260901".to_string());
        r.tags = Some(vec!["urgent".to_string(), "shop".to_string()]);
        assert_eq!(
            mutation_args(&r).unwrap(),
            vec![
                "add",
                "Buy milk",
                "project:home.errands",
                "due:20260901",
                "+urgent",
                "+shop"
            ]
        );
    }

    #[test]
    fn add_description_stays_one_argument() {
        let mut r = req("add");
        r.description = Some("echo pwned; rm -rf /".to_string());
        let args = mutation_args(&r).unwrap();
        assert_eq!(args, vec!["add", "echo pwned; rm -rf /"]);
    }

    #[test]
    fn add_without_description_is_rejected() {
        let mut r = req("add");
        r.description = Some("  ".to_string());
        assert!(mutation_args(&r).is_err());
        assert!(mutation_args(&req("add")).is_err());
    }

    #[test]
    fn uuid_verbs_build_uuid_then_verb() {
        for verb in ["done", "delete", "start", "stop"] {
            let mut r = req(verb);
            r.uuid = Some("abc-123".to_string());
            assert_eq!(mutation_args(&r).unwrap(), vec!["abc-123", verb]);
        }
    }

    #[test]
    fn uuid_verbs_require_uuid() {
        for verb in ["done", "delete", "start", "stop", "modify", "annotate"] {
            let err = mutation_args(&req(verb)).unwrap_err();
            assert!(err.contains("uuid"), "{verb}: {err}");
        }
    }

    #[test]
    fn modify_splits_modification_words() {
        let mut r = req("modify");
        r.uuid = Some("abc".to_string());
        r.modifications = Some("project:work +next due:tomorrow".to_string());
        assert_eq!(
            mutation_args(&r).unwrap(),
            vec!["abc", "modify", "project:work", "+next", "due:tomorrow"]
        );
    }

    #[test]
    fn annotate_keeps_text_as_one_argument() {
        let mut r = req("annotate");
        r.uuid = Some("abc".to_string());
        r.text = Some("see ticket #42".to_string());
        assert_eq!(
            mutation_args(&r).unwrap(),
            vec!["abc", "annotate", "see ticket #42"]
        );
    }

    #[test]
    fn annotate_without_text_omits_argument() {
        let mut r = req("annotate");
        r.uuid = Some("abc".to_string());
        assert_eq!(mutation_args(&r).unwrap(), vec!["abc", "annotate"]);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = mutation_args(&req("purge")).unwrap_err();
        assert!(err.contains("unknown action"));
    }

    #[test]
    fn export_parses_records_in_order() {
        let cli = ScriptedCli::ok(
            r#"[
                {"uuid":"u1","description":"first","status":"pending","urgency":9.1,
                 "entry":"20260801T120000Z","tags":["a","b"]},
                {"uuid":"u2","description":"second","status":"completed",
                 "annotations":[{"description":"note","entry":"20260802T000000Z"}]}
            ]"#,
        );
        let tasks = export_tasks(&cli, "status:pending").unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].uuid, "u1");
        assert_eq!(tasks[0].urgency, Some(9.1));
        assert_eq!(tasks[0].extra["entry"], "20260801T120000Z");
        assert_eq!(tasks[1].uuid, "u2");
        let notes = tasks[1].annotations.as_ref().unwrap();
        assert_eq!(notes[0].description, "note");
        assert_eq!(
            cli.calls()[0],
            vec!["status:pending".to_string(), "export".to_string()]
        );
    }

    #[test]
    fn export_treats_blank_output_as_empty() {
        let cli = ScriptedCli::ok("\n");
        assert!(export_tasks(&cli, "").unwrap().is_empty());
    }

    #[test]
    fn export_propagates_cli_failure() {
        let cli = ScriptedCli::err(CliError::CommandFailed {
            code: 2,
            stderr: "no matches".to_string(),
        });
        assert!(matches!(
            export_tasks(&cli, "bogus((filter"),
            Err(CliError::CommandFailed { .. })
        ));
    }

    #[test]
    fn export_propagates_parse_failure() {
        let cli = ScriptedCli::ok("You have 3 tasks.");
        assert!(matches!(
            export_tasks(&cli, ""),
            Err(CliError::Parse(_))
        ));
    }

    #[test]
    fn drain_capped_keeps_reading_past_the_cap() {
        let data = vec![7u8; 20_000];
        let mut cursor = std::io::Cursor::new(data);
        let (buf, truncated) = drain_capped(&mut cursor, 1_000);
        assert_eq!(buf.len(), 1_000);
        assert!(truncated);
        // the stream must be consumed to EOF, not abandoned at the cap
        assert_eq!(cursor.position(), 20_000);
    }

    #[test]
    fn drain_capped_exact_fit_is_not_truncated() {
        let mut cursor = std::io::Cursor::new(vec![1u8; 512]);
        let (buf, truncated) = drain_capped(&mut cursor, 512);
        assert_eq!(buf.len(), 512);
        assert!(!truncated);
    }

    #[test]
    fn task_round_trips_passthrough_fields() {
        let raw = r#"{"uuid":"u","description":"d","status":"pending","id":4,"modified":"20260801T120000Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["id"], 4);
        assert_eq!(back["modified"], "20260801T120000Z");
        assert!(back.get("project").is_none());
    }
}
