#![allow(dead_code)]

use std::{collections::VecDeque, env, sync::Mutex};

use async_trait::async_trait;
use clap::Parser as _;
use harness_core::{
    TestArgs,
    backend::{Backend, BackendError, StackCommand},
};

/// Sets an environment variable for the guard's lifetime, removing it on
/// drop so a panicking test cannot poison the ones after it. Callers are
/// expected to hold it inside `#[serial]` tests.
pub struct EnvVarGuard {
    key: &'static str,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        // SAFETY: mutating tests are serialized and nothing reads the
        // variable concurrently.
        unsafe { env::set_var(key, value) };
        Self { key }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: same serialization as in `set`.
        unsafe { env::remove_var(self.key) };
    }
}

/// Scripted stand-in for the stack CLI: records every argv it sees and
/// serves canned status documents. The last status in the script repeats
/// once the queue drains, like a real environment that has settled.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<Vec<String>>>,
    statuses: Mutex<VecDeque<String>>,
    active_env: Option<String>,
    fail_on: Option<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(mut self, statuses: &[&str]) -> Self {
        self.statuses = Mutex::new(statuses.iter().map(|raw| (*raw).to_owned()).collect());
        self
    }

    pub fn with_active_environment(mut self, name: &str) -> Self {
        self.active_env = Some(name.to_owned());
        self
    }

    /// Make every invocation of the given subcommand exit non-zero.
    pub fn failing_on(mut self, subcommand: &str) -> Self {
        self.fail_on = Some(subcommand.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// The subcommand of each recorded invocation, global flags skipped.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|args| subcommand_of(args))
            .collect()
    }

    pub fn count(&self, subcommand: &str) -> usize {
        self.subcommands()
            .iter()
            .filter(|name| *name == subcommand)
            .count()
    }

    fn next_status(&self) -> String {
        let mut statuses = self.statuses.lock().expect("statuses lock");
        if statuses.len() > 1 {
            statuses.pop_front().expect("queue is non-empty")
        } else {
            statuses.front().cloned().unwrap_or_else(|| "{}".to_owned())
        }
    }
}

fn subcommand_of(args: &[String]) -> String {
    args.iter()
        .find(|arg| !arg.starts_with("--"))
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn output(&self, command: &StackCommand) -> Result<String, BackendError> {
        let args = command.args().to_vec();
        let subcommand = subcommand_of(&args);
        self.calls.lock().expect("calls lock").push(args);

        if self.fail_on.as_deref() == Some(subcommand.as_str()) {
            return Err(BackendError::Failed {
                command: command.description().to_owned(),
                status: Some(1),
                stdout: String::new(),
                stderr: format!("scripted {subcommand} failure"),
            });
        }

        match subcommand.as_str() {
            "status" => Ok(self.next_status()),
            "switch" => Ok(self.active_env.clone().unwrap_or_default()),
            _ => Ok(String::new()),
        }
    }
}

/// Parse driver arguments the way an assessment binary would.
pub fn test_args(extra: &[&str]) -> TestArgs {
    let mut argv = vec!["assess"];
    argv.extend_from_slice(extra);
    TestArgs::parse_from(argv)
}

pub const STATUS_ALL_STARTED: &str = r#"
environment: shared-env
machines:
  "0":
    agent-state: started
  "1":
    agent-state: started
applications:
  ubuntu:
    units:
      ubuntu/0:
        agent-state: started
      ubuntu/1:
        agent-state: started
"#;

pub const STATUS_PENDING: &str = r#"
environment: shared-env
machines:
  "0":
    agent-state: started
  "1":
    agent-state: pending
applications:
  ubuntu:
    units:
      ubuntu/0:
        agent-state: started
      ubuntu/1:
        agent-state: pending
"#;

pub const STATUS_ERRORED: &str = r#"
environment: shared-env
machines:
  "0":
    agent-state: started
applications:
  ubuntu:
    units:
      ubuntu/0:
        agent-state: error
        agent-state-info: 'hook failed: "install"'
"#;
