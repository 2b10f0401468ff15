//! Test doubles for the external process and network seams

use async_trait::async_trait;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Mutex;
use sugarbuild_client::ClientError;

use crate::command::{CommandError, CommandOutput, CommandRunner, OutputSink};
use crate::pipeline::DumpSource;

#[derive(Debug, Clone, Default)]
struct Reply {
    stdout: String,
    stderr: String,
}

struct Rule {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// Records every command and answers with scripted output
///
/// A command is answered by the first rule whose pattern it contains.
/// Replies for a rule are used in order; the last one repeats. Commands
/// with no matching rule succeed with empty output.
#[derive(Default)]
pub struct ScriptedCommandRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.push(
            pattern,
            Reply {
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    pub fn respond_stderr(&self, pattern: &str, stderr: &str) {
        self.push(
            pattern,
            Reply {
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
    }

    fn push(&self, pattern: &str, reply: Reply) {
        let mut rules = self.rules.lock().unwrap();
        match rules.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => rule.replies.push_back(reply),
            None => rules.push(Rule {
                pattern: pattern.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    fn reply_for(&self, command: &str) -> Reply {
        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules.iter_mut().find(|r| command.contains(&r.pattern)) else {
            return Reply::default();
        };
        if rule.replies.len() > 1 {
            rule.replies.pop_front().unwrap_or_default()
        } else {
            rule.replies.front().cloned().unwrap_or_default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded commands containing `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run_with_sink(
        &self,
        command: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(command.to_string());
        let reply = self.reply_for(command);
        let output = CommandOutput {
            stdout: reply.stdout.clone(),
            stderr: reply.stderr.clone(),
            exit_code: Some(0),
        };

        let mut flow = ControlFlow::Continue(());
        for line in reply.stdout.split_inclusive('\n') {
            flow = sink.on_stdout(line);
            if flow.is_break() {
                break;
            }
        }
        if flow.is_continue() && !reply.stderr.is_empty() {
            flow = sink.on_stderr(&reply.stderr);
        }

        match flow {
            ControlFlow::Continue(()) => Ok(output),
            ControlFlow::Break(reason) => Err(CommandError::Interrupted {
                command: command.to_string(),
                reason,
                output,
            }),
        }
    }
}

/// Serves one fixed dump, or reports every dump as missing
pub struct StaticDumpSource {
    dump: Option<String>,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl StaticDumpSource {
    pub fn new(dump: &str) -> Self {
        Self {
            dump: Some(dump.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn missing() -> Self {
        Self {
            dump: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DumpSource for StaticDumpSource {
    async fn fetch_dump(&self, host: &str, branch: &str, flavor: &str) -> Result<String, ClientError> {
        self.requests
            .lock()
            .unwrap()
            .push((host.to_string(), branch.to_string(), flavor.to_string()));
        self.dump
            .clone()
            .ok_or_else(|| ClientError::NotFound(format!("No data file for ({}) found.", branch)))
    }
}
