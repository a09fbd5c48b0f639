//! Agent backed by an external process speaking JSON over stdio.
//!
//! Each consultation spawns the command, writes one request document to its
//! stdin, closes it, and reads one reply document from stdout:
//!
//! ```json
//! {"side": "a", "parameter": "attack_power", "delta": -2.5, "rationale": "..."}
//! {"no_change": true}
//! {"changes": [{"side": "b", "parameter": "defense", "delta": 1.0}]}
//! ```
use anyhow::{Context, Result, bail};
use arena_core::{AgentContext, AgentError, AgentResponse, ParameterDelta, Side, TuningAgent};
use serde::Deserialize;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Runtime;

#[derive(Debug, Deserialize)]
struct AgentReply {
    #[serde(default)]
    no_change: bool,
    side: Option<Side>,
    parameter: Option<String>,
    delta: Option<f64>,
    #[serde(default)]
    changes: Vec<ParameterDelta>,
    rationale: Option<String>,
}

pub struct CommandAgent {
    program: String,
    args: Vec<String>,
    runtime: Runtime,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start agent runtime")?;
        Ok(Self {
            program: program.into(),
            args,
            runtime,
        })
    }

    /// Program followed by its arguments, passed through untouched.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("agent command is empty");
        };
        Self::new(program.clone(), args.to_vec())
    }

    async fn exchange(&self, payload: Vec<u8>) -> Result<Vec<u8>, AgentError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| transport(format!("failed to spawn `{}`: {err}", self.program)))?;

        // Feed stdin while draining stdout so neither pipe can fill up.
        let stdin = child.stdin.take();
        let write_request = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(&payload).await,
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(write_request, child.wait_with_output());

        let output = output.map_err(|err| transport(format!("failed to read reply: {err}")))?;
        match written {
            // The child may answer without reading the whole request.
            Err(err) if err.kind() != ErrorKind::BrokenPipe => {
                return Err(transport(format!("failed to write request: {err}")));
            }
            _ => {}
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(transport(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl TuningAgent for CommandAgent {
    fn name(&self) -> &'static str {
        "command"
    }

    fn propose_delta(&mut self, ctx: &AgentContext<'_>) -> Result<AgentResponse, AgentError> {
        let payload = serde_json::to_vec(&ctx.to_request())
            .map_err(|err| transport(format!("failed to encode request: {err}")))?;
        let timeout = ctx.timeout;
        let reply = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, self.exchange(payload)).await });
        match reply {
            Err(_) => Err(AgentError::Timeout {
                timeout_ms: millis(timeout),
            }),
            Ok(result) => parse_reply(&result?),
        }
    }
}

fn transport(message: String) -> AgentError {
    AgentError::Transport { message }
}

fn malformed(message: impl Into<String>) -> AgentError {
    AgentError::Malformed {
        message: message.into(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub fn parse_reply(stdout: &[u8]) -> Result<AgentResponse, AgentError> {
    let text = String::from_utf8_lossy(stdout);
    let reply: AgentReply =
        serde_json::from_str(text.trim()).map_err(|err| malformed(err.to_string()))?;

    let mut response = if reply.no_change {
        AgentResponse::no_change()
    } else {
        let mut deltas = reply.changes;
        match (reply.side, reply.parameter, reply.delta) {
            (Some(side), Some(parameter), Some(delta)) => {
                deltas.push(ParameterDelta::new(side, parameter, delta));
            }
            (None, None, None) => {}
            _ => return Err(malformed("side, parameter and delta must appear together")),
        }
        if deltas.is_empty() {
            return Err(malformed("reply proposes neither a change nor no_change"));
        }
        AgentResponse::change(deltas)
    };
    response.rationale = reply.rationale;
    Ok(response)
}
