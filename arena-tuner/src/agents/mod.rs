mod command;
mod heuristic;

use anyhow::{Result, bail};
use arena_core::{NoChangeAgent, TuningAgent};
use clap::ValueEnum;
use std::fmt;

pub use command::CommandAgent;
pub use heuristic::HeuristicAgent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgentKind {
    /// Proportional attack-power controller
    Heuristic,
    /// Never change anything (measure only)
    None,
    /// External process speaking JSON over stdin/stdout
    Command,
}

impl AgentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::None => "none",
            Self::Command => "command",
        }
    }

    /// `command` is the external agent's program and arguments; only the
    /// `command` kind uses it.
    pub fn create_agent(self, command: &[String]) -> Result<Box<dyn TuningAgent>> {
        Ok(match self {
            Self::Heuristic => Box::new(HeuristicAgent::default()),
            Self::None => Box::new(NoChangeAgent),
            Self::Command => {
                if command.is_empty() {
                    bail!("--agent command requires --agent-command or a command after `--`");
                }
                Box::new(CommandAgent::from_argv(command)?)
            }
        })
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
