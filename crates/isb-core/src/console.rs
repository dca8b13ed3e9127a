//! Operator console: line commands read from stdin on a dedicated thread.
//!
//! The loop blocks on input and on identity lookups, so it must never run on
//! a runtime worker. Lookups are driven on the main runtime through a
//! [`Handle`]; store writes go through the blocking store variants.

use std::{
    io::{BufRead, Write},
    sync::Arc,
};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{
    audit::{AuditEvent, AuditLogger},
    domain::UserId,
    errors::Error,
    moderation::{parse_target_id, Moderation, ModerationAction},
    Result,
};

pub const HELP_TEXT: &str = "Available console commands:\n\
!ban, arguments: id;\n\
!unban, arguments: id;\n\
!make-an-admin, arguments: id;\n\
!make-a-user, arguments: id;\n\
!help, arguments: none";

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Unknown command.")]
    UnknownCommand,
    #[error("Too few arguments for this command.")]
    TooFewArguments,
    #[error("Too many arguments for this command.")]
    TooManyArguments,
    #[error("Wrong arguments for this command.")]
    WrongArguments,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Moderate(ModerationAction, UserId),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, ConsoleError> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ConsoleError::UnknownCommand)?;
        let args: Vec<&str> = words.collect();

        if name == "!help" {
            if !args.is_empty() {
                return Err(ConsoleError::TooManyArguments);
            }
            return Ok(ConsoleCommand::Help);
        }

        let action = ModerationAction::from_command(name).ok_or(ConsoleError::UnknownCommand)?;
        match args.as_slice() {
            [] => Err(ConsoleError::TooFewArguments),
            [id] => parse_target_id(id)
                .map(|id| ConsoleCommand::Moderate(action, id))
                .map_err(|_| ConsoleError::WrongArguments),
            _ => Err(ConsoleError::TooManyArguments),
        }
    }
}

pub struct Console {
    moderation: Arc<Moderation>,
    rt: Handle,
    audit: Arc<AuditLogger>,
}

impl Console {
    pub fn new(moderation: Arc<Moderation>, rt: Handle, audit: Arc<AuditLogger>) -> Self {
        Self {
            moderation,
            rt,
            audit,
        }
    }

    pub fn execute(&self, cmd: ConsoleCommand) -> String {
        match cmd {
            ConsoleCommand::Help => HELP_TEXT.to_string(),
            ConsoleCommand::Moderate(action, target) => {
                match self.moderation.apply_blocking(&self.rt, action, target) {
                    Ok(outcome) => format!("{}\nID: {}", action.log_line(outcome), target.0),
                    Err(Error::UnknownIdentity(_)) => {
                        format!("User doesn't exist!\nID: {}", target.0)
                    }
                    Err(e) => format!("Failed to {} {}: {e}", action.as_str(), target.0),
                }
            }
        }
    }

    /// Process one input line and return the console response.
    pub fn handle_line(&self, line: &str) -> String {
        tracing::info!("Processed console command - {line}");
        self.audit.record(AuditEvent::console(line));

        match ConsoleCommand::parse(line) {
            Ok(cmd) => self.execute(cmd),
            Err(e) => {
                tracing::warn!("{e}");
                e.to_string()
            }
        }
    }

    /// Read commands until EOF or cancellation. Responses go to `out`.
    pub fn run<R: BufRead, W: Write>(
        &self,
        input: R,
        mut out: W,
        cancel: &CancellationToken,
    ) -> Result<()> {
        writeln!(out, "{HELP_TEXT}\n")?;
        for line in input.lines() {
            if cancel.is_cancelled() {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line);
            writeln!(out, "{response}\n")?;
            out.flush()?;
        }
        tracing::info!("console input closed");
        Ok(())
    }
}
