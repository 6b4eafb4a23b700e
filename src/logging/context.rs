use crate::cli::Command;

/// How the current process runs, which decides where console logs go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogContext {
    /// One-shot commands whose stdout carries JSON results.
    LocalCli,
    /// Long-running webhook server.
    Daemon,
}

pub fn detect_context(command: &Command) -> LogContext {
    match command {
        Command::Serve(_) => LogContext::Daemon,
        Command::List(_) | Command::Setup(_) | Command::Run(_) | Command::Sync(_) => {
            LogContext::LocalCli
        }
    }
}
