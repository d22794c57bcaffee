//! Blocking execution of container runtime commands
//!
//! Output of the child is streamed line by line into the log while it runs;
//! the call only returns once the child has exited.

use crate::error::CommandError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Runs one invocation of an external program to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the program with `args`; a nonzero exit is an error
    async fn run(&self, args: &[String]) -> Result<(), CommandError>;
}

/// Spawns a real child process
#[derive(Debug, Clone)]
pub struct ProcessCommandRunner {
    program: String,
    tag: String,
}

impl ProcessCommandRunner {
    pub fn new(program: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            tag: tag.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, args: &[String]) -> Result<(), CommandError> {
        debug!(program = %self.program, ?args, "Running command");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (stdout, stderr) = (child.stdout.take(), child.stderr.take());
        tokio::join!(
            forward_lines(stdout, &self.tag),
            forward_lines(stderr, &self.tag)
        );

        let status = child.wait().await.map_err(|source| CommandError::Wait {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(CommandError::NonZeroExit {
                program: self.program.clone(),
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

async fn forward_lines<R>(stream: Option<R>, tag: &str)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => info!(tag, "{line}"),
            Ok(None) => break,
            Err(error) => {
                debug!(tag, %error, "Stopped reading command output");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn successful_command_returns_ok() {
        let runner = ProcessCommandRunner::new("sh", "test");
        let result = runner.run(&shell("echo out; echo err 1>&2")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_with_code() {
        let runner = ProcessCommandRunner::new("sh", "test");
        let result = runner.run(&shell("echo failing; exit 3")).await;
        assert!(matches!(
            result,
            Err(CommandError::NonZeroExit { code: 3, ref program }) if program == "sh"
        ));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let runner = ProcessCommandRunner::new("lock-harness-no-such-binary", "test");
        let result = runner.run(&[]).await;
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }
}
