//! External command execution
//!
//! Every controller shells out through [`CommandRunner`] so parsing and
//! argument construction can be tested against canned output. Arguments
//! are always passed as argv; nothing goes through a shell.

use async_trait::async_trait;
use phantom_mac_core::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Trait for running external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output
    ///
    /// # Returns
    ///
    /// - `Ok(CommandOutput)`: The program ran (any exit status)
    /// - `Err(Error)`: The program could not be started
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Like [`run`](Self::run), failing once `limit` has elapsed
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        limit: Duration,
    ) -> Result<CommandOutput> {
        tokio::time::timeout(limit, self.run(program, args))
            .await
            .map_err(|_| Error::command(format!("{} timed out after {:?}", program, limit)))?
    }
}

/// Runs programs on the host via `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::command(format!("failed to start {}: {}", program, e)))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command and report whether it exited successfully
pub(crate) async fn succeeds<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> bool {
    match runner.run(program, args).await {
        Ok(output) if output.success() => true,
        Ok(output) => {
            tracing::warn!(
                "{} {} exited with {:?}: {}",
                program,
                args.join(" "),
                output.status,
                output.stderr.trim()
            );
            false
        }
        Err(e) => {
            tracing::warn!("{}", e);
            false
        }
    }
}

/// Run a command and return its stdout when it exited successfully
pub(crate) async fn stdout_of<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> Option<String> {
    match runner.run(program, args).await {
        Ok(output) if output.success() => Some(output.stdout),
        Ok(output) => {
            tracing::debug!(
                "{} {} exited with {:?}: {}",
                program,
                args.join(" "),
                output.status,
                output.stderr.trim()
            );
            None
        }
        Err(e) => {
            tracing::debug!("{}", e);
            None
        }
    }
}

/// Send a single echo request, bounded by `timeout` plus one second
pub(crate) async fn ping<R: CommandRunner + ?Sized>(
    runner: &R,
    args: &[&str],
    timeout: Duration,
) -> bool {
    match runner
        .run_with_timeout("ping", args, timeout + Duration::from_secs(1))
        .await
    {
        Ok(output) => output.success(),
        Err(e) => {
            tracing::debug!("ping failed: {}", e);
            false
        }
    }
}

/// Whole seconds for ping flags, never below one
pub(crate) fn whole_secs(timeout: Duration) -> u64 {
    timeout.as_secs().max(1)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRunner;
    use super::*;

    #[tokio::test]
    async fn test_succeeds_and_stdout() {
        let runner = ScriptedRunner::new()
            .ok("ip route show default", "default via 10.0.0.1 dev eth0\n")
            .fail("ip link set eth0 down");

        assert!(!succeeds(&runner, "ip", &["link", "set", "eth0", "down"]).await);
        assert!(!succeeds(&runner, "missing", &[]).await);
        assert_eq!(
            stdout_of(&runner, "ip", &["route", "show", "default"]).await.as_deref(),
            Some("default via 10.0.0.1 dev eth0\n")
        );
        assert_eq!(stdout_of(&runner, "ip", &["link", "set", "eth0", "down"]).await, None);
    }

    #[test]
    fn test_whole_secs() {
        assert_eq!(whole_secs(Duration::from_millis(200)), 1);
        assert_eq!(whole_secs(Duration::from_secs(5)), 5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = SystemCommandRunner.run("echo", &["hello"]).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");

        let missing = SystemCommandRunner
            .run("phantom-mac-definitely-not-installed", &[])
            .await;
        assert!(matches!(missing, Err(Error::Command(_))));
    }
}
