//! A tool for executing the external binaries (`yt-dlp`, `which`).

use crate::error::{Error, Result};
use log::debug;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Represents a command executor.
///
/// No timeout is applied: a process runs until it exits.
///
/// # Example
///
/// ```rust,no_run
/// # use std::path::PathBuf;
/// # use tubetrack::executor::Executor;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = Executor::new(PathBuf::from("yt-dlp"), vec!["--version".to_string()]);
///
/// let output = executor.execute().await?;
/// println!("Output: {}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Executor {
    /// The path to the command executable.
    pub executable_path: PathBuf,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
}

/// Represents the output of a process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    /// The stdout of the process.
    pub stdout: String,
    /// The stderr of the process.
    pub stderr: String,
    /// The exit code of the process.
    pub code: i32,
}

impl Executor {
    pub fn new(executable_path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable_path: executable_path.into(),
            args,
        }
    }

    fn command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.executable_path);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.stdin(Stdio::null());

        #[cfg(target_os = "windows")]
        {
            command.creation_flags(0x08000000);
        }

        command.args(&self.args);
        command
    }

    /// Executes the command and returns the whole output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be spawned or exited unsuccessfully.
    pub async fn execute(&self) -> Result<ProcessOutput> {
        debug!("Executing command: {:?}", self);

        // Both pipes are drained concurrently by `wait_with_output`, so a
        // large JSON dump on stdout cannot block the child.
        let output = self.command().spawn()?.wait_with_output().await?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| Error::Command("Failed to parse stdout as UTF-8".to_string()))?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let code = output.status.code().unwrap_or(-1);
        if output.status.success() {
            return Ok(ProcessOutput {
                stdout,
                stderr,
                code,
            });
        }

        Err(Error::Command(format!(
            "Process failed with code {}: {}",
            code,
            stderr.trim()
        )))
    }

    /// Executes the command, handing every stdout line to `on_line` as it arrives.
    ///
    /// Stderr is collected in the background and only surfaced when the process fails.
    pub async fn execute_streaming<F>(&self, mut on_line: F) -> Result<i32>
    where
        F: FnMut(&str),
    {
        debug!("Executing streaming command: {:?}", self);

        let mut child = self.command().spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Command("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Command("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            tokio::io::copy(&mut BufReader::new(stderr), &mut buffer).await?;
            Ok::<Vec<u8>, std::io::Error>(buffer)
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            on_line(&line);
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await??;

        let code = status.code().unwrap_or(-1);
        if status.success() {
            return Ok(code);
        }

        Err(Error::Command(format!(
            "Process failed with code {}: {}",
            code,
            String::from_utf8_lossy(&stderr).trim()
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Executor {
        Executor::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn captures_stdout() {
        let output = sh("printf hello").execute().await.unwrap();
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.code, 0);
    }

    #[tokio::test]
    async fn failing_process_reports_stderr() {
        let err = sh("echo broken >&2; exit 3").execute().await.unwrap_err();
        match err {
            Error::Command(message) => {
                assert!(message.contains("code 3"));
                assert!(message.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn streams_lines_in_order() {
        let mut seen = Vec::new();
        let code = sh("echo one; echo two; echo three")
            .execute_streaming(|line| seen.push(line.to_string()))
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(seen, vec!["one", "two", "three"]);
    }
}
