use core::fmt;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    fmt::Debug,
    process::{ExitStatus, Stdio},
    str::Utf8Error,
    sync::atomic::{AtomicUsize, Ordering},
};

use owo_colors::{AnsiColors, OwoColorize};
use stacked_errors::{bail_locationless, Result, StackableErr};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    process,
    task::{self, JoinHandle},
};
use tracing::debug;

// cycled through so that interleaved output from concurrent commands can be
// told apart
const PREFIX_COLORS: [AnsiColors; 6] = [
    AnsiColors::Blue,
    AnsiColors::Green,
    AnsiColors::Magenta,
    AnsiColors::Cyan,
    AnsiColors::Yellow,
    AnsiColors::Red,
];
static PREFIX_COLOR_NUM: AtomicUsize = AtomicUsize::new(0);

fn next_terminal_color() -> AnsiColors {
    PREFIX_COLORS[PREFIX_COLOR_NUM.fetch_add(1, Ordering::Relaxed) % PREFIX_COLORS.len()]
}

/// An OS command, this is `tokio::process::Command` wrapped with the recording
/// and forwarding functionality this crate needs.
#[derive(Clone, Default)]
pub struct Command {
    /// The program to run
    pub program: OsString,
    /// All the arguments that will be passed to the program
    pub args: Vec<OsString>,
    /// Forward the command's stdout to the current process stdout, with a
    /// colored line prefix
    pub stdout_debug: bool,
    /// Forward the command's stderr to the current process stderr, with a
    /// colored line prefix
    pub stderr_debug: bool,
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Command {{ {} }}", self.get_unified_command()))
    }
}

impl Command {
    /// Creates a `Command` from `program_with_args` separated by whitespace,
    /// the first part becoming the program and the others being inserted as
    /// args. In case an argument has spaces, it should be added with
    /// [Command::arg] as an unbroken `&str` instead.
    pub fn new(program_with_args: impl AsRef<str>) -> Self {
        let mut program = OsString::new();
        let mut args: Vec<OsString> = vec![];
        for (i, part) in program_with_args.as_ref().split_whitespace().enumerate() {
            if i == 0 {
                program = part.into();
            } else {
                args.push(part.into());
            }
        }
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Adds an argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().into());
        self
    }

    /// Sets `stdout_debug` and `stderr_debug` for passing the command's
    /// standard streams to the standard streams of this process
    pub fn debug(mut self, std_stream_debug: bool) -> Self {
        self.stdout_debug = std_stream_debug;
        self.stderr_debug = std_stream_debug;
        self
    }

    /// Gets the program and args interspersed with spaces
    pub(crate) fn get_unified_command(&self) -> String {
        let mut command = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            command += " ";
            command += arg.to_string_lossy().as_ref();
        }
        command
    }

    /// Runs the command to completion with a null stdin, recording its stdout
    /// and stderr. Note: success only means that the OS calls succeeded, use
    /// [CommandResult::assert_success] to check the exit status of the command
    /// itself.
    pub async fn run_to_completion(self) -> Result<CommandResult> {
        debug!("running `{}`", self.get_unified_command());
        let mut cmd = process::Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .stack_err_with(|| format!("{self:?}.run_to_completion() -> failed to spawn"))?;
        if !(self.stdout_debug || self.stderr_debug) {
            let output = child.wait_with_output().await.stack_err_with(|| {
                format!("{self:?}.run_to_completion() -> failed when waiting on child")
            })?;
            return Ok(CommandResult {
                command: self,
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
        // in forwarding mode the streams are copied line by line so that a
        // distinguishing prefix can be inserted, recording along the way
        let child_id = child.id().unwrap_or(0);
        let program_name = self.program.to_string_lossy();
        let color = next_terminal_color();
        let stdout_prefix = format!("{program_name} {child_id}  | ")
            .color(color)
            .to_string();
        let stderr_prefix = format!("{program_name} {child_id} E| ")
            .color(color)
            .to_string();
        let stdout_read = BufReader::new(child.stdout.take().unwrap());
        let stderr_read = BufReader::new(child.stderr.take().unwrap());
        let mut handles: Vec<JoinHandle<Vec<u8>>> = vec![];
        handles.push(task::spawn(recorder(
            stdout_read,
            self.stdout_debug
                .then(|| (tokio::io::stdout(), stdout_prefix)),
        )));
        handles.push(task::spawn(recorder(
            stderr_read,
            self.stderr_debug
                .then(|| (tokio::io::stderr(), stderr_prefix)),
        )));
        let status = child.wait().await.stack_err_with(|| {
            format!("{self:?}.run_to_completion() -> failed when waiting on child")
        })?;
        let stdout = handles
            .remove(0)
            .await
            .stack_err("Command stdout recorder task panicked")?;
        let stderr = handles
            .remove(0)
            .await
            .stack_err("Command stderr recorder task panicked")?;
        Ok(CommandResult {
            command: self,
            status,
            stdout,
            stderr,
        })
    }
}

/// Used as the engine of the stdout and stderr recording tasks. `expect`s are
/// only used in here because it is spawned as a separate task.
async fn recorder<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    std_read: BufReader<R>,
    mut std_forward: Option<(W, String)>,
) -> Vec<u8> {
    let mut record = vec![];
    let mut segments = std_read.split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(mut line)) => {
                line.push(b'\n');
                record.extend_from_slice(&line);
                if let Some((ref mut std_forward, ref prefix)) = std_forward {
                    let line_string = String::from_utf8_lossy(&line);
                    std_forward
                        .write_all(format!("{prefix}{line_string}").as_bytes())
                        .await
                        .expect("Command stream forwarding failed on write");
                    std_forward
                        .flush()
                        .await
                        .expect("Command stream forwarding failed on flush");
                }
            }
            Ok(None) => break,
            Err(e) => panic!("Command stream recording failed on read: {e}"),
        }
    }
    record
}

/// The result of a [Command](crate::Command)
#[must_use]
#[derive(Clone)]
pub struct CommandResult {
    // the command information is kept around for failures
    pub command: Command,
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Debug for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "CommandResult {{\ncommand: {:?},\nstatus: {:?},\n",
            self.command, self.status
        ))?;
        let stdout = self.stdout_as_utf8_lossy();
        if !stdout.is_empty() {
            f.write_fmt(format_args!("stdout: {stdout}\n,"))?;
        }
        let stderr = self.stderr_as_utf8_lossy();
        if !stderr.is_empty() {
            f.write_fmt(format_args!("stderr: {stderr}\n,"))?;
        }
        f.write_fmt(format_args!("}}"))
    }
}

impl CommandResult {
    /// Returns if the command completed with a successful return status
    pub fn successful(&self) -> bool {
        self.status.success()
    }

    /// Returns a formatted error with relevant information if the command was
    /// not successful
    pub fn assert_success(&self) -> Result<()> {
        if self.status.success() {
            Ok(())
        } else {
            bail_locationless!("{self:#?}.assert_success() -> unsuccessful")
        }
    }

    /// Returns `str::from_utf8(&self.stdout)`
    pub fn stdout_as_utf8(&self) -> std::result::Result<&str, Utf8Error> {
        std::str::from_utf8(&self.stdout)
    }

    /// Returns `String::from_utf8_lossy(&self.stdout)`
    pub fn stdout_as_utf8_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Returns `String::from_utf8_lossy(&self.stderr)`
    pub fn stderr_as_utf8_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unified_command() {
        let command = Command::new("docker ps").arg("-a");
        assert_eq!(command.get_unified_command(), "docker ps -a");
        assert_eq!(format!("{command:?}"), "Command { docker ps -a }");
    }

    #[tokio::test]
    async fn records_stdout() {
        let comres = Command::new("echo hello").run_to_completion().await.unwrap();
        comres.assert_success().unwrap();
        assert_eq!(comres.stdout_as_utf8().unwrap().trim(), "hello");
    }

    #[tokio::test]
    async fn unsuccessful_status_is_reported() {
        let comres = Command::new("false").run_to_completion().await.unwrap();
        assert!(!comres.successful());
        assert!(comres.assert_success().is_err());
    }
}
