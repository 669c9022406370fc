use std::fmt;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How long to keep reading output once the process itself is gone
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// A fully resolved external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable to spawn (binary name or absolute path)
    pub program: String,

    /// Arguments, in order
    pub args: Vec<String>,

    /// Short label used to prefix logged output lines
    pub label: String,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            label: label.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a finished (or abandoned) process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exited with status zero before the deadline
    Success,
    /// Exited before the deadline with a nonzero status. `code` is `None`
    /// when the process was terminated by a signal.
    Failed { code: Option<i32> },
    /// Still running at the deadline; it was killed
    TimedOut,
}

/// Result of one external process run
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Exit code, if the process exited on its own
    pub exit_code: Option<i32>,

    /// Combined stdout/stderr, one line per output line, in arrival order
    pub output: String,

    /// Whether the deadline was exceeded
    pub timed_out: bool,
}

impl ProcessResult {
    pub fn outcome(&self) -> ProcessOutcome {
        if self.timed_out {
            ProcessOutcome::TimedOut
        } else if self.exit_code == Some(0) {
            ProcessOutcome::Success
        } else {
            ProcessOutcome::Failed {
                code: self.exit_code,
            }
        }
    }

    pub fn success(&self) -> bool {
        self.outcome() == ProcessOutcome::Success
    }
}

/// Run `cmd`, waiting at most `deadline` for it to exit.
///
/// Both output streams are read line by line as they arrive; each line is
/// logged under the command's label and appended to the returned output.
/// The deadline applies to the process exiting; output still buffered after
/// that is collected for a short grace period. A process still running at the
/// deadline is killed and reaped before this returns. Only a failure to spawn
/// the process is reported as `Err`.
pub async fn run(cmd: &CommandSpec, deadline: Duration) -> io::Result<ProcessResult> {
    debug!("[{}] running: {}", cmd.label, cmd);

    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    let mut readers = Vec::new();

    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_lines(stdout, line_tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_lines(stderr, line_tx.clone())));
    }
    drop(line_tx);

    let mut output = String::new();
    let expired = tokio::time::sleep(deadline);
    tokio::pin!(expired);

    // The deadline covers the process itself, not its pipes: a background
    // grandchild may keep them open long after the tool has exited.
    let mut streams_open = true;
    let status = loop {
        tokio::select! {
            line = line_rx.recv(), if streams_open => match line {
                Some(line) => {
                    debug!("[{}] {}", cmd.label, line);
                    output.push_str(&line);
                    output.push('\n');
                }
                None => streams_open = false,
            },
            status = child.wait() => break Some(status?),
            _ = &mut expired => break None,
        }
    };

    let timed_out = status.is_none();
    if timed_out {
        warn!(
            "[{}] still running after {}s, killing",
            cmd.label,
            deadline.as_secs()
        );
        if let Err(e) = child.kill().await {
            warn!("[{}] failed to kill process: {}", cmd.label, e);
        }
    }

    drain_lines(&mut line_rx, &mut output, &cmd.label).await;
    for reader in readers {
        reader.abort();
    }

    Ok(ProcessResult {
        exit_code: status.and_then(|s| s.code()),
        output,
        timed_out,
    })
}

/// Collect lines the readers still deliver after the process has ended,
/// giving up after `OUTPUT_GRACE` if something else holds the pipes open
async fn drain_lines(
    line_rx: &mut mpsc::UnboundedReceiver<String>,
    output: &mut String,
    label: &str,
) {
    let drained = tokio::time::timeout(OUTPUT_GRACE, async {
        while let Some(line) = line_rx.recv().await {
            debug!("[{}] {}", label, line);
            output.push_str(&line);
            output.push('\n');
        }
    })
    .await;

    if drained.is_err() {
        debug!("[{}] output pipes still open after exit, not waiting", label);
    }
}

async fn forward_lines<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                // Tools may print non-UTF-8 progress bytes; keep reading regardless
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("output stream closed: {}", e);
                break;
            }
        }
    }
}
