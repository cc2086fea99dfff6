//! # Command Module / 命令模块
//!
//! Renders command templates into argv vectors and runs subprocesses,
//! capturing their combined output as raw bytes.
//!
//! 将命令模板渲染为参数向量并运行子进程，以原始字节形式捕获其合并输出。

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;

/// A byte buffer shared between a running subprocess and its owner.
/// It stays readable after the capturing future is dropped, so output
/// produced before a timeout is not lost.
pub type CaptureBuffer = Arc<Mutex<Vec<u8>>>;

/// Values substituted for `{name}` placeholders in command templates.
///
/// 命令模板中 `{name}` 占位符的替换值。
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: Vec<(&'static str, String)>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the value for `{name}`.
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replaces every known `{name}` in `token` in a single left-to-right pass.
    /// Substituted values are never scanned again, and unknown names are kept as-is.
    pub fn substitute(&self, token: &str) -> String {
        let mut out = String::with_capacity(token.len());
        let mut rest = token;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}').and_then(|close| {
                self.lookup(&after[..close]).map(|value| (close, value))
            }) {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// A command template rendered into a program and its arguments.
///
/// 渲染为程序及其参数的命令模板。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PreparedCommand {
    /// Renders a template: `$VAR` and `~` are expanded first, the result is
    /// split with shell quoting rules, and only then are placeholders
    /// substituted inside each argument. A placeholder value therefore always
    /// stays inside a single argument, whatever characters it contains.
    ///
    /// Expansion happens before quotes are interpreted, so a variable set in
    /// this process is replaced even inside single quotes. Unset variables are
    /// left as written for the child's own shell to resolve.
    pub fn render(template: &str, placeholders: &Placeholders) -> Result<Self> {
        let expanded =
            shellexpand::env_with_context_no_errors(template, |var| std::env::var(var).ok());
        let expanded = shellexpand::tilde(&expanded).into_owned();

        let parts = shlex::split(&expanded)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse command: {}", expanded))?;

        let mut parts = parts.iter().map(|part| placeholders.substitute(part));
        let Some(program) = parts.next() else {
            bail!("Empty command after parsing: {:?}", template);
        };

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Appends already-rendered arguments.
    pub fn push_args<I>(&mut self, args: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.args.extend(args);
    }

    /// A shell-quoted rendering of the command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shlex::try_quote(part).map(|q| q.into_owned()).unwrap_or_else(|_| part.clone()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Builds a `tokio` command running in `cwd` with extra environment variables.
    /// The child is killed if the handle is dropped before it exits.
    pub fn to_command(&self, cwd: &Path, envs: &[(String, String)]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(cwd)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);
        cmd
    }
}

/// Spawns a command and captures its combined stdout and stderr into `buffer`.
///
/// On Unix both streams of the child share one pipe, so the captured bytes
/// are exactly the sequence the child wrote, interleaving included. Output is
/// appended one line at a time, and a final line without a trailing newline
/// or invalid UTF-8 is kept as-is. stdin is closed so the child can never
/// wait on the terminal.
///
/// 派生一个命令，并将其合并后的 stdout 和 stderr 捕获到 `buffer` 中。
/// 在 Unix 上两个流共用同一个管道，因此捕获的字节与子进程写入的顺序完全一致。
pub async fn spawn_and_capture_into(
    mut cmd: tokio::process::Command,
    buffer: CaptureBuffer,
) -> std::io::Result<ExitStatus> {
    cmd.stdin(Stdio::null());

    #[cfg(unix)]
    {
        capture_merged(cmd, buffer).await
    }
    #[cfg(not(unix))]
    {
        capture_separate(cmd, buffer).await
    }
}

#[cfg(unix)]
async fn capture_merged(
    mut cmd: tokio::process::Command,
    buffer: CaptureBuffer,
) -> std::io::Result<ExitStatus> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let (reader, writer) = std::io::pipe()?;
    let writer_for_stderr = writer.try_clone()?;
    let mut child = cmd.stdout(writer).stderr(writer_for_stderr).spawn()?;
    // The command still owns the parent's write ends; EOF only arrives once they are closed.
    drop(cmd);

    let reader = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    let (read_res, status) = tokio::join!(read_lines_into(reader, buffer), child.wait());
    read_res?;
    status
}

/// Without a shared pipe the streams are drained concurrently; the order
/// within each stream is kept, the order across them is not.
#[cfg(not(unix))]
async fn capture_separate(
    mut cmd: tokio::process::Command,
    buffer: CaptureBuffer,
) -> std::io::Result<ExitStatus> {
    let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("Failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("Failed to capture stderr"))?;

    let (stdout_res, stderr_res, status) = tokio::join!(
        read_lines_into(stdout, Arc::clone(&buffer)),
        read_lines_into(stderr, Arc::clone(&buffer)),
        child.wait()
    );
    stdout_res?;
    stderr_res?;
    status
}

/// Spawns a command and returns its exit status with the combined output.
///
/// 派生一个命令，返回其退出状态以及合并后的输出。
pub async fn spawn_and_capture(
    cmd: tokio::process::Command,
) -> (std::io::Result<ExitStatus>, Vec<u8>) {
    let buffer = CaptureBuffer::default();
    let status = spawn_and_capture_into(cmd, Arc::clone(&buffer)).await;
    let output = std::mem::take(&mut *buffer.lock().await);
    (status, output)
}

async fn read_lines_into<R>(stream: R, buffer: CaptureBuffer) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        buffer.lock().await.extend_from_slice(&line);
    }
}

/// Runs a collaborator command with inherited stdio and returns its exit status.
pub async fn run_inherited(prepared: &PreparedCommand, cwd: &Path) -> Result<ExitStatus> {
    prepared
        .to_command(cwd, &[])
        .status()
        .await
        .with_context(|| format!("Failed to execute '{}'", prepared.display()))
}
