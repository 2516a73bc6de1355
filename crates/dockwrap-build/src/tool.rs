//! 外部コンテナツールの呼び出し
//!
//! docker / podman などのCLIをサブプロセスとして実行します。
//! API は直接使わず、終了コードと stdout/stderr だけを解釈します。

use crate::error::{ImageError, Result};
use std::ffi::OsStr;
use std::io::Write;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// コンテナツールのコマンドライン
///
/// `"docker"` のような単一の実行ファイルのほか、
/// `"sudo docker"` のように前置引数付きの指定も受け付ける。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTool {
    program: String,
    prefix_args: Vec<String>,
}

/// 実行結果（出力はキャプチャ済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// シグナルで終了した場合は 1
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(1)
    }
}

impl ContainerTool {
    pub fn new(command_line: &str) -> Self {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "docker".to_string());
        Self {
            program,
            prefix_args: parts.collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 表示用のコマンドライン
    pub fn display_command<I, S>(&self, args: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        std::iter::once(self.program.clone())
            .chain(self.prefix_args.iter().cloned())
            .chain(args.into_iter().map(|a| a.as_ref().to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 引数を設定済みの Command を作成
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args).args(args);
        cmd
    }

    pub(crate) fn unavailable(&self, source: std::io::Error) -> ImageError {
        ImageError::ToolUnavailable {
            program: self.program.clone(),
            source,
        }
    }

    /// 実行して出力を端末に流しながらキャプチャ
    pub async fn output<I, S>(&self, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr> + AsRef<str>,
    {
        self.execute(args, true).await
    }

    /// 実行して出力をキャプチャのみ（端末には出さない）
    pub async fn output_quiet<I, S>(&self, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr> + AsRef<str>,
    {
        self.execute(args, false).await
    }

    async fn execute<I, S>(&self, args: I, echo: bool) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr> + AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command_line = self.display_command(args.iter().map(|a| AsRef::<str>::as_ref(a)));
        if echo {
            info!(command = %command_line, "Running container tool");
        } else {
            debug!(command = %command_line, "Running container tool");
        }

        let mut child = self
            .command(args.iter().map(|a| AsRef::<OsStr>::as_ref(a)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout, stderr) = tokio::join!(
            forward_output(stdout, echo, OutputStream::Stdout),
            forward_output(stderr, echo, OutputStream::Stderr),
        );
        let status = child.wait().await?;

        debug!(command = %command_line, ?status, "Container tool finished");
        Ok(ToolOutput {
            status,
            stdout: stdout?,
            stderr: stderr?,
        })
    }

    /// イメージがローカルに存在するか（`image inspect`）
    pub async fn image_exists(&self, reference: &str) -> Result<bool> {
        let output = self
            .output_quiet(["image", "inspect", reference])
            .await?;
        Ok(output.success())
    }

    /// コンテナを強制削除（存在しなくてもエラーにしない）
    pub async fn remove_container(&self, name: &str) {
        match self.output_quiet(["rm", "-f", name]).await {
            Ok(output) => debug!(container = %name, code = output.code(), "Removed container"),
            Err(e) => debug!(container = %name, error = %e, "Failed to remove container"),
        }
    }

    /// Drop から呼ぶための同期版
    pub fn remove_container_blocking(&self, name: &str) {
        let result = std::process::Command::new(&self.program)
            .args(&self.prefix_args)
            .args(["rm", "-f", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match result {
            Ok(status) => debug!(container = %name, ?status, "Removed container"),
            Err(e) => debug!(container = %name, error = %e, "Failed to remove container"),
        }
    }
}

impl Default for ContainerTool {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[derive(Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// 行単位で読み込み、必要なら端末にそのまま転送しつつ全体を返す
///
/// UTF-8 でないバイト列も読み捨てずに最後まで読む（途中で閉じるとツールが SIGPIPE で落ちる）。
async fn forward_output<R>(
    reader: Option<R>,
    echo: bool,
    stream: OutputStream,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(String::new());
    };

    let mut reader = BufReader::new(reader);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if echo && let Err(e) = write_raw(stream, &line) {
            debug!(error = %e, "Failed to forward container tool output");
        }
        captured.extend_from_slice(&line);
    }
    Ok(String::from_utf8_lossy(&captured).into_owned())
}

fn write_raw(stream: OutputStream, bytes: &[u8]) -> std::io::Result<()> {
    match stream {
        OutputStream::Stdout => {
            let mut out = std::io::stdout().lock();
            out.write_all(bytes)?;
            out.flush()
        }
        OutputStream::Stderr => std::io::stderr().lock().write_all(bytes),
    }
}
