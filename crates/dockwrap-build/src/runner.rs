//! 一時コンテナの実行
//!
//! コンテナは実行が終わると必ず削除する。コマンドが失敗しても、
//! SIGINT / SIGTERM で中断されても、パニックしても [`ContainerGuard`] が `rm -f` する。

use crate::builder::{BuildOptions, ImageBuilder};
use crate::error::{INTERRUPTED_EXIT_CODE, ImageError, Result, TERMINATED_EXIT_CODE};
use crate::reference::ImageRef;
use crate::tool::ContainerTool;
use dockwrap_core::ImageDescriptor;
use std::path::PathBuf;
#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::{debug, info, warn};

/// コンテナ内のホスト名
const CONTAINER_HOSTNAME: &str = "Docker";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// コンテナ内で実行するコマンド（そのまま渡す）
    pub command: Vec<String>,
    /// 対話モード（`-t -i -e PROMPT=1`）
    pub interactive: bool,
    /// `HOST[:CONTAINER[:OPTS]]`、HOST だけなら同じパスにマウント
    pub volumes: Vec<String>,
    /// `KEY=VALUE` または `KEY`（ホストの値を引き継ぐ）
    pub env: Vec<String>,
    /// `PORT` または `HOST:CONTAINER`
    pub ports: Vec<String>,
    pub network: Option<String>,
    pub privileged: bool,
    /// 同じパスにマウントし SRC_DIR で渡すプロジェクトディレクトリ
    pub project_dir: Option<PathBuf>,
    /// ホストのユーザーとして実行する（passwd/group を読み取り専用でマウント）
    pub map_user: bool,
    /// sudoers.d もマウントする（map_user が必要）
    pub sudo: bool,
    /// ホームディレクトリを同じパスにマウント
    pub mount_home: bool,
}

/// 実行中のコンテナの後始末
///
/// `release` を呼ばずに破棄された場合は Drop で同期的に削除する。
pub struct ContainerGuard {
    tool: ContainerTool,
    name: String,
    released: bool,
}

impl ContainerGuard {
    pub fn new(tool: ContainerTool, name: impl Into<String>) -> Self {
        Self {
            tool,
            name: name.into(),
            released: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// コンテナを削除
    pub async fn release(mut self) {
        if !self.released {
            self.tool.remove_container(&self.name).await;
            self.released = true;
        }
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.released {
            self.tool.remove_container_blocking(&self.name);
        }
    }
}

pub struct ContainerRunner<'a> {
    builder: &'a ImageBuilder<'a>,
}

impl<'a> ContainerRunner<'a> {
    pub fn new(builder: &'a ImageBuilder<'a>) -> Self {
        Self { builder }
    }

    /// コンテナを実行し、終了コードを返す
    ///
    /// イメージがローカルになければ先にビルドする。
    pub async fn run(
        &self,
        image: &ImageDescriptor,
        tag: Option<&str>,
        options: &RunOptions,
    ) -> Result<i32> {
        let tool = self.builder.tool();
        let reference = self.builder.reference(image, tag)?;

        if !tool.image_exists(&reference.to_string()).await? {
            info!(image = %reference, "Image does not exist locally, building");
            let build = BuildOptions {
                tag: tag.map(str::to_string),
                ..Default::default()
            };
            self.builder.build(image, &build).await?;
        }

        let name = container_name(image.name());
        let args = self.run_args(image, &reference, &name, options)?;
        info!(command = %tool.display_command(&args), "Starting container");

        // 起動前に登録しておかないと、直後のシグナルでガードが働かずに終了してしまう
        let mut signals = ShutdownSignals::install()?;
        let guard = ContainerGuard::new(tool.clone(), name);
        let mut child = tool.command(&args).spawn().map_err(|e| tool.unavailable(e))?;

        let waited = tokio::select! {
            status = child.wait() => Ok(status),
            received = signals.recv() => Err(received),
        };

        let status = match waited {
            Ok(status) => status,
            Err((signal_name, code)) => {
                warn!(container = %guard.name(), signal = signal_name, "Interrupted, removing container");
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "Failed to kill container tool process");
                }
                guard.release().await;
                return Err(ImageError::Interrupted {
                    signal: signal_name,
                    code,
                });
            }
        };

        guard.release().await;
        let code = status?.code().unwrap_or(1);
        debug!(code, "Container exited");
        Ok(code)
    }

    /// `run` コマンドの引数
    pub fn run_args(
        &self,
        image: &ImageDescriptor,
        reference: &ImageRef,
        name: &str,
        options: &RunOptions,
    ) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "--rm".into(),
            "--name".into(),
            name.into(),
            format!("--hostname={}", CONTAINER_HOSTNAME),
        ];

        if options.privileged {
            args.push("--privileged".into());
        }

        if let Some(network) = &options.network {
            args.push(format!("--network={}", network));
        }

        for volume in &options.volumes {
            args.push("-v".into());
            args.push(volume_spec(volume));
        }

        for (key, value) in image.env() {
            args.push("-e".into());
            args.push(format!("{}={}", key, value));
        }
        for env in &options.env {
            args.push("-e".into());
            args.push(env.clone());
        }

        for port in &options.ports {
            args.push("-p".into());
            args.push(port_spec(port));
        }

        if let Some(project_dir) = &options.project_dir {
            let project_dir = project_dir.canonicalize()?;
            let path = project_dir.display().to_string();
            args.push("-v".into());
            args.push(format!("{}:{}", path, path));
            args.push("-e".into());
            args.push(format!("SRC_DIR={}", path));
        }

        if options.mount_home
            && let Some(home) = dirs::home_dir()
        {
            let home = home.display().to_string();
            args.push("-v".into());
            args.push(format!("{}:{}", home, home));
        }

        if options.map_user {
            args.extend(map_user_args(options.sudo));
        } else if options.sudo {
            warn!("--sudo requires --map-user, ignoring");
        }

        args.extend(image.run_args().iter().cloned());

        if options.interactive {
            args.extend(["-t", "-i", "-e", "PROMPT=1"].map(String::from));
        }

        args.push(reference.to_string());
        args.extend(options.command.iter().cloned());
        Ok(args)
    }
}

/// コンテナ実行中に待ち受ける終了シグナル（SIGINT / SIGTERM）
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn install() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// シグナル名と終了コード
    #[cfg(unix)]
    async fn recv(&mut self) -> (&'static str, i32) {
        tokio::select! {
            Some(()) = self.interrupt.recv() => ("SIGINT", INTERRUPTED_EXIT_CODE),
            Some(()) = self.terminate.recv() => ("SIGTERM", TERMINATED_EXIT_CODE),
            else => std::future::pending().await,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> (&'static str, i32) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ("Ctrl-C", INTERRUPTED_EXIT_CODE),
            Err(_) => std::future::pending().await,
        }
    }
}

/// 重ならないコンテナ名: `dockwrap-<image>-<pid>-<millis>`
pub fn container_name(image: &str) -> String {
    format!(
        "dockwrap-{}-{}-{}",
        image,
        std::process::id(),
        chrono::Utc::now().timestamp_millis()
    )
}

/// ホストのパスだけなら同じパスにマウント
fn volume_spec(volume: &str) -> String {
    if volume.contains(':') {
        volume.to_string()
    } else {
        format!("{}:{}", volume, volume)
    }
}

/// ポート番号だけなら同じ番号で公開
fn port_spec(port: &str) -> String {
    if port.contains(':') {
        port.to_string()
    } else {
        format!("{}:{}", port, port)
    }
}

#[cfg(unix)]
fn map_user_args(sudo: bool) -> Vec<String> {
    // SAFETY: getuid/getgid は常に成功し副作用もない
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };

    let mut args: Vec<String> = vec![
        "-v".into(),
        "/etc/group:/etc/group:ro".into(),
        "-v".into(),
        "/etc/passwd:/etc/passwd:ro".into(),
        "-u".into(),
        format!("{}:{}", uid, gid),
    ];
    if sudo {
        args.push("-v".into());
        args.push("/etc/sudoers.d:/etc/sudoers.d:ro".into());
    }
    args
}

#[cfg(not(unix))]
fn map_user_args(_sudo: bool) -> Vec<String> {
    warn!("--map-user is only supported on unix hosts, ignoring");
    Vec::new()
}
