use dockwrap_core::DiscoveryError;
use std::path::PathBuf;
use thiserror::Error;

/// 割り込みで中断した場合の終了コード（128 + SIGINT）
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// SIGTERM で中断した場合の終了コード（128 + SIGTERM）
pub const TERMINATED_EXIT_CODE: i32 = 143;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build failed for image '{image}' (exit code {code})")]
    BuildFailed {
        image: String,
        code: i32,
        stderr: String,
    },

    #[error("Source image not found: {0}")]
    SourceImageNotFound(String),

    #[error("Failed to tag {from} as {to} (exit code {code})")]
    TagFailed {
        from: String,
        to: String,
        code: i32,
        stderr: String,
    },

    #[error("Registry {operation} failed for {reference} (exit code {code})")]
    RegistryFailed {
        operation: &'static str,
        reference: String,
        code: i32,
        stderr: String,
    },

    #[error("Registry login command failed (exit code {code})")]
    LoginFailed { code: i32 },

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Container tool '{program}' could not be started: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Interrupted by {signal}")]
    Interrupted { signal: &'static str, code: i32 },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// プロセスの終了コード
    ///
    /// コンテナツールが失敗した場合はその終了コードをそのまま返す。
    pub fn exit_code(&self) -> i32 {
        match self {
            ImageError::BuildFailed { code, .. }
            | ImageError::TagFailed { code, .. }
            | ImageError::RegistryFailed { code, .. }
            | ImageError::LoginFailed { code } => *code,
            ImageError::Interrupted { code, .. } => *code,
            _ => 1,
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            ImageError::DockerfileNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     解決方法:\n\
                     1. Docker/ フォルダに Dockerfile を置いてください\n\
                     2. image.kdl で明示的にファイル名を指定してください:\n\
                        dockerfile \"Dockerfile.dev\"",
                    path.display()
                )
            }
            ImageError::BuildFailed { image, code, .. } => {
                format!(
                    "イメージ '{}' のビルドに失敗しました (終了コード {})\n\
                     \n\
                     Dockerfileの内容と親イメージがビルド済みかを確認してください。",
                    image, code
                )
            }
            ImageError::SourceImageNotFound(reference) => {
                format!(
                    "タグ付け元のイメージがローカルにありません: {}\n\
                     \n\
                     先に build または pull を実行してください。",
                    reference
                )
            }
            ImageError::RegistryFailed {
                operation,
                reference,
                code,
                ..
            } => {
                format!(
                    "レジストリへの {} に失敗しました: {} (終了コード {})\n\
                     \n\
                     認証情報とネットワーク接続を確認してください。",
                    operation, reference, code
                )
            }
            ImageError::LoginFailed { code } => {
                format!(
                    "レジストリへのログインに失敗しました (終了コード {})\n\
                     \n\
                     設定ファイルの docker_login_command を確認してください。",
                    code
                )
            }
            ImageError::InvalidTag { tag } => {
                format!(
                    "無効なタグです: {}\n\
                     \n\
                     タグは128文字以下の英数字、'.'、'-'、'_' のみ使用できます。",
                    tag
                )
            }
            ImageError::ToolUnavailable { program, source } => {
                format!(
                    "コンテナツール '{}' を起動できません: {}\n\
                     \n\
                     インストールされているか、DOCKWRAP_CONTAINER_TOOL の値を確認してください。",
                    program, source
                )
            }
            ImageError::Interrupted { signal, .. } => format!("{} で中断されました", signal),
            ImageError::Discovery(err) => err.to_string(),
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;
