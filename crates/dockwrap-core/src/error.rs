use std::path::PathBuf;
use thiserror::Error;

/// イメージフォルダの発見・読み込み時のエラー
///
/// どのバリアントもCLI構築を中断させる（部分的なコマンド構成は作らない）。
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("イメージディレクトリが見つかりません: {0}")]
    RootNotFound(PathBuf),

    #[error(
        "{folder} に Docker/ はありますが {manifest} がありません\nヒント: image.kdl を作成するか、Docker/ を別の場所に移動してください"
    )]
    MissingManifest { folder: PathBuf, manifest: PathBuf },

    #[error("KDLパースエラー: {path}\n理由: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: kdl::KdlError,
    },

    #[error("無効なマニフェスト: {path}\n理由: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("{path} に image 定義がありません")]
    NoDescriptor { path: PathBuf },

    #[error("{path} に image 定義が {count} 個あります（1個のみ許可）")]
    AmbiguousDescriptor { path: PathBuf, count: usize },

    #[error(
        "イメージ名 '{name}' が重複しています\n  {first}\n  {second}"
    )]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("親イメージの循環参照が検出されました: {0}")]
    CircularParent(String),

    #[error("イメージ名 '{name}' は予約されたコマンド名です: {path}")]
    ReservedName { name: String, path: PathBuf },

    #[error("IO エラー: {path}\n理由: {message}")]
    Io { path: PathBuf, message: String },
}

impl DiscoveryError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        DiscoveryError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        DiscoveryError::InvalidManifest {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
