//! イメージ定義

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// ビルド定義サブフォルダ名
pub const BUILD_DIR_NAME: &str = "Docker";

/// 拡張定義ファイル名
pub const MANIFEST_FILENAME: &str = "image.kdl";

/// デフォルトのビルドファイル名
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// 親イメージの参照を受け取るビルド引数のデフォルト名
pub const DEFAULT_PARENT_ARG: &str = "PARENT_IMAGE";

/// ビルド可能なコンテナイメージ1つ分の定義
///
/// KDL形式（image.kdl）：
/// ```kdl
/// image "ubuntu_derived" {
///     parent "ubuntu_base"
///     context "Docker"
///     version "1.0.0"
///     build_args {
///         UBUNTU_VERSION "22.04"
///     }
///     run_args "--network" "host"
///     env {
///         LANG "C.UTF-8"
///     }
/// }
/// ```
///
/// 発見時に一度だけ構築され、以降は変更されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub(crate) name: String,
    pub(crate) build_context_path: PathBuf,
    pub(crate) dockerfile: PathBuf,
    pub(crate) manifest_path: PathBuf,
    pub(crate) parent_name: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) parent_arg: String,
    pub(crate) build_args: BTreeMap<String, String>,
    pub(crate) run_args: Vec<String>,
    pub(crate) env: BTreeMap<String, String>,
}

impl ImageDescriptor {
    /// レジストリ内で一意なイメージ名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ビルドコンテキスト（絶対パス）
    pub fn build_context_path(&self) -> &Path {
        &self.build_context_path
    }

    /// ビルドファイルのパス（コンテキスト内）
    pub fn dockerfile(&self) -> &Path {
        &self.dockerfile
    }

    /// このイメージを定義した image.kdl
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent_name.as_deref()
    }

    /// 明示的なバージョン（デフォルトタグとして使われる）
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// 親イメージの参照を渡すビルド引数名
    pub fn parent_arg(&self) -> &str {
        &self.parent_arg
    }

    pub fn build_args(&self) -> &BTreeMap<String, String> {
        &self.build_args
    }

    /// run 時に追加するコンテナツールの引数
    pub fn run_args(&self) -> &[String] {
        &self.run_args
    }

    /// run 時にコンテナへ渡す環境変数
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}
