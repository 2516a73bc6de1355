//! dockwrap の環境設定
//!
//! リポジトリごとの設定ファイル（YAML）を環境名ごとに読み込みます。
//!
//! ```yaml
//! local:
//!   images_dir: images
//!   docker_registry_prefix: registry.example.com/team
//!   docker_login_command: "docker login -u ci registry.example.com"
//!   build_args:
//!     HTTP_PROXY: http://proxy:3128
//! ```

pub mod error;

pub use error::*;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 設定ファイルパスの環境変数
pub const CONFIG_PATH_ENV: &str = "DOCKWRAP_CONFIG";

/// コンテナツールの環境変数
pub const CONTAINER_TOOL_ENV: &str = "DOCKWRAP_CONTAINER_TOOL";

pub const DEFAULT_CONTAINER_TOOL: &str = "docker";

pub const DEFAULT_IMAGES_DIR: &str = "images";

/// カレントディレクトリで探す設定ファイル名（優先順）
const CANDIDATES: [&str; 4] = [
    "dockwrap.yml",
    "dockwrap.yaml",
    ".dockwrap.yml",
    ".dockwrap.yaml",
];

/// 1環境分の設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvConfig {
    /// イメージフォルダのルート（相対パスは設定ファイルの場所が基準）
    #[serde(default)]
    pub images_dir: Option<PathBuf>,
    /// イメージ参照の前につけるレジストリ（例: ghcr.io/owner）
    #[serde(default, alias = "registry_prefix")]
    pub docker_registry_prefix: Option<String>,
    /// イメージ操作の前に `sh -c` で実行するログインコマンド
    #[serde(default, alias = "login_command")]
    pub docker_login_command: Option<String>,
    /// コンテナツールの実行ファイル（docker, podman など）
    #[serde(default)]
    pub container_tool: Option<String>,
    /// 全イメージに適用するビルド引数（マニフェストとCLIで上書きされる）
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
}

impl EnvConfig {
    /// コンテナツールを解決
    ///
    /// 優先順位: DOCKWRAP_CONTAINER_TOOL 環境変数 > 設定ファイル > docker
    pub fn container_tool(&self) -> String {
        if let Ok(tool) = std::env::var(CONTAINER_TOOL_ENV)
            && !tool.trim().is_empty()
        {
            return tool;
        }
        self.container_tool
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTAINER_TOOL.to_string())
    }

    /// ログインコマンド（空文字は未設定扱い）
    pub fn login_command(&self) -> Option<&str> {
        self.docker_login_command
            .as_deref()
            .map(str::trim)
            .filter(|cmd| !cmd.is_empty())
    }

    pub fn registry_prefix(&self) -> Option<&str> {
        self.docker_registry_prefix
            .as_deref()
            .map(|prefix| prefix.trim_end_matches('/'))
            .filter(|prefix| !prefix.is_empty())
    }
}

/// 読み込んだ設定ファイル
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    path: PathBuf,
    environments: BTreeMap<String, EnvConfig>,
}

impl ConfigFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn environment_names(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    /// 環境を取得（images_dir は設定ファイルの場所を基準に解決済み）
    pub fn environment(&self, name: &str) -> Result<EnvConfig> {
        let mut env = self
            .environments
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::EnvironmentNotFound {
                name: name.to_string(),
                path: self.path.clone(),
                available: self
                    .environments
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        if let Some(images_dir) = &env.images_dir
            && images_dir.is_relative()
            && let Some(base) = self.path.parent()
        {
            env.images_dir = Some(base.join(images_dir));
        }

        Ok(env)
    }
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DOCKWRAP_CONFIG（ファイルが存在する場合）
/// 2. カレントディレクトリ: dockwrap.yml, dockwrap.yaml, .dockwrap.yml, .dockwrap.yaml
/// 3. ~/.config/dockwrap/config.yml (グローバル設定)
///
/// 設定ファイルは必須ではないため、見つからない場合は None を返す。
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path_str) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&path_str);
        if path.is_file() {
            info!(config_path = %path.display(), "Found config from environment variable");
            return Some(path);
        }
        warn!(env_path = %path_str, "DOCKWRAP_CONFIG is set but file does not exist");
    }

    let current_dir = std::env::current_dir().ok()?;
    if let Some(path) = find_config_file_in(&current_dir) {
        return Some(path);
    }

    let global_config = dirs::config_dir()?.join("dockwrap").join("config.yml");
    if global_config.is_file() {
        info!(config_path = %global_config.display(), "Found global config");
        return Some(global_config);
    }

    debug!("Config file not found");
    None
}

/// 指定ディレクトリで設定ファイルを探す
pub fn find_config_file_in(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.is_file())
}

/// 設定ファイルを読み込む
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // 空ファイルは環境なしとして扱う
    if content.trim().is_empty() {
        return Ok(ConfigFile {
            path: path.to_path_buf(),
            environments: BTreeMap::new(),
        });
    }

    // `local:` のように値のない環境も許可する
    let raw: BTreeMap<String, Option<EnvConfig>> =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let environments = raw
        .into_iter()
        .map(|(name, env)| (name, env.unwrap_or_default()))
        .collect();

    Ok(ConfigFile {
        path: path.to_path_buf(),
        environments,
    })
}

/// 環境設定をロード
///
/// 設定ファイルがなければデフォルト設定を返す。
/// 設定ファイルがあるのに環境が定義されていない場合はエラー。
pub fn load_environment(name: &str) -> Result<EnvConfig> {
    match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            let env = config.environment(name)?;
            debug!(environment = name, config = ?env, "Loaded environment config");
            Ok(env)
        }
        None => Ok(EnvConfig::default()),
    }
}
