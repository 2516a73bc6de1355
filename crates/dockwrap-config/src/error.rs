use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ファイルを読み込めません: {path}\n理由: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("設定ファイルのパースに失敗しました: {path}\n理由: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "環境 '{name}' が {path} に定義されていません\n利用可能な環境: {available}"
    )]
    EnvironmentNotFound {
        name: String,
        path: PathBuf,
        available: String,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
