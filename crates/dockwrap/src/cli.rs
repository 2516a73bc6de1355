//! コマンドライン定義
//!
//! サブコマンドはイメージフォルダの内容で決まるため、2段階でパースする。
//! まずグローバルオプションだけを読み（[`bootstrap`]）、発見したイメージから
//! 完全なコマンドを組み立てる（[`build_cli`]）。

use clap::{ArgMatches, Args, Command, FromArgMatches, Subcommand};
use dockwrap_build::parse_build_arg;
use dockwrap_core::{DiscoveryError, Registry};
use std::ffi::OsString;
use std::path::PathBuf;

const ABOUT: &str = "イメージフォルダを、そのままコマンドに。";

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// イメージフォルダのルート（省略時は設定ファイルの images_dir、なければ ./images）
    #[arg(long, env = "DOCKWRAP_IMAGES_DIR", value_name = "DIR")]
    pub images_dir: Option<PathBuf>,

    /// 設定ファイルの環境名
    #[arg(long, env = "DOCKWRAP_ENV", default_value = "local", value_name = "NAME")]
    pub env: String,

    /// ログレベル（RUST_LOG が優先）
    #[arg(
        long,
        default_value = "warn",
        value_parser = ["error", "warn", "info", "debug", "trace"],
        value_name = "LEVEL"
    )]
    pub log_level: String,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            images_dir: None,
            env: "local".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// 組み込みコマンド
#[derive(Debug, Subcommand)]
pub enum BuiltinCommand {
    /// 登録されているイメージの一覧
    List,
    /// バージョン情報を表示
    Version,
}

/// 組み込みコマンドと重なるイメージ名は使えない
pub const RESERVED_NAMES: [&str; 3] = ["list", "version", "help"];

/// イメージごとのサブコマンド
#[derive(Debug, Subcommand)]
pub enum ImageCommand {
    /// イメージをビルド
    Build {
        /// タグ（省略時は version またはコンテンツハッシュ）
        #[arg(long)]
        tag: Option<String>,
        /// ビルド引数（KEY=VALUE、複数指定可）
        #[arg(long = "build-arg", value_name = "KEY=VALUE", value_parser = parse_build_arg)]
        build_args: Vec<(String, String)>,
        /// ビルド済みでも再ビルドする
        #[arg(long)]
        force: bool,
        /// キャッシュを使わずにビルド
        #[arg(long)]
        no_cache: bool,
    },
    /// 既存のイメージに追加のタグをつける
    Tag {
        /// タグ付け元（タグだけなら このイメージのタグとみなす）
        source: String,
        /// 新しいタグ（同上）
        target: String,
    },
    /// イメージをレジストリにプッシュ
    Push {
        /// レジストリ（省略時は設定ファイルの docker_registry_prefix）
        #[arg(long)]
        registry: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// イメージをレジストリからプル
    Pull {
        /// レジストリ（省略時は設定ファイルの docker_registry_prefix）
        #[arg(long)]
        registry: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// 一時コンテナでコマンドを実行（終了後にコンテナは削除）
    Run {
        #[command(flatten)]
        options: RunArgs,
        /// 実行するコマンド（以降の引数はそのままコンテナに渡す）
        #[arg(
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "COMMAND"
        )]
        command: Vec<String>,
    },
    /// 一時コンテナで対話シェルを起動
    Shell {
        #[command(flatten)]
        options: RunArgs,
    },
    /// イメージの参照（URL）を表示
    Url {
        #[arg(long)]
        registry: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(long)]
    pub tag: Option<String>,
    /// マウント（HOST[:CONTAINER[:OPTS]]、HOST だけなら同じパス）
    #[arg(short = 'v', long = "volume", value_name = "MOUNT")]
    pub volumes: Vec<String>,
    /// 環境変数（KEY=VALUE）
    #[arg(short = 'e', long = "env", value_name = "ENV")]
    pub env: Vec<String>,
    /// 公開するポート（PORT または HOST:CONTAINER）
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub ports: Vec<String>,
    #[arg(long)]
    pub network: Option<String>,
    #[arg(long)]
    pub privileged: bool,
    /// 同じパスにマウントするプロジェクトディレクトリ（省略時はカレントディレクトリ）
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,
    /// ホストのユーザーとして実行
    #[arg(long)]
    pub map_user: bool,
    /// コンテナ内で sudo を有効にする
    #[arg(long, requires = "map_user")]
    pub sudo: bool,
    /// ホームディレクトリをマウント
    #[arg(long)]
    pub mount_home: bool,
}

/// グローバルオプションの先読み結果
#[derive(Debug, Default)]
pub struct Bootstrap {
    pub globals: GlobalArgs,
    /// 最初のサブコマンド名（イメージ名または組み込みコマンド）
    pub subcommand: Option<String>,
}

fn bootstrap_command() -> Command {
    GlobalArgs::augment_args(Command::new("dockwrap"))
        .ignore_errors(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .allow_external_subcommands(true)
}

/// グローバルオプションだけを読む（未知の引数は無視）
pub fn bootstrap<I, T>(args: I) -> Bootstrap
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Ok(matches) = bootstrap_command().try_get_matches_from(args) else {
        return Bootstrap::default();
    };

    Bootstrap {
        subcommand: matches.subcommand_name().map(str::to_string),
        globals: GlobalArgs::from_arg_matches(&matches).unwrap_or_default(),
    }
}

/// レジストリからコマンドを組み立てる
pub fn build_cli(registry: &Registry) -> Result<Command, DiscoveryError> {
    // augment_* は派生元の doc コメントで about を上書きするので、説明は後から設定する
    let mut command = BuiltinCommand::augment_subcommands(GlobalArgs::augment_args(
        Command::new("dockwrap"),
    ))
    .version(env!("CARGO_PKG_VERSION"))
    .about(ABOUT)
    .subcommand_required(true)
    .arg_required_else_help(true);

    for image in registry.iter() {
        if RESERVED_NAMES.contains(&image.name()) {
            return Err(DiscoveryError::ReservedName {
                name: image.name().to_string(),
                path: image.manifest_path().to_path_buf(),
            });
        }

        let about = match image.parent_name() {
            Some(parent) => format!("イメージ {} の操作（親: {}）", image.name(), parent),
            None => format!("イメージ {} の操作", image.name()),
        };
        let image_command =
            ImageCommand::augment_subcommands(Command::new(image.name().to_string()))
                .about(about)
                .subcommand_required(true)
                .arg_required_else_help(true);
        command = command.subcommand(image_command);
    }

    Ok(command)
}

/// パース結果のディスパッチ先
pub enum Invocation {
    Builtin(BuiltinCommand),
    Image { name: String, command: ImageCommand },
}

impl Invocation {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let Some((name, sub_matches)) = matches.subcommand() else {
            return Err(clap::Error::new(clap::error::ErrorKind::MissingSubcommand));
        };

        if BuiltinCommand::has_subcommand(name) {
            return BuiltinCommand::from_arg_matches(matches).map(Invocation::Builtin);
        }

        let command = ImageCommand::from_arg_matches(sub_matches)?;
        Ok(Invocation::Image {
            name: name.to_string(),
            command,
        })
    }
}
