mod cli;
mod commands;

use cli::{BuiltinCommand, GlobalArgs, Invocation};
use colored::Colorize;
use commands::Context;
use dockwrap_build::ImageError;
use dockwrap_config::{ConfigError, DEFAULT_IMAGES_DIR};
use dockwrap_core::DiscoveryError;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// 終了コード
const EXIT_FAILURE: i32 = 1;
const EXIT_DISCOVERY: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let bootstrap = cli::bootstrap(args.iter().cloned());

    init_logging(&bootstrap.globals.log_level);

    // version は設定ファイルもイメージフォルダも不要
    if bootstrap.subcommand.as_deref() == Some("version") {
        print_version();
        return;
    }

    let code = match run(args, &bootstrap.globals).await {
        Ok(code) => code,
        Err(err) => {
            report(&err);
            exit_code(&err)
        }
    };

    std::process::exit(code);
}

/// RUST_LOG があればそれを、なければ --log-level を使う
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_version() {
    println!("dockwrap {}", env!("CARGO_PKG_VERSION"));
}

async fn run(args: Vec<OsString>, globals: &GlobalArgs) -> anyhow::Result<i32> {
    let config = dockwrap_config::load_environment(&globals.env)?;

    // 優先順位: --images-dir > 設定ファイル > ./images
    let images_dir = globals
        .images_dir
        .clone()
        .or_else(|| config.images_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGES_DIR));
    tracing::debug!(images_dir = %images_dir.display(), env = %globals.env, "Resolved images directory");

    let registry = dockwrap_core::discover_images(&images_dir)?;
    let command = cli::build_cli(&registry)?;

    let matches = match command.try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) => {
            // --help もここを通る（終了コード 0）
            err.print()?;
            return Ok(err.exit_code());
        }
    };

    let ctx = Context::new(&registry, &config);

    match Invocation::from_matches(&matches)? {
        Invocation::Builtin(BuiltinCommand::List) => commands::list::handle(&registry, &ctx.builder()),
        Invocation::Builtin(BuiltinCommand::Version) => {
            print_version();
            Ok(0)
        }
        Invocation::Image { name, command } => {
            let image = registry
                .get(&name)
                .ok_or_else(|| anyhow::anyhow!("イメージ '{}' が見つかりません", name))?;
            commands::dispatch(&ctx, image, command).await
        }
    }
}

fn report(err: &anyhow::Error) {
    let message = match err.downcast_ref::<ImageError>() {
        Some(image_error) => image_error.user_message(),
        None => format!("{:#}", err),
    };
    eprintln!("{} {}", "エラー:".red().bold(), message);
}

/// エラーの種類から終了コードを決める
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(image_error) = err.downcast_ref::<ImageError>() {
        return image_error.exit_code();
    }
    if err.downcast_ref::<DiscoveryError>().is_some() {
        return EXIT_DISCOVERY;
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_CONFIG;
    }
    if let Some(clap_error) = err.downcast_ref::<clap::Error>() {
        return clap_error.exit_code();
    }
    EXIT_FAILURE
}
