use super::Context;
use crate::cli::RunArgs;
use dockwrap_build::{ContainerRunner, RunOptions};
use dockwrap_core::ImageDescriptor;
use tracing::debug;

pub async fn handle(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    args: RunArgs,
    command: Vec<String>,
) -> anyhow::Result<i32> {
    run_container(ctx, image, args, command, false).await
}

/// 対話シェル（イメージのデフォルトコマンドを `-t -i` で起動）
pub async fn handle_shell(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    args: RunArgs,
) -> anyhow::Result<i32> {
    run_container(ctx, image, args, Vec::new(), true).await
}

async fn run_container(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    args: RunArgs,
    command: Vec<String>,
    interactive: bool,
) -> anyhow::Result<i32> {
    ctx.login().await?;

    let project_dir = match args.project_dir {
        Some(dir) => Some(dir),
        None => Some(std::env::current_dir()?),
    };

    let options = RunOptions {
        command,
        interactive,
        volumes: args.volumes,
        env: args.env,
        ports: args.ports,
        network: args.network,
        privileged: args.privileged,
        project_dir,
        map_user: args.map_user,
        sudo: args.sudo,
        mount_home: args.mount_home,
    };

    let builder = ctx.builder();
    let code = ContainerRunner::new(&builder)
        .run(image, args.tag.as_deref(), &options)
        .await?;

    debug!(image = %image.name(), code, "Run finished");
    Ok(code)
}
