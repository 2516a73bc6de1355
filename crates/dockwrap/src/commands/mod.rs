pub mod build;
pub mod list;
pub mod pull;
pub mod push;
pub mod run;
pub mod tag;
pub mod url;

use crate::cli::ImageCommand;
use dockwrap_build::{ContainerTool, ImageBuilder};
use dockwrap_config::EnvConfig;
use dockwrap_core::{ImageDescriptor, Registry};

/// コマンド実行に必要な情報
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub config: &'a EnvConfig,
    pub tool: ContainerTool,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, config: &'a EnvConfig) -> Self {
        Self {
            registry,
            config,
            tool: ContainerTool::new(&config.container_tool()),
        }
    }

    pub fn builder(&self) -> ImageBuilder<'a> {
        ImageBuilder::new(self.tool.clone(), self.registry)
            .with_registry_prefix(self.config.registry_prefix())
            .with_default_build_args(self.config.build_args.clone())
    }

    /// 設定されていればレジストリにログイン
    pub async fn login(&self) -> anyhow::Result<()> {
        if let Some(command) = self.config.login_command() {
            dockwrap_build::login(command).await?;
        }
        Ok(())
    }
}

/// イメージのサブコマンドを実行し、終了コードを返す
pub async fn dispatch(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    command: ImageCommand,
) -> anyhow::Result<i32> {
    match command {
        ImageCommand::Build {
            tag,
            build_args,
            force,
            no_cache,
        } => build::handle(ctx, image, tag, build_args, force, no_cache).await,
        ImageCommand::Tag { source, target } => tag::handle(ctx, image, &source, &target).await,
        ImageCommand::Push { registry, tag } => {
            push::handle(ctx, image, registry.as_deref(), tag.as_deref()).await
        }
        ImageCommand::Pull { registry, tag } => {
            pull::handle(ctx, image, registry.as_deref(), tag.as_deref()).await
        }
        ImageCommand::Run { options, command } => run::handle(ctx, image, options, command).await,
        ImageCommand::Shell { options } => run::handle_shell(ctx, image, options).await,
        ImageCommand::Url { registry, tag } => {
            url::handle(ctx, image, registry.as_deref(), tag.as_deref())
        }
    }
}
