use super::Context;
use colored::Colorize;
use dockwrap_build::{BuildOptions, BuildOutcome};
use dockwrap_core::ImageDescriptor;

pub async fn handle(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    tag: Option<String>,
    build_args: Vec<(String, String)>,
    force: bool,
    no_cache: bool,
) -> anyhow::Result<i32> {
    ctx.login().await?;

    println!("{} {}", "イメージ:".bold(), image.name().cyan().bold());
    if let Some(parent) = image.parent_name() {
        println!("  親イメージ: {}", parent.dimmed());
    }

    let options = BuildOptions {
        tag,
        build_args,
        force,
        no_cache,
    };
    let outcome = ctx.builder().build(image, &options).await?;

    if let BuildOutcome::Built { reference, .. } = outcome {
        println!();
        println!("{} {}", "✓ ビルド完了:".green().bold(), reference);
    }
    Ok(0)
}
