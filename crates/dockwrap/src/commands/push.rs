use super::Context;
use colored::Colorize;
use dockwrap_build::ImagePusher;
use dockwrap_core::ImageDescriptor;

/// `--registry` があればそのレジストリに、なければ設定のプレフィックスのままプッシュ
pub async fn handle(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    registry: Option<&str>,
    tag: Option<&str>,
) -> anyhow::Result<i32> {
    ctx.login().await?;

    let local = ctx.builder().reference(image, tag)?;
    let remote = match registry {
        Some(registry) => local.with_registry(Some(registry)),
        None => local.clone(),
    };

    println!("{} {}", "プッシュ中:".blue(), image.name().cyan());
    let pushed = ImagePusher::new(ctx.tool.clone())
        .push(&local, &remote)
        .await?;

    println!();
    println!("{} {}", "✓ プッシュ完了:".green().bold(), pushed);
    Ok(0)
}
