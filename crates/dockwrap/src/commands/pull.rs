use super::Context;
use colored::Colorize;
use dockwrap_build::ImagePusher;
use dockwrap_core::ImageDescriptor;

pub async fn handle(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    registry: Option<&str>,
    tag: Option<&str>,
) -> anyhow::Result<i32> {
    ctx.login().await?;

    let mut reference = ctx.builder().reference(image, tag)?;
    if let Some(registry) = registry {
        reference = reference.with_registry(Some(registry));
    }

    println!("{} {}", "プル中:".blue(), image.name().cyan());
    let pulled = ImagePusher::new(ctx.tool.clone()).pull(&reference).await?;

    println!();
    println!("{} {}", "✓ プル完了:".green().bold(), pulled);
    Ok(0)
}
