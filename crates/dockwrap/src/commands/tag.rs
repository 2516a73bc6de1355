use super::Context;
use dockwrap_core::ImageDescriptor;

pub async fn handle(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    source: &str,
    target: &str,
) -> anyhow::Result<i32> {
    ctx.login().await?;
    ctx.builder().tag(image, source, target).await?;
    Ok(0)
}
