use super::Context;
use dockwrap_core::ImageDescriptor;

/// スクリプトから使えるよう参照だけを出力
pub fn handle(
    ctx: &Context<'_>,
    image: &ImageDescriptor,
    registry: Option<&str>,
    tag: Option<&str>,
) -> anyhow::Result<i32> {
    let mut reference = ctx.builder().reference(image, tag)?;
    if let Some(registry) = registry {
        reference = reference.with_registry(Some(registry));
    }
    println!("{}", reference);
    Ok(0)
}
