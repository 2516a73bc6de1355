use colored::Colorize;
use dockwrap_build::ImageBuilder;
use dockwrap_core::Registry;

pub fn handle(registry: &Registry, builder: &ImageBuilder<'_>) -> anyhow::Result<i32> {
    println!(
        "{}  {}",
        "Images:".bold(),
        registry.root().display().to_string().dimmed()
    );
    println!();

    if registry.is_empty() {
        println!("  {}", "(なし)".dimmed());
        return Ok(0);
    }

    for image in registry.iter() {
        let reference = builder.reference(image, None)?;
        let parent = image.parent_name().unwrap_or("-");
        println!(
            "  {:<20} {:<20} {}",
            image.name().green(),
            parent.dimmed(),
            reference.to_string().cyan()
        );
        println!(
            "  {:<20} {}",
            "",
            image.build_context_path().display().to_string().dimmed()
        );
    }
    println!();
    println!("{} {}", "合計:".bold(), registry.len());
    Ok(0)
}
