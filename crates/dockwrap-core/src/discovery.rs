//! イメージフォルダの自動発見
//!
//! ルートディレクトリ直下のフォルダを1階層だけ走査し、
//! `Docker/` サブフォルダと `image.kdl` を持つフォルダをイメージとして登録します。

use crate::error::{DiscoveryError, Result};
use crate::model::{BUILD_DIR_NAME, MANIFEST_FILENAME};
use crate::parser::parse_manifest_file;
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// ルートディレクトリからイメージを発見してレジストリを構築
///
/// - `Docker/` がないフォルダはスキップ（補助フォルダを置けるように）
/// - `Docker/` があって `image.kdl` がないフォルダはエラー
/// - 名前の重複・親のループはエラー
///
/// エラー時は部分的なレジストリを返さない。
#[tracing::instrument(skip(root), fields(root = %root.display()))]
pub fn discover_images(root: &Path) -> Result<Registry> {
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
    }
    let root = root
        .canonicalize()
        .map_err(|e| DiscoveryError::io(root, e))?;

    let mut registry = Registry::new(root.clone());

    for folder in image_folder_candidates(&root)? {
        let build_dir = folder.join(BUILD_DIR_NAME);
        let manifest = folder.join(MANIFEST_FILENAME);

        if !build_dir.is_dir() {
            debug!(folder = %folder.display(), "No Docker/ directory, skipping");
            continue;
        }

        if !manifest.is_file() {
            return Err(DiscoveryError::MissingManifest { folder, manifest });
        }

        let descriptor = parse_manifest_file(&manifest)?;
        debug!(
            image = %descriptor.name(),
            folder = %folder.display(),
            "Found image"
        );
        registry.insert(descriptor)?;
    }

    registry.check_parent_cycles()?;

    for image in registry.iter() {
        if let Some(parent) = image.parent_name()
            && !registry.contains(parent)
        {
            warn!(
                image = %image.name(),
                parent = %parent,
                "Parent image is not defined under the images directory"
            );
        }
    }

    info!(image_count = registry.len(), "Discovered images");
    Ok(registry)
}

/// ルート直下のディレクトリを名前順で列挙
fn image_folder_candidates(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|e| DiscoveryError::io(root, e))?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DiscoveryError::io(root, e))?;
        let path = entry.path();
        if path.is_dir() {
            folders.push(path);
        }
    }

    // read_dir の順序はOS依存なので名前順に固定
    folders.sort();
    Ok(folders)
}
