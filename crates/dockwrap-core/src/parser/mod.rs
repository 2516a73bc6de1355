//! KDLパーサー
//!
//! イメージフォルダの image.kdl をパースして [`ImageDescriptor`] を生成します。

mod image;

use image::parse_image;

use crate::error::{DiscoveryError, Result};
use crate::model::ImageDescriptor;
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::Path;
use tracing::debug;

/// image.kdl ファイルをパース
pub fn parse_manifest_file<P: AsRef<Path>>(path: P) -> Result<ImageDescriptor> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| DiscoveryError::io(path, e))?;
    parse_manifest_str(&content, path)
}

/// KDL文字列をパース
///
/// `manifest_path` は相対パス（context など）の基準として使われる。
pub fn parse_manifest_str(content: &str, manifest_path: &Path) -> Result<ImageDescriptor> {
    let doc: KdlDocument = content
        .parse()
        .map_err(|source| DiscoveryError::ManifestParse {
            path: manifest_path.to_path_buf(),
            source,
        })?;

    let image_nodes: Vec<&KdlNode> = doc
        .nodes()
        .iter()
        .filter(|node| node.name().value() == "image")
        .collect();

    match image_nodes.as_slice() {
        [] => Err(DiscoveryError::NoDescriptor {
            path: manifest_path.to_path_buf(),
        }),
        [node] => {
            let descriptor = parse_image(node, manifest_path)?;
            debug!(
                image = %descriptor.name(),
                context = %descriptor.build_context_path().display(),
                "Parsed image manifest"
            );
            Ok(descriptor)
        }
        nodes => Err(DiscoveryError::AmbiguousDescriptor {
            path: manifest_path.to_path_buf(),
            count: nodes.len(),
        }),
    }
}

/// ノードの最初の位置引数を文字列として取得
pub(crate) fn first_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| value_to_string(e.value()))
}

/// 文字列・整数・浮動小数点・真偽値を文字列化（build_args 等で数値を書けるように）
pub(crate) fn value_to_string(value: &KdlValue) -> Option<String> {
    if let Some(s) = value.as_string() {
        return Some(s.to_string());
    }
    if let Some(i) = value.as_integer() {
        return Some(i.to_string());
    }
    if let Some(f) = value.as_float() {
        return Some(f.to_string());
    }
    value.as_bool().map(|b| b.to_string())
}

#[cfg(test)]
mod tests;
