//! image ノードのパース

use super::{first_arg, value_to_string};
use crate::error::{DiscoveryError, Result};
use crate::model::{
    BUILD_DIR_NAME, DEFAULT_DOCKERFILE, DEFAULT_PARENT_ARG, ImageDescriptor,
};
use kdl::{KdlDocument, KdlNode};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// image ノードをパース
pub fn parse_image(node: &KdlNode, manifest_path: &Path) -> Result<ImageDescriptor> {
    let name = first_arg(node)
        .ok_or_else(|| DiscoveryError::invalid(manifest_path, "image requires a name"))?;
    validate_image_name(&name).map_err(|msg| DiscoveryError::invalid(manifest_path, msg))?;

    let mut context: Option<String> = None;
    let mut dockerfile: Option<String> = None;
    let mut parent_name = None;
    let mut version = None;
    let mut parent_arg = None;
    let mut build_args = BTreeMap::new();
    let mut run_args = Vec::new();
    let mut env = BTreeMap::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "context" => context = Some(required_arg(child, manifest_path)?),
                "dockerfile" => dockerfile = Some(required_arg(child, manifest_path)?),
                "parent" => parent_name = Some(required_arg(child, manifest_path)?),
                "version" => version = Some(required_arg(child, manifest_path)?),
                "parent_arg" => parent_arg = Some(required_arg(child, manifest_path)?),
                // build_args { KEY "value" } と build_arg "KEY=value" の両方をサポート
                "build_args" => {
                    if let Some(args) = child.children() {
                        build_args.extend(parse_key_values(args));
                    }
                }
                "build_arg" => {
                    let (key, value) = split_assignment(&required_arg(child, manifest_path)?);
                    build_args.insert(key, value);
                }
                "run_args" => {
                    run_args.extend(
                        child
                            .entries()
                            .iter()
                            .filter(|e| e.name().is_none())
                            .filter_map(|e| value_to_string(e.value())),
                    );
                }
                "env" | "environment" => {
                    if let Some(vars) = child.children() {
                        env.extend(parse_key_values(vars));
                    } else if let Some(val) = first_arg(child) {
                        let (key, value) = split_assignment(&val);
                        env.insert(key, value);
                    }
                }
                other => {
                    debug!(node = other, "Ignoring unknown image node");
                }
            }
        }
    }

    let folder = manifest_path.parent().unwrap_or(Path::new("."));
    let context_dir = folder.join(context.as_deref().unwrap_or(BUILD_DIR_NAME));
    if !context_dir.is_dir() {
        return Err(DiscoveryError::invalid(
            manifest_path,
            format!(
                "build context is not a directory: {}",
                context_dir.display()
            ),
        ));
    }
    let build_context_path = context_dir
        .canonicalize()
        .map_err(|e| DiscoveryError::io(&context_dir, e))?;

    let dockerfile = build_context_path.join(dockerfile.as_deref().unwrap_or(DEFAULT_DOCKERFILE));

    Ok(ImageDescriptor {
        name,
        build_context_path,
        dockerfile,
        manifest_path: absolute(manifest_path),
        parent_name,
        version,
        parent_arg: parent_arg.unwrap_or_else(|| DEFAULT_PARENT_ARG.to_string()),
        build_args,
        run_args,
        env,
    })
}

/// 子ノードを KEY "value" のマップとして読む
fn parse_key_values(doc: &KdlDocument) -> BTreeMap<String, String> {
    doc.nodes()
        .iter()
        .map(|node| {
            let key = node.name().value().to_string();
            let value = first_arg(node).unwrap_or_default();
            (key, value)
        })
        .collect()
}

fn required_arg(node: &KdlNode, manifest_path: &Path) -> Result<String> {
    first_arg(node).ok_or_else(|| {
        DiscoveryError::invalid(
            manifest_path,
            format!("'{}' requires a value", node.name().value()),
        )
    })
}

/// "KEY=value" を分割（= がなければ値は空）
pub(crate) fn split_assignment(value: &str) -> (String, String) {
    match value.split_once('=') {
        Some((key, value)) => (key.trim().to_string(), value.to_string()),
        None => (value.trim().to_string(), String::new()),
    }
}

/// イメージ名の検証
///
/// コンテナツールのリポジトリ名とCLIのサブコマンド名の両方に使えること。
pub(crate) fn validate_image_name(name: &str) -> std::result::Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err("image name must not be empty".to_string()),
        Some(c) if !(c.is_ascii_lowercase() || c.is_ascii_digit()) => {
            return Err(format!(
                "image name '{}' must start with a lowercase letter or digit",
                name
            ));
        }
        _ => {}
    }

    if let Some(c) = chars.find(|c| {
        !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    }) {
        return Err(format!(
            "image name '{}' contains invalid character '{}'",
            name, c
        ));
    }

    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
