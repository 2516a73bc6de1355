//! ビルドコンテキストのコンテンツハッシュ
//!
//! イメージのデフォルトタグはビルドコンテキストの内容から決まる。
//! 内容が変わらなければタグも変わらないので、ビルド済みかどうかを
//! タグの存在だけで判定できる。

use crate::error::{DiscoveryError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// デフォルトタグに使うハッシュの長さ
pub const SHORT_HASH_LEN: usize = 10;

/// ディレクトリ配下の全ファイルからSHA-256を計算（16進文字列）
///
/// 相対パスの辞書順に、相対パスとファイル内容のダイジェストを入力する。
/// ファイル名の変更も内容の変更もハッシュに反映される。
pub fn folder_hash(dir: &Path) -> Result<String> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();
    visit_dir(dir, &mut files, &mut visited)?;

    let mut entries: Vec<(String, PathBuf)> = files
        .into_iter()
        .map(|path| (relative_key(dir, &path), path))
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (key, path) in &entries {
        let content = std::fs::read(path).map_err(|e| DiscoveryError::io(path, e))?;
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(Sha256::digest(&content));
    }

    let hash = hex::encode(hasher.finalize());
    debug!(dir = %dir.display(), files = entries.len(), %hash, "Computed folder hash");
    Ok(hash)
}

/// 親イメージのハッシュと自身のハッシュを結合
pub fn combine_hashes(parent: &str, own: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent.as_bytes());
    hasher.update(own.as_bytes());
    hex::encode(hasher.finalize())
}

/// ハッシュの先頭を切り出してタグにする
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(SHORT_HASH_LEN)]
}

/// OS に依存しない区切り文字（/）で相対パスを表現
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// ディレクトリを再帰的に走査
fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>, visited: &mut HashSet<PathBuf>) -> Result<()> {
    let canonical_dir = dir.canonicalize().map_err(|e| DiscoveryError::io(dir, e))?;

    // ループ検出: 既に訪問済みなら終了
    if !visited.insert(canonical_dir.clone()) {
        warn!(dir = %canonical_dir.display(), "Symlink loop detected, skipping");
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| DiscoveryError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| DiscoveryError::io(dir, e))?;
        let path = entry.path();

        if path.is_dir() {
            visit_dir(&path, files, visited)?;
        } else if path.is_file() {
            files.push(path);
        }
    }

    Ok(())
}
