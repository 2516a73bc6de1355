//! イメージレジストリ
//!
//! イメージ名から [`ImageDescriptor`] への対応。起動のたびに発見処理で作り直される。

use crate::error::{DiscoveryError, Result};
use crate::hash::{combine_hashes, folder_hash, short_hash};
use crate::model::ImageDescriptor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 発見されたイメージの一覧（発見順を保持）
#[derive(Debug, Clone, Default)]
pub struct Registry {
    root: PathBuf,
    images: Vec<ImageDescriptor>,
}

impl Registry {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            images: Vec::new(),
        }
    }

    /// イメージを登録（名前の重複はエラー）
    pub(crate) fn insert(&mut self, descriptor: ImageDescriptor) -> Result<()> {
        if let Some(existing) = self.get(descriptor.name()) {
            return Err(DiscoveryError::DuplicateName {
                name: descriptor.name().to_string(),
                first: existing.manifest_path().to_path_buf(),
                second: descriptor.manifest_path().to_path_buf(),
            });
        }
        self.images.push(descriptor);
        Ok(())
    }

    /// 発見処理のルートディレクトリ
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&ImageDescriptor> {
        self.images.iter().find(|image| image.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageDescriptor> {
        self.images.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(|image| image.name())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// 登録済みの親イメージを取得
    ///
    /// 親が未登録の場合は None（ビルド時にコンテナツール側で失敗させる）。
    pub fn parent_of(&self, image: &ImageDescriptor) -> Option<&ImageDescriptor> {
        image.parent_name().and_then(|parent| self.get(parent))
    }

    /// 親をたどるチェーン（自身を含まない、近い順）
    pub fn ancestors<'a>(&'a self, image: &'a ImageDescriptor) -> Vec<&'a ImageDescriptor> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([image.name()]);
        let mut current = self.parent_of(image);

        while let Some(parent) = current {
            if !seen.insert(parent.name()) {
                break;
            }
            chain.push(parent);
            current = self.parent_of(parent);
        }

        chain
    }

    /// 親イメージのループを検出
    pub(crate) fn check_parent_cycles(&self) -> Result<()> {
        for image in &self.images {
            let mut path = vec![image.name()];
            let mut current = self.parent_of(image);

            while let Some(parent) = current {
                if path.contains(&parent.name()) {
                    path.push(parent.name());
                    return Err(DiscoveryError::CircularParent(path.join(" -> ")));
                }
                path.push(parent.name());
                current = self.parent_of(parent);
            }
        }
        Ok(())
    }

    /// イメージのコンテンツハッシュ
    ///
    /// 登録済みの親があれば、親のハッシュと結合する（親が変われば子も再ビルド対象になる）。
    pub fn content_hash(&self, image: &ImageDescriptor) -> Result<String> {
        let own = folder_hash(image.build_context_path())?;

        // 祖先から順に結合
        let mut hash: Option<String> = None;
        for ancestor in self.ancestors(image).into_iter().rev() {
            let ancestor_hash = folder_hash(ancestor.build_context_path())?;
            hash = Some(match hash {
                Some(parent) => combine_hashes(&parent, &ancestor_hash),
                None => ancestor_hash,
            });
        }

        Ok(match hash {
            Some(parent) => combine_hashes(&parent, &own),
            None => own,
        })
    }

    /// デフォルトタグ: 明示的な version、なければコンテンツハッシュの先頭10文字
    pub fn default_tag(&self, image: &ImageDescriptor) -> Result<String> {
        if let Some(version) = image.version() {
            return Ok(version.to_string());
        }
        let hash = self.content_hash(image)?;
        Ok(short_hash(&hash).to_string())
    }
}
