//! イメージ参照（`[<registry>/]<name>:<tag>`）

use crate::error::{ImageError, Result};
use std::fmt;

/// Docker タグの最大長
const MAX_TAG_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: String,
}

impl ImageRef {
    /// タグを検証して参照を作成
    pub fn new(registry: Option<&str>, name: &str, tag: &str) -> Result<Self> {
        validate_tag(tag)?;
        Ok(Self {
            registry: normalize_registry(registry),
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// タグだけ差し替えた参照
    pub fn with_tag(&self, tag: &str) -> Result<Self> {
        Self::new(self.registry.as_deref(), &self.name, tag)
    }

    /// レジストリだけ差し替えた参照
    pub fn with_registry(&self, registry: Option<&str>) -> Self {
        Self {
            registry: normalize_registry(registry),
            name: self.name.clone(),
            tag: self.tag.clone(),
        }
    }

    /// `<registry>/<name>`（タグなし）
    pub fn repository(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}", registry, self.name),
            None => self.name.clone(),
        }
    }

    /// CLI で渡された参照を解決
    ///
    /// `:` も `/` も含まない値はこのイメージのタグとみなし、
    /// それ以外はそのままの参照として扱う。
    pub fn resolve(&self, argument: &str) -> Result<String> {
        if is_plain_tag(argument) {
            return Ok(self.with_tag(argument)?.to_string());
        }

        let (image, tag) = split_image_tag(argument);
        if image.is_empty() {
            return Err(ImageError::InvalidTag {
                tag: argument.to_string(),
            });
        }
        validate_tag(&tag)?;
        Ok(argument.to_string())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository(), self.tag)
    }
}

fn normalize_registry(registry: Option<&str>) -> Option<String> {
    registry
        .map(|r| r.trim().trim_end_matches('/'))
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

/// タグだけの指定か（`:` と `/` を含まない）
pub fn is_plain_tag(argument: &str) -> bool {
    !argument.contains(':') && !argument.contains('/')
}

/// タグのバリデーション
pub fn validate_tag(tag: &str) -> Result<()> {
    // Docker タグの制約:
    // - 128文字以下
    // - 英数字、ピリオド、ハイフン、アンダースコアのみ
    // - 先頭はピリオドまたはハイフンではない

    if tag.is_empty() {
        return Err(ImageError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > MAX_TAG_LEN {
        return Err(ImageError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(ImageError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(ImageError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// イメージ名とタグを分離
///
/// # Examples
/// - `ghcr.io/org/app:v1.0` -> `("ghcr.io/org/app", "v1.0")`
/// - `ghcr.io/org/app` -> `("ghcr.io/org/app", "latest")`
/// - `localhost:5000/app:dev` -> `("localhost:5000/app", "dev")`
pub fn split_image_tag(image: &str) -> (String, String) {
    if let Some(pos) = image.rfind(':') {
        let potential_tag = &image[pos + 1..];
        let potential_image = &image[..pos];

        // localhost:5000/app のようなポート番号はタグではない
        if !potential_tag.contains('/') && !potential_tag.chars().all(|c| c.is_ascii_digit()) {
            return (potential_image.to_string(), potential_tag.to_string());
        }
    }

    (image.to_string(), "latest".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let local = ImageRef::new(None, "ubuntu_base", "a1b2c3d4e5").unwrap();
        assert_eq!(local.to_string(), "ubuntu_base:a1b2c3d4e5");

        let remote = ImageRef::new(Some("ghcr.io/team/"), "ubuntu_base", "1.0").unwrap();
        assert_eq!(remote.to_string(), "ghcr.io/team/ubuntu_base:1.0");
        assert_eq!(remote.registry(), Some("ghcr.io/team"));
        assert_eq!(remote.repository(), "ghcr.io/team/ubuntu_base");
    }

    #[test]
    fn test_with_registry() {
        let local = ImageRef::new(None, "app", "1.0").unwrap();
        let remote = local.with_registry(Some("registry.example.com"));
        assert_eq!(remote.to_string(), "registry.example.com/app:1.0");
        assert_eq!(remote.with_registry(Some("")).to_string(), "app:1.0");
    }

    #[test]
    fn test_resolve_plain_tag() {
        let image = ImageRef::new(Some("registry.local"), "app", "abc").unwrap();
        assert_eq!(image.resolve("v2").unwrap(), "registry.local/app:v2");
    }

    #[test]
    fn test_resolve_literal_reference() {
        let image = ImageRef::new(None, "app", "abc").unwrap();
        assert_eq!(image.resolve("other:1.0").unwrap(), "other:1.0");
        assert_eq!(
            image.resolve("localhost:5000/app").unwrap(),
            "localhost:5000/app"
        );
        assert!(image.resolve(":1.0").is_err());
        assert!(image.resolve("other:-bad").is_err());
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("latest").is_ok());
        assert!(validate_tag("v1.0.0").is_ok());
        assert!(validate_tag("feature_branch-1").is_ok());

        assert!(validate_tag("").is_err());
        assert!(validate_tag(".hidden").is_err());
        assert!(validate_tag("-dash").is_err());
        assert!(validate_tag("has space").is_err());
        assert!(validate_tag(&"a".repeat(129)).is_err());
        assert!(validate_tag(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_new_rejects_invalid_tag() {
        let result = ImageRef::new(None, "app", "bad tag");
        assert!(matches!(result, Err(ImageError::InvalidTag { .. })));
    }

    #[test]
    fn test_split_image_tag() {
        assert_eq!(
            split_image_tag("ghcr.io/org/app:v1.0"),
            ("ghcr.io/org/app".to_string(), "v1.0".to_string())
        );
        assert_eq!(
            split_image_tag("ghcr.io/org/app"),
            ("ghcr.io/org/app".to_string(), "latest".to_string())
        );
        assert_eq!(
            split_image_tag("localhost:5000/app:dev"),
            ("localhost:5000/app".to_string(), "dev".to_string())
        );
        assert_eq!(
            split_image_tag("localhost:5000/app"),
            ("localhost:5000/app".to_string(), "latest".to_string())
        );
    }
}
