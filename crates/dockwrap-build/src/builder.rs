//! イメージのビルドとタグ付け

use crate::error::{ImageError, Result};
use crate::reference::{ImageRef, split_image_tag};
use crate::tool::{ContainerTool, ToolOutput};
use colored::Colorize;
use dockwrap_core::{DEFAULT_DOCKERFILE, ImageDescriptor, Registry};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// イメージ履歴に残ると困るビルド引数のキー
const SENSITIVE_PATTERNS: [&str; 5] = ["password", "token", "secret", "api_key", "private_key"];

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// 省略時はデフォルトタグ（version またはコンテンツハッシュ）
    pub tag: Option<String>,
    /// CLI で指定されたビルド引数（最優先）
    pub build_args: Vec<(String, String)>,
    /// ローカルに同じ参照があってもビルドする
    pub force: bool,
    pub no_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// ビルドした（ツールの出力付き）
    Built {
        reference: ImageRef,
        output: ToolOutput,
    },
    AlreadyExists(ImageRef),
}

impl BuildOutcome {
    pub fn reference(&self) -> &ImageRef {
        match self {
            BuildOutcome::Built { reference, .. } | BuildOutcome::AlreadyExists(reference) => {
                reference
            }
        }
    }

    /// ビルド時のツールの出力（スキップした場合は None）
    pub fn output(&self) -> Option<&ToolOutput> {
        match self {
            BuildOutcome::Built { output, .. } => Some(output),
            BuildOutcome::AlreadyExists(_) => None,
        }
    }
}

pub struct ImageBuilder<'a> {
    tool: ContainerTool,
    registry: &'a Registry,
    registry_prefix: Option<String>,
    default_build_args: BTreeMap<String, String>,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(tool: ContainerTool, registry: &'a Registry) -> Self {
        Self {
            tool,
            registry,
            registry_prefix: None,
            default_build_args: BTreeMap::new(),
        }
    }

    /// 参照の前につけるレジストリ（設定ファイルの docker_registry_prefix）
    pub fn with_registry_prefix(mut self, prefix: Option<&str>) -> Self {
        self.registry_prefix = prefix.map(str::to_string);
        self
    }

    /// 全イメージ共通のビルド引数（マニフェストとCLIで上書きされる）
    pub fn with_default_build_args(mut self, build_args: BTreeMap<String, String>) -> Self {
        self.default_build_args = build_args;
        self
    }

    pub fn tool(&self) -> &ContainerTool {
        &self.tool
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn registry_prefix(&self) -> Option<&str> {
        self.registry_prefix.as_deref()
    }

    /// イメージの参照（タグ省略時はデフォルトタグ）
    pub fn reference(&self, image: &ImageDescriptor, tag: Option<&str>) -> Result<ImageRef> {
        let tag = match tag {
            Some(tag) => tag.to_string(),
            None => self.registry.default_tag(image)?,
        };
        ImageRef::new(self.registry_prefix.as_deref(), image.name(), &tag)
    }

    /// 親イメージの参照
    ///
    /// 登録済みの親はそのデフォルト参照、未登録の親（例: `ubuntu:22.04`）は
    /// 名前をそのまま参照として扱う。
    pub fn parent_reference(&self, image: &ImageDescriptor) -> Result<Option<ImageRef>> {
        let Some(parent_name) = image.parent_name() else {
            return Ok(None);
        };

        match self.registry.get(parent_name) {
            Some(parent) => self.reference(parent, None).map(Some),
            None => {
                let (name, tag) = split_image_tag(parent_name);
                ImageRef::new(None, &name, &tag).map(Some)
            }
        }
    }

    /// ビルド引数をマージ
    ///
    /// 優先順位: 設定ファイル < マニフェスト < 親イメージ < CLI
    pub fn build_args(
        &self,
        image: &ImageDescriptor,
        cli_args: &[(String, String)],
    ) -> Result<BTreeMap<String, String>> {
        let mut merged = self.default_build_args.clone();
        merged.extend(
            image
                .build_args()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        if let Some(parent) = self.parent_reference(image)? {
            merged.insert(image.parent_arg().to_string(), parent.to_string());
        }

        merged.extend(cli_args.iter().cloned());

        for key in merged.keys() {
            validate_build_arg(key);
        }

        Ok(merged)
    }

    /// ビルドコマンドの引数
    pub fn build_command_args(
        &self,
        image: &ImageDescriptor,
        reference: &ImageRef,
        build_args: &BTreeMap<String, String>,
        no_cache: bool,
    ) -> Vec<String> {
        let mut args = vec!["build".to_string(), "-t".to_string(), reference.to_string()];

        if image.dockerfile() != image.build_context_path().join(DEFAULT_DOCKERFILE) {
            args.push("-f".to_string());
            args.push(image.dockerfile().display().to_string());
        }

        if no_cache {
            args.push("--no-cache".to_string());
        }

        for (key, value) in build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(image.build_context_path().display().to_string());
        args
    }

    /// イメージをビルド
    ///
    /// Dockerfile がなければツールを呼ばずに失敗する。
    /// 同じ参照がローカルにあれば `force` なしではスキップする。
    pub async fn build(
        &self,
        image: &ImageDescriptor,
        options: &BuildOptions,
    ) -> Result<BuildOutcome> {
        if !image.dockerfile().is_file() {
            return Err(ImageError::DockerfileNotFound(image.dockerfile().to_path_buf()));
        }

        let reference = self.reference(image, options.tag.as_deref())?;
        let reference_str = reference.to_string();

        if !options.force && self.tool.image_exists(&reference_str).await? {
            info!(image = %reference_str, "Image already exists, not rebuilding");
            println!(
                "  {} {} はビルド済みです（--force で再ビルド）",
                "✓".green(),
                reference_str.cyan()
            );
            return Ok(BuildOutcome::AlreadyExists(reference));
        }

        let build_args = self.build_args(image, &options.build_args)?;
        debug!(?build_args, "Build args");

        let args = self.build_command_args(image, &reference, &build_args, options.no_cache);

        println!("{} {}", "ビルド中:".blue(), reference_str.cyan());
        let output = self.tool.output(&args).await?;

        if !output.success() {
            return Err(ImageError::BuildFailed {
                image: image.name().to_string(),
                code: output.code(),
                stderr: output.stderr,
            });
        }

        info!(image = %reference_str, "Successfully built");
        println!("  {} {}", "✓".green(), reference_str);
        Ok(BuildOutcome::Built { reference, output })
    }

    /// ローカルのイメージに追加のタグをつける
    ///
    /// `source` / `target` がタグだけならこのイメージの参照に展開する。
    pub async fn tag(
        &self,
        image: &ImageDescriptor,
        source: &str,
        target: &str,
    ) -> Result<(String, String)> {
        let base = ImageRef::new(self.registry_prefix.as_deref(), image.name(), "latest")?;
        let from = base.resolve(source)?;
        let to = base.resolve(target)?;

        if !self.tool.image_exists(&from).await? {
            return Err(ImageError::SourceImageNotFound(from));
        }

        let output = self.tool.output(["tag", from.as_str(), to.as_str()]).await?;
        if !output.success() {
            return Err(ImageError::TagFailed {
                from,
                to,
                code: output.code(),
                stderr: output.stderr,
            });
        }

        info!(from = %from, to = %to, "Tagged image");
        println!("  {} {} → {}", "✓".green(), from, to.cyan());
        Ok((from, to))
    }
}

/// ビルド引数のセキュリティチェック
fn validate_build_arg(key: &str) {
    let key_lower = key.to_lowercase();
    if SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
    {
        warn!(
            build_arg = %key,
            "Build arg may contain sensitive data; build args are recorded in the image history"
        );
    }
}

/// `KEY=VALUE` 形式のビルド引数をパース
pub fn parse_build_arg(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", arg)),
    }
}
