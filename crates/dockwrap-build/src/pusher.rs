//! レジストリとのやり取り
//!
//! push / pull と、イメージ操作の前に実行するログインコマンド。

use crate::error::{ImageError, Result};
use crate::reference::ImageRef;
use crate::tool::ContainerTool;
use colored::Colorize;
use tokio::process::Command;
use tracing::info;

pub struct ImagePusher {
    tool: ContainerTool,
}

impl ImagePusher {
    pub fn new(tool: ContainerTool) -> Self {
        Self { tool }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// ローカルの参照とリモートの参照が異なる場合は、先にリモートの参照でタグ付けする。
    ///
    /// # Returns
    /// プッシュした参照
    pub async fn push(&self, local: &ImageRef, remote: &ImageRef) -> Result<String> {
        let local = local.to_string();
        let remote = remote.to_string();

        if local != remote {
            if !self.tool.image_exists(&local).await? {
                return Err(ImageError::SourceImageNotFound(local));
            }
            let output = self.tool.output(["tag", local.as_str(), remote.as_str()]).await?;
            if !output.success() {
                return Err(ImageError::TagFailed {
                    from: local,
                    to: remote,
                    code: output.code(),
                    stderr: output.stderr,
                });
            }
        }

        println!("  → {}", remote.cyan());
        let output = self.tool.output(["push", remote.as_str()]).await?;
        if !output.success() {
            return Err(ImageError::RegistryFailed {
                operation: "push",
                reference: remote,
                code: output.code(),
                stderr: output.stderr,
            });
        }

        info!(image = %remote, "Pushed image");
        println!("  {} Pushed", "✓".green());
        Ok(remote)
    }

    /// イメージをレジストリからプル
    pub async fn pull(&self, reference: &ImageRef) -> Result<String> {
        let reference = reference.to_string();

        println!("  ← {}", reference.cyan());
        let output = self.tool.output(["pull", reference.as_str()]).await?;
        if !output.success() {
            return Err(ImageError::RegistryFailed {
                operation: "pull",
                reference,
                code: output.code(),
                stderr: output.stderr,
            });
        }

        info!(image = %reference, "Pulled image");
        println!("  {} Pulled", "✓".green());
        Ok(reference)
    }
}

/// レジストリへのログインコマンドを `sh -c` で実行
pub async fn login(command: &str) -> Result<()> {
    info!("Performing registry login");
    let status = Command::new("sh").arg("-c").arg(command).status().await?;

    if !status.success() {
        return Err(ImageError::LoginFailed {
            code: status.code().unwrap_or(1),
        });
    }
    Ok(())
}
