//! dockwrap build
//!
//! 外部コンテナツール（docker など）をサブプロセスとして呼び出し、
//! イメージのビルド・タグ付け・push/pull・一時コンテナの実行を行います。

pub mod builder;
pub mod error;
pub mod pusher;
pub mod reference;
pub mod runner;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{BuildOptions, BuildOutcome, ImageBuilder, parse_build_arg};
pub use error::{INTERRUPTED_EXIT_CODE, ImageError, Result, TERMINATED_EXIT_CODE};
pub use pusher::{ImagePusher, login};
pub use reference::{ImageRef, split_image_tag, validate_tag};
pub use runner::{ContainerGuard, ContainerRunner, RunOptions, container_name};
pub use tool::{ContainerTool, ToolOutput};
