//! dockwrap core
//!
//! イメージ定義（image.kdl）のパース、イメージフォルダの発見、
//! およびレジストリの構築を提供します。

pub mod discovery;
pub mod error;
pub mod hash;
pub mod model;
pub mod parser;
pub mod registry;

pub use discovery::discover_images;
pub use error::{DiscoveryError, Result};
pub use model::{
    BUILD_DIR_NAME, DEFAULT_DOCKERFILE, DEFAULT_PARENT_ARG, ImageDescriptor, MANIFEST_FILENAME,
};
pub use parser::{parse_manifest_file, parse_manifest_str};
pub use registry::Registry;
