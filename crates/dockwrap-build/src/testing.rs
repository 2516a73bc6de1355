//! テスト用の偽コンテナツール
//!
//! 引数を calls.log に記録し、ローカルイメージを images ファイルで模擬する。
//! 終了コードは `<操作>.exit` ファイルで上書きできる。

use crate::tool::ContainerTool;
use dockwrap_core::Registry;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
DIR='@DIR@'
IMAGES="$DIR/images"
echo "$*" >> "$DIR/calls.log"
touch "$IMAGES"

exit_code() {
    if [ -f "$DIR/$1.exit" ]; then cat "$DIR/$1.exit"; else echo 0; fi
}

case "$1" in
    image)
        if grep -qxF "$3" "$IMAGES"; then
            echo "[{\"RepoTags\": [\"$3\"]}]"
            exit 0
        fi
        echo "Error: No such image: $3" >&2
        exit 1
        ;;
    build)
        shift
        tag=""
        parent=""
        while [ $# -gt 0 ]; do
            case "$1" in
                -t) tag="$2"; shift 2 ;;
                --build-arg)
                    case "$2" in
                        PARENT_IMAGE=*) parent="${2#PARENT_IMAGE=}" ;;
                    esac
                    shift 2
                    ;;
                *) shift ;;
            esac
        done
        if [ -n "$parent" ] && ! grep -qxF "$parent" "$IMAGES"; then
            echo "ERROR: failed to resolve source metadata for $parent: not found" >&2
            exit 1
        fi
        code=$(exit_code build)
        if [ "$code" != 0 ]; then
            echo "ERROR: build step failed" >&2
            exit "$code"
        fi
        echo "Successfully tagged $tag"
        echo "$tag" >> "$IMAGES"
        ;;
    tag)
        if ! grep -qxF "$2" "$IMAGES"; then
            echo "Error: No such image: $2" >&2
            exit 1
        fi
        echo "$3" >> "$IMAGES"
        ;;
    push)
        code=$(exit_code push)
        if [ "$code" != 0 ]; then
            echo "denied: requested access to the resource is denied" >&2
        fi
        exit "$code"
        ;;
    pull)
        code=$(exit_code pull)
        if [ "$code" != 0 ]; then
            echo "Error response from daemon: manifest unknown" >&2
            exit "$code"
        fi
        echo "$2" >> "$IMAGES"
        ;;
    run)
        echo "container output"
        exit "$(exit_code run)"
        ;;
esac
exit 0
"#;

pub(crate) struct FakeTool {
    dir: TempDir,
}

impl FakeTool {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = SCRIPT.replace("@DIR@", dir.path().to_str().unwrap());
        fs::write(dir.path().join("fake-docker"), script).unwrap();
        fs::write(dir.path().join("images"), "").unwrap();
        Self { dir }
    }

    /// `sh <script>` として起動（実行権限に依存しない）
    pub(crate) fn tool(&self) -> ContainerTool {
        ContainerTool::new(&format!(
            "sh {}",
            self.dir.path().join("fake-docker").display()
        ))
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    pub(crate) fn add_image(&self, reference: &str) {
        let path = self.dir.path().join("images");
        let mut images = fs::read_to_string(&path).unwrap();
        images.push_str(reference);
        images.push('\n');
        fs::write(path, images).unwrap();
    }

    pub(crate) fn has_image(&self, reference: &str) -> bool {
        fs::read_to_string(self.dir.path().join("images"))
            .unwrap()
            .lines()
            .any(|line| line == reference)
    }

    pub(crate) fn set_exit_code(&self, operation: &str, code: i32) {
        fs::write(
            self.dir.path().join(format!("{}.exit", operation)),
            code.to_string(),
        )
        .unwrap();
    }
}

/// イメージフォルダ一式
pub(crate) struct ImageTree {
    dir: TempDir,
}

impl ImageTree {
    pub(crate) fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// `<folder>/Docker/Dockerfile` と `<folder>/image.kdl` を作成
    pub(crate) fn image(self, folder: &str, manifest: &str) -> Self {
        let dir = self.dir.path().join(folder);
        fs::create_dir_all(dir.join("Docker")).unwrap();
        fs::write(dir.join("Docker/Dockerfile"), "ARG PARENT_IMAGE\nFROM alpine\n").unwrap();
        fs::write(dir.join("image.kdl"), manifest).unwrap();
        self
    }

    pub(crate) fn dockerfile(&self, folder: &str) -> PathBuf {
        self.dir.path().join(folder).join("Docker/Dockerfile")
    }

    pub(crate) fn registry(&self) -> Registry {
        dockwrap_core::discover_images(self.dir.path()).unwrap()
    }
}
