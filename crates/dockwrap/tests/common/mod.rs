use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use std::process::{Child, Stdio};
use tempfile::TempDir;

/// 引数を calls.log に記録し、ローカルイメージを images ファイルで模擬するコンテナツール
const FAKE_TOOL: &str = r#"#!/bin/sh
DIR='@DIR@'
IMAGES="$DIR/images"
echo "$*" >> "$DIR/calls.log"
touch "$IMAGES"

exit_code() {
    if [ -f "$DIR/$1.exit" ]; then cat "$DIR/$1.exit"; else echo 0; fi
}

case "$1" in
    image)
        grep -qxF "$3" "$IMAGES" && exit 0
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
        if [ -f "$DIR/run.sleep" ]; then
            exec sleep "$(cat "$DIR/run.sleep")"
        fi
        echo "container output"
        exit "$(exit_code run)"
        ;;
esac
exit 0
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    /// images/ と偽のコンテナツール、空の設定ファイルを持つプロジェクト
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = Self { root };

        fs::create_dir_all(project.images_dir()).unwrap();
        fs::create_dir_all(project.tool_dir()).unwrap();
        let script = FAKE_TOOL.replace("@DIR@", project.tool_dir().to_str().unwrap());
        fs::write(project.tool_dir().join("fake-docker"), script).unwrap();
        fs::write(project.tool_dir().join("images"), "").unwrap();
        project.write_config("local:\n");

        project
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.path().join("images")
    }

    fn tool_dir(&self) -> PathBuf {
        self.root.path().join("tool")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("dockwrap.yml")
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).unwrap();
    }

    /// `images/<folder>/Docker/Dockerfile` と `images/<folder>/image.kdl` を作成
    pub fn write_image(&self, folder: &str, manifest: &str) {
        let dir = self.images_dir().join(folder);
        fs::create_dir_all(dir.join("Docker")).unwrap();
        fs::write(dir.join("Docker/Dockerfile"), "ARG PARENT_IMAGE\nFROM alpine\n").unwrap();
        fs::write(dir.join("image.kdl"), manifest).unwrap();
    }

    /// 設定・イメージフォルダ・コンテナツールを固定した dockwrap コマンド
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("dockwrap").unwrap();
        cmd.current_dir(self.path())
            .env("DOCKWRAP_CONFIG", self.config_path())
            .env(
                "DOCKWRAP_CONTAINER_TOOL",
                format!("sh {}", self.tool_dir().join("fake-docker").display()),
            )
            .env("DOCKWRAP_IMAGES_DIR", self.images_dir())
            .env("NO_COLOR", "1")
            .env_remove("DOCKWRAP_ENV")
            .env_remove("RUST_LOG");
        cmd
    }

    /// 出力を捨ててバックグラウンドで起動（シグナルを送るテスト用）
    #[allow(dead_code)]
    pub fn spawn(&self, args: &[&str]) -> Child {
        std::process::Command::new(assert_cmd::cargo::cargo_bin("dockwrap"))
            .args(args)
            .current_dir(self.path())
            .env("DOCKWRAP_CONFIG", self.config_path())
            .env(
                "DOCKWRAP_CONTAINER_TOOL",
                format!("sh {}", self.tool_dir().join("fake-docker").display()),
            )
            .env("DOCKWRAP_IMAGES_DIR", self.images_dir())
            .env("NO_COLOR", "1")
            .env_remove("DOCKWRAP_ENV")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    /// `run` を指定秒数ブロックさせる
    #[allow(dead_code)]
    pub fn set_run_sleep(&self, seconds: u32) {
        fs::write(self.tool_dir().join("run.sleep"), seconds.to_string()).unwrap();
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.tool_dir().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[allow(dead_code)]
    pub fn add_image(&self, reference: &str) {
        let path = self.tool_dir().join("images");
        let mut images = fs::read_to_string(&path).unwrap();
        images.push_str(reference);
        images.push('\n');
        fs::write(path, images).unwrap();
    }

    #[allow(dead_code)]
    pub fn has_image(&self, reference: &str) -> bool {
        fs::read_to_string(self.tool_dir().join("images"))
            .unwrap()
            .lines()
            .any(|line| line == reference)
    }

    #[allow(dead_code)]
    pub fn set_exit_code(&self, operation: &str, code: i32) {
        fs::write(
            self.tool_dir().join(format!("{}.exit", operation)),
            code.to_string(),
        )
        .unwrap();
    }
}
