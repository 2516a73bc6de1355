use super::*;
use crate::error::DiscoveryError;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Docker/ を持つイメージフォルダを作成し、image.kdl のパスを返す
fn image_folder() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp_dir.path().join("Docker")).unwrap();
    let manifest = temp_dir.path().join("image.kdl");
    (temp_dir, manifest)
}

#[test]
fn test_parse_minimal_image() {
    let (_dir, manifest) = image_folder();

    let image = parse_manifest_str(r#"image "ubuntu_base""#, &manifest).unwrap();

    assert_eq!(image.name(), "ubuntu_base");
    assert!(image.build_context_path().ends_with("Docker"));
    assert!(image.build_context_path().is_absolute());
    assert!(image.dockerfile().ends_with("Docker/Dockerfile"));
    assert_eq!(image.parent_name(), None);
    assert_eq!(image.version(), None);
    assert_eq!(image.parent_arg(), "PARENT_IMAGE");
    assert!(image.build_args().is_empty());
    assert!(image.run_args().is_empty());
}

#[test]
fn test_parse_full_image() {
    let (_dir, manifest) = image_folder();

    let kdl = r#"
        image "ubuntu_derived" {
            parent "ubuntu_base"
            version "1.4.0"
            parent_arg "BASE"
            dockerfile "Dockerfile.dev"
            build_args {
                UBUNTU_VERSION "22.04"
                JOBS 4
            }
            run_args "--network" "host"
            env {
                LANG "C.UTF-8"
            }
        }
    "#;

    let image = parse_manifest_str(kdl, &manifest).unwrap();

    assert_eq!(image.name(), "ubuntu_derived");
    assert_eq!(image.parent_name(), Some("ubuntu_base"));
    assert_eq!(image.version(), Some("1.4.0"));
    assert_eq!(image.parent_arg(), "BASE");
    assert!(image.dockerfile().ends_with("Docker/Dockerfile.dev"));
    assert_eq!(
        image.build_args().get("UBUNTU_VERSION").map(String::as_str),
        Some("22.04")
    );
    assert_eq!(image.build_args().get("JOBS").map(String::as_str), Some("4"));
    assert_eq!(image.run_args(), ["--network", "host"]);
    assert_eq!(image.env().get("LANG").map(String::as_str), Some("C.UTF-8"));
}

#[test]
fn test_parse_flat_build_arg_and_env() {
    let (_dir, manifest) = image_folder();

    let kdl = r#"
        image "app" {
            build_arg "HTTP_PROXY=http://proxy:3128"
            env "DEBUG=1"
        }
    "#;

    let image = parse_manifest_str(kdl, &manifest).unwrap();

    assert_eq!(
        image.build_args().get("HTTP_PROXY").map(String::as_str),
        Some("http://proxy:3128")
    );
    assert_eq!(image.env().get("DEBUG").map(String::as_str), Some("1"));
}

#[test]
fn test_context_is_relative_to_manifest() {
    let (dir, manifest) = image_folder();
    fs::create_dir_all(dir.path().join("build")).unwrap();

    let kdl = r#"
        image "custom" {
            context "build"
        }
    "#;

    let image = parse_manifest_str(kdl, &manifest).unwrap();
    assert_eq!(
        image.build_context_path(),
        dir.path().join("build").canonicalize().unwrap()
    );
}

#[test]
fn test_missing_context_directory() {
    let (_dir, manifest) = image_folder();

    let kdl = r#"image "custom" { context "nowhere"; }"#;

    let result = parse_manifest_str(kdl, &manifest);
    assert!(matches!(
        result,
        Err(DiscoveryError::InvalidManifest { .. })
    ));
}

#[test]
fn test_no_image_node() {
    let (_dir, manifest) = image_folder();

    let result = parse_manifest_str(r#"comment "nothing here""#, &manifest);
    assert!(matches!(result, Err(DiscoveryError::NoDescriptor { .. })));
}

#[test]
fn test_multiple_image_nodes_are_ambiguous() {
    let (_dir, manifest) = image_folder();

    let kdl = r#"
        image "first"
        image "second"
    "#;

    match parse_manifest_str(kdl, &manifest) {
        Err(DiscoveryError::AmbiguousDescriptor { count, .. }) => assert_eq!(count, 2),
        other => panic!("Expected AmbiguousDescriptor error, got {:?}", other),
    }
}

#[test]
fn test_image_without_name() {
    let (_dir, manifest) = image_folder();

    let result = parse_manifest_str("image", &manifest);
    assert!(matches!(
        result,
        Err(DiscoveryError::InvalidManifest { .. })
    ));
}

#[test]
fn test_invalid_image_names() {
    let (_dir, manifest) = image_folder();

    for name in ["Ubuntu", "-leading", "with space", "slash/name"] {
        let kdl = format!(r#"image "{}""#, name);
        let result = parse_manifest_str(&kdl, &manifest);
        assert!(
            matches!(result, Err(DiscoveryError::InvalidManifest { .. })),
            "name {:?} should be rejected",
            name
        );
    }
}

#[test]
fn test_parse_error() {
    let (_dir, manifest) = image_folder();

    let result = parse_manifest_str(r#"image "x" {"#, &manifest);
    assert!(matches!(result, Err(DiscoveryError::ManifestParse { .. })));
}

#[test]
fn test_unknown_nodes_are_ignored() {
    let (_dir, manifest) = image_folder();

    let kdl = r#"
        description "not an image"
        image "app" {
            maintainer "team"
        }
    "#;

    let image = parse_manifest_str(kdl, &manifest).unwrap();
    assert_eq!(image.name(), "app");
}

#[test]
fn test_parse_manifest_file() {
    let (_dir, manifest) = image_folder();
    fs::write(&manifest, r#"image "from_file""#).unwrap();

    let image = parse_manifest_file(&manifest).unwrap();
    assert_eq!(image.name(), "from_file");
    assert_eq!(image.manifest_path(), manifest.canonicalize().unwrap());
}
