#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::assert::Assert;
use serde_json::Value;
use tempfile::TempDir;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("workspace root")
        .to_path_buf()
}

fn install_script(name: &str, dst: &Path) {
    let src = workspace_root().join("fixtures").join("fake_conda").join(name);
    fs::create_dir_all(dst.parent().expect("script parent")).expect("script dir");
    fs::copy(src, dst).expect("copy script");
    fs::set_permissions(dst, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

/// Installation root driven by the fake conda launcher fixture.
pub fn fake_root() -> (TempDir, PathBuf) {
    let temp = tempfile::Builder::new()
        .prefix("condax-cli")
        .tempdir()
        .expect("tempdir");
    let root = temp.path().join("miniconda3");
    install_script("conda.sh", &root.join("condabin").join("conda"));
    install_script("python.sh", &root.join("condabin").join("python.sh"));
    install_script("python.sh", &root.join("bin").join("python"));
    fs::create_dir_all(root.join("envs")).expect("envs dir");
    (temp, root)
}

pub fn parse_json(assert: &Assert) -> Value {
    let output = assert.get_output();
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout should be JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
