#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("workspace root")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    workspace_root().join("fixtures").join("fake_conda").join(name)
}

fn install_script(src: &Path, dst: &Path) {
    fs::create_dir_all(dst.parent().expect("script parent")).expect("script dir");
    fs::copy(src, dst).expect("copy script");
    fs::set_permissions(dst, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

/// A root laid out like a finished installation whose launcher is the
/// `fake_conda/conda.sh` fixture.
pub fn fake_root() -> (TempDir, PathBuf) {
    let temp = tempfile::Builder::new()
        .prefix("condax-root")
        .tempdir()
        .expect("tempdir");
    let root = temp.path().join("miniconda3");
    install_script(&fixture("conda.sh"), &root.join("condabin").join("conda"));
    install_script(&fixture("python.sh"), &root.join("condabin").join("python.sh"));
    install_script(&fixture("python.sh"), &root.join("bin").join("python"));
    fs::create_dir_all(root.join("envs")).expect("envs dir");
    (temp, root)
}

/// Every argument line the fake launcher has seen, oldest first.
pub fn conda_log(root: &Path) -> Vec<String> {
    fs::read_to_string(root.join("conda.log"))
        .unwrap_or_default()
        .lines()
        .map(ToOwned::to_owned)
        .collect()
}
