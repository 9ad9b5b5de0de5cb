use std::{
    env, fs,
    path::{Path, PathBuf},
    process::{Command, Output},
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A fresh directory below the system temp dir, unique per test.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!(
        "wakedir-it-{}-{}-{name}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ));
    drop(fs::remove_dir_all(&dir));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

/// Writes `config_toml` as `wakedir.toml` into `dir` and returns its path.
pub fn write_config(dir: &Path, config_toml: &str) -> PathBuf {
    let path = dir.join("wakedir.toml");
    fs::write(&path, config_toml).expect("failed to write config");
    path
}

/// Runs the binary with the given config and arguments.
pub fn wakedir(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wakedir"))
        .env("WAKEDIR_INTEGRATION_TEST", "1")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run wakedir")
}

/// Asserts success and returns stdout.
pub fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "wakedir failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("stdout is not utf-8")
}

pub const WRITABLE_CONFIG: &str = r#"
[storage]
type = "file"
readonly = false

[storage.file]
path = "hosts.toml"
"#;
