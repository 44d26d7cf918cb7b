use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_ground_kdl(&self, content: &str) {
        let path = self.root.path().join("ground.kdl");
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn state_file(&self, artifact: &str) -> PathBuf {
        self.root
            .path()
            .join(format!(".groundflow/state/{artifact}.json"))
    }

    /// 正常系のプロバイダーシムを配置
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn write_shim(&self) {
        self.write_shim_script(
            r#"case "$1" in
    create)
        printf '{"id": "res-%s", "attributes": {}}\n' "$(date +%s%N)"
        ;;
    update)
        echo '{"attributes": {}}'
        ;;
    destroy)
        echo '{}'
        ;;
esac"#,
        );
    }

    /// 常に失敗するプロバイダーシムを配置
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn write_failing_shim(&self) {
        self.write_shim_script(r#"echo "provider exploded" >&2; exit 1"#);
    }

    #[cfg(unix)]
    fn write_shim_script(&self, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let dir = self.root.path().join("providers");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shim");
        fs::write(&path, format!("#!/bin/sh\nread REQUEST\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// ロックファイルを直接配置（競合テスト用）
    #[allow(dead_code)]
    pub fn write_lock(&self, artifact: &str, holder: &str, expires_at: &str) {
        let dir = self.root.path().join(".groundflow/state");
        fs::create_dir_all(&dir).unwrap();
        let lock = serde_json::json!({
            "lock_id": 1,
            "holder": holder,
            "acquired_at": "2026-01-01T00:00:00Z",
            "expires_at": expires_at,
        });
        fs::write(dir.join(format!("{artifact}.lock")), lock.to_string()).unwrap();
    }
}
