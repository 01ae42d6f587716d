#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use multibuild::{Matrix, Toolchain};
use tempfile::TempDir;

/// Stand-in for cmake: records its arguments and seeds a cache file.
const FAKE_CMAKE: &str = r#"#!/bin/sh
printf '%s\n' "$@" > cmake.args
echo "configured" > CMakeCache.txt
"#;

/// Stand-in for make: produces a `profit-cli` that prints a timing line
/// whose ms figure is its argument count. Concurrent runs are detected
/// through a lock directory under `builds/`.
const FAKE_MAKE: &str = r#"#!/bin/sh
cat > profit-cli <<'EOF'
#!/bin/sh
lock=../../../bench.lock
mkdir "$lock" || exit 3
printf '%s\n' "$*" > last.args
echo "Loading profiles..."
echo "Ran 100 iterations in 4.5 [s] ($# [ms] per iteration)"
rmdir "$lock"
EOF
chmod +x profit-cli
"#;

/// Stand-in for make that fails for every clang++ configuration.
const FAKE_MAKE_FAILS_FOR_CLANG: &str = r#"#!/bin/sh
case "$(pwd -P)" in
  *clang++*) echo "clang++: error: unsupported" >&2; exit 2 ;;
esac
touch built
"#;

pub struct Tools {
    dir: TempDir,
}

impl Tools {
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            cmake: self.path("cmake").into(),
            make: self.path("make").into(),
            executable: "./profit-cli".into(),
        }
    }
}

/// Fake tool scripts, written once before any test of the binary spawns a
/// process so no forked child can hold them open for writing.
pub fn tools() -> &'static Tools {
    static TOOLS: OnceLock<Tools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("cmake", FAKE_CMAKE),
            ("make", FAKE_MAKE),
            ("make-fails-for-clang", FAKE_MAKE_FAILS_FOR_CLANG),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        Tools { dir }
    })
}

pub fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("CMakeLists.txt"), "project(demo CXX)\n").unwrap();
    dir
}

/// Every built-in compiler version crossed with two flag sets.
pub fn small_matrix() -> Matrix {
    Matrix::builtin()
        .filter(&[], &["o2".to_string(), "o3n".to_string()])
        .unwrap()
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
