use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_markshot")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "markshot.exe"
            } else {
                "markshot"
            });
            p
        })
}

#[test]
fn cli_writes_all_eight_demo_pngs() {
    let dir = PathBuf::from("target").join("cli_smoke_demos");
    let _ = std::fs::remove_dir_all(&dir);

    let status = std::process::Command::new(exe())
        .args([
            "--sentence",
            "Growth comes from stepping out of the comfort zone.",
            "--highlight",
            "comfort zone",
            "--basename",
            "demo",
            "--font-size",
            "24",
            "--output-dir",
        ])
        .arg(&dir)
        .status()
        .unwrap();
    assert!(status.success());

    for suffix in [
        "_color",
        "_size",
        "_family",
        "_weight",
        "_style",
        "_underline",
        "_strike",
        "_rise",
    ] {
        let path = dir.join(format!("demo{suffix}.png"));
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn cli_requires_a_sentence() {
    let status = std::process::Command::new(exe())
        .args(["--highlight", "x"])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn cli_rejects_a_bad_color() {
    let dir = PathBuf::from("target").join("cli_smoke_bad_color");
    let status = std::process::Command::new(exe())
        .args(["--sentence", "hello", "--color", "red-ish", "--output-dir"])
        .arg(&dir)
        .status()
        .unwrap();
    assert!(!status.success());
}
