use std::process::Command;

#[test]
fn jarscope_exits_non_zero_on_missing_input() {
    let jarscope = std::env::var("CARGO_BIN_EXE_jarscope").unwrap_or_else(|_| {
        let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("target");
        path.push("debug");
        path.push("jarscope");
        if cfg!(windows) {
            path.set_extension("exe");
        }
        path.to_string_lossy().to_string()
    });
    let output = Command::new(jarscope)
        .arg("--input")
        .arg("missing.jar")
        .output()
        .expect("run jarscope");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("input not found: missing.jar"));
}
