use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::tempdir;

fn inquisitor_binary() -> &'static str {
    env!("CARGO_BIN_EXE_inquisitor")
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("workspace root")
        .to_path_buf()
}

#[test]
fn clean_file_prints_nothing_and_succeeds() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("clean.py");
    fs::write(
        &path,
        "def add(a: int, b: int) -> int:\n    return a + b\n\ntotal = add(1, 2)\n",
    )?;

    let output = Command::new(inquisitor_binary())
        .arg(&path)
        .env_remove("INQUISITOR_DEBUG")
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn violations_are_printed_by_line_and_fail() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("broken.py");
    fs::write(
        &path,
        "def f():\n    pass\n\nx = missing\nf = 3\nNone = 1\n",
    )?;

    let output = Command::new(inquisitor_binary())
        .arg(&path)
        .env_remove("INQUISITOR_DEBUG")
        .output()?;
    assert!(!output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "4: name 'missing' is used but not defined",
            "5: suspicious: 'f' was bound to a function and is rebound to 'int'",
            "6: cannot redefine built-in constant 'None'",
        ]
    );
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("3 violation(s) found"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn json_format_includes_diagnostics_and_bindings() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("report.py");
    fs::write(&path, "count = 1\nlabel = count + \"x\"\n")?;

    let output = Command::new(inquisitor_binary())
        .arg(&path)
        .args(["--format", "json"])
        .env_remove("INQUISITOR_DEBUG")
        .output()?;
    assert!(!output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let diagnostics = report["diagnostics"].as_array().expect("diagnostics array");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["level"], "heresy");
    assert_eq!(diagnostics[0]["span"]["line"], 2);

    let bindings = report["bindings"].as_array().expect("bindings array");
    assert!(bindings
        .iter()
        .any(|binding| binding["name"] == "count" && binding["type"] == "int"));
    Ok(())
}

#[test]
fn comment_annotations_can_be_disabled() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("comments.py");
    fs::write(&path, "name = 3  #:: str\n")?;

    let strict = Command::new(inquisitor_binary())
        .arg(&path)
        .env_remove("INQUISITOR_DEBUG")
        .output()?;
    assert!(!strict.status.success());
    assert_eq!(
        String::from_utf8(strict.stdout)?.trim(),
        "1: 'name' declared as 'str' but assigned 'int'"
    );

    let relaxed = Command::new(inquisitor_binary())
        .arg(&path)
        .arg("--no-comment-annotations")
        .env_remove("INQUISITOR_DEBUG")
        .output()?;
    assert!(relaxed.status.success());
    Ok(())
}

#[test]
fn syntax_errors_are_reported_on_stderr() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("syntax.py");
    fs::write(&path, "def f(:\n    pass\n")?;

    let output = Command::new(inquisitor_binary()).arg(&path).output()?;
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("failed to parse"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn debug_environment_enables_logging_without_changing_results() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("logged.py");
    fs::write(&path, "import os\nvalue = 1\n")?;

    let output = Command::new(inquisitor_binary())
        .arg(&path)
        .env("INQUISITOR_DEBUG", "1")
        .output()?;
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("value"), "bindings dump missing: {stderr}");
    Ok(())
}

#[test]
fn test_subcommand_passes_bundled_samples() -> anyhow::Result<()> {
    let output = Command::new(inquisitor_binary())
        .arg("test")
        .arg(workspace_root().join("samples"))
        .env_remove("INQUISITOR_DEBUG")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("---> "));
    assert!(!stdout.contains("False alarm"));
    assert!(!stdout.contains("Didn't catch"));
    Ok(())
}

#[test]
fn test_subcommand_reports_mismatches() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let nested = tmp.path().join("nested");
    fs::create_dir_all(&nested)?;
    fs::write(
        nested.join("drift.py"),
        "x = 1  ##ERROR nothing wrong\ny = nowhere\n",
    )?;
    fs::write(tmp.path().join("ok.py"), "None = 1  ##ERROR reserved\n")?;
    fs::write(tmp.path().join("notes.txt"), "ignored\n")?;

    let output = Command::new(inquisitor_binary())
        .arg("test")
        .arg("-v")
        .arg(tmp.path())
        .env_remove("INQUISITOR_DEBUG")
        .output()?;
    assert!(!output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let headers: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with("---> "))
        .collect();
    assert_eq!(headers.len(), 2);
    assert!(headers[0].ends_with("drift.py"));
    assert!(stdout.contains("False alarm on line 2: name 'nowhere' is used but not defined"));
    assert!(stdout.contains("Didn't catch line 1: nothing wrong"));
    assert!(stdout.contains("Caught error on line 1: cannot redefine built-in constant 'None'"));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("1 of 2 sample file(s) failed"), "stderr: {stderr}");
    Ok(())
}
