// End-to-end tests for the `roster` binary.
//
// Every test runs in its own temp dir with XDG_CONFIG_HOME pointed inside it,
// so a user config on the machine never leaks into the run.
//
// Run with: cargo test -p roster-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rust_xlsxwriter::Workbook;
use tempfile::{tempdir, TempDir};

const LOCAL_CSV: &str = "\
姓名,身份证号,入党时间,个人身份
张三,110101199001011234,2020-06-15,Member
李四,110101198505051234,2025-03-01,Member
王五,11010119920202123x,2018-07-01,Member
";

const NATIONAL_CSV: &str = "\
姓名,身份证号码,入党日期,工作岗位
张三,110101199001011234,2020-06-15,Officer
李四,110101198505051234,2025-03-01,Member
王五,11010119920202123X,2018-07-01,Member
赵六,110101197707071234,2010-01-01,Member
";

fn roster(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_roster"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("ROSTER_CONFIG")
        .env_remove("ROSTER_TEMPLATES")
        .env_remove("RUST_LOG");
    cmd
}

fn fixtures() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let local = dir.path().join("local.csv");
    let national = dir.path().join("national.csv");
    std::fs::write(&local, LOCAL_CSV).unwrap();
    std::fs::write(&national, NATIONAL_CSV).unwrap();
    (dir, local, national)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be valid JSON: {e}\nstdout:\n{stdout}"))
}

fn write_header(path: &Path, header: &[&str]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (i, name) in header.iter().enumerate() {
        sheet.write_string(0, i as u16, *name).unwrap();
    }
    workbook.save(path).unwrap();
}

// ===========================================================================
// roster compare
// ===========================================================================

#[test]
fn compare_writes_workbook_and_json() {
    let (dir, local, national) = fixtures();
    let workbook = dir.path().join("diff.xlsx");

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--output", workbook.to_str().unwrap(), "--json"])
        .output()
        .expect("roster compare");

    assert!(output.status.success(), "exit: {:?}\nstderr: {}", output.status, stderr(&output));
    assert!(workbook.is_file());

    let val = json_stdout(&output);
    assert_eq!(val["workbook"], serde_json::json!(workbook.display().to_string()));
    assert_eq!(val["summary"]["local_rows"], 3);
    assert_eq!(val["summary"]["national_rows"], 4);
    assert_eq!(val["summary"]["matched_keys"], 3);
    assert_eq!(val["summary"]["local_extra"], 0);
    assert_eq!(val["summary"]["national_extra"], 1);
    assert_eq!(val["summary"]["field_mismatches"], 1);
    assert_eq!(val["sheets"].as_array().unwrap().len(), 12);

    let position = val["field_diffs"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["attribute"] == "position")
        .expect("position diff");
    assert_eq!(position["rows"][0]["identity"], "110101199001011234");
    assert_eq!(position["rows"][0]["local_value"], "Member");
    assert_eq!(position["rows"][0]["national_value"], "Officer");

    let extra = &val["national_extra"]["rows"];
    assert_eq!(extra[0][0], "赵六");

    let text = stderr(&output);
    assert!(text.contains("1 only in 全国"), "{text}");
}

#[test]
fn strict_exit_reports_discrepancies() {
    let (dir, local, national) = fixtures();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--out-dir", "reports", "--strict-exit"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("registries differ"));

    let written: Vec<_> = std::fs::read_dir(dir.path().join("reports")).unwrap().collect();
    assert_eq!(written.len(), 1, "workbook is still written on strict exit");
}

#[test]
fn identical_registries_pass_strict_exit() {
    let (dir, local, _) = fixtures();
    let national = dir.path().join("same.csv");
    std::fs::write(
        &national,
        "姓名,身份证号码,入党日期,工作岗位\n\
         张三,110101199001011234,2020-06-15,Member\n\
         李四,110101198505051234,2025-03-01,Member\n\
         王五,11010119920202123X,2018-07-01,Member\n",
    )
    .unwrap();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--output", "out.xlsx", "--strict-exit", "--no-datasets", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val = json_stdout(&output);
    assert_eq!(val["summary"]["field_mismatches"], 0);
    assert_eq!(val["sheets"].as_array().unwrap().len(), 10);
}

#[test]
fn reference_date_override_changes_tenure() {
    let (dir, local, national) = fixtures();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--output", "out.xlsx", "--reference-date", "2030-12-31", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val = json_stdout(&output);
    assert_eq!(val["meta"]["reference_date"], "2030-12-31");

    let columns: Vec<&str> = val["local"]["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    let tenure = columns.iter().position(|c| *c == "党龄").expect("tenure column");
    assert_eq!(val["local"]["rows"][0][tenure], 10);
}

#[test]
fn json_output_file() {
    let (dir, local, national) = fixtures();
    let json_path = dir.path().join("result.json");

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--output", "out.xlsx", "--json-output", json_path.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty(), "no --json, nothing on stdout");
    let val: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(val["summary"]["national_extra"], 1);
}

#[test]
fn missing_identity_column_is_fatal() {
    let (dir, local, _) = fixtures();
    let national = dir.path().join("broken.csv");
    std::fs::write(&national, "姓名,证件号\n张三,110101199001011234\n").unwrap();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap(), "--output", "out.xlsx"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(6));
    let text = stderr(&output);
    assert!(text.contains("身份证号码"), "{text}");
    assert!(text.contains("hint:"), "{text}");
    assert!(!dir.path().join("out.xlsx").exists(), "no partial report");
}

#[test]
fn unreadable_input_is_io_error() {
    let (dir, local, _) = fixtures();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), "missing.xlsx"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
}

#[test]
fn invalid_config_exits_4() {
    let (dir, local, national) = fixtures();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "name = \"bad\"\nfields = []\n").unwrap();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--config", config.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
}

#[test]
fn bad_reference_date_is_usage_error() {
    let (dir, local, national) = fixtures();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--reference-date", "31/12/2025"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

// dirs::config_dir honors XDG_CONFIG_HOME on Linux only.
#[cfg(target_os = "linux")]
#[test]
fn user_config_is_picked_up() {
    let (dir, local, national) = fixtures();
    let config_dir = dir.path().join("xdg/roster-recon");
    std::fs::create_dir_all(&config_dir).unwrap();

    let show = roster(dir.path()).args(["config", "show"]).output().unwrap();
    assert!(show.status.success());
    let text = String::from_utf8_lossy(&show.stdout).replace("name = \"roster\"", "name = \"月度核查\"");
    std::fs::write(config_dir.join("recon.toml"), text).unwrap();

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap(), "--output", "out.xlsx", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json_stdout(&output)["meta"]["config_name"], "月度核查");
}

// ===========================================================================
// Templates
// ===========================================================================

fn templates(dir: &Path) -> PathBuf {
    let templates = dir.join("templates");
    std::fs::create_dir_all(&templates).unwrap();
    write_header(&templates.join("单机模板.xlsx"), &["姓名", "身份证号", "入党时间", "个人身份"]);
    write_header(&templates.join("全国模板.xlsx"), &["姓名", "身份证号码", "入党日期", "工作岗位"]);
    templates
}

#[test]
fn compare_with_matching_templates() {
    let (dir, local, national) = fixtures();
    let templates = templates(dir.path());

    let output = roster(dir.path())
        .args(["compare", local.to_str().unwrap(), national.to_str().unwrap()])
        .args(["--templates", templates.to_str().unwrap(), "--output", "out.xlsx"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn compare_rejects_swapped_inputs() {
    let (dir, local, national) = fixtures();
    let templates = templates(dir.path());

    let output = roster(dir.path())
        .args(["compare", national.to_str().unwrap(), local.to_str().unwrap()])
        .args(["--templates", templates.to_str().unwrap(), "--output", "out.xlsx"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("does not match the template"));
    assert!(!dir.path().join("out.xlsx").exists());
}

#[test]
fn validate_reports_column_details() {
    let dir = tempdir().unwrap();
    let templates = templates(dir.path());
    let upload = dir.path().join("upload.csv");
    std::fs::write(&upload, "身份证号,姓名,入党时间,个人身份\nA1,张三,2020-06-15,Member\n").unwrap();

    let output = roster(dir.path())
        .args(["validate", upload.to_str().unwrap(), "--schema", "local"])
        .args(["--templates", templates.to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(5));
    let val = json_stdout(&output);
    assert_eq!(val["valid"], false);
    assert_eq!(val["order_mismatch"], true);
    assert_eq!(val["column_details"][0]["position"], "A");
    assert_eq!(val["column_details"][0]["expected"], "姓名");
}

#[test]
fn validate_accepts_matching_header() {
    let dir = tempdir().unwrap();
    let templates = templates(dir.path());
    let upload = dir.path().join("national.csv");
    std::fs::write(&upload, NATIONAL_CSV).unwrap();

    let output = roster(dir.path())
        .args(["validate", upload.to_str().unwrap(), "--schema", "national"])
        .args(["--templates", templates.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn validate_unknown_schema_is_usage_error() {
    let dir = tempdir().unwrap();
    let output = roster(dir.path())
        .args(["validate", "x.csv", "--schema", "regional", "--templates", "."])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// roster config / cleanup
// ===========================================================================

#[test]
fn config_show_round_trips_through_check() {
    let dir = tempdir().unwrap();

    let show = roster(dir.path()).args(["config", "show"]).output().unwrap();
    assert!(show.status.success());
    assert!(stderr(&show).contains("built-in default"));

    let path = dir.path().join("recon.toml");
    std::fs::write(&path, &show.stdout).unwrap();

    let check = roster(dir.path())
        .args(["config", "check", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(check.status.success(), "stderr: {}", stderr(&check));
    assert!(stderr(&check).contains("8 compared"), "{}", stderr(&check));
}

#[test]
fn cleanup_dry_run_keeps_files() {
    let dir = tempdir().unwrap();
    let reports = dir.path().join("reports");
    std::fs::create_dir_all(reports.join("old-upload")).unwrap();
    std::fs::write(reports.join("比对结果_20250101000000.xlsx"), b"x").unwrap();

    let output = roster(dir.path())
        .args(["cleanup", reports.to_str().unwrap(), "--max-age-hours", "0", "--dry-run"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(reports.join("old-upload").is_dir());
    assert!(reports.join("比对结果_20250101000000.xlsx").is_file());
}

#[test]
fn cleanup_keeps_recent_entries() {
    let dir = tempdir().unwrap();
    let reports = dir.path().join("reports");
    std::fs::create_dir_all(&reports).unwrap();
    std::fs::write(reports.join("fresh.xlsx"), b"x").unwrap();

    let output = roster(dir.path())
        .args(["cleanup", reports.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(reports.join("fresh.xlsx").is_file());
}

#[test]
fn cleanup_requires_a_directory() {
    let dir = tempdir().unwrap();
    let output = roster(dir.path())
        .args(["cleanup", "nope"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
