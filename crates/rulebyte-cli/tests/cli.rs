use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const FREEZE: &str = r#"{
    "rules": [{
        "name": "Freeze",
        "priority": 1,
        "conditions": {"all": [{"fact": "temperature", "operator": "LT", "value": 0}]},
        "actions": [{"type": "alert", "target": "console", "value": "freezing"}]
    }]
}"#;

fn rulebyte(dir: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("rulebyte")?;
    cmd.current_dir(dir).env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn compiles_and_runs_freeze_rule() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("rules.json"), FREEZE)?;
    fs::write(dir.path().join("cold.json"), r#"{"temperature": -5}"#)?;
    fs::write(dir.path().join("warm.json"), r#"{"temperature": 10}"#)?;

    rulebyte(dir.path())?
        .args(["compile", "rules.json", "rules.rbc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled 1 rules"));
    assert!(dir.path().join("rules.rbc").exists());

    rulebyte(dir.path())?
        .args(["run", "rules.rbc", "--facts", "cold.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Freeze] alert -> console: freezing"))
        .stdout(predicate::str::contains("Fired: Freeze"));

    rulebyte(dir.path())?
        .args(["run", "rules.rbc", "--facts", "warm.json", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would").not())
        .stdout(predicate::str::contains("Fired: none"));

    Ok(())
}

#[test]
fn compile_error_writes_nothing() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("bad.json"),
        r#"{"rules": [{"name": "Bad", "priority": 0,
            "conditions": {"all": [{"fact": "a", "operator": "XYZ", "value": 1}]}}]}"#,
    )?;

    rulebyte(dir.path())?
        .args(["compile", "bad.json", "out.rbc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("XYZ"))
        .stderr(predicate::str::contains("Bad"));
    assert!(!dir.path().join("out.rbc").exists());

    Ok(())
}

#[test]
fn validation_errors_are_listed() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("bad.yaml"),
        "rules:\n  - name: ''\n    priority: -2\n    conditions: { all: [] }\n",
    )?;

    rulebyte(dir.path())?
        .args(["compile", "bad.yaml", "out.rbc", "--validate-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rules[0]: field 'name' must not be empty"))
        .stderr(predicate::str::contains("priority must be non-negative"));
    assert!(!dir.path().join("out.rbc").exists());

    Ok(())
}

#[test]
fn validate_only_writes_nothing() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("rules.json"), FREEZE)?;

    rulebyte(dir.path())?
        .args(["compile", "rules.json", "out.rbc", "--validate-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 rules valid"));
    assert!(!dir.path().join("out.rbc").exists());

    Ok(())
}

#[test]
fn optimize_and_disasm() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("rules.json"), FREEZE)?;

    rulebyte(dir.path())?
        .args(["compile", "rules.json", "plain.rbc"])
        .assert()
        .success();
    rulebyte(dir.path())?
        .args(["compile", "rules.json", "small.rbc", "--optimize"])
        .assert()
        .success();

    let plain = fs::metadata(dir.path().join("plain.rbc"))?.len();
    let small = fs::metadata(dir.path().join("small.rbc"))?.len();
    assert!(small < plain);

    rulebyte(dir.path())?
        .args(["disasm", "plain.rbc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RULE_START       Freeze"))
        .stdout(predicate::str::contains("LABEL"));
    rulebyte(dir.path())?
        .args(["disasm", "small.rbc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LABEL").not());

    Ok(())
}

#[test]
fn strict_flag_and_config_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("rules.json"), FREEZE)?;
    fs::write(dir.path().join("empty.json"), "{}")?;

    rulebyte(dir.path())?
        .args(["compile", "rules.json", "rules.rbc"])
        .assert()
        .success();

    rulebyte(dir.path())?
        .args(["run", "rules.rbc", "--facts", "empty.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fired: none"));

    rulebyte(dir.path())?
        .args(["run", "rules.rbc", "--facts", "empty.json", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fact 'temperature' is not defined"));

    fs::write(
        dir.path().join("rulebyte.toml"),
        "[interpreter]\nfact_policy = \"strict\"\n",
    )?;
    rulebyte(dir.path())?
        .args(["run", "rules.rbc", "--facts", "empty.json"])
        .assert()
        .failure();

    fs::write(dir.path().join("rulebyte.toml"), "[compiler]\nunknown = 1\n")?;
    rulebyte(dir.path())?
        .args(["disasm", "rules.rbc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rulebyte.toml"));

    Ok(())
}

#[test]
fn unknown_opcode_in_program_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("junk.rbc"), [0x00u8, 0xFF])?;
    fs::write(dir.path().join("facts.json"), "{}")?;

    rulebyte(dir.path())?
        .args(["run", "junk.rbc", "--facts", "facts.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown opcode 0xff at byte 1"));

    Ok(())
}

#[test]
fn facts_from_command_line() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("rules.json"), FREEZE)?;
    fs::write(dir.path().join("warm.json"), r#"{"temperature": 10}"#)?;

    rulebyte(dir.path())?
        .args(["compile", "rules.json", "rules.rbc"])
        .assert()
        .success();

    rulebyte(dir.path())?
        .args(["run", "rules.rbc", "--facts", "warm.json", "--set", "temperature=-3", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would alert -> console: freezing (rule Freeze)"));

    rulebyte(dir.path())?
        .args(["run", "rules.rbc", "--set", "=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=VALUE"));

    Ok(())
}
