mod common;

use std::fs;

use disting_core::{LoadError, NotificationLevel};
use disting_types::{EngineAction, Jack, PhysicalOutput};

use common::{emulator, run_for, FRAME};

const COUNTER: &str = r#"
fn init() {
    this.gates = 0;
    #{
        inputs: ["gate"],
        outputs: 2,
        parameters: [["Gain", 0.0, 10.0, 2.0, "V", 10]]
    }
}

fn gate(input, rising) {
    if rising { this.gates += 1; }
    [this.gates.to_float(), ()]
}

fn step(dt, inputs) {
    [(), getParameter(0, 1)]
}
"#;

fn out(i: usize) -> PhysicalOutput {
    PhysicalOutput::new(i).unwrap()
}

#[test]
fn file_script_runs_in_the_frame_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.rhai");
    fs::write(&path, COUNTER).unwrap();

    let mut emu = emulator();
    emu.load_script_file(&path).unwrap();
    assert_eq!(emu.script_path(), Some(path.as_path()));
    emu.dispatch(&EngineAction::SetClockEnabled { input: 1, enabled: true })
        .unwrap();

    // Two rising edges in one second at 110 BPM
    run_for(&mut emu, 1.0);
    assert_eq!(emu.output(out(1)), 2.0);
    assert_eq!(emu.output(out(2)), 2.0);

    emu.dispatch(&EngineAction::SetParameter { param: 1, value: 6.5 })
        .unwrap();
    emu.tick(FRAME);
    assert_eq!(emu.output(out(2)), 6.5);
}

#[test]
fn failed_reload_keeps_running_script() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.rhai");
    fs::write(&path, COUNTER).unwrap();

    let mut emu = emulator();
    emu.load_script_file(&path).unwrap();

    fs::write(&path, "fn step(dt, inputs) {").unwrap();
    assert!(matches!(emu.reload(), Err(LoadError::Script(_))));
    assert_eq!(emu.script().unwrap().schema().output_count(), 2);
    assert_eq!(emu.notifications().count(NotificationLevel::Error), 1);

    emu.tick(FRAME);
    assert_eq!(emu.output(out(2)), 2.0);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut emu = emulator();
    assert!(emu.load_script_file(&dir.path().join("nope.rhai")).is_err());
    assert!(!emu.has_script());
}

#[test]
fn runtime_errors_do_not_stop_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oops.rhai");
    fs::write(
        &path,
        r#"
fn init() { #{ outputs: 1 } }
fn step(dt, inputs) { let x = inputs[5]; [x] }
"#,
    )
    .unwrap();

    let mut emu = emulator();
    emu.load_script_file(&path).unwrap();
    for _ in 0..10 {
        emu.tick(FRAME);
    }
    assert_eq!(emu.frames(), 10);
    assert_eq!(emu.sandbox().fault_count(), 10);
    assert_eq!(emu.notifications().count(NotificationLevel::Error), 1);
}

#[test]
fn nan_parameter_bound_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nan.rhai");
    fs::write(
        &path,
        r#"fn init() { #{ parameters: [["X", parse_float("NaN"), 1.0, 0.5, "V", 10]] } }"#,
    )
    .unwrap();

    let mut emu = emulator();
    assert!(matches!(emu.load_script_file(&path), Err(LoadError::Script(_))));
    assert!(!emu.has_script());
    emu.tick(FRAME);
    assert_eq!(emu.frames(), 1);
}
