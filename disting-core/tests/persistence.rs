mod common;

use disting_core::{JsonStateStore, MemoryStateStore, Script, StateStore};
use disting_types::{EngineAction, Jack, PhysicalInput, Polarity, ScriptInputType};

use common::{emulator, schema};

fn configured() -> disting_core::Emulator {
    let mut emu = emulator();
    let mut sch = schema(&[ScriptInputType::Cv; 3], 2);
    sch.parameters.push(common::float_param("Level", 0.0, 10.0, 5.0));
    sch.parameters.push(common::float_param("Tone", 0.0, 1.0, 0.5));
    emu.load_script(Script::new("saved", sch.clone()));
    for action in [
        EngineAction::AssignInput { script: 1, physical: Some(9) },
        EngineAction::AssignInput { script: 3, physical: None },
        EngineAction::AssignOutput { script: 2, physical: Some(8) },
        EngineAction::SetParameter { param: 1, value: 7.5 },
        EngineAction::ConnectParameter { param: 2, input: 4 },
        EngineAction::SetBpm(140.0),
        EngineAction::SetPolarity { input: 4, polarity: Polarity::Unipolar },
        EngineAction::SetClockEnabled { input: 2, enabled: true },
    ] {
        emu.dispatch(&action).unwrap();
    }
    emu
}

fn fresh_with_same_script() -> disting_core::Emulator {
    let mut emu = emulator();
    let mut sch = schema(&[ScriptInputType::Cv; 3], 2);
    sch.parameters.push(common::float_param("Level", 0.0, 10.0, 5.0));
    sch.parameters.push(common::float_param("Tone", 0.0, 1.0, 0.5));
    emu.load_script(Script::new("saved", sch));
    emu
}

#[test]
fn json_store_round_trips_engine_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStateStore::new(dir.path().join("nested").join("state.json"));
    assert!(store.load().is_none());

    let emu = configured();
    emu.save_state(&store);
    let saved = store.load().unwrap();
    assert_eq!(saved, emu.to_persisted());

    let mut restored = fresh_with_same_script();
    restored.restore(&saved);
    let state = restored.state();
    assert_eq!(state.routing.inputs.get(1), PhysicalInput::new(9));
    assert_eq!(state.routing.inputs.get(3), None);
    assert_eq!(state.clock.bpm(), 140.0);
    assert_eq!(restored.params().value(1), Some(7.5));
    assert_eq!(state.automation.link(2), PhysicalInput::new(4));
    let jack = PhysicalInput::new(4).unwrap();
    assert_eq!(state.channels.input_mode(jack).polarity, Polarity::Unipolar);
}

#[test]
fn corrupt_state_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(JsonStateStore::new(&path).load().is_none());
}

#[test]
fn out_of_range_links_are_skipped_on_restore() {
    let mut saved = configured().to_persisted();
    saved.parameter_automation.insert(7, 1);
    saved.parameter_automation.insert(1, 40);
    saved.input_assignments.insert(2, 99);

    let store = MemoryStateStore::with_state(saved);
    let mut emu = fresh_with_same_script();
    emu.restore(&store.load().unwrap());

    assert_eq!(emu.state().automation.len(), 1);
    assert_eq!(emu.state().routing.inputs.get(2), None);
}

#[test]
fn empty_assignments_keep_default_wiring() {
    let mut emu = fresh_with_same_script();
    let saved = disting_core::PersistedState::default();
    emu.restore(&saved);
    assert_eq!(emu.state().routing.inputs.get(3), PhysicalInput::new(3));

    let store = MemoryStateStore::new();
    emu.save_state(&store);
    assert_eq!(store.save_count(), 1);
}

#[test]
fn persisting_actions_save_once() {
    let store = MemoryStateStore::new();
    let mut emu = fresh_with_same_script();

    emu.dispatch_with(&EngineAction::SetBpm(96.0), &store).unwrap();
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.load().unwrap().clock_bpm, 96.0);

    emu.dispatch_with(&EngineAction::AssignInput { script: 1, physical: Some(5) }, &store)
        .unwrap();
    assert_eq!(store.save_count(), 2);

    emu.dispatch_with(&EngineAction::TriggerPulse { input: 1 }, &store)
        .unwrap();
    assert_eq!(store.save_count(), 2);

    assert!(emu
        .dispatch_with(&EngineAction::AssignInput { script: 9, physical: Some(1) }, &store)
        .is_err());
    assert_eq!(store.save_count(), 2);
}
