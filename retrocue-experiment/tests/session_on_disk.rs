use retrocue_core::{Position, TargetItem};
use retrocue_experiment::sim::{
    RecordingEyetracker, RecordingTriggerSink, ScriptedBreaks, ScriptedKeyboard, ScriptedPointer,
    SimulatedDisplay,
};
use retrocue_experiment::{ExperimentConfig, JsonLinesWriter, Rig, Session};
use retrocue_timing::SimulatedTimer;
use serde_json::Value;
use std::time::Duration;

type SimRig = Rig<
    SimulatedDisplay,
    ScriptedPointer,
    ScriptedKeyboard,
    RecordingTriggerSink,
    SimulatedTimer,
>;

fn rig(timer: &SimulatedTimer) -> SimRig {
    Rig::new(
        SimulatedDisplay::new(timer.clone(), Duration::from_millis(4)),
        ScriptedPointer::new(
            timer.clone(),
            Duration::from_millis(320),
            Duration::from_millis(1100),
        ),
        ScriptedKeyboard::new(timer.clone()),
        RecordingTriggerSink::new(timer.clone()),
        timer.clone(),
    )
}

fn read_rows(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn full_session_writes_balanced_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig {
        participant: 4,
        blocks: 2,
        trials_per_block: 16,
        seed: Some(99),
        practice: true,
        practice_round_limit: Some(2),
        output_dir: dir.path().to_path_buf(),
        rehearsal: true,
        ..Default::default()
    };
    let path = config.output_file();
    let timer = SimulatedTimer::new();
    let mut rig = rig(&timer);
    let mut writer = JsonLinesWriter::open(&path).unwrap();

    let report = Session::new(config)
        .unwrap()
        .run(
            &mut rig,
            &mut RecordingEyetracker::default(),
            &mut ScriptedBreaks::default(),
            &mut writer,
        )
        .unwrap();

    assert_eq!(report.practice_rounds, 4);
    assert_eq!(report.trials_completed, 32);
    assert_eq!(report.trigger_failures, 0);
    // Practice sends nothing, every recorded trial sends six markers.
    assert_eq!(report.triggers_sent, 32 * 6);

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 32);
    for block in [1, 2] {
        let in_block: Vec<&Value> = rows.iter().filter(|r| r["block"] == block).collect();
        assert_eq!(in_block.len(), 16);
        for item in TargetItem::ALL {
            for first in Position::ALL {
                for second in Position::ALL {
                    let cell = in_block
                        .iter()
                        .filter(|r| {
                            r["target_item"] == item.number()
                                && r["location_1"] == first.as_str()
                                && r["location_2"] == second.as_str()
                        })
                        .count();
                    assert_eq!(cell, 2);
                }
            }
        }
    }

    for row in &rows {
        let code = row["condition_code"].as_str().unwrap();
        assert!(code.starts_with('1'));
        assert_eq!(row["retrocue"], row["target_item"]);
        assert_eq!(row["idle_latency_ms"], 320.0);
        assert!(row["performance"].as_u64().unwrap() <= 100);
    }
}

#[test]
fn aborted_session_keeps_rows_up_to_the_abort() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig {
        blocks: 1,
        trials_per_block: 8,
        seed: Some(7),
        practice: false,
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let path = config.output_file();
    let timer = SimulatedTimer::new();
    let mut rig = rig(&timer);
    rig.keyboard = ScriptedKeyboard::new(timer.clone()).abort_at(Duration::from_secs(16));
    let mut writer = JsonLinesWriter::open(&path).unwrap();

    let report = Session::new(config)
        .unwrap()
        .run(
            &mut rig,
            &mut RecordingEyetracker::default(),
            &mut ScriptedBreaks::default(),
            &mut writer,
        )
        .unwrap();

    assert!(report.finished_early);
    let rows = read_rows(&path);
    assert_eq!(rows.len(), report.trials_completed);
    assert!(!rows.is_empty());
    let last_end = rows.last().unwrap()["end_time_ms"].as_f64().unwrap();
    assert!(last_end <= 16_000.0);
}
