use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use farm_engine::{
    GameLogic,
    regression::{StateHashGolden, assert_or_update_golden_json, record_then_replay_and_compare},
};

fn unique_temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("zombie_farm_engine_regression_harness_{nanos}"))
}

#[derive(Debug, Clone)]
struct GridGame {
    width: usize,
    height: usize,
}

#[derive(Debug, Clone, Copy)]
struct SetCell {
    x: usize,
    y: usize,
    v: u8,
}

impl GameLogic for GridGame {
    type State = Vec<Vec<u8>>;
    type Input = SetCell;

    fn initial_state(&self) -> Self::State {
        vec![vec![0u8; self.width]; self.height]
    }

    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        if input.y < next.len() && input.x < next[input.y].len() {
            next[input.y][input.x] = input.v;
        }
        next
    }
}

#[test]
fn engine_regression_harness_record_replay_roundtrips() {
    let game = GridGame {
        width: 4,
        height: 4,
    };
    let out_dir = unique_temp_dir();
    let inputs = [
        SetCell { x: 0, y: 0, v: 1 },
        SetCell { x: 1, y: 0, v: 2 },
        SetCell { x: 2, y: 1, v: 3 },
        SetCell { x: 3, y: 2, v: 4 },
    ];

    let artifacts = record_then_replay_and_compare(
        "engine_regression_harness_record_replay_roundtrips",
        &out_dir,
        game,
        inputs,
    )
    .expect("regression harness should complete");

    assert_eq!(artifacts.hashes.len(), inputs.len() + 1);
    assert!(artifacts.state_json.exists());

    let golden_path = out_dir.join("golden.json");
    let golden = StateHashGolden::new("grid", artifacts.hashes.clone());
    assert_or_update_golden_json(&golden_path, &golden, false).expect("first run writes golden");
    assert_or_update_golden_json(&golden_path, &golden, false).expect("second run matches");

    let mut drifted = artifacts.hashes.clone();
    drifted[2] = "0".repeat(64);
    let err = assert_or_update_golden_json(&golden_path, &StateHashGolden::new("grid", drifted), false)
        .unwrap_err();
    assert!(err.to_string().contains("frame 2"));

    let _ = fs::remove_dir_all(out_dir);
}
