//! Engine-level regression testing helpers.
//!
//! These utilities help you:
//! - run a scenario live and save its `TimeMachine` (JSON),
//! - replay the same inputs from a fresh runner and reload the saved timeline, and
//! - assert every frame produces the same SHA-256 state digest.
//!
//! Digests are taken over the canonical `serde_json` form of the state, so the engine stays
//! game-agnostic: any `Serialize` state works.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{GameLogic, HeadlessRunner, TimeMachine};

/// Environment flag helper: accepts `1/true/yes/on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// If set, regression tests may update golden files in-place.
pub fn update_goldens_enabled() -> bool {
    env_flag("ZOMBIE_FARM_UPDATE_GOLDENS")
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Path of a checked-in golden under the calling crate's `tests/goldens/`.
#[macro_export]
macro_rules! regression_golden_path {
    ($name:expr) => {{
        let base = $crate::regression::sanitize_filename($name);
        ::std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("goldens")
            .join(format!("{base}.json"))
    }};
}

pub fn state_sha256_hex<S: Serialize>(state: &S) -> io::Result<String> {
    let bytes =
        serde_json::to_vec(state).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateHashGolden {
    pub version: u32,
    pub name: String,
    pub hash_alg: String,
    /// One hash per logical engine frame / state.
    pub hashes: Vec<String>,
}

impl StateHashGolden {
    pub fn new(name: impl Into<String>, hashes: Vec<String>) -> Self {
        Self {
            version: 1,
            name: name.into(),
            hash_alg: "sha256".to_string(),
            hashes,
        }
    }
}

pub fn load_golden_json(path: impl AsRef<Path>) -> io::Result<StateHashGolden> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed parsing golden json {}: {e}", path.display()),
        )
    })
}

pub fn save_golden_json(path: impl AsRef<Path>, golden: &StateHashGolden) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, golden).map_err(io::Error::other)?;
    writer.flush()?;
    Ok(())
}

/// Compares `golden` against the file at `path`, writing it when missing or when `update`
/// is set.
pub fn assert_or_update_golden_json(
    path: impl AsRef<Path>,
    golden: &StateHashGolden,
    update: bool,
) -> io::Result<()> {
    let path = path.as_ref();
    let exists = path.exists();

    if update || !exists {
        save_golden_json(path, golden)?;
        if !exists {
            eprintln!("wrote golden: {}", path.display());
        } else {
            eprintln!("updated golden: {}", path.display());
        }
        return Ok(());
    }

    let expected = load_golden_json(path)?;
    if expected.version != golden.version || expected.hash_alg != golden.hash_alg {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "golden metadata mismatch at {}:\nexpected: v{} alg={}\nactual:   v{} alg={}\n(hint: set ZOMBIE_FARM_UPDATE_GOLDENS=1 to rewrite)",
                path.display(),
                expected.version,
                expected.hash_alg,
                golden.version,
                golden.hash_alg,
            ),
        ));
    }

    compare_hashes(&path.display().to_string(), &expected.hashes, &golden.hashes)
}

fn compare_hashes(context: &str, expected: &[String], actual: &[String]) -> io::Result<()> {
    if expected.len() != actual.len() {
        return Err(io::Error::other(format!(
            "frame count mismatch at {context}: expected {} hashes, got {}",
            expected.len(),
            actual.len()
        )));
    }

    for (i, (a, b)) in expected.iter().zip(actual.iter()).enumerate() {
        if a != b {
            return Err(io::Error::other(format!(
                "state mismatch at {context} (frame {i}):\nexpected: {a}\nactual:   {b}"
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct ReplayArtifacts {
    pub state_json: PathBuf,
    /// Per-frame digests of the live run.
    pub hashes: Vec<String>,
}

pub fn history_hashes<S: Serialize>(history: &[S]) -> io::Result<Vec<String>> {
    history.iter().map(state_sha256_hex).collect()
}

/// Engine-level regression helper:
/// - run a scenario live, saving its `TimeMachine` JSON recording
/// - run the same inputs again from a fresh runner
/// - load the JSON recording back
/// - assert all three timelines hash identically frame by frame
pub fn record_then_replay_and_compare<G>(
    name: &str,
    out_dir: impl AsRef<Path>,
    game: G,
    inputs: impl IntoIterator<Item = G::Input>,
) -> io::Result<ReplayArtifacts>
where
    G: GameLogic + Clone,
    G::Input: Clone,
    G::State: Serialize + DeserializeOwned,
{
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;
    let state_json = out_dir.join(format!("{}.json", sanitize_filename(name)));

    let inputs: Vec<G::Input> = inputs.into_iter().collect();

    let mut live_runner = HeadlessRunner::new(game.clone());
    live_runner.run(inputs.iter().cloned());
    live_runner.timemachine().save_json_file(&state_json)?;
    let live = history_hashes(live_runner.history())?;

    let mut replay_runner = HeadlessRunner::new(game);
    replay_runner.run(inputs);
    let replayed = history_hashes(replay_runner.history())?;
    compare_hashes(&format!("{name} (re-simulated)"), &live, &replayed)?;

    let loaded = TimeMachine::<G::State>::load_json_file(&state_json)?;
    let reloaded = history_hashes(loaded.history())?;
    compare_hashes(&format!("{name} (reloaded)"), &live, &reloaded)?;

    Ok(ReplayArtifacts {
        state_json,
        hashes: live,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_replaces_path_characters() {
        assert_eq!(sanitize_filename("stage 1/answer"), "stage_1_answer");
        assert_eq!(sanitize_filename("ok-name_2"), "ok-name_2");
    }

    #[test]
    fn equal_states_hash_equal() {
        let a = state_sha256_hex(&vec![1, 2, 3]).expect("hash");
        let b = state_sha256_hex(&vec![1, 2, 3]).expect("hash");
        let c = state_sha256_hex(&vec![1, 2, 4]).expect("hash");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn compare_hashes_reports_first_mismatch() {
        let expected = vec!["a".to_string(), "b".to_string()];
        let actual = vec!["a".to_string(), "x".to_string()];
        let err = compare_hashes("unit", &expected, &actual).unwrap_err();
        assert!(err.to_string().contains("frame 1"));
    }
}
