//! Stage file loading.
//!
//! Stage files are RON renditions of [`StageData`]. A few stages ship with
//! the crate and can be named instead of given as a path.

use std::path::Path;

use tactics_core::brain::BrainKind;
use tactics_core::data::StageData;
use tactics_core::gimmick::GimmickCommand;
use thiserror::Error;
use tracing::info;

/// Stages compiled into the binary.
const BUILTIN: &[(&str, &str)] = &[("skirmish", include_str!("../stages/skirmish.ron"))];

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Neither a file nor a built-in stage.
    #[error("Stage not found: {0}")]
    NotFound(String),
    /// Failed to read file.
    #[error("Failed to read stage file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse stage: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed, but not playable.
    #[error("Invalid stage '{name}': {problems}")]
    Invalid {
        /// Stage name.
        name: String,
        /// Validation problems joined with `; `.
        problems: String,
    },
    /// The stage refused to build.
    #[error(transparent)]
    Game(#[from] tactics_core::error::GameError),
}

/// Load a stage from a RON file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<StageData, ScenarioError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let data = from_ron_str(&text)?;
    info!(path = %path.display(), stage = %data.name, "Stage loaded");
    Ok(data)
}

/// Parse and validate a stage.
pub fn from_ron_str(text: &str) -> Result<StageData, ScenarioError> {
    let data: StageData = ron::from_str(text)?;
    let problems = data.validate();
    if !problems.is_empty() {
        return Err(ScenarioError::Invalid {
            name: data.name,
            problems: problems.join("; "),
        });
    }
    Ok(data)
}

/// Resolve `stage` as a file path, falling back to a built-in stage name.
pub fn resolve(stage: &str) -> Result<StageData, ScenarioError> {
    if Path::new(stage).is_file() {
        return load(stage);
    }
    match BUILTIN.iter().find(|(name, _)| *name == stage) {
        Some((_, text)) => from_ron_str(text),
        None => Err(ScenarioError::NotFound(stage.to_owned())),
    }
}

/// Names of the built-in stages.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

/// Hand every unit, including gimmick reinforcements, to the automatic
/// brain so the stage can play out unattended.
pub fn automate(data: &mut StageData) {
    for unit in &mut data.units {
        unit.brain = BrainKind::Auto;
    }
    for gimmick in data.gimmicks.values_mut() {
        if let GimmickCommand::Appear(unit) = &mut gimmick.command {
            unit.brain = BrainKind::Auto;
        }
    }
}
