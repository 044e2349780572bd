//! Scenario definition and loader.
//!
//! A scenario is a RON document describing the clamper settings, the static
//! terrain and the actors to drive. Every field has a default, so a scenario
//! only spells out what it changes.

use std::path::{Path, PathBuf};

use groundclamp::{ClampType, ClamperSettings, SettingsError, TerrainError};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("I/O while reading scenario {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Ron(String),
    #[error("invalid clamper settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("invalid terrain: {0}")]
    Terrain(#[from] TerrainError),
    #[error("duplicate actor id {0}")]
    DuplicateActor(u64),
    #[error("tick length must be positive and finite, got {0}")]
    TickLength(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub settings: ClamperSettings,
    /// Number of ticks to run.
    pub ticks: u32,
    /// Tick length in seconds.
    pub dt: f64,
    /// Viewer position for ranged three-point LOD.
    pub eye_point: Option<[f32; 3]>,
    /// Downgrade three-point clamping above this speed (m/s).
    pub max_three_point_speed: Option<f32>,
    pub terrain: Vec<TerrainRow>,
    pub actors: Vec<ActorRow>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            settings: ClamperSettings::default(),
            ticks: 120,
            dt: 1.0 / 30.0,
            eye_point: None,
            max_three_point_speed: None,
            terrain: Vec::new(),
            actors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainRow {
    pub id: u32,
    #[serde(default)]
    pub translation: [f32; 3],
    /// Yaw, pitch, roll in radians.
    #[serde(default)]
    pub yaw_pitch_roll: [f32; 3],
    pub shape: TerrainShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TerrainShape {
    Plane { offset: f32 },
    Cuboid { half_extents: [f32; 3] },
    Ball { radius: f32 },
    /// Regular height grid, row-major, `columns` samples per row, centered on the
    /// row's translation.
    Heightmap {
        cell_size: f32,
        columns: u32,
        heights: Vec<f32>,
    },
    Trimesh {
        vertices: Vec<[f32; 3]>,
        indices: Vec<[u32; 3]>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorRow {
    pub id: u64,
    pub name: String,
    pub position: [f32; 3],
    /// Heading in radians about +Z.
    pub yaw: f32,
    /// Model-space bounding box dimensions.
    pub dimensions: [f32; 3],
    pub clamp_type: ClampType,
    pub height_above_terrain: f32,
    pub step_up_distance: f32,
    pub adjust_rotation_to_ground: bool,
    /// Constant velocity (m/s).
    pub velocity: [f32; 3],
}

impl Default for ActorRow {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            position: [0.0; 3],
            yaw: 0.0,
            dimensions: [1.0; 3],
            clamp_type: ClampType::KeepAboveTerrain,
            height_above_terrain: 0.0,
            step_up_distance: 0.0,
            adjust_rotation_to_ground: false,
            velocity: [0.0; 3],
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario =
            ron::de::from_str(text).map_err(|e| ScenarioError::Ron(e.to_string()))?;
        scenario.validated()
    }

    /// Check the parts the clamper and the tick loop cannot recover from.
    pub fn validated(mut self) -> Result<Self, ScenarioError> {
        self.settings = self.settings.validated()?;

        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ScenarioError::TickLength(self.dt));
        }

        let mut ids = std::collections::HashSet::with_capacity(self.actors.len());
        for actor in &self.actors {
            if !ids.insert(actor.id) {
                return Err(ScenarioError::DuplicateActor(actor.id));
            }
        }

        Ok(self)
    }

    /// Built-in demo used when no scenario file is given.
    pub fn demo() -> Result<Self, ScenarioError> {
        Self::from_ron(include_str!("../scenarios/demo.ron"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scenario_parses() {
        let scenario = Scenario::demo().expect("demo scenario is valid");
        assert!(!scenario.terrain.is_empty());
        assert!(!scenario.actors.is_empty());
        assert!(scenario.dt > 0.0);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let scenario = Scenario::from_ron("(ticks: 3, actors: [(id: 7, name: \"rock\")])")
            .expect("minimal scenario");
        assert_eq!(scenario.ticks, 3);
        assert_eq!(scenario.settings, ClamperSettings::default());
        assert_eq!(scenario.actors[0].clamp_type, ClampType::KeepAboveTerrain);
        assert_eq!(scenario.actors[0].dimensions, [1.0; 3]);
    }

    #[test]
    fn duplicate_actor_ids_are_rejected() {
        let err = Scenario::from_ron("(actors: [(id: 1), (id: 1)])").expect_err("duplicate ids");
        assert!(matches!(err, ScenarioError::DuplicateActor(1)));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = Scenario::from_ron("(settings: (intermittent_time_delta: -1.0))")
            .expect_err("negative interval");
        assert!(matches!(err, ScenarioError::Settings(_)));
    }

    #[test]
    fn malformed_ron_is_reported() {
        let err = Scenario::from_ron("(ticks: ").expect_err("truncated");
        assert!(matches!(err, ScenarioError::Ron(_)));
    }
}
