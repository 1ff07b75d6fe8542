use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::error::{Result, SceneError};
use crate::fixture::{Fixture, StrandId};
use crate::geometry::Point;

pub const FILE_TYPE: &str = "scene";
pub const FILE_VERSION: u32 = 2;

/// Per-strand output settings carried through load and save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StrandSettings {
    pub id: StrandId,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_color_mode")]
    pub color_mode: String,
}

fn default_enabled() -> bool {
    true
}

fn default_color_mode() -> String {
    "RGB8".to_string()
}

impl StrandSettings {
    pub fn new(id: StrandId) -> Self {
        Self {
            id,
            enabled: default_enabled(),
            color_mode: default_color_mode(),
        }
    }
}

/// On-disk JSON layout of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SceneFile {
    pub file_type: String,
    #[serde(default = "default_file_version")]
    pub file_version: u32,
    #[serde(default)]
    pub scene_name: String,
    #[serde(default)]
    pub extents: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
    #[serde(default)]
    pub strands: Vec<StrandSettings>,
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
}

fn default_file_version() -> u32 {
    FILE_VERSION
}

impl Default for SceneFile {
    fn default() -> Self {
        Self {
            file_type: FILE_TYPE.to_string(),
            file_version: FILE_VERSION,
            scene_name: String::new(),
            extents: [0.0, 0.0],
            center: None,
            strands: Vec::new(),
            fixtures: Vec::new(),
        }
    }
}

impl SceneFile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: SceneFile = serde_json::from_str(json)?;
        if file.file_type != FILE_TYPE {
            return Err(SceneError::FileType(file.file_type));
        }
        Ok(file)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        fs::write(path, json).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
