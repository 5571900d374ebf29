use rand::Rng;
use runway_common::Extents;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::StreamError;

/// Resampling attempts before `pick` stops drawing and steps past the
/// excluded entry directly.
const MAX_PICK_RETRIES: usize = 16;

/// Prefab identifier of a segment kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub String);

impl SegmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A placeable segment kind with fixed dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub id: SegmentId,
    #[serde(flatten)]
    pub extents: Extents,
}

impl SegmentDescriptor {
    pub fn new(id: impl Into<String>, width: f32, height: f32, length: f32) -> Self {
        Self {
            id: SegmentId::new(id),
            extents: Extents::new(width, height, length),
        }
    }

    pub fn width(&self) -> f32 {
        self.extents.width
    }

    pub fn height(&self) -> f32 {
        self.extents.height
    }

    pub fn length(&self) -> f32 {
        self.extents.length
    }
}

/// On-disk form of a catalog.
///
/// ```yaml
/// starter: standing
/// segments:
///   - { id: standing, width: 5, height: 1, length: 5 }
///   - { id: speed_boost, width: 5, height: 1, length: 5 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub starter: Option<SegmentId>,
    #[serde(default)]
    pub segments: Vec<SegmentDescriptor>,
}

/// Immutable set of segment kinds the window can place.
///
/// All validation happens here, so a catalog that exists is always usable.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    descriptors: Vec<SegmentDescriptor>,
    starter: usize,
}

impl SegmentCatalog {
    /// Build a catalog whose starter is the first descriptor.
    pub fn new(descriptors: Vec<SegmentDescriptor>) -> Result<Self, StreamError> {
        Self::with_starter(descriptors, None)
    }

    /// Build a catalog with an explicit starter segment for the initial
    /// platform placed on reset.
    pub fn with_starter(
        descriptors: Vec<SegmentDescriptor>,
        starter: Option<SegmentId>,
    ) -> Result<Self, StreamError> {
        if descriptors.is_empty() {
            return Err(StreamError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for d in &descriptors {
            if !d.extents.is_valid() {
                return Err(StreamError::InvalidDescriptor {
                    id: d.id.clone(),
                    width: d.width(),
                    height: d.height(),
                    length: d.length(),
                });
            }
            if !seen.insert(&d.id) {
                return Err(StreamError::DuplicateDescriptor(d.id.clone()));
            }
        }

        let starter = match starter {
            Some(id) => descriptors
                .iter()
                .position(|d| d.id == id)
                .ok_or(StreamError::UnknownStarter(id))?,
            None => 0,
        };

        Ok(Self {
            descriptors,
            starter,
        })
    }

    /// The stock segment kinds of the runner: one plain platform and three
    /// hazard variants, all 5 x 1 x 5.
    pub fn builtin() -> Self {
        Self {
            descriptors: vec![
                SegmentDescriptor::new("standing", 5.0, 1.0, 5.0),
                SegmentDescriptor::new("speed_boost", 5.0, 1.0, 5.0),
                SegmentDescriptor::new("falling_obstacle", 5.0, 1.0, 5.0),
                SegmentDescriptor::new("rotating_obstacles", 5.0, 1.0, 5.0),
            ],
            starter: 0,
        }
    }

    pub fn from_config(config: CatalogConfig) -> Result<Self, StreamError> {
        Self::with_starter(config.segments, config.starter)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, StreamError> {
        let config: CatalogConfig = serde_yaml::from_str(s)?;
        Self::from_config(config)
    }

    /// Load a catalog from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&data)
    }

    /// Uniformly pick a descriptor, avoiding `excluding` when the catalog has
    /// more than one entry. A single-entry catalog always returns that entry.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        excluding: Option<&SegmentId>,
        rng: &mut R,
    ) -> &SegmentDescriptor {
        let count = self.descriptors.len();
        let mut index = rng.random_range(0..count);

        let Some(excluded) = excluding else {
            return &self.descriptors[index];
        };
        if count == 1 {
            return &self.descriptors[index];
        }

        let mut retries = 0;
        while &self.descriptors[index].id == excluded {
            if retries == MAX_PICK_RETRIES {
                tracing::warn!(%excluded, "segment pick retries exhausted; stepping past excluded");
                index = (index + 1) % count;
                break;
            }
            index = rng.random_range(0..count);
            retries += 1;
        }
        &self.descriptors[index]
    }

    /// Descriptor used for the initial platform under the agent.
    pub fn starter(&self) -> &SegmentDescriptor {
        &self.descriptors[self.starter]
    }

    pub fn get(&self, id: &SegmentId) -> Option<&SegmentDescriptor> {
        self.descriptors.iter().find(|d| &d.id == id)
    }

    pub fn descriptors(&self) -> &[SegmentDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
