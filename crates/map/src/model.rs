//! Map data shapes. JSON field names follow the wire format consumed by the
//! renderer (`centerType`, `cornerType_a`, `createdAt`, ...).

use crate::error::MapError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use stoon_common::ObjectId;

/// Free-form per-tile properties.
pub type Properties = Map<String, Value>;

/// Ground classification of a tile center or corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    #[default]
    Plain,
    Hill,
    Mountain,
}

impl TerrainType {
    /// Classify by height: above 1 is mountain, above 0 is hill, otherwise
    /// plain.
    pub fn from_height(height: f64) -> Self {
        if height > 1.0 {
            Self::Mountain
        } else if height > 0.0 {
            Self::Hill
        } else {
            Self::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Hill => "hill",
            Self::Mountain => "mountain",
        }
    }
}

impl fmt::Display for TerrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One grid cell.
///
/// Square tiles use all four corners (a = up-left, b = up-right,
/// c = down-right, d = down-left). Triangular tiles use a, b and c only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapTile {
    pub x: i32,
    pub y: i32,
    pub height: f64,
    #[serde(default)]
    pub center_type: TerrainType,
    #[serde(rename = "cornerType_a", default)]
    pub corner_type_a: TerrainType,
    #[serde(rename = "cornerType_b", default)]
    pub corner_type_b: TerrainType,
    #[serde(rename = "cornerType_c", default)]
    pub corner_type_c: TerrainType,
    #[serde(rename = "cornerType_d", default)]
    pub corner_type_d: TerrainType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl MapTile {
    /// A tile whose center is classified from `height`, with plain corners.
    pub fn new(x: i32, y: i32, height: f64) -> Self {
        Self {
            x,
            y,
            height,
            center_type: TerrainType::from_height(height),
            corner_type_a: TerrainType::Plain,
            corner_type_b: TerrainType::Plain,
            corner_type_c: TerrainType::Plain,
            corner_type_d: TerrainType::Plain,
            properties: None,
        }
    }

    /// Overwrite the fields present in `patch`.
    pub fn apply(&mut self, patch: &TilePatch) {
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(t) = patch.center_type {
            self.center_type = t;
        }
        if let Some(t) = patch.corner_type_a {
            self.corner_type_a = t;
        }
        if let Some(t) = patch.corner_type_b {
            self.corner_type_b = t;
        }
        if let Some(t) = patch.corner_type_c {
            self.corner_type_c = t;
        }
        if let Some(t) = patch.corner_type_d {
            self.corner_type_d = t;
        }
        if let Some(props) = &patch.properties {
            self.properties = Some(props.clone());
        }
    }
}

/// Partial tile update. Coordinates are not patchable; unknown keys,
/// including `x` and `y` from a request body, are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_type: Option<TerrainType>,
    #[serde(rename = "cornerType_a", skip_serializing_if = "Option::is_none")]
    pub corner_type_a: Option<TerrainType>,
    #[serde(rename = "cornerType_b", skip_serializing_if = "Option::is_none")]
    pub corner_type_b: Option<TerrainType>,
    #[serde(rename = "cornerType_c", skip_serializing_if = "Option::is_none")]
    pub corner_type_c: Option<TerrainType>,
    #[serde(rename = "cornerType_d", skip_serializing_if = "Option::is_none")]
    pub corner_type_d: Option<TerrainType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl TilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), MapError> {
        match self.height {
            Some(h) if !h.is_finite() => Err(MapError::Validation(format!(
                "tile height must be finite, got {h}"
            ))),
            _ => Ok(()),
        }
    }
}

fn default_zoom() -> f64 {
    1.0
}

/// Creation request for a map: everything except identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub tiles: Vec<MapTile>,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

impl NewMap {
    /// Check the grid invariants: every tile inside `[0, width) × [0, height)`,
    /// no two tiles on the same cell, finite heights, positive finite zoom.
    pub fn validate(&self) -> Result<(), MapError> {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(MapError::Validation(format!(
                "zoom must be positive and finite, got {}",
                self.zoom
            )));
        }
        let mut seen = HashSet::with_capacity(self.tiles.len());
        for tile in &self.tiles {
            if !in_bounds(self.width, self.height, tile.x, tile.y) {
                return Err(MapError::Validation(format!(
                    "tile ({}, {}) outside {}x{} grid",
                    tile.x, tile.y, self.width, self.height
                )));
            }
            if !seen.insert((tile.x, tile.y)) {
                return Err(MapError::Validation(format!(
                    "duplicate tile at ({}, {})",
                    tile.x, tile.y
                )));
            }
            if !tile.height.is_finite() {
                return Err(MapError::Validation(format!(
                    "tile ({}, {}) height must be finite",
                    tile.x, tile.y
                )));
            }
        }
        Ok(())
    }

    /// Stamp creation and update times.
    pub fn into_map(self, now: DateTime<Utc>) -> GameMap {
        GameMap {
            id: None,
            name: self.name,
            width: self.width,
            height: self.height,
            tiles: self.tiles,
            zoom: self.zoom,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named terrain grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMap {
    /// Assigned by the store; `None` until the map has been inserted.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub tiles: Vec<MapTile>,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameMap {
    /// Whether `(x, y)` lies inside the grid.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        in_bounds(self.width, self.height, x, y)
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&MapTile> {
        self.tiles.iter().find(|t| t.x == x && t.y == y)
    }

    pub fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut MapTile> {
        self.tiles.iter_mut().find(|t| t.x == x && t.y == y)
    }

    /// Advance `updated_at` to now. If the clock has not moved past the
    /// previous stamp, step one microsecond beyond it instead, so the value
    /// strictly increases on every call.
    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    pub(crate) fn touch_at(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + TimeDelta::microseconds(1)
        };
    }
}

fn in_bounds(width: u32, height: u32, x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && i64::from(x) < i64::from(width) && i64::from(y) < i64::from(height)
}
