//! Measurement spots and the datasets they come from.

use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::error::{Error, Result};

/// A named point-like measurement with an influence radius.
///
/// Always valid: the radius is positive and the position finite, whether the
/// spot was built with [`Spot::new`] or deserialized. The intensity is NaN
/// when the spot carries no value for the active measure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSpot"))]
pub struct Spot {
    name: String,
    position: Vec3,
    radius: f32,
    intensity: f32,
}

impl Spot {
    /// Creates a spot, rejecting non-positive radii and non-finite positions.
    pub fn new(name: impl Into<String>, position: Vec3, radius: f32, intensity: f32) -> Result<Self> {
        let name = name.into();
        if !position.is_finite() {
            return Err(Error::InvalidSpot {
                name,
                reason: format!("position {position} is not finite"),
            });
        }
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(Error::InvalidSpot {
                name,
                reason: format!("radius {radius} must be positive"),
            });
        }
        Ok(Self {
            name,
            position,
            radius,
            intensity,
        })
    }

    /// Spot label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Centre in model space.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Influence radius.
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Measured value, or NaN.
    #[inline]
    #[must_use]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// True if the spot carries a value.
    #[inline]
    #[must_use]
    pub fn has_intensity(&self) -> bool {
        !self.intensity.is_nan()
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawSpot {
    name: String,
    position: Vec3,
    radius: f32,
    intensity: f32,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSpot> for Spot {
    type Error = Error;

    fn try_from(raw: RawSpot) -> Result<Self> {
        Spot::new(raw.name, raw.position, raw.radius, raw.intensity)
    }
}

/// One row of a spot dataset as delivered by the loader.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpotRecord {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: f32,
    /// One value per measure; missing values are NaN.
    #[cfg_attr(feature = "serde", serde(default))]
    pub measures: Vec<f32>,
}

/// Spot positions together with every measure recorded for them.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SpotDataset {
    pub records: Vec<SpotRecord>,
}

impl SpotDataset {
    /// Wraps loader records.
    #[must_use]
    pub fn new(records: Vec<SpotRecord>) -> Self {
        Self { records }
    }

    /// Number of spots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no spots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of measures, i.e. the longest `measures` row.
    #[must_use]
    pub fn measure_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.measures.len())
            .max()
            .unwrap_or(0)
    }

    /// Builds the spots with intensities taken from measure `measure`.
    ///
    /// Records without that measure get a NaN intensity.
    pub fn spots(&self, measure: usize) -> Result<Vec<Spot>> {
        self.records
            .iter()
            .map(|r| {
                let intensity = r.measures.get(measure).copied().unwrap_or(f32::NAN);
                Spot::new(r.name.clone(), Vec3::new(r.x, r.y, r.z), r.r, intensity)
            })
            .collect()
    }

    /// Value range of measure `measure`, ignoring missing values.
    #[must_use]
    pub fn intensity_bounds(&self, measure: usize) -> Option<Bounds> {
        Bounds::from_values(self.records.iter().filter_map(|r| r.measures.get(measure).copied()))
    }
}

impl FromIterator<SpotRecord> for SpotDataset {
    fn from_iter<I: IntoIterator<Item = SpotRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
