use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Tiger density assumed for numeric work when a reserve does not report one.
pub const DEFAULT_TIGER_DENSITY: f64 = 10.0;

/// Static description of one reserve. Areas are in sq km, tiger density is
/// per 100 sq km.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reserve {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_area: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub core_area: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub buffer_area: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub tiger_density: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat_min: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat_max: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon_min: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon_max: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Reserve {
    pub fn tiger_density_or_default(&self) -> f64 {
        self.tiger_density.unwrap_or(DEFAULT_TIGER_DENSITY)
    }

    /// Total area normalised by 1000 sq km.
    pub fn area_factor(&self) -> f64 {
        self.total_area / 1_000.0
    }

    /// Core area over buffer area; a zero buffer counts as 1 sq km.
    pub fn core_to_buffer_ratio(&self) -> f64 {
        let buffer = if self.buffer_area == 0.0 {
            1.0
        } else {
            self.buffer_area
        };
        self.core_area / buffer
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }

    /// Closed lat/lon ring around the bounding box, first point repeated last.
    pub fn bounding_polygon(&self) -> [(f64, f64); 5] {
        [
            (self.lat_min, self.lon_min),
            (self.lat_max, self.lon_min),
            (self.lat_max, self.lon_max),
            (self.lat_min, self.lon_max),
            (self.lat_min, self.lon_min),
        ]
    }
}

/// A reserve plus the map geometry clients draw it with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveView {
    #[serde(flatten)]
    pub reserve: Reserve,
    pub center: (f64, f64),
    pub outline: [(f64, f64); 5],
}

impl From<&Reserve> for ReserveView {
    fn from(reserve: &Reserve) -> Self {
        Self {
            center: reserve.center(),
            outline: reserve.bounding_polygon(),
            reserve: reserve.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReserveCatalog {
    pub reserves: Vec<Reserve>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown reserve '{0}'")]
    UnknownReserve(String),
}

impl ReserveCatalog {
    pub fn new(reserves: Vec<Reserve>) -> Self {
        Self { reserves }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let catalog: ReserveCatalog =
            serde_yaml::from_str(text).context("Failed to parse reserve catalogue")?;
        Ok(catalog)
    }

    pub fn find(&self, name: &str) -> Result<&Reserve, CatalogError> {
        self.reserves
            .iter()
            .find(|reserve| reserve.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownReserve(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.reserves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserves.is_empty()
    }
}

pub struct ReserveLoader {
    base_dir: PathBuf,
}

impl ReserveLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<ReserveCatalog> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read reserve catalogue {}", path.display()))?;
        let catalog: ReserveCatalog = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(catalog)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrOther {
    Number(f64),
    Other(serde::de::IgnoredAny),
}

// Survey sheets sometimes carry "NA" or "Undetermined" in numeric columns.
fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrOther>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrOther::Number(number)) if number.is_finite() => Some(number),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_f64(deserializer)?.unwrap_or(0.0))
}
