//! Initial fleet loading.
//!
//! On first start the catalog is empty; if a seed file is configured, every
//! car in it is added through the engine (and therefore journalled).

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::model::{Car, CarFilter};

/// One entry of the seed file. Field names follow the JSON the fleet data is
/// published in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCar {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub image: String,
    pub fuel: String,
    pub seater: u32,
    pub transmission: String,
    pub price_per_day: u32,
    #[serde(default)]
    pub description: String,
}

impl SeedCar {
    fn into_car(self) -> Car {
        Car {
            id: Ulid::new(),
            brand: self.brand,
            model: self.model,
            image: self.image,
            fuel: self.fuel,
            seater: self.seater,
            transmission: self.transmission,
            price_per_day: self.price_per_day,
            description: self.description,
        }
    }
}

#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Engine(EngineError),
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::Io(e) => write!(f, "cannot read seed file: {e}"),
            SeedError::Parse(e) => write!(f, "malformed seed file: {e}"),
            SeedError::Engine(e) => write!(f, "seeding failed: {e}"),
        }
    }
}

impl std::error::Error for SeedError {}

impl From<EngineError> for SeedError {
    fn from(e: EngineError) -> Self {
        SeedError::Engine(e)
    }
}

pub fn parse_seed(json: &str) -> Result<Vec<SeedCar>, SeedError> {
    serde_json::from_str(json).map_err(SeedError::Parse)
}

/// Add every car in `path` if the catalog is empty. Returns how many were added.
///
/// A missing file is not an error: it is logged and nothing is loaded.
pub async fn seed_if_empty(engine: &Engine, path: &Path) -> Result<usize, SeedError> {
    if !engine.list_cars(&CarFilter::default()).await?.is_empty() {
        info!("catalog already populated, skipping seed");
        return Ok(0);
    }

    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("seed file {} not found, starting with an empty catalog", path.display());
            return Ok(0);
        }
        Err(e) => return Err(SeedError::Io(e)),
    };

    let cars = parse_seed(&json)?;
    let count = cars.len();
    for car in cars {
        engine.add_car(car.into_car()).await?;
    }
    info!("seeded {count} cars from {}", path.display());
    Ok(count)
}
