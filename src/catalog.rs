use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use ulid::Ulid;

use crate::engine::StoreError;
use crate::model::*;

/// Read side of the fleet as seen by availability queries and admission checks.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Cars matching `filter`, in the catalog's natural (insertion) order.
    async fn list_matching(&self, filter: &CarFilter) -> Result<Vec<Car>, StoreError>;

    /// Sorted, de-duplicated values of one attribute across all cars.
    async fn distinct_values(&self, attribute: CarAttribute) -> Result<Vec<String>, StoreError>;

    async fn get(&self, id: Ulid) -> Result<Option<Car>, StoreError>;

    /// Returns false if a car with the same id is already present.
    async fn insert(&self, car: Car) -> Result<bool, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;
}

#[derive(Default)]
struct Fleet {
    cars: Vec<Car>,
    index: HashMap<Ulid, usize>,
}

/// Insertion-ordered in-process catalog.
#[derive(Default)]
pub struct MemoryCatalog {
    fleet: RwLock<Fleet>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous insert for WAL replay. Returns false on duplicate id.
    pub fn insert_now(&self, car: Car) -> bool {
        let mut fleet = self.fleet.write().unwrap_or_else(PoisonError::into_inner);
        if fleet.index.contains_key(&car.id) {
            return false;
        }
        let pos = fleet.cars.len();
        fleet.index.insert(car.id, pos);
        fleet.cars.push(car);
        true
    }

    pub fn len_now(&self) -> usize {
        self.fleet.read().unwrap_or_else(PoisonError::into_inner).cars.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &Ulid) -> bool {
        self.fleet
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .contains_key(id)
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn list_matching(&self, filter: &CarFilter) -> Result<Vec<Car>, StoreError> {
        let fleet = self.fleet.read().unwrap_or_else(PoisonError::into_inner);
        Ok(fleet
            .cars
            .iter()
            .filter(|car| filter.matches(car))
            .cloned()
            .collect())
    }

    async fn distinct_values(&self, attribute: CarAttribute) -> Result<Vec<String>, StoreError> {
        let fleet = self.fleet.read().unwrap_or_else(PoisonError::into_inner);
        let values: BTreeSet<&str> = fleet.cars.iter().map(|c| attribute.value_of(c)).collect();
        Ok(values.into_iter().map(str::to_owned).collect())
    }

    async fn get(&self, id: Ulid) -> Result<Option<Car>, StoreError> {
        let fleet = self.fleet.read().unwrap_or_else(PoisonError::into_inner);
        Ok(fleet.index.get(&id).map(|&pos| fleet.cars[pos].clone()))
    }

    async fn insert(&self, car: Car) -> Result<bool, StoreError> {
        Ok(self.insert_now(car))
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.len_now())
    }
}
