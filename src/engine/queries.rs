use ulid::Ulid;

use crate::model::*;

use super::availability::find_available;
use super::conflict::validate_span;
use super::{Engine, EngineError};

impl Engine {
    /// Cars matching `filter` that are free for the whole of `[start, end)`,
    /// plus the fleet's distinct brands.
    pub async fn list_available(
        &self,
        filter: &CarFilter,
        start: Ms,
        end: Ms,
    ) -> Result<AvailableCars, EngineError> {
        let span = validate_span(start, end)?;
        let cars = find_available(self.catalog.as_ref(), self.store.as_ref(), filter, span).await?;
        let brands = self.catalog.distinct_values(CarAttribute::Brand).await?;
        Ok(AvailableCars { cars, brands })
    }

    pub async fn list_cars(&self, filter: &CarFilter) -> Result<Vec<Car>, EngineError> {
        Ok(self.catalog.list_matching(filter).await?)
    }

    pub async fn distinct_values(&self, attribute: CarAttribute) -> Result<Vec<String>, EngineError> {
        Ok(self.catalog.distinct_values(attribute).await?)
    }

    pub async fn get_car(&self, id: Ulid) -> Result<Car, EngineError> {
        self.catalog.get(id).await?.ok_or(EngineError::NotFound(id))
    }

    /// Committed reservations of one car, ordered by start.
    pub async fn reservations_for(&self, car_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        if self.catalog.get(car_id).await?.is_none() {
            return Err(EngineError::NotFound(car_id));
        }
        Ok(self.store.reservations_for(car_id).await?)
    }

    pub async fn authenticate(&self, email: &str, raw_password: &str) -> Result<AccountInfo, EngineError> {
        self.accounts.authenticate(email, raw_password).await
    }

    pub fn account(&self, id: &Ulid) -> Option<AccountInfo> {
        self.accounts.get(id)
    }
}
