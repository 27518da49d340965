use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::validate_span;
use super::{Engine, EngineError};

fn require(field: &'static str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(format!("{field} is required")));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(EngineError::LimitExceeded("field too long"));
    }
    Ok(())
}

fn validate_car(car: &Car) -> Result<(), EngineError> {
    require("brand", &car.brand)?;
    require("model", &car.model)?;
    require("fuel", &car.fuel)?;
    require("transmission", &car.transmission)?;
    if car.image.len() > MAX_FIELD_LEN {
        return Err(EngineError::LimitExceeded("image reference too long"));
    }
    if car.description.len() > MAX_DESCRIPTION_LEN {
        return Err(EngineError::LimitExceeded("description too long"));
    }
    if car.seater == 0 {
        return Err(EngineError::Validation("seater must be at least 1".into()));
    }
    Ok(())
}

fn validate_meta(meta: &ReservationMeta) -> Result<(), EngineError> {
    require("contact", &meta.contact)?;
    require("license", &meta.license)?;
    if meta.amount_cents < 0 {
        return Err(EngineError::Validation("amount must not be negative".into()));
    }
    Ok(())
}

impl Engine {
    /// Add a car to the catalog. Cars are immutable once added.
    pub async fn add_car(&self, car: Car) -> Result<(), EngineError> {
        validate_car(&car)?;

        let _writes = self.catalog_writes.lock().await;
        if self.catalog.len().await? >= MAX_CARS {
            return Err(EngineError::LimitExceeded("too many cars"));
        }
        if self.catalog.get(car.id).await?.is_some() {
            return Err(EngineError::AlreadyExists(car.id));
        }

        let id = car.id;
        self.persist(&Event::CarAdded { car: car.clone() }).await?;
        if !self.catalog.insert(car).await? {
            return Err(EngineError::AlreadyExists(id));
        }
        tracing::debug!(car = %id, "car added");
        Ok(())
    }

    /// Register an account. The password is hashed before anything is stored
    /// or journalled.
    pub async fn register_account(
        &self,
        id: Ulid,
        name: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<AccountInfo, EngineError> {
        let record = self.accounts.prepare(id, name, email, raw_password).await?;

        let _registration = self.accounts.registration_guard().await;
        if self.accounts.contains(&record.id) {
            return Err(EngineError::AlreadyExists(record.id));
        }
        if self.accounts.email_taken(&record.email) {
            return Err(EngineError::DuplicateEmail(record.email));
        }

        self.persist(&Event::AccountRegistered {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            password_hash: record.password_hash.clone(),
        })
        .await?;

        let info = record.info();
        if !self.accounts.insert_now(record) {
            return Err(EngineError::DuplicateEmail(info.email));
        }
        tracing::debug!(account = %info.id, "account registered");
        Ok(info)
    }

    /// Validate a booking request against the catalog and the account
    /// register, then hand it to the admission gateway.
    pub async fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<Reservation, EngineError> {
        validate_span(request.start, request.end)?;
        validate_meta(&request.meta)?;

        if self.catalog.get(request.car_id).await?.is_none() {
            return Err(EngineError::NotFound(request.car_id));
        }
        if !self.accounts.contains(&request.account_id) {
            return Err(EngineError::NotFound(request.account_id));
        }

        self.gateway.admit(request).await
    }
}
