mod availability;
mod conflict;
mod error;
mod gateway;
mod mutations;
mod queries;
mod store;

pub use availability::{exclude_conflicting, find_available};
pub use conflict::{try_admit, validate_span};
pub use error::EngineError;
pub use gateway::AdmissionGateway;
pub use store::{MemoryReservationStore, ReservationStore, StoreError};

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::accounts::{AccountRecord, Accounts};
use crate::catalog::{Catalog, MemoryCatalog};
use crate::model::*;
use crate::wal::{Journal, Wal};

/// Append an event to the journal if there is one. Journal-less engines
/// (tests, externally durable stores) treat this as a no-op.
pub(crate) async fn journal_append(journal: Option<&Journal>, event: &Event) -> Result<(), EngineError> {
    match journal {
        Some(journal) => journal
            .append(event)
            .await
            .map_err(|e| EngineError::StorageUnavailable(format!("WAL error: {e}"))),
        None => Ok(()),
    }
}

/// The reservation service: catalog, accounts, reservation store and the
/// admission gateway that guards it. Passed explicitly (usually as
/// `Arc<Engine>`) to whatever front-end serves requests.
pub struct Engine {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ReservationStore>,
    accounts: Accounts,
    gateway: AdmissionGateway,
    journal: Option<Journal>,
    /// Serializes catalog writes (duplicate-id check + commit).
    catalog_writes: Mutex<()>,
}

impl Engine {
    /// Engine over arbitrary collaborators, without a journal.
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn ReservationStore>) -> Self {
        Self::assemble(catalog, store, Accounts::new(), None)
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryCatalog::new()),
            Arc::new(MemoryReservationStore::new()),
        )
    }

    /// Replay the WAL at `wal_path` into in-memory collaborators and keep
    /// journaling to it. Must run inside a tokio runtime.
    pub fn open(wal_path: &Path) -> std::io::Result<Self> {
        let events = Wal::replay(wal_path)?;
        let catalog = Arc::new(MemoryCatalog::new());
        let store = Arc::new(MemoryReservationStore::new());
        let accounts = Accounts::new();

        let mut reservations = 0usize;
        for event in events {
            match event {
                Event::CarAdded { car } => {
                    let id = car.id;
                    if !catalog.insert_now(car) {
                        tracing::warn!("replay: duplicate car {id} ignored");
                    }
                }
                Event::AccountRegistered {
                    id,
                    name,
                    email,
                    password_hash,
                } => {
                    let record = AccountRecord {
                        id,
                        name,
                        email,
                        password_hash,
                    };
                    if !accounts.insert_now(record) {
                        tracing::warn!("replay: duplicate account {id} ignored");
                    }
                }
                Event::ReservationCommitted { reservation } => {
                    let (id, car_id) = (reservation.id, reservation.car_id);
                    if store.overlaps_now(car_id, &reservation.span) {
                        tracing::warn!(
                            "replay: reservation {id} overlaps an earlier one on car {car_id}, ignored"
                        );
                    } else if !store.insert_now(reservation) {
                        tracing::warn!("replay: duplicate reservation {id} ignored");
                    } else {
                        reservations += 1;
                    }
                }
            }
        }
        tracing::info!(
            cars = catalog.len_now(),
            accounts = accounts.len(),
            reservations,
            "replayed {}",
            wal_path.display()
        );

        let journal = Journal::spawn(Wal::open(wal_path)?);
        Ok(Self::assemble(catalog, store, accounts, Some(journal)))
    }

    fn assemble(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ReservationStore>,
        accounts: Accounts,
        journal: Option<Journal>,
    ) -> Self {
        let gateway = AdmissionGateway::new(store.clone(), journal.clone());
        Self {
            catalog,
            store,
            accounts,
            gateway,
            journal,
            catalog_writes: Mutex::new(()),
        }
    }

    pub fn gateway(&self) -> &AdmissionGateway {
        &self.gateway
    }

    async fn persist(&self, event: &Event) -> Result<(), EngineError> {
        journal_append(self.journal.as_ref(), event).await
    }
}
