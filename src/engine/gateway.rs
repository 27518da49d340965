use std::sync::Arc;
use std::time::Instant;

use dashmap::{DashMap, DashSet};
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::model::*;
use crate::observability::{
    ADMISSION_LOCK_WAIT_SECONDS, RESERVATIONS_ADMITTED_TOTAL, RESERVATIONS_CONFLICTED_TOTAL,
};
use crate::wal::Journal;

use super::conflict::try_admit;
use super::store::ReservationStore;
use super::EngineError;

/// Serializes admissions per car. Each car id gets its own mutex; ids never
/// share one, so admissions on different cars run in parallel.
///
/// Lock entries live as long as the gateway. The table is bounded by the
/// number of distinct car ids ever admitted against, which the catalog caps.
pub struct AdmissionGateway {
    locks: DashMap<Ulid, Arc<Mutex<()>>>,
    /// Reservation ids with an admission under way. Car locks alone cannot
    /// keep one id from being admitted on two different cars at once.
    in_flight: Arc<DashSet<Ulid>>,
    store: Arc<dyn ReservationStore>,
    journal: Option<Journal>,
}

impl AdmissionGateway {
    pub fn new(store: Arc<dyn ReservationStore>, journal: Option<Journal>) -> Self {
        Self {
            locks: DashMap::new(),
            in_flight: Arc::new(DashSet::new()),
            store,
            journal,
        }
    }

    fn lock_for(&self, car_id: Ulid) -> Arc<Mutex<()>> {
        self.locks.entry(car_id).or_default().clone()
    }

    /// Check and commit `request` while holding its car's lock.
    ///
    /// Waiting for the lock is cancel-safe: dropping the future before the lock
    /// is granted leaves no trace. Once granted, the check and commit run in a
    /// task that owns the guard, so they complete even if the caller goes away.
    pub async fn admit(&self, request: ReservationRequest) -> Result<Reservation, EngineError> {
        let car_id = request.car_id;
        let claim = IdClaim::take(&self.in_flight, request.id)
            .ok_or(EngineError::AlreadyExists(request.id))?;
        let lock = self.lock_for(car_id);

        let wait_start = Instant::now();
        let guard = lock.lock_owned().await;
        metrics::histogram!(ADMISSION_LOCK_WAIT_SECONDS).record(wait_start.elapsed().as_secs_f64());

        let store = self.store.clone();
        let journal = self.journal.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let _claim = claim;
            let outcome = try_admit(store.as_ref(), journal.as_ref(), request).await;
            match &outcome {
                Ok(reservation) => {
                    metrics::counter!(RESERVATIONS_ADMITTED_TOTAL).increment(1);
                    tracing::debug!(
                        car = %car_id,
                        reservation = %reservation.id,
                        start = reservation.span.start,
                        end = reservation.span.end,
                        "reservation admitted"
                    );
                }
                Err(EngineError::Conflict { span, .. }) => {
                    metrics::counter!(RESERVATIONS_CONFLICTED_TOTAL).increment(1);
                    tracing::debug!(car = %car_id, start = span.start, end = span.end, "reservation conflicted");
                }
                Err(e) => tracing::debug!(car = %car_id, "reservation rejected: {e}"),
            }
            outcome
        });

        task.await
            .map_err(|e| EngineError::StorageUnavailable(format!("admission task failed: {e}")))?
    }

    /// Number of cars that have had at least one admission attempt.
    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

/// Holds a reservation id in the in-flight set until dropped.
struct IdClaim {
    set: Arc<DashSet<Ulid>>,
    id: Ulid,
}

impl IdClaim {
    fn take(set: &Arc<DashSet<Ulid>>, id: Ulid) -> Option<Self> {
        set.insert(id).then(|| Self {
            set: set.clone(),
            id,
        })
    }
}

impl Drop for IdClaim {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}
