use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(e) => write!(f, "reservation store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Durable set of committed reservations, keyed by car.
///
/// The store does no conflict checking of its own: `insert` trusts the caller
/// to hold the car's admission lock and to have counted overlaps first.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Number of reservations on `car_id` whose span overlaps `span`.
    async fn count_overlapping(&self, car_id: Ulid, span: Span) -> Result<usize, StoreError>;

    async fn insert(&self, reservation: Reservation) -> Result<Reservation, StoreError>;

    /// Every car with at least one reservation overlapping `span`.
    async fn conflicting_car_ids(&self, span: Span) -> Result<HashSet<Ulid>, StoreError>;

    /// All reservations of one car, ordered by start.
    async fn reservations_for(&self, car_id: Ulid) -> Result<Vec<Reservation>, StoreError>;

    /// Whether a reservation with this id has been committed, on any car.
    async fn contains(&self, reservation_id: Ulid) -> Result<bool, StoreError>;
}

/// In-process store. Each car's ledger sits behind its own DashMap shard entry,
/// so readers only contend with a writer for the duration of one insert.
pub struct MemoryReservationStore {
    ledgers: DashMap<Ulid, CarLedger>,
    /// reservation id -> car id
    ids: DashMap<Ulid, Ulid>,
}

impl Default for MemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReservationStore {
    pub fn new() -> Self {
        Self {
            ledgers: DashMap::new(),
            ids: DashMap::new(),
        }
    }

    /// Insert without going through the async trait; used by WAL replay.
    /// Returns false, storing nothing, if the reservation id is already taken.
    pub fn insert_now(&self, reservation: Reservation) -> bool {
        match self.ids.entry(reservation.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(reservation.car_id);
                self.ledgers
                    .entry(reservation.car_id)
                    .or_default()
                    .insert(reservation);
                true
            }
        }
    }

    pub fn overlaps_now(&self, car_id: Ulid, span: &Span) -> bool {
        self.ledgers
            .get(&car_id)
            .is_some_and(|ledger| ledger.overlapping(span).next().is_some())
    }

    #[cfg(test)]
    pub(crate) fn ledger_len(&self, car_id: &Ulid) -> usize {
        self.ledgers.get(car_id).map_or(0, |l| l.len())
    }

    #[cfg(test)]
    pub(crate) fn total_reservations(&self) -> usize {
        self.ids.len()
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn count_overlapping(&self, car_id: Ulid, span: Span) -> Result<usize, StoreError> {
        Ok(self
            .ledgers
            .get(&car_id)
            .map_or(0, |ledger| ledger.overlapping(&span).count()))
    }

    async fn insert(&self, reservation: Reservation) -> Result<Reservation, StoreError> {
        if !self.insert_now(reservation.clone()) {
            return Err(StoreError::Unavailable(format!(
                "reservation {} already stored",
                reservation.id
            )));
        }
        Ok(reservation)
    }

    async fn conflicting_car_ids(&self, span: Span) -> Result<HashSet<Ulid>, StoreError> {
        Ok(self
            .ledgers
            .iter()
            .filter(|entry| entry.value().overlapping(&span).next().is_some())
            .map(|entry| *entry.key())
            .collect())
    }

    async fn reservations_for(&self, car_id: Ulid) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .ledgers
            .get(&car_id)
            .map(|ledger| ledger.reservations.clone())
            .unwrap_or_default())
    }

    async fn contains(&self, reservation_id: Ulid) -> Result<bool, StoreError> {
        Ok(self.ids.contains_key(&reservation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(car_id: Ulid, start: Ms, end: Ms) -> Reservation {
        Reservation {
            id: Ulid::new(),
            car_id,
            account_id: Ulid::new(),
            span: Span::new(start, end),
            meta: ReservationMeta {
                contact: "c".into(),
                license: "l".into(),
                amount_cents: 100,
            },
        }
    }

    #[tokio::test]
    async fn count_overlapping_is_per_car() {
        let store = MemoryReservationStore::new();
        let a = Ulid::new();
        let b = Ulid::new();
        store.insert(reservation(a, 100, 200)).await.unwrap();
        store.insert(reservation(b, 100, 200)).await.unwrap();

        assert_eq!(store.count_overlapping(a, Span::new(150, 250)).await.unwrap(), 1);
        assert_eq!(store.count_overlapping(a, Span::new(200, 300)).await.unwrap(), 0);
        assert_eq!(store.count_overlapping(Ulid::new(), Span::new(0, 1000)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn conflicting_ids_single_pass() {
        let store = MemoryReservationStore::new();
        let a = Ulid::new();
        let b = Ulid::new();
        let c = Ulid::new();
        store.insert(reservation(a, 0, 100)).await.unwrap();
        store.insert(reservation(b, 100, 200)).await.unwrap();
        store.insert(reservation(c, 50, 150)).await.unwrap();

        let ids = store.conflicting_car_ids(Span::new(90, 100)).await.unwrap();
        assert_eq!(ids, HashSet::from([a, c]));

        let ids = store.conflicting_car_ids(Span::new(200, 300)).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn reservations_for_sorted_by_start() {
        let store = MemoryReservationStore::new();
        let car = Ulid::new();
        store.insert(reservation(car, 500, 600)).await.unwrap();
        store.insert(reservation(car, 100, 200)).await.unwrap();

        let all = store.reservations_for(car).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].span.start, 100);
        assert_eq!(all[1].span.start, 500);
        assert_eq!(store.ledger_len(&car), 2);
        assert_eq!(store.total_reservations(), 2);
        assert!(store.reservations_for(Ulid::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ids_are_unique_across_cars() {
        let store = MemoryReservationStore::new();
        let first = reservation(Ulid::new(), 100, 200);
        let mut reused = reservation(Ulid::new(), 500, 600);
        reused.id = first.id;

        store.insert(first.clone()).await.unwrap();
        assert!(store.contains(first.id).await.unwrap());
        assert!(!store.contains(Ulid::new()).await.unwrap());

        assert!(store.insert(reused.clone()).await.is_err());
        assert!(!store.insert_now(reused.clone()));
        assert!(store.reservations_for(reused.car_id).await.unwrap().is_empty());
        assert_eq!(store.total_reservations(), 1);
    }

    #[test]
    fn overlaps_now_is_half_open() {
        let store = MemoryReservationStore::new();
        let car = Ulid::new();
        assert!(store.insert_now(reservation(car, 100, 200)));
        assert!(store.overlaps_now(car, &Span::new(150, 250)));
        assert!(!store.overlaps_now(car, &Span::new(200, 300)));
        assert!(!store.overlaps_now(Ulid::new(), &Span::new(0, 1000)));
    }
}
