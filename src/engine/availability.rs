use std::collections::HashSet;

use ulid::Ulid;

use crate::catalog::Catalog;
use crate::model::*;

use super::store::ReservationStore;
use super::EngineError;

/// Drop every candidate whose id is in `conflicting`, keeping the candidates'
/// order.
pub fn exclude_conflicting(candidates: Vec<Car>, conflicting: &HashSet<Ulid>) -> Vec<Car> {
    if conflicting.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|car| !conflicting.contains(&car.id))
        .collect()
}

/// Cars matching `filter` with no committed reservation overlapping `span`.
///
/// Issues exactly one catalog read and one store read regardless of fleet
/// size. Takes no admission locks, so the answer is a snapshot: a car listed
/// here can still lose an admission race a moment later.
pub async fn find_available(
    catalog: &dyn Catalog,
    store: &dyn ReservationStore,
    filter: &CarFilter,
    span: Span,
) -> Result<Vec<Car>, EngineError> {
    let candidates = catalog.list_matching(filter).await?;
    if candidates.is_empty() {
        return Ok(candidates);
    }
    let conflicting = store.conflicting_car_ids(span).await?;
    Ok(exclude_conflicting(candidates, &conflicting))
}
