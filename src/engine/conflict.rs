use crate::limits::*;
use crate::model::*;
use crate::wal::Journal;

use super::store::ReservationStore;
use super::{journal_append, EngineError};

/// Turn raw request times into a span. Inverted or empty intervals are a
/// validation failure; spans outside the supported range are a limit failure.
pub fn validate_span(start: Ms, end: Ms) -> Result<Span, EngineError> {
    let span = Span::try_new(start, end).ok_or_else(|| {
        EngineError::Validation(format!("interval start {start} must be before end {end}"))
    })?;
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(span)
}

/// Admit `request` if its id is unused and no committed reservation on the
/// same car overlaps it.
///
/// The caller must hold the car's admission lock for the whole call: the
/// overlap count and the commit are only atomic relative to other admissions
/// on the same car because of that lock.
pub async fn try_admit(
    store: &dyn ReservationStore,
    journal: Option<&Journal>,
    request: ReservationRequest,
) -> Result<Reservation, EngineError> {
    let span = validate_span(request.start, request.end)?;

    if store.contains(request.id).await? {
        return Err(EngineError::AlreadyExists(request.id));
    }

    let overlapping = store.count_overlapping(request.car_id, span).await?;
    if overlapping > 0 {
        return Err(EngineError::Conflict {
            car_id: request.car_id,
            span,
        });
    }

    let reservation = Reservation {
        id: request.id,
        car_id: request.car_id,
        account_id: request.account_id,
        span,
        meta: request.meta,
    };
    journal_append(
        journal,
        &Event::ReservationCommitted {
            reservation: reservation.clone(),
        },
    )
    .await?;
    Ok(store.insert(reservation).await?)
}
