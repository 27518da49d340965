use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, the only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Build a span from untrusted input. `None` unless `start < end`.
    pub fn try_new(start: Ms, end: Ms) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[cfg(test)]
    pub(crate) fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// A rentable car. Immutable once it is in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: Ulid,
    pub brand: String,
    pub model: String,
    pub image: String,
    pub fuel: String,
    pub seater: u32,
    pub transmission: String,
    pub price_per_day: u32,
    pub description: String,
}

/// Attribute filter over the catalog. Every `None` field matches anything,
/// so `CarFilter::default()` selects the whole fleet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarFilter {
    pub brand: Option<String>,
    pub fuel: Option<String>,
    pub transmission: Option<String>,
    pub min_seater: Option<u32>,
}

impl CarFilter {
    pub fn by_brand(brand: impl Into<String>) -> Self {
        Self {
            brand: Some(brand.into()),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.fuel.is_none()
            && self.transmission.is_none()
            && self.min_seater.is_none()
    }

    pub fn matches(&self, car: &Car) -> bool {
        self.brand.as_ref().is_none_or(|b| *b == car.brand)
            && self.fuel.as_ref().is_none_or(|f| *f == car.fuel)
            && self
                .transmission
                .as_ref()
                .is_none_or(|t| *t == car.transmission)
            && self.min_seater.is_none_or(|n| car.seater >= n)
    }
}

/// Catalog columns with a finite set of string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarAttribute {
    Brand,
    Model,
    Fuel,
    Transmission,
}

impl CarAttribute {
    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "brand" => Some(Self::Brand),
            "model" => Some(Self::Model),
            "fuel" => Some(Self::Fuel),
            "transmission" => Some(Self::Transmission),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Model => "model",
            Self::Fuel => "fuel",
            Self::Transmission => "transmission",
        }
    }

    pub fn value_of<'a>(&self, car: &'a Car) -> &'a str {
        match self {
            Self::Brand => &car.brand,
            Self::Model => &car.model,
            Self::Fuel => &car.fuel,
            Self::Transmission => &car.transmission,
        }
    }
}

/// Caller-supplied details carried with a reservation. Opaque to the conflict check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationMeta {
    pub contact: String,
    pub license: String,
    pub amount_cents: i64,
}

/// A committed, exclusive claim on one car for one span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub car_id: Ulid,
    pub account_id: Ulid,
    pub span: Span,
    pub meta: ReservationMeta,
}

/// An admission attempt. Times are raw so that a malformed interval can be
/// rejected as a validation failure instead of a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub id: Ulid,
    pub car_id: Ulid,
    pub account_id: Ulid,
    pub start: Ms,
    pub end: Ms,
    pub meta: ReservationMeta,
}

/// Committed reservations of a single car, sorted by `span.start`.
#[derive(Debug, Clone, Default)]
pub struct CarLedger {
    pub reservations: Vec<Reservation>,
}

impl CarLedger {
    /// Insert maintaining sort order by span.start.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    /// Return only reservations whose span overlaps the query window.
    /// Uses binary search to skip reservations starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.reservations.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

/// The event types. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CarAdded {
        car: Car,
    },
    AccountRegistered {
        id: Ulid,
        name: String,
        email: String,
        password_hash: String,
    },
    ReservationCommitted {
        reservation: Reservation,
    },
}

// ── Query result types ───────────────────────────────────────────

/// Public view of an account. Never carries password material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: Ulid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableCars {
    pub cars: Vec<Car>,
    /// Distinct brands across the whole fleet, for building filter menus.
    pub brands: Vec<String>,
}
