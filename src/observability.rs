use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "carlot_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "carlot_query_duration_seconds";

/// Counter: reservations committed by the admission gateway.
pub const RESERVATIONS_ADMITTED_TOTAL: &str = "carlot_reservations_admitted_total";

/// Counter: admissions rejected because the car was already reserved.
pub const RESERVATIONS_CONFLICTED_TOTAL: &str = "carlot_reservations_conflicted_total";

/// Histogram: time spent waiting for a car's admission lock, in seconds.
pub const ADMISSION_LOCK_WAIT_SECONDS: &str = "carlot_admission_lock_wait_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "carlot_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "carlot_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "carlot_connections_rejected_total";

/// Counter: failed account logins (unknown email or wrong password).
pub const AUTH_FAILURES_TOTAL: &str = "carlot_auth_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "carlot_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "carlot_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertCar { .. } => "insert_car",
        Command::SelectCars { .. } => "select_cars",
        Command::SelectAvailableCars { .. } => "select_available_cars",
        Command::SelectDistinct { .. } => "select_distinct",
        Command::InsertReservation { .. } => "insert_reservation",
        Command::SelectReservations { .. } => "select_reservations",
        Command::InsertAccount { .. } => "insert_account",
        Command::Authenticate { .. } => "authenticate",
    }
}
