use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::CarlotAuthSource;
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability::{self, AUTH_FAILURES_TOTAL, QUERIES_TOTAL, QUERY_DURATION_SECONDS};
use crate::sql::{self, Command, SqlError};

pub struct CarlotHandler {
    engine: Arc<Engine>,
    query_parser: Arc<CarlotQueryParser>,
}

impl CarlotHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(CarlotQueryParser),
        }
    }

    async fn run(&self, sql: &str) -> PgWireResult<Vec<Response>> {
        let cmd = sql::parse_sql(sql).map_err(sql_err)?;
        let label = observability::command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(cmd).await;
        metrics::histogram!(QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        let status = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_client_error() => "rejected",
            Err(_) => "error",
        };
        metrics::counter!(QUERIES_TOTAL, "command" => label, "status" => status).increment(1);
        result.map_err(engine_err)
    }

    async fn execute_command(&self, cmd: Command) -> Result<Vec<Response>, EngineError> {
        let engine = &self.engine;
        match cmd {
            Command::InsertCar { car } => {
                engine.add_car(car).await?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::SelectCars { filter } => {
                let cars = engine.list_cars(&filter).await?;
                Ok(vec![car_rows(cars)])
            }
            Command::SelectAvailableCars { filter, start, end } => {
                let available = engine.list_available(&filter, start, end).await?;
                Ok(vec![car_rows(available.cars)])
            }
            Command::SelectDistinct { attribute } => {
                let values = engine.distinct_values(attribute).await?;
                Ok(vec![distinct_rows(attribute, values)])
            }
            Command::InsertReservation { request } => {
                engine.create_reservation(request).await?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::SelectReservations { car_id } => {
                let reservations = engine.reservations_for(car_id).await?;
                Ok(vec![reservation_rows(reservations)])
            }
            Command::InsertAccount {
                id,
                name,
                email,
                password,
            } => {
                engine.register_account(id, &name, &email, &password.0).await?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::Authenticate { email, password } => {
                let account = engine
                    .authenticate(&email, &password.0)
                    .await
                    .inspect_err(|e| {
                        if matches!(e, EngineError::InvalidCredentials | EngineError::AccountNotFound(_)) {
                            metrics::counter!(AUTH_FAILURES_TOTAL).increment(1);
                        }
                    })?;
                Ok(vec![account_rows(account)])
            }
        }
    }
}

// ── Result schemas ───────────────────────────────────────────────

fn text(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn int8(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT8, FieldFormat::Text)
}

fn car_schema() -> Vec<FieldInfo> {
    vec![
        text("id"),
        text("brand"),
        text("model"),
        text("image"),
        text("fuel"),
        int8("seater"),
        text("transmission"),
        int8("price_per_day"),
        text("description"),
    ]
}

fn reservation_schema() -> Vec<FieldInfo> {
    vec![
        text("id"),
        text("car_id"),
        text("account_id"),
        int8("start"),
        int8("end"),
        text("contact"),
        text("license"),
        int8("amount"),
    ]
}

fn account_schema() -> Vec<FieldInfo> {
    vec![text("id"), text("name"), text("email")]
}

fn distinct_schema(attribute: CarAttribute) -> Vec<FieldInfo> {
    vec![text(attribute.column())]
}

/// Schema for a statement before it runs, for Describe messages.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    let lower = sql.to_lowercase();
    if !lower.trim_start().starts_with("select") {
        return vec![];
    }
    if let Some((_, rest)) = lower.split_once("distinct") {
        return rest
            .split_whitespace()
            .next()
            .and_then(CarAttribute::from_column)
            .map(distinct_schema)
            .unwrap_or_default();
    }
    if lower.contains("reservations") {
        reservation_schema()
    } else if lower.contains("sessions") {
        account_schema()
    } else if lower.contains("cars") {
        car_schema()
    } else {
        vec![]
    }
}

fn car_rows(cars: Vec<Car>) -> Response {
    let schema = Arc::new(car_schema());
    let rows: Vec<PgWireResult<_>> = cars
        .into_iter()
        .map(|car| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&car.id.to_string())?;
            encoder.encode_field(&car.brand)?;
            encoder.encode_field(&car.model)?;
            encoder.encode_field(&car.image)?;
            encoder.encode_field(&car.fuel)?;
            encoder.encode_field(&i64::from(car.seater))?;
            encoder.encode_field(&car.transmission)?;
            encoder.encode_field(&i64::from(car.price_per_day))?;
            encoder.encode_field(&car.description)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn reservation_rows(reservations: Vec<Reservation>) -> Response {
    let schema = Arc::new(reservation_schema());
    let rows: Vec<PgWireResult<_>> = reservations
        .into_iter()
        .map(|r| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&r.id.to_string())?;
            encoder.encode_field(&r.car_id.to_string())?;
            encoder.encode_field(&r.account_id.to_string())?;
            encoder.encode_field(&r.span.start)?;
            encoder.encode_field(&r.span.end)?;
            encoder.encode_field(&r.meta.contact)?;
            encoder.encode_field(&r.meta.license)?;
            encoder.encode_field(&r.meta.amount_cents)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn account_rows(account: AccountInfo) -> Response {
    let schema = Arc::new(account_schema());
    let encode = |account: AccountInfo| -> PgWireResult<_> {
        let mut encoder = DataRowEncoder::new(schema.clone());
        encoder.encode_field(&account.id.to_string())?;
        encoder.encode_field(&account.name)?;
        encoder.encode_field(&account.email)?;
        Ok(encoder.take_row())
    };
    let rows = vec![encode(account)];
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn distinct_rows(attribute: CarAttribute, values: Vec<String>) -> Response {
    let schema = Arc::new(distinct_schema(attribute));
    let rows: Vec<PgWireResult<_>> = values
        .into_iter()
        .map(|value| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&value)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

#[async_trait]
impl SimpleQueryHandler for CarlotHandler {
    async fn do_query<C>(
        &self,
        _client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        self.run(query).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct CarlotQueryParser;

#[async_trait]
impl QueryParser for CarlotQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for CarlotHandler {
    type Statement = String;
    type QueryParser = CarlotQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        let mut responses = self.run(&sql).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            result_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if let Ok(n) = sql[start..i].parse::<usize>() {
                max = max.max(n);
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
/// Highest index first so `$1` never clobbers the prefix of `$10`.
fn substitute_params(portal: &Portal<String>) -> String {
    substitute(&portal.statement.statement, &portal.parameters)
}

/// Inline `$N` placeholders in one left-to-right pass over `sql`. Inserted
/// values are never rescanned, and `$` inside a quoted literal is left alone.
fn substitute(sql: &str, params: &[Option<Bytes>]) -> String {
    let mut result = String::with_capacity(sql.len());
    let bytes = sql.as_bytes();
    let mut in_literal = false;
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                in_literal = !in_literal;
                i += 1;
            }
            b'$' if !in_literal => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let index = sql[start..end]
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=params.len()).contains(n));
                let Some(n) = index else {
                    i = end;
                    continue;
                };
                result.push_str(&sql[copied..i]);
                match &params[n - 1] {
                    Some(value) => {
                        let text = String::from_utf8_lossy(value);
                        result.push('\'');
                        result.push_str(&text.replace('\'', "''"));
                        result.push('\'');
                    }
                    None => result.push_str("NULL"),
                }
                copied = end;
                i = end;
            }
            _ => i += 1,
        }
    }
    result.push_str(&sql[copied..]);
    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct CarlotFactory {
    handler: Arc<CarlotHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<CarlotAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl CarlotFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = CarlotAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(CarlotHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for CarlotFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = CarlotFactory::new(engine, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Errors ───────────────────────────────────────────────────────

fn sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::Validation(_) => "22023",
        EngineError::Conflict { .. } => "23P01",
        EngineError::DuplicateEmail(_) | EngineError::AlreadyExists(_) => "23505",
        EngineError::NotFound(_) | EngineError::AccountNotFound(_) => "P0002",
        EngineError::InvalidCredentials => "28P01",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::StorageUnavailable(_) => "58030",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    if !e.is_client_error() {
        tracing::error!("query failed: {e}");
    }
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        sqlstate(&e).into(),
        e.to_string(),
    )))
}

fn sql_err(e: SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
