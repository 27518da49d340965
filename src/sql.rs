use std::collections::HashMap;

use sqlparser::ast::{
    self, Distinct, Expr, ObjectNamePart, SelectItem, SetExpr, Statement, TableFactor, TableObject,
    Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;

/// A raw password carried from the wire to the account register.
/// Debug output never shows it.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(pub String);

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertCar {
        car: Car,
    },
    SelectCars {
        filter: CarFilter,
    },
    SelectAvailableCars {
        filter: CarFilter,
        start: Ms,
        end: Ms,
    },
    SelectDistinct {
        attribute: CarAttribute,
    },
    InsertReservation {
        request: ReservationRequest,
    },
    SelectReservations {
        car_id: Ulid,
    },
    InsertAccount {
        id: Ulid,
        name: String,
        email: String,
        password: Password,
    },
    Authenticate {
        email: String,
        password: Password,
    },
}

const CAR_COLUMNS: &[&str] = &[
    "id",
    "brand",
    "model",
    "image",
    "fuel",
    "seater",
    "transmission",
    "price_per_day",
    "description",
];
const RESERVATION_COLUMNS: &[&str] = &[
    "id", "car_id", "account_id", "start", "end", "contact", "license", "amount",
];
const ACCOUNT_COLUMNS: &[&str] = &["id", "name", "email", "password"];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let defaults = match table.as_str() {
        "cars" => CAR_COLUMNS,
        "reservations" => RESERVATION_COLUMNS,
        "accounts" => ACCOUNT_COLUMNS,
        _ => return Err(SqlError::UnknownTable(table)),
    };
    let row = InsertRow::new(insert, defaults)?;

    match table.as_str() {
        "cars" => Ok(Command::InsertCar {
            car: Car {
                id: row.id()?,
                brand: row.string("brand")?,
                model: row.string("model")?,
                image: row.string_or_empty("image")?,
                fuel: row.string("fuel")?,
                seater: parse_u32(row.expr("seater")?)?,
                transmission: row.string("transmission")?,
                price_per_day: parse_u32(row.expr("price_per_day")?)?,
                description: row.string_or_empty("description")?,
            },
        }),
        "reservations" => Ok(Command::InsertReservation {
            request: ReservationRequest {
                id: row.id()?,
                car_id: parse_ulid(row.expr("car_id")?)?,
                account_id: parse_ulid(row.expr("account_id")?)?,
                start: parse_i64(row.expr("start")?)?,
                end: parse_i64(row.expr("end")?)?,
                meta: ReservationMeta {
                    contact: row.string("contact")?,
                    license: row.string("license")?,
                    amount_cents: parse_i64(row.expr("amount")?)?,
                },
            },
        }),
        _ => Ok(Command::InsertAccount {
            id: row.id()?,
            name: row.string("name")?,
            email: row.string("email")?,
            password: Password(row.string("password")?),
        }),
    }
}

/// One VALUES row keyed by column name. Without an explicit column list the
/// table's default column order applies.
struct InsertRow {
    values: HashMap<String, Expr>,
}

impl InsertRow {
    fn new(insert: &ast::Insert, defaults: &[&str]) -> Result<Self, SqlError> {
        let rows = extract_insert_rows(insert)?;
        if rows.len() != 1 {
            return Err(SqlError::Unsupported("multi-row INSERT".into()));
        }
        let row = &rows[0];

        let columns: Vec<String> = if insert.columns.is_empty() {
            defaults.iter().map(|c| c.to_string()).collect()
        } else {
            insert
                .columns
                .iter()
                .map(|ident| ident.value.to_lowercase())
                .collect()
        };
        if row.len() > columns.len() {
            return Err(SqlError::WrongArity("VALUES", columns.len(), row.len()));
        }
        if !insert.columns.is_empty() && row.len() != columns.len() {
            return Err(SqlError::WrongArity("VALUES", columns.len(), row.len()));
        }

        let mut values = HashMap::with_capacity(row.len());
        for (column, expr) in columns.into_iter().zip(row.iter()) {
            if !defaults.contains(&column.as_str()) {
                return Err(SqlError::UnknownColumn(column));
            }
            values.insert(column, expr.clone());
        }
        Ok(Self { values })
    }

    fn expr(&self, column: &'static str) -> Result<&Expr, SqlError> {
        self.values.get(column).ok_or(SqlError::MissingColumn(column))
    }

    fn string(&self, column: &'static str) -> Result<String, SqlError> {
        parse_string(self.expr(column)?)
    }

    fn string_or_empty(&self, column: &'static str) -> Result<String, SqlError> {
        match self.values.get(column) {
            Some(expr) if is_null(expr) => Ok(String::new()),
            Some(expr) => parse_string(expr),
            None => Ok(String::new()),
        }
    }

    /// Explicit id, or a fresh one when the column is omitted or NULL.
    fn id(&self) -> Result<Ulid, SqlError> {
        match self.values.get("id") {
            Some(expr) if !is_null(expr) => parse_ulid(expr),
            _ => Ok(Ulid::new()),
        }
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters = Filters::default();
    if let Some(selection) = &select.selection {
        collect_filters(selection, &mut filters)?;
    }

    match table.as_str() {
        "cars" if select.distinct.is_some() => {
            if !matches!(select.distinct, Some(Distinct::Distinct)) {
                return Err(SqlError::Unsupported("DISTINCT ON".into()));
            }
            filters.reject_any("cars")?;
            Ok(Command::SelectDistinct {
                attribute: distinct_attribute(&select.projection)?,
            })
        }
        "cars" => {
            let filter = filters.take_car_filter();
            filters.reject_any("cars")?;
            Ok(Command::SelectCars { filter })
        }
        "available_cars" => {
            let filter = filters.take_car_filter();
            let start = filters.start.take().ok_or(SqlError::MissingFilter("start"))?;
            let end = filters.end.take().ok_or(SqlError::MissingFilter("end"))?;
            filters.reject_any("available_cars")?;
            Ok(Command::SelectAvailableCars { filter, start, end })
        }
        "reservations" => {
            let car_id = filters.car_id.take().ok_or(SqlError::MissingFilter("car_id"))?;
            filters.reject_any("reservations")?;
            Ok(Command::SelectReservations { car_id })
        }
        "sessions" => {
            let email = filters.email.take().ok_or(SqlError::MissingFilter("email"))?;
            let password = filters
                .password
                .take()
                .ok_or(SqlError::MissingFilter("password"))?;
            filters.reject_any("sessions")?;
            Ok(Command::Authenticate {
                email,
                password: Password(password),
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn distinct_attribute(projection: &[SelectItem]) -> Result<CarAttribute, SqlError> {
    let [SelectItem::UnnamedExpr(expr)] = projection else {
        return Err(SqlError::Unsupported(
            "SELECT DISTINCT takes exactly one column".into(),
        ));
    };
    let column = expr_column_name(expr)
        .ok_or_else(|| SqlError::Parse(format!("expected column, got {expr}")))?;
    CarAttribute::from_column(&column).ok_or(SqlError::UnknownColumn(column))
}

/// WHERE-clause values recognised across all tables. Each SELECT takes the
/// ones it understands and rejects the rest.
#[derive(Default)]
struct Filters {
    brand: Option<String>,
    fuel: Option<String>,
    transmission: Option<String>,
    min_seater: Option<u32>,
    start: Option<Ms>,
    end: Option<Ms>,
    car_id: Option<Ulid>,
    email: Option<String>,
    password: Option<String>,
}

impl Filters {
    fn take_car_filter(&mut self) -> CarFilter {
        CarFilter {
            brand: self.brand.take(),
            fuel: self.fuel.take(),
            transmission: self.transmission.take(),
            min_seater: self.min_seater.take(),
        }
    }

    fn reject_any(&self, table: &'static str) -> Result<(), SqlError> {
        let leftover = [
            ("brand", self.brand.is_some()),
            ("fuel", self.fuel.is_some()),
            ("transmission", self.transmission.is_some()),
            ("seater", self.min_seater.is_some()),
            ("start", self.start.is_some()),
            ("end", self.end.is_some()),
            ("car_id", self.car_id.is_some()),
            ("email", self.email.is_some()),
            ("password", self.password.is_some()),
        ];
        match leftover.iter().find(|(_, set)| *set) {
            Some((column, _)) => Err(SqlError::Unsupported(format!(
                "filter on {column} for {table}"
            ))),
            None => Ok(()),
        }
    }
}

fn collect_filters(expr: &Expr, filters: &mut Filters) -> Result<(), SqlError> {
    match expr {
        Expr::Nested(inner) => collect_filters(inner, filters),
        Expr::BinaryOp { left, op, right } => {
            if *op == ast::BinaryOperator::And {
                collect_filters(left, filters)?;
                return collect_filters(right, filters);
            }
            let column = expr_column_name(left)
                .ok_or_else(|| SqlError::Unsupported(format!("filter {expr}")))?;
            match (column.as_str(), op) {
                ("brand", ast::BinaryOperator::Eq) => filters.brand = Some(parse_string(right)?),
                ("fuel", ast::BinaryOperator::Eq) => filters.fuel = Some(parse_string(right)?),
                ("transmission", ast::BinaryOperator::Eq) => {
                    filters.transmission = Some(parse_string(right)?)
                }
                ("seater", ast::BinaryOperator::GtEq) => filters.min_seater = Some(parse_u32(right)?),
                ("start", ast::BinaryOperator::GtEq) => filters.start = Some(parse_i64(right)?),
                ("end", ast::BinaryOperator::LtEq) => filters.end = Some(parse_i64(right)?),
                ("car_id", ast::BinaryOperator::Eq) => filters.car_id = Some(parse_ulid(right)?),
                ("email", ast::BinaryOperator::Eq) => filters.email = Some(parse_string(right)?),
                ("password", ast::BinaryOperator::Eq) => {
                    filters.password = Some(parse_string(right)?)
                }
                _ => return Err(SqlError::Unsupported(format!("filter {column} {op}"))),
            }
            Ok(())
        }
        _ => Err(SqlError::Unsupported(format!("filter {expr}"))),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_rows(insert: &ast::Insert) -> Result<&[Vec<Expr>], SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            Ok(values.rows.as_slice())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(extract_value(expr), Some(Value::Null))
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s) | Value::Number(s, _)) => {
            Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
        }
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .trim()
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer {s:?}: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64(expr)?;
    u32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of u32 range")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    WrongArity(&'static str, usize, usize),
    MissingColumn(&'static str),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingColumn(col) => write!(f, "missing column: {col}"),
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    const ACCOUNT: &str = "01BX5ZZKBKACTAV9WEVGEMMVRZ";

    #[test]
    fn parse_insert_car_positional() {
        let sql = format!(
            "INSERT INTO cars VALUES ('{CAR}', 'Toyota', 'Corolla', 'corolla.png', 'Petrol', 5, 'Manual', 45, 'Compact')"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertCar { car } => {
                assert_eq!(car.id.to_string(), CAR);
                assert_eq!(car.brand, "Toyota");
                assert_eq!(car.seater, 5);
                assert_eq!(car.price_per_day, 45);
                assert_eq!(car.description, "Compact");
            }
            _ => panic!("expected InsertCar, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_car_named_columns_any_order() {
        let sql = "INSERT INTO cars (model, brand, fuel, transmission, seater, price_per_day) \
                   VALUES ('Model 3', 'Tesla', 'Electric', 'Automatic', '5', '120')";
        let cmd = parse_sql(sql).unwrap();
        match cmd {
            Command::InsertCar { car } => {
                assert_eq!(car.brand, "Tesla");
                assert_eq!(car.model, "Model 3");
                assert_eq!(car.seater, 5);
                assert_eq!(car.price_per_day, 120);
                assert_eq!(car.image, "");
            }
            _ => panic!("expected InsertCar, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_car_missing_required_column() {
        let sql = "INSERT INTO cars (brand, model) VALUES ('Tesla', 'Model 3')";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingColumn("fuel"))));
    }

    #[test]
    fn parse_insert_car_unknown_column() {
        let sql = "INSERT INTO cars (brand, colour) VALUES ('Tesla', 'red')";
        assert!(matches!(parse_sql(sql), Err(SqlError::UnknownColumn(_))));
    }

    #[test]
    fn parse_insert_reservation() {
        let sql = format!(
            r#"INSERT INTO reservations (id, car_id, account_id, start, "end", contact, license, amount) VALUES ('{CAR}', '{CAR}', '{ACCOUNT}', 1717236000000, 1717243200000, '555-0100', 'D123', 9000)"#
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertReservation { request } => {
                assert_eq!(request.car_id.to_string(), CAR);
                assert_eq!(request.account_id.to_string(), ACCOUNT);
                assert_eq!(request.start, 1_717_236_000_000);
                assert_eq!(request.end, 1_717_243_200_000);
                assert_eq!(request.meta.contact, "555-0100");
                assert_eq!(request.meta.amount_cents, 9000);
            }
            _ => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_reservation_generates_id() {
        let sql = format!(
            r#"INSERT INTO reservations (car_id, account_id, start, "end", contact, license, amount) VALUES ('{CAR}', '{ACCOUNT}', 1000, 2000, 'c', 'l', 0)"#
        );
        assert!(matches!(
            parse_sql(&sql).unwrap(),
            Command::InsertReservation { .. }
        ));
    }

    #[test]
    fn parse_insert_account_redacts_password() {
        let sql = "INSERT INTO accounts (name, email, password) VALUES ('Ada', 'ada@example.com', 'hunter2')";
        let cmd = parse_sql(sql).unwrap();
        assert!(!format!("{cmd:?}").contains("hunter2"));
        match cmd {
            Command::InsertAccount { name, email, password, .. } => {
                assert_eq!(name, "Ada");
                assert_eq!(email, "ada@example.com");
                assert_eq!(password.0, "hunter2");
            }
            _ => panic!("expected InsertAccount, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_cars_with_filters() {
        let sql = "SELECT * FROM cars WHERE brand = 'Toyota' AND seater >= 5 AND transmission = 'Manual'";
        match parse_sql(sql).unwrap() {
            Command::SelectCars { filter } => {
                assert_eq!(filter.brand.as_deref(), Some("Toyota"));
                assert_eq!(filter.min_seater, Some(5));
                assert_eq!(filter.transmission.as_deref(), Some("Manual"));
                assert_eq!(filter.fuel, None);
            }
            cmd => panic!("expected SelectCars, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_all_cars() {
        let cmd = parse_sql("SELECT * FROM cars").unwrap();
        assert_eq!(
            cmd,
            Command::SelectCars {
                filter: CarFilter::default()
            }
        );
    }

    #[test]
    fn parse_select_available_cars() {
        let sql = "SELECT * FROM available_cars WHERE start >= 1000 AND \"end\" <= 2000 AND fuel = 'Diesel'";
        match parse_sql(sql).unwrap() {
            Command::SelectAvailableCars { filter, start, end } => {
                assert_eq!(start, 1000);
                assert_eq!(end, 2000);
                assert_eq!(filter.fuel.as_deref(), Some("Diesel"));
            }
            cmd => panic!("expected SelectAvailableCars, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_available_cars_requires_window() {
        let sql = "SELECT * FROM available_cars WHERE start >= 1000";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingFilter("end"))));
    }

    #[test]
    fn parse_select_distinct() {
        assert_eq!(
            parse_sql("SELECT DISTINCT brand FROM cars").unwrap(),
            Command::SelectDistinct {
                attribute: CarAttribute::Brand
            }
        );
        assert_eq!(
            parse_sql("SELECT DISTINCT transmission FROM cars").unwrap(),
            Command::SelectDistinct {
                attribute: CarAttribute::Transmission
            }
        );
        assert!(matches!(
            parse_sql("SELECT DISTINCT seater FROM cars"),
            Err(SqlError::UnknownColumn(_))
        ));
    }

    #[test]
    fn parse_select_reservations() {
        let sql = format!("SELECT * FROM reservations WHERE car_id = '{CAR}'");
        match parse_sql(&sql).unwrap() {
            Command::SelectReservations { car_id } => assert_eq!(car_id.to_string(), CAR),
            cmd => panic!("expected SelectReservations, got {cmd:?}"),
        }
        assert!(matches!(
            parse_sql("SELECT * FROM reservations"),
            Err(SqlError::MissingFilter("car_id"))
        ));
    }

    #[test]
    fn parse_sessions_lookup() {
        let sql = "SELECT * FROM sessions WHERE email = 'ada@example.com' AND password = 'pw'";
        match parse_sql(sql).unwrap() {
            Command::Authenticate { email, password } => {
                assert_eq!(email, "ada@example.com");
                assert_eq!(password, Password("pw".into()));
            }
            cmd => panic!("expected Authenticate, got {cmd:?}"),
        }
    }

    #[test]
    fn filter_for_wrong_table_rejected() {
        let sql = "SELECT * FROM cars WHERE start >= 1000";
        assert!(matches!(parse_sql(sql), Err(SqlError::Unsupported(_))));
        let sql = "SELECT * FROM cars WHERE brand <> 'Kia'";
        assert!(matches!(parse_sql(sql), Err(SqlError::Unsupported(_))));
    }

    #[test]
    fn negative_amount_parses() {
        let sql = format!(
            r#"INSERT INTO reservations (car_id, account_id, start, "end", contact, license, amount) VALUES ('{CAR}', '{ACCOUNT}', 1000, 2000, 'c', 'l', -5)"#
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertReservation { request } => assert_eq!(request.meta.amount_cents, -5),
            cmd => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_unknown_table_errors() {
        let sql = "INSERT INTO foobar (id) VALUES ('01ARZ3NDEKTSV4RRFFQ69G5FAV')";
        assert!(matches!(parse_sql(sql), Err(SqlError::UnknownTable(_))));
        assert!(matches!(
            parse_sql("SELECT * FROM bookings"),
            Err(SqlError::UnknownTable(_))
        ));
    }

    #[test]
    fn parse_unsupported_statement() {
        let sql = format!("DELETE FROM reservations WHERE id = '{CAR}'");
        assert!(matches!(parse_sql(&sql), Err(SqlError::Unsupported(_))));
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }

    #[test]
    fn parse_garbage_errors() {
        assert!(matches!(parse_sql("SELEC * FROM"), Err(SqlError::Parse(_))));
    }
}
