use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio_postgres::{Config, NoTls};
use ulid::Ulid;

const HOUR: i64 = 3_600_000; // 1 hour in ms

async fn connect(host: &str, port: u16) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname("carlot")
        .user("carlot")
        .password("carlot");

    let (client, conn) = config.connect(NoTls).await.expect("connect failed");
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            eprintln!("connection error: {e}");
        }
    });
    client
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

/// Whole hour near "now", so repeated runs against one server don't collide.
fn base_time() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_millis() as i64;
    now - now % HOUR
}

async fn add_car(client: &tokio_postgres::Client, brand: &str) -> Ulid {
    let id = Ulid::new();
    client
        .batch_execute(&format!(
            "INSERT INTO cars (id, brand, model, image, fuel, seater, transmission, price_per_day, description) \
             VALUES ('{id}', '{brand}', 'Bench', '', 'Petrol', 5, 'Manual', 50, '')"
        ))
        .await
        .unwrap();
    id
}

async fn reserve(
    client: &tokio_postgres::Client,
    car: Ulid,
    account: Ulid,
    start: i64,
    end: i64,
) -> Result<(), tokio_postgres::Error> {
    let id = Ulid::new();
    client
        .batch_execute(&format!(
            r#"INSERT INTO reservations (id, car_id, account_id, start, "end", contact, license, amount) VALUES ('{id}', '{car}', '{account}', {start}, {end}, '555-0100', 'BENCH', 5000)"#
        ))
        .await
}

async fn setup(client: &tokio_postgres::Client) -> (Vec<Ulid>, Ulid) {
    let brands = ["Toyota", "Honda", "Mazda", "Kia", "Ford"];
    let mut cars = Vec::new();
    for i in 0..20 {
        cars.push(add_car(client, brands[i % brands.len()]).await);
    }

    let account = Ulid::new();
    client
        .batch_execute(&format!(
            "INSERT INTO accounts (id, name, email, password) VALUES ('{account}', 'Bench', 'bench-{account}@example.com', 'bench')"
        ))
        .await
        .unwrap();

    println!("  created {} cars and one account", cars.len());
    (cars, account)
}

async fn phase1_sequential(host: &str, port: u16, car: Ulid, account: Ulid, base: i64) {
    let client = connect(host, port).await;

    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let s = base + (i as i64) * HOUR;
        let t = Instant::now();
        reserve(&client, car, account, s, s + HOUR).await.unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} reservations in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("write latency", &mut latencies);
}

async fn phase2_concurrent(host: &str, port: u16, cars: &[Ulid], account: Ulid, base: i64) {
    let n_tasks = 10;
    let n_per_task = 200;

    let start = Instant::now();
    let mut handles = Vec::new();

    for i in 0..n_tasks {
        let host = host.to_string();
        // One car per task, so admissions never wait on each other's lock
        let car = cars[1 + i % (cars.len() - 1)];

        handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            for j in 0..n_per_task {
                let s = base + (j as i64) * HOUR;
                reserve(&client, car, account, s, s + HOUR).await.unwrap();
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} reservations = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

async fn phase3_contention(host: &str, port: u16, car: Ulid, account: Ulid, base: i64) {
    let n_tasks = 16;
    let slots = 100;

    let admitted = Arc::new(AtomicUsize::new(0));
    let conflicted = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();
    let mut handles = Vec::new();

    for _ in 0..n_tasks {
        let host = host.to_string();
        let admitted = admitted.clone();
        let conflicted = conflicted.clone();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            for slot in 0..slots {
                let s = base + (slot as i64) * HOUR;
                match reserve(&client, car, account, s, s + HOUR).await {
                    Ok(()) => admitted.fetch_add(1, Ordering::Relaxed),
                    Err(_) => conflicted.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let ok = admitted.load(Ordering::Relaxed);
    let rejected = conflicted.load(Ordering::Relaxed);
    println!(
        "  {n_tasks} tasks racing for {slots} slots: {ok} admitted, {rejected} conflicts in {:.2}s",
        elapsed.as_secs_f64()
    );
    assert_eq!(ok, slots, "every slot must be admitted exactly once");
}

async fn phase4_read_under_load(host: &str, port: u16, cars: &[Ulid], account: Ulid, base: i64) {
    let stop = Arc::new(AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for (w, &car) in cars.iter().enumerate().take(5) {
        let host = host.to_string();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            let mut i = 0i64;
            while !stop.load(Ordering::Relaxed) {
                let s = base + (w as i64 * 10_000 + i) * HOUR;
                let _ = reserve(&client, car, account, s, s + HOUR).await;
                i += 1;
            }
        }));
    }

    let n_readers = 10;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();

    for r in 0..n_readers {
        let host = host.to_string();
        reader_handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            let s = base + (r as i64) * HOUR;
            let e = s + 24 * HOUR;
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for _ in 0..reads_per_reader {
                let t = Instant::now();
                client
                    .simple_query(&format!(
                        r#"SELECT * FROM available_cars WHERE brand = 'Toyota' AND start >= {s} AND "end" <= {e}"#
                    ))
                    .await
                    .unwrap();
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.unwrap());
    }

    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("availability query", &mut all_latencies);
}

async fn phase5_connection_storm(host: &str, port: u16, cars: &[Ulid], account: Ulid, base: i64) {
    let n_conns = 50;
    let ops_per_conn = 10;

    let start = Instant::now();
    let mut handles = Vec::new();
    let success = Arc::new(AtomicUsize::new(0));

    for c in 0..n_conns {
        let host = host.to_string();
        let success = success.clone();
        let car = cars[c % cars.len()];
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            for i in 0..ops_per_conn {
                let s = base + ((c * ops_per_conn + i) as i64) * HOUR;
                let _ = reserve(&client, car, account, s, s + HOUR).await;
            }
            client.simple_query("SELECT DISTINCT brand FROM cars").await.unwrap();
            success.fetch_add(1, Ordering::Relaxed);
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let elapsed = start.elapsed();
    let ok = success.load(Ordering::Relaxed);
    println!(
        "  {n_conns} connections, {ops_per_conn} ops each: {ok}/{n_conns} succeeded in {:.2}s",
        elapsed.as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let host = std::env::var("CARLOT_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("CARLOT_PORT")
        .unwrap_or_else(|_| "5433".into())
        .parse()
        .expect("invalid CARLOT_PORT");

    println!("=== carlot stress benchmark ===");
    println!("target: {host}:{port}\n");

    println!("[setup]");
    let setup_client = connect(&host, port).await;
    let (cars, account) = setup(&setup_client).await;
    drop(setup_client);

    // Phases work in disjoint time windows so they never conflict with each other
    let base = base_time();
    let window = 100_000 * HOUR;

    println!("\n[phase 1] sequential reservation throughput");
    phase1_sequential(&host, port, cars[0], account, base).await;

    println!("\n[phase 2] concurrent reservations across cars");
    phase2_concurrent(&host, port, &cars, account, base + window).await;

    println!("\n[phase 3] contention on one car");
    phase3_contention(&host, port, cars[0], account, base + 2 * window).await;

    println!("\n[phase 4] availability latency under write load");
    phase4_read_under_load(&host, port, &cars, account, base + 3 * window).await;

    println!("\n[phase 5] connection storm");
    phase5_connection_storm(&host, port, &cars, account, base + 4 * window).await;

    println!("\n=== benchmark complete ===");
}
