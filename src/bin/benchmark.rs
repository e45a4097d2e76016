use chrono::{Duration as ChronoDuration, Utc};
use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const STAGE_SECS: u64 = 10;
const TICKETS_PER_CATEGORY: u32 = 500;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sold,
    Rejected,
    Failed,
}

struct Stage {
    rps: u32,
    sold: u64,
    rejected: u64,
    failed: u64,
    mean_ms: f64,
    p99_ms: f64,
}

#[tokio::main]
async fn main() {
    let base_url = std::env::var("BENCH_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    println!("{}", "🚀 Starting Purchase Rush Benchmark".bold().green());
    println!("Target URL: {}", base_url);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");

    if client.get(format!("{}/health", base_url)).send().await.is_err() {
        eprintln!("{}", format!("❌ Server is NOT reachable at {}. Please start it first.", base_url).red().bold());
        return;
    }

    println!("\n{}", "⚙️  Setting up benchmark event...".yellow());
    let event_id = match setup_event(&client, &base_url).await {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{}", format!("❌ Setup failed: {}", e).red().bold());
            return;
        }
    };
    println!("{}", "✅ Event created.".green());
    println!("   Event ID: {}", event_id);

    println!("\n{:<10} | {:<8} | {:<9} | {:<7} | {:<10} | {:<10} | {}", "RPS", "Sold", "Rejected", "Failed", "Mean (ms)", "P99 (ms)", "Inventory");
    println!("{:-<10}-+-{:-<8}-+-{:-<9}-+-{:-<7}-+-{:-<10}-+-{:-<10}-+-{:-<10}", "", "", "", "", "", "", "");

    let mut oversold = false;
    for rps in [10, 50, 200, 1000] {
        let category_id = match create_category(&client, &base_url, &event_id, rps).await {
            Ok(id) => id,
            Err(e) => {
                eprintln!("{}", format!("❌ Could not create category: {}", e).red());
                return;
            }
        };

        let stage = run_stage(&client, &base_url, &event_id, &category_id, rps).await;
        let sold_quantity = fetch_sold_quantity(&client, &base_url, &event_id, &category_id).await;

        let inventory = match sold_quantity {
            Some(sold) if sold == stage.sold && sold <= u64::from(TICKETS_PER_CATEGORY) => "consistent".green(),
            Some(sold) => {
                oversold = true;
                format!("MISMATCH ({} recorded)", sold).red().bold()
            }
            None => "unknown".yellow(),
        };

        println!(
            "{:<10} | {:<8} | {:<9} | {:<7} | {:<10.2} | {:<10.2} | {}",
            stage.rps, stage.sold, stage.rejected, stage.failed, stage.mean_ms, stage.p99_ms, inventory
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    if oversold {
        eprintln!("\n{}", "❌ Inventory did not match accepted sales.".red().bold());
        std::process::exit(1);
    }
    println!("\n{}", "✅ No oversell detected.".green().bold());
}

async fn setup_event(client: &Client, base_url: &str) -> Result<String, String> {
    let payload = json!({
        "title": "Benchmark Arena Night",
        "description": "Load testing",
        "category": "Benchmark",
        "start_time": (Utc::now() + ChronoDuration::days(30)).to_rfc3339(),
        "end_time": (Utc::now() + ChronoDuration::days(30) + ChronoDuration::hours(4)).to_rfc3339(),
        "location": "Server Room",
        "virtual_mode": "NONE",
        "max_attendees": TICKETS_PER_CATEGORY * 4,
    });

    let res = client.post(format!("{}/api/v1/events", base_url))
        .json(&payload)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().await.unwrap_or_default();
        return Err(format!("status {}: {}", status, txt));
    }

    let body: Value = res.json().await.map_err(|e| e.to_string())?;
    body["id"].as_str().map(String::from).ok_or_else(|| "response has no id".to_string())
}

async fn create_category(client: &Client, base_url: &str, event_id: &str, rps: u32) -> Result<String, String> {
    let res = client.post(format!("{}/api/v1/events/{}/categories", base_url, event_id))
        .json(&json!({
            "name": format!("Rush {} rps", rps),
            "ticket_type": "NORMAL",
            "price": 49,
            "quantity": TICKETS_PER_CATEGORY,
        }))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
        return Err(format!("status {}", res.status()));
    }

    let body: Value = res.json().await.map_err(|e| e.to_string())?;
    body["id"].as_str().map(String::from).ok_or_else(|| "response has no id".to_string())
}

async fn fetch_sold_quantity(client: &Client, base_url: &str, event_id: &str, category_id: &str) -> Option<u64> {
    let res = client.get(format!("{}/api/v1/events/{}/categories", base_url, event_id))
        .send()
        .await
        .ok()?;
    let body: Value = res.json().await.ok()?;
    body.as_array()?
        .iter()
        .find(|c| c["id"].as_str() == Some(category_id))
        .and_then(|c| c["sold_quantity"].as_u64())
}

async fn run_stage(client: &Client, base_url: &str, event_id: &str, category_id: &str, rps: u32) -> Stage {
    let limiter = Arc::new(RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN))
    ));

    let url = format!("{}/api/v1/events/{}/purchases", base_url, event_id);
    let (tx, mut rx) = mpsc::channel(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(STAGE_SECS);
    let mut seq: u64 = 0;

    while start_time.elapsed() <= duration {
        if limiter.check().is_ok() {
            seq += 1;
            let client = client.clone();
            let url = url.clone();
            let tx = tx.clone();
            let body = json!({
                "ticket_category_id": category_id,
                "buyer_name": format!("Load Buyer {}", seq),
                "buyer_email": format!("buyer{}@bench.local", seq),
                "quantity": 1 + (seq % 3),
                "payment_status": "PAID",
            });

            tokio::spawn(async move {
                let req_start = Instant::now();
                let res = client.post(&url).json(&body).send().await;
                let latency = req_start.elapsed();

                let outcome = match res {
                    Ok(r) if r.status() == StatusCode::CREATED => Outcome::Sold,
                    Ok(r) if r.status() == StatusCode::CONFLICT => Outcome::Rejected,
                    _ => Outcome::Failed,
                };
                let quantity = body["quantity"].as_u64().unwrap_or(0);

                let _ = tx.send((latency, outcome, quantity)).await;
            });
        } else {
            tokio::task::yield_now().await;
        }
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).expect("valid histogram precision");
    let mut stage = Stage { rps, sold: 0, rejected: 0, failed: 0, mean_ms: 0.0, p99_ms: 0.0 };

    while let Some((latency, outcome, quantity)) = rx.recv().await {
        match outcome {
            Outcome::Sold => stage.sold += quantity,
            Outcome::Rejected => stage.rejected += 1,
            Outcome::Failed => stage.failed += 1,
        }
        let _ = histogram.record(latency.as_micros() as u64);
    }

    stage.mean_ms = histogram.mean() / 1000.0;
    stage.p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;
    stage
}
