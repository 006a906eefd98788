//! Configuration and endpoint validation commands.

use std::path::Path;
use std::time::Instant;

use serde_json::json;
use tabled::{Table, Tabled};

use super::output;
use crate::application::DispatchCore;
use crate::error::Result;
use crate::infrastructure::config::Config;

#[derive(Tabled)]
struct EndpointRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Weight")]
    weight: u32,
    #[tabled(rename = "Writes")]
    primary: &'static str,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Latency")]
    latency: String,
}

/// Validate configuration file without starting anything.
pub fn execute_config(path: &Path) -> Result<()> {
    println!("Checking configuration: {}", path.display());

    let config = Config::load(path)?;
    output::ok("Configuration file is valid");

    output::section("Summary");
    output::key_value("Endpoints", config.endpoints.len());
    if let Some(primary) = config
        .write_primary_index()
        .and_then(|i| config.endpoints.get(i))
    {
        output::key_value("Write primary", &primary.name);
    }
    output::key_value(
        "Rate limits",
        format!(
            "{}/s, {}/min, {} concurrent",
            config.admission.max_requests_per_second,
            config.admission.max_requests_per_minute,
            config.admission.max_concurrent_requests
        ),
    );
    output::key_value("Exhaustion", format!("{:?}", config.pool.exhaustion_policy));
    output::key_value("Commitment", &config.pool.commitment);
    output::key_value("Simulation", config.simulation);
    println!();

    if config.engine.path.exists() {
        output::ok(&format!("Engine binary found: {}", config.engine.path.display()));
    } else {
        output::warn(&format!(
            "Engine binary not found at {}, transactions will use the direct path",
            config.engine.path.display()
        ));
    }
    if config.pool.api_key.is_some() {
        output::ok("Provider API key configured");
    }
    Ok(())
}

/// Send one `getLatestBlockhash` to every endpoint and print the results.
pub async fn execute_endpoints(path: &Path) -> Result<()> {
    let config = super::load_config(path)?;
    let core = DispatchCore::from_config(config)?;
    core.queue().start();

    let dispatcher = core.dispatcher();
    let params = vec![json!({ "commitment": dispatcher.commitment() })];
    let primary = core.pool().write_primary();

    let mut rows = Vec::new();
    let mut failures = 0;
    for endpoint in core.pool().endpoints() {
        let started = Instant::now();
        let result = dispatcher
            .probe(endpoint.clone(), "getLatestBlockhash", params.clone())
            .await;
        let latency = format!("{}ms", started.elapsed().as_millis());
        let result = match result {
            Ok(_) => "ok".to_string(),
            Err(e) => {
                failures += 1;
                format!("{} ({})", e.code(), e)
            }
        };
        rows.push(EndpointRow {
            name: endpoint.name().to_string(),
            url: endpoint.url().to_string(),
            weight: endpoint.weight(),
            primary: output::yes_no(endpoint.id() == primary),
            result,
            latency,
        });
    }
    core.queue().shutdown().await;

    output::section("Endpoints");
    println!("{}", Table::new(rows));
    println!();
    if failures == 0 {
        output::ok("All endpoints answered");
    } else {
        output::warn(&format!("{failures} endpoint(s) failed"));
    }
    Ok(())
}
