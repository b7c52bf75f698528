//! tagscope demo
//!
//! Loads a config (first argument, default `tagscope.yaml`), emits a handful
//! of metrics through derived scopes, and prints the Prometheus rendering.
//! Set `RUST_LOG=debug` to watch metric registration.

use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use tagscope_core::{Result, ValueBuckets};
use tagscope_memory::{config, MetricsRuntime};

fn run(path: &str) -> Result<String> {
    let cfg = config::load_from_file(path)?;
    let runtime = MetricsRuntime::new(&cfg)?;
    let root = runtime.scope();

    let http = root.sub_scope("http");
    if http.capabilities().tagging() {
        for route in ["/v1/items", "/v1/users"] {
            let scoped = http.tagged([("route", route)]);
            scoped.counter("requests").inc(3);
            scoped.timer("latency").record(Duration::from_millis(12));
        }
    } else {
        http.counter("requests").inc(6);
    }

    let sw = http.histogram("handler", None).start();
    std::thread::sleep(Duration::from_millis(2));
    sw.stop();

    let sizes = ValueBuckets::exponential(64.0, 4.0, 6)?;
    let payload = http.histogram("payload_bytes", Some(sizes.into()));
    for size in [10.0, 300.0, 5_000.0, 1e6] {
        payload.record_value(size);
    }

    let pool = root.sub_scope("pool");
    pool.integer_gauge("connections").update(8);
    pool.integer_gauge("connections").dec(1);
    pool.gauge("utilization").update(0.875);

    Ok(runtime.render())
}

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "tagscope.yaml".to_string());
    tracing::info!(%path, "tagscope-demo starting");

    match run(&path) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(code = e.kind().as_str(), error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}
