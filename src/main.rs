//! Demo: running the library as a standalone metrics server.

use std::sync::Arc;

use promethea::prelude::*;

#[cfg_attr(feature = "standalone", tokio::main)]
#[cfg(feature = "standalone")]
async fn main() {
    promethea::config::init_logging();

    registry::init(Features::PROCESS | Features::SCRAPETIME_ALL, "").expect("registry already initialized");
    let reg = registry::default_registry();

    let requests = Arc::new(
        Counter::new(
            "demo_http_requests_total",
            "Total HTTP requests received",
            vec!["method".to_string()],
        )
        .unwrap(),
    );
    let connections = Arc::new(Gauge::new("demo_active_connections", "Number of active connections", vec![]).unwrap());

    reg.must_register_metric(requests.clone());
    reg.must_register_metric(connections.clone());

    requests.inc(&["GET"]).unwrap();
    requests.add(&["GET"], 5.0).unwrap();
    connections.set(&[], 42.0).unwrap();

    tracing::info!("starting metrics server on http://127.0.0.1:9090/metrics");

    let server = StandaloneServer::builder().port(9090).host("127.0.0.1").build(reg);

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server error");
    }
}

#[cfg(not(feature = "standalone"))]
fn main() {
    eprintln!("the `standalone` feature is not enabled; run with --features standalone");
}
