//! Basic usage example for the TYL Graphite handler
//!
//! Drives `GraphiteHandler` with the in-memory `MockTransport`, so it runs
//! without a Carbon listener, and prints the plaintext lines that would have
//! been sent.

use tyl_graphite_handler::{
    Event, GraphiteHandler, HandlerConfig, MockStore, MockTransport, MockTransportConfig,
};

const DISK_EVENT: &str = r#"{
    "timestamp": 2000,
    "entity": {"metadata": {"name": "web-01", "labels": {"region": "eu-west"}}},
    "check": {"metadata": {"name": "disk", "labels": {"tier": "gold"}}},
    "metrics": {
        "handlers": ["graphite"],
        "points": [
            {"name": "/", "value": 87.5, "timestamp": 1000},
            {"name": "/var/log", "value": 41.25, "timestamp": 1000}
        ]
    }
}"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("TYL Graphite Handler - Basic Usage Example");
    println!("==========================================");

    let event = Event::from_json(DISK_EVENT)?;

    // Prefix from entity/check labels, plus the synthetic count record
    let config = HandlerConfig::default()
        .with_labels("region,tier")
        .with_count(true)
        .with_count_scheme("labels:region");
    let handler = GraphiteHandler::new(config);

    let store = MockStore::new();
    let report = handler
        .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
        .await?;
    println!("\n{report}");
    print!("{}", store.lines());

    // Bare point names
    let bare = GraphiteHandler::new(HandlerConfig::default().with_no_prefix(true));
    println!("\nWithout prefixes:");
    for record in bare.records(&event)? {
        println!("{record}");
    }

    Ok(())
}
