//! Assemble and start a two-unit pipeline, watching its lifecycle and bus.
//!
//! ```text
//! cargo run -p patchbay-runtime --example pipeline
//! ```

use patchbay_fault::FaultRegistry;
use patchbay_runtime::{testing, Container, ServiceDescription, UnitDescriptor};
use serde_json::json;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let registry = Arc::new(FaultRegistry::new());
    patchbay_runtime::register_kinds(&registry)?;

    let service = ServiceDescription::new()
        .unit(UnitDescriptor::new("source", "test.Source").option("value", 42))
        .unit(UnitDescriptor::new("sink", "test.Sink"))
        .connection("source.value -> sink.value");

    let resolver = Arc::new(testing::fixture_resolver(Arc::clone(&registry)));
    let mut container = Container::new("pipeline", service, resolver, registry)?;

    container.observe(|event: &patchbay_runtime::LifecycleEvent| {
        println!("lifecycle: {event}");
    });
    let mut messages = container.subscribe_messages();

    container.run().await?;

    container
        .unit_action("source", "emit", json!({ "value": 7 }))
        .await?;

    while let Ok(message) = messages.try_recv() {
        println!(
            "bus: {} {:?} {} {}",
            message.unit, message.channel, message.data, message.trace
        );
    }

    println!(
        "structure: {}",
        serde_json::to_string_pretty(container.structure())?
    );
    Ok(())
}
