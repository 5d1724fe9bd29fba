//! Runs one reader session against the simulated tag.
//!
//! ```text
//! cargo run -p core-service --example tag_reader_demo
//! RUST_LOG=debug cargo run -p core-service --example tag_reader_demo
//! ```

use std::time::Duration;

use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_schema::{HumidityConfig, MeasurementConfig, TemperatureConfig};
use core_service::{BridgeEvent, HostError, SimulatorConfig, TagReaderService};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Pretty)
            .with_filter(filter),
    )?;

    let (service, simulator) = TagReaderService::with_simulator(
        SimulatorConfig::default()
            .with_connect_delay(Duration::from_millis(200))
            .with_disconnect_delay(Duration::from_millis(600)),
    )?;

    let mut events = service.events();
    let connected = service.add_tag_connected_listener();
    let disconnected = service.add_tag_disconnected_listener();

    // Rejections carry a host error code.
    if let Err(e) = service.get_data().await {
        let host = HostError::from(&e);
        info!(code = %host.code, message = %host.message, "getData before init rejected");
    }

    service.init_tag_reader().await?;

    let accepted = service
        .set_config(
            MeasurementConfig::new(60, 0, 3600),
            TemperatureConfig::new(-10.0, 50.0),
            Some(HumidityConfig::new(20.0, 80.0)),
            None,
        )
        .await?;
    info!(accepted, "Configuration written");

    let config = service.get_config().await?;
    info!(config = %serde_json::to_string(&config)?, "Configuration read back");

    simulator.record_temperature(26.1);
    simulator.record_humidity(41.0);
    let data = service.get_data().await?;
    info!(data = %serde_json::to_string(&data)?, "Sensor data pulled");

    let mut presence = 0;
    while presence < 2 {
        match tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
            Ok(Ok(event @ BridgeEvent::TagConnected { .. }))
            | Ok(Ok(event @ BridgeEvent::TagDisconnected { .. })) => {
                presence += 1;
                info!(event = %serde_json::to_string(&event)?, "Host event");
            }
            Ok(Ok(event)) => info!(event = event.name(), "Host event"),
            Ok(Err(e)) => anyhow::bail!("event stream failed: {e}"),
            Err(_) => break,
        }
    }

    service.remove_tag_connected_listener(connected);
    service.remove_tag_disconnected_listener(disconnected);
    service.deinit_tag_reader().await?;

    Ok(())
}
