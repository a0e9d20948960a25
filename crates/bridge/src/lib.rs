//! BLE Uplink Bridge
//!
//! Samples characteristic values from BLE peripherals on per-value
//! cadences and relays them to a network sink, riding out outages on both
//! sides with a bounded record queue.

pub mod clock;
pub mod config;
pub mod control;
mod error;
pub mod read_engine;
pub mod store;
pub mod watchdog;

pub use clock::{Clock, ManualClock, SystemClock};
pub use self::config::BridgeConfig;
pub use control::{ControlLoop, IterationReport};
pub use error::BridgeError;
pub use read_engine::{ReadEngine, ReadOutcome};
pub use store::KeyValueStore;
pub use watchdog::{ThreadWatchdog, Watchdog};

use std::str::FromStr;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uplink::MqttUplink;
use value_scheduler::ScheduleTable;

/// Initialize logging
pub fn init_logging(level: &str, json: bool) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.expect("Failed to set tracing subscriber");
}

/// Build the schedule table from the key/value store named in `config`
pub fn load_schedule(config: &BridgeConfig) -> Result<ScheduleTable, BridgeError> {
    let store = KeyValueStore::load(&config.values_file)?;
    let lines = store.read_lines(&config.values_prefix);
    Ok(ScheduleTable::from_lines(config.max_entries, lines))
}

/// Run the bridge until Ctrl-C
pub async fn run(config: BridgeConfig) -> Result<(), BridgeError> {
    let table = load_schedule(&config)?;
    if table.is_empty() {
        return Err(BridgeError::InvalidConfig(format!(
            "no {}<n> lines in {}",
            config.values_prefix,
            config.values_file.display()
        )));
    }

    let transport = config.simulation.transport();
    let mut uplink = MqttUplink::new(config.uplink.clone());
    uplink.connect()?;

    let watchdog = ThreadWatchdog::new();
    let _monitor = watchdog.spawn_monitor(Duration::from_secs(config.watchdog_timeout_secs));

    let mut bridge = ControlLoop::new(
        &config,
        table,
        transport,
        uplink,
        SystemClock::new(),
        watchdog,
    );
    bridge
        .run(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await;
    Ok(())
}
