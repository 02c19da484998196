//! Schedule engine firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │   RtcClock       NvsAdapter     OfflineSource   LogEventSink │
//! │  (TimeSource)   (StoragePort)  (ScheduleSource)  (EventSink) │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            ScheduleService (pure logic)                │  │
//! │  │  evaluator · arbiter · data channels · sync control    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};

use schedule_engine::adapters::log_sink::LogEventSink;
use schedule_engine::adapters::nvs::NvsAdapter;
use schedule_engine::adapters::source::OfflineSource;
use schedule_engine::adapters::time::RtcClock;
use schedule_engine::app::ports::StoragePort;
use schedule_engine::app::service::ScheduleService;
use schedule_engine::config::EngineConfig;

/// NVS location of the JSON engine configuration.
const CONFIG_NAMESPACE: &str = "engine";
const CONFIG_KEY: &str = "config";
const CONFIG_MAX_LEN: usize = 2048;

/// Evaluation period.  Shorter than a minute so transitions land within
/// a few seconds of the boundary.
const TICK_PERIOD: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Schedule engine v{}              ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage and configuration ──────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = load_config(&nvs);
    info!(
        "Engine '{}' following '{}' ({:?}, {} entries max, {} channels)",
        config.name,
        config.source_id,
        config.kind,
        config.max_entries,
        config.channels.len()
    );

    // ── 3. Engine ─────────────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut engine = ScheduleService::new(config, nvs, RtcClock::new(), OfflineSource)
        .map_err(|e| anyhow!("engine init failed: {e}"))?;
    engine.start(&mut sink);

    info!("System ready. Entering tick loop.");

    // ── 4. Tick loop ──────────────────────────────────────────
    loop {
        engine.tick(&mut sink);
        std::thread::sleep(TICK_PERIOD);
    }
}

/// Read the engine configuration from NVS, falling back to defaults.
fn load_config(nvs: &NvsAdapter) -> EngineConfig {
    let mut buf = vec![0u8; CONFIG_MAX_LEN];
    match nvs.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
        Ok(len) => match serde_json::from_slice::<EngineConfig>(&buf[..len]) {
            Ok(cfg) => {
                info!("Config loaded from NVS");
                cfg
            }
            Err(e) => {
                warn!("NVS config unreadable ({}), using defaults", e);
                EngineConfig::default()
            }
        },
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            EngineConfig::default()
        }
    }
}
