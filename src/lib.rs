//! Telemetry acquisition and state core for marine instrument displays.
//!
//! Bridgewatch ingests a live instrument feed (ASCII sentences in NMEA 0183
//! style and binary PGN frames as relayed by an NMEA 2000 gateway), decodes it
//! into validated readings in canonical SI units, keeps bounded per-metric
//! history, formats values in the user's chosen units and evaluates alarm
//! thresholds with hysteresis.
//!
//! # Features
//!
//! - **Two wire protocols**: sentences and frames, interleaved on one link
//! - **Self-healing transport**: fixed backoff ladder with bounded retries
//! - **Concurrent store**: per-key locking, watch channels per metric
//! - **Alarms**: warning and critical levels with a hysteresis dead band
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bridgewatch::{Bridgewatch, CoreConfig, Endpoint, MetricKey, SensorType, UpdateRate};
//! use bridgewatch::transport::WireProtocol;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let core = Bridgewatch::new(CoreConfig::default())?;
//!     core.start().await?;
//!     core.connect(Endpoint::tcp("192.168.4.1", 10110, WireProtocol::Auto)).await?;
//!
//!     let depth = MetricKey::new(SensorType::Depth, 0, "depth");
//!     let mut updates = core.store().updates(&depth, UpdateRate::Max(2));
//!     while let Some(update) = updates.next().await {
//!         let display = &update.display;
//!         println!("{} {}", display.mnemonic, display.enriched.formatted_value_with_unit);
//!     }
//!     Ok(())
//! }
//! ```

pub mod alarm;
pub mod config;
pub mod enrich;
mod error;
pub mod frame;
pub mod logging;
pub mod router;
pub mod schema;
pub mod sentence;
pub mod store;
pub mod stream;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod transport;
pub mod types;

pub use alarm::{AlarmEvent, AlarmLevel, AlarmState, Direction, ThresholdConfig};
pub use config::{CoreConfig, ThresholdEntry};
pub use enrich::{EnrichedValue, Enricher, Unit, UnitCategory, UnitPreferences};
pub use error::*;
pub use router::{RouteOutcome, Router, RouterStats};
pub use store::{DisplayValue, History, MetricRecord, MetricStore, MetricUpdate, StatKind};
pub use transport::{ConnectionState, ConnectionStatus, Endpoint, TransportManager};
pub use types::*;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use transport::{Connector, NetConnector, TransportStatsSnapshot};

/// The assembled core: transport, router and store wired together.
///
/// # Examples
///
/// ```rust
/// use bridgewatch::{Bridgewatch, CoreConfig, MetricKey, SensorType, Timestamp};
///
/// let core = Bridgewatch::new(CoreConfig::default()).unwrap();
/// core.ingest_sentence("$IIDBT,036.41,f,011.10,M,005.99,F*25", Timestamp::from_millis(1_000));
///
/// let depth = MetricKey::new(SensorType::Depth, 0, "depth");
/// assert_eq!(core.store().read(&depth).unwrap().current_si_value, 11.10);
/// ```
pub struct Bridgewatch {
    config: CoreConfig,
    store: Arc<MetricStore>,
    router: Arc<Router>,
    transport: TransportManager,
    pruner: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Bridgewatch {
    /// Build the core with real sockets.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let connector = Arc::new(NetConnector::new(config.max_buffer));
        Self::with_connector(config, connector)
    }

    /// Build the core over a custom [`Connector`].
    pub fn with_connector(config: CoreConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(MetricStore::new(
            config.history,
            Enricher::default(),
            config.units.clone(),
        ));
        store.apply_thresholds(config.threshold_pairs()?)?;

        let decoder = sentence::SentenceDecoder::new().with_require_checksum(config.require_checksum);
        let router = Arc::new(Router::new(decoder, Arc::clone(&store)));
        let transport =
            TransportManager::new(connector, router.clone(), config.reconnect.clone());

        Ok(Self { config, store, router, transport, pruner: Mutex::new(None) })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MetricStore> {
        &self.store
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn transport(&self) -> &TransportManager {
        &self.transport
    }

    /// Start the history pruner and, if configured, connect to the endpoint.
    /// Must be called from within a Tokio runtime.
    pub async fn start(&self) -> Result<()> {
        {
            let mut pruner = self.pruner.lock();
            if pruner.is_none() {
                let cancel = CancellationToken::new();
                let task = self.store.spawn_pruner(cancel.clone());
                *pruner = Some((cancel, task));
            }
        }
        if let Some(endpoint) = self.config.endpoint.clone() {
            self.connect(endpoint).await?;
        }
        info!("Bridgewatch started");
        Ok(())
    }

    /// Disconnect and stop the pruner.
    pub async fn shutdown(&self) {
        self.transport.disconnect().await;
        let pruner = self.pruner.lock().take();
        if let Some((cancel, task)) = pruner {
            cancel.cancel();
            let _ = task.await;
        }
        info!("Bridgewatch stopped");
    }

    pub async fn connect(&self, endpoint: Endpoint) -> Result<()> {
        self.transport.connect(endpoint).await
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await
    }

    /// Retry immediately after reconnects were exhausted.
    pub fn reset(&self) {
        self.transport.reset()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.transport.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.transport.subscribe_status()
    }

    pub fn transport_stats(&self) -> TransportStatsSnapshot {
        self.transport.stats()
    }

    pub fn router_stats(&self) -> RouterStats {
        self.router.stats()
    }

    pub fn set_threshold(&self, key: MetricKey, config: ThresholdConfig) -> Result<()> {
        self.store.set_threshold(key, config)
    }

    pub fn acknowledge(&self, key: &MetricKey) -> bool {
        self.store.acknowledge(key)
    }

    /// Route one unit as if it had arrived on the link.
    pub fn ingest(&self, frame: &RawFrame) -> RouteOutcome {
        self.router.route(frame)
    }

    /// Route one sentence line received at `at`.
    pub fn ingest_sentence(&self, line: &str, at: Timestamp) -> RouteOutcome {
        self.router.route(&RawFrame::sentence(line, at))
    }
}

impl Drop for Bridgewatch {
    fn drop(&mut self) {
        if let Some((cancel, _)) = self.pruner.get_mut().take() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedConnector, ScriptedLink, sentence};
    use crate::transport::WireProtocol;

    #[tokio::test(start_paused = true)]
    async fn scripted_feed_reaches_store_and_alarms() {
        let depth = MetricKey::new(SensorType::Depth, 0, "depth");
        let mut config = CoreConfig::default();
        config.thresholds.push(ThresholdEntry::new(
            &depth,
            ThresholdConfig::new(Direction::Below).with_warning(5.0, 0.3),
        ));

        let link = ScriptedLink::new(vec![
            sentence("SDDPT,6.0,0.5").into_bytes(),
            sentence("SDDPT,4.8,0.5").into_bytes(),
        ]);
        let connector = Arc::new(ScriptedConnector::new(vec![Ok(link)]));
        let core = Bridgewatch::with_connector(config, connector).unwrap();
        let mut alarms = core.store().alarm_events();

        core.start().await.unwrap();
        core.connect(Endpoint::tcp("gateway", 10110, WireProtocol::Sentence)).await.unwrap();

        let event = alarms.recv().await.unwrap();
        assert_eq!(event.key, depth);
        assert_eq!(event.state.level, AlarmLevel::Warning);
        assert_eq!(core.store().read(&depth).unwrap().current_si_value, 4.8);
        assert_eq!(core.router_stats().records, 2);

        assert!(core.acknowledge(&depth));
        assert!(core.store().alarm(&depth).unwrap().acknowledged);
        core.shutdown().await;
        assert_eq!(core.status(), ConnectionStatus::default());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = CoreConfig::default();
        config.history.capacity = 0;
        assert!(Bridgewatch::new(config).is_err());
    }

    #[test]
    fn checksum_requirement_follows_config() {
        let config = CoreConfig { require_checksum: false, ..CoreConfig::default() };
        let core = Bridgewatch::new(config).unwrap();
        let outcome = core.ingest_sentence("$IIHDT,271.5,T", Timestamp::from_millis(1));
        assert_eq!(outcome, RouteOutcome::Stored { fields: 2 });
    }
}
