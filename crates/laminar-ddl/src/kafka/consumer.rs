//! Consumer description.
//!
//! A [`ConsumerSpec`] is everything a Kafka consumer needs to start
//! reading for one source operator. Building one performs no I/O; with
//! the `kafka` feature it converts to an `rdkafka` [`ClientConfig`].
//!
//! [`ClientConfig`]: rdkafka::config::ClientConfig

use std::collections::BTreeMap;

use super::config::TopicSubscription;
use super::offsets::StartupMode;

/// Consumer settings for one source operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSpec {
    /// Topic addressing.
    pub subscription: TopicSubscription,
    /// Where consumption starts.
    pub startup: StartupMode,
    /// Client properties (`bootstrap.servers`, `group.id` and pass-through
    /// properties with the `kafka.` prefix stripped).
    pub client_properties: BTreeMap<String, String>,
}

impl ConsumerSpec {
    /// Final client configuration entries.
    ///
    /// `auto.offset.reset` always reflects the resolved startup mode, since
    /// the declared value may have been an offset object.
    #[must_use]
    pub fn config_entries(&self) -> BTreeMap<String, String> {
        let mut entries = self.client_properties.clone();
        entries.insert(
            "auto.offset.reset".into(),
            self.startup.auto_offset_reset().into(),
        );
        entries
    }

    /// Builds an rdkafka [`ClientConfig`](rdkafka::config::ClientConfig).
    #[cfg(feature = "kafka")]
    #[must_use]
    pub fn to_rdkafka_config(&self) -> rdkafka::config::ClientConfig {
        let mut config = rdkafka::config::ClientConfig::new();
        for (key, value) in self.config_entries() {
            config.set(key, value);
        }
        config
    }
}
