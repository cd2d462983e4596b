//! Start offset resolution.
//!
//! An offset reset specification resolves once, at construction time, to
//! a [`StartupMode`]:
//!
//! - `earliest` (any case) starts from the earliest retained offset
//! - a JSON object `{"<partition>": <offset>, ...}` starts each listed
//!   partition of the topic at an explicit offset
//! - anything else, including no specification, starts from the latest
//!   offset

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ::serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;

use super::config::TopicSubscription;
use crate::error::ConnectorError;

/// A single partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    /// Topic name.
    pub topic: String,
    /// Partition number.
    pub partition: i32,
}

/// Explicit start offsets for the partitions of one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOffsets {
    topic: String,
    offsets: BTreeMap<i32, i64>,
}

impl StartOffsets {
    /// The topic the offsets apply to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Offsets by partition.
    #[must_use]
    pub fn offsets(&self) -> &BTreeMap<i32, i64> {
        &self.offsets
    }

    /// Start offset for a partition.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::UnsupportedOffsetSpec` if the partition was
    /// not listed.
    pub fn offset_for(&self, partition: i32) -> Result<i64, ConnectorError> {
        self.offsets.get(&partition).copied().ok_or_else(|| {
            ConnectorError::UnsupportedOffsetSpec(format!(
                "no start offset for partition {partition} of topic '{}'",
                self.topic
            ))
        })
    }

    /// Listed partitions with their offsets, in partition order.
    #[must_use]
    pub fn assignments(&self) -> Vec<(TopicPartition, i64)> {
        self.offsets
            .iter()
            .map(|(&partition, &offset)| {
                (
                    TopicPartition {
                        topic: self.topic.clone(),
                        partition,
                    },
                    offset,
                )
            })
            .collect()
    }

    /// Builds an rdkafka [`TopicPartitionList`](rdkafka::TopicPartitionList)
    /// for manual assignment.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if rdkafka rejects an offset.
    #[cfg(feature = "kafka")]
    pub fn to_topic_partition_list(&self) -> Result<rdkafka::TopicPartitionList, ConnectorError> {
        let mut tpl = rdkafka::TopicPartitionList::new();
        for (&partition, &offset) in &self.offsets {
            tpl.add_partition_offset(&self.topic, partition, rdkafka::Offset::Offset(offset))
                .map_err(|e| ConnectorError::Validation(e.to_string()))?;
        }
        Ok(tpl)
    }
}

/// Where consumption starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupMode {
    /// Earliest retained offset.
    Earliest,
    /// Latest offset; only new records are read.
    Latest,
    /// Explicit per-partition offsets.
    SpecificOffsets(StartOffsets),
}

impl StartupMode {
    /// Resolves an offset reset specification for a subscription.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::UnsupportedOffsetSpec` if the specification
    /// looks like JSON but is not a non-empty object of non-negative integer
    /// partitions to non-negative integer offsets, or if explicit offsets
    /// are combined with a pattern subscription.
    pub fn resolve(
        spec: Option<&str>,
        subscription: &TopicSubscription,
    ) -> Result<Self, ConnectorError> {
        let spec = spec.map(str::trim).unwrap_or_default();

        if spec.eq_ignore_ascii_case("earliest") {
            return Ok(StartupMode::Earliest);
        }
        if !(spec.starts_with('{') || spec.starts_with('[')) {
            return Ok(StartupMode::Latest);
        }

        let TopicSubscription::Topic(topic) = subscription else {
            return Err(ConnectorError::UnsupportedOffsetSpec(format!(
                "explicit offsets need a single topic, not pattern '{}'",
                subscription.identifier()
            )));
        };

        let offsets = parse_partition_offsets(spec)?;
        Ok(StartupMode::SpecificOffsets(StartOffsets {
            topic: topic.clone(),
            offsets,
        }))
    }

    /// The `auto.offset.reset` value matching this mode.
    ///
    /// Explicit offsets map to `error` so that partitions without a listed
    /// offset fail instead of silently picking a position.
    #[must_use]
    pub fn auto_offset_reset(&self) -> &'static str {
        match self {
            StartupMode::Earliest => "earliest",
            StartupMode::Latest => "latest",
            StartupMode::SpecificOffsets(_) => "error",
        }
    }
}

/// Every member of a JSON object, in document order, duplicates included.
struct ObjectEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for ObjectEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ObjectEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of partition offsets")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(ObjectEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parses a non-negative decimal integer written with digits only.
fn parse_digits<T: FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_partition_offsets(spec: &str) -> Result<BTreeMap<i32, i64>, ConnectorError> {
    let unsupported = |why: String| ConnectorError::UnsupportedOffsetSpec(format!("{spec}: {why}"));

    let ObjectEntries(entries) =
        serde_json::from_str(spec).map_err(|e| unsupported(e.to_string()))?;
    if entries.is_empty() {
        return Err(unsupported("no partitions listed".into()));
    }

    let mut offsets = BTreeMap::new();
    for (key, value) in &entries {
        let partition = parse_digits::<i32>(key)
            .ok_or_else(|| unsupported(format!("invalid partition '{key}'")))?;
        let offset = match value {
            Value::Number(n) => n.as_i64().filter(|o| *o >= 0),
            Value::String(s) => parse_digits::<i64>(s.trim()),
            _ => None,
        }
        .ok_or_else(|| unsupported(format!("invalid offset {value} for partition {partition}")))?;

        if offsets.insert(partition, offset).is_some() {
            return Err(unsupported(format!("partition {partition} listed twice")));
        }
    }
    Ok(offsets)
}
