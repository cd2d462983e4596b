//! Kafka source construction.
//!
//! [`KafkaSourceFactory`] turns a Kafka source descriptor into a
//! [`SourceRuntimeConfig`] and attaches the resulting operator to a
//! [`StreamEnvironment`]. Everything is resolved before anything is
//! attached, and an attached source whose table cannot be registered is
//! removed again, so a failed construction leaves the environment
//! untouched.

use std::collections::BTreeMap;

use arrow_schema::SchemaRef;
use tracing::{info, warn};

use super::config::{
    KafkaSourceSettings, TopicSubscription, KAFKA_AUTO_OFFSET_RESET_KEY, KAFKA_PROPERTY_PREFIX,
};
use super::consumer::ConsumerSpec;
use super::offsets::StartupMode;
use crate::descriptor::{ConnectorKind, TableDescriptor};
use crate::environment::{SourceOperator, StreamEnvironment, TableHandle};
use crate::error::ConnectorError;
use crate::serde::{self, DecoderKind, Format, LengthCheckPolicy};

/// Everything derived from a descriptor to run one Kafka source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRuntimeConfig {
    /// Operator name, `{topic}_{table}`.
    pub operator_name: String,
    /// Topic addressing.
    pub subscription: TopicSubscription,
    /// Record decoder.
    pub decoder: DecoderKind,
    /// Row type.
    pub schema: SchemaRef,
    /// Where consumption starts.
    pub startup: StartupMode,
    /// Parallelism, or `None` to inherit.
    pub parallelism: Option<u32>,
    /// Consumer client properties.
    pub client_properties: BTreeMap<String, String>,
}

impl SourceRuntimeConfig {
    /// Consumer settings for this source.
    #[must_use]
    pub fn consumer_spec(&self) -> ConsumerSpec {
        ConsumerSpec {
            subscription: self.subscription.clone(),
            startup: self.startup.clone(),
            client_properties: self.client_properties.clone(),
        }
    }
}

/// Builds Kafka source operators from descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaSourceFactory {
    _private: (),
}

impl KafkaSourceFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Derives the runtime configuration of a Kafka source.
    ///
    /// # Errors
    ///
    /// - `ConnectorError::Validation` if the descriptor is not a Kafka
    ///   source, the topic pattern does not compile, or delimited decoding
    ///   lacks a delimiter or length policy
    /// - `ConnectorError::Validation` if raw decoding is selected but the
    ///   first column is not `VARCHAR`
    /// - `ConnectorError::MissingConfig` if no topic is declared
    /// - `ConnectorError::UnsupportedFormat` if the delimiter is not a
    ///   single ASCII character
    /// - `ConnectorError::UnsupportedOffsetSpec` for a malformed offset object
    pub fn resolve(&self, desc: &TableDescriptor) -> Result<SourceRuntimeConfig, ConnectorError> {
        let ConnectorKind::KafkaSource(settings) = desc.connector() else {
            return Err(ConnectorError::Validation(format!(
                "table '{}' is a {} table, not a Kafka source",
                desc.name(),
                desc.connector().name()
            )));
        };

        let subscription = settings.subscription()?;
        let schema = desc.schema();
        let decoder = resolve_decoder(settings, &schema)?;
        let startup = StartupMode::resolve(settings.offset_reset.as_deref(), &subscription)?;

        Ok(SourceRuntimeConfig {
            operator_name: format!("{}_{}", subscription.identifier(), desc.name()),
            subscription,
            decoder,
            schema,
            startup,
            parallelism: desc.parallelism(),
            client_properties: client_properties(desc, settings),
        })
    }

    /// Builds the source operator for a descriptor.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn build_operator(&self, desc: &TableDescriptor) -> Result<SourceOperator, ConnectorError> {
        let runtime = self.resolve(desc)?;
        let consumer = runtime.consumer_spec();
        let deserializer = serde::create_deserializer(&runtime.decoder);
        Ok(SourceOperator::new(
            runtime.operator_name,
            runtime.parallelism,
            runtime.schema,
            consumer,
            deserializer,
        ))
    }

    /// Attaches the source to `env` and registers it as the descriptor's table.
    ///
    /// # Errors
    ///
    /// Returns the resolution errors of [`resolve`](Self::resolve), or
    /// whatever the environment reports. If the table cannot be registered
    /// the attached source is removed before the error is returned.
    pub fn construct(
        &self,
        desc: &TableDescriptor,
        env: &mut dyn StreamEnvironment,
    ) -> Result<TableHandle, ConnectorError> {
        let operator = self.build_operator(desc)?;
        let operator_name = operator.name().to_string();
        let parallelism = operator.parallelism();
        let format = operator.deserializer().format();

        let stream = env.add_source(operator)?;
        let handle = match env.register_table(stream, desc.name(), &desc.field_names()) {
            Ok(handle) => handle,
            Err(err) => {
                if let Err(rollback) = env.remove_source(stream) {
                    warn!(
                        table = desc.name(),
                        %stream,
                        error = %rollback,
                        "failed to detach source after table registration failed"
                    );
                }
                return Err(err);
            }
        };

        info!(
            table = desc.name(),
            operator = %operator_name,
            %stream,
            %format,
            parallelism = ?parallelism,
            "attached kafka source"
        );
        Ok(handle)
    }
}

fn resolve_decoder(
    settings: &KafkaSourceSettings,
    schema: &SchemaRef,
) -> Result<DecoderKind, ConnectorError> {
    match Format::resolve(settings.source_data_type.as_deref()) {
        Format::Json => Ok(DecoderKind::Json),
        Format::Raw => {
            serde::raw::check_schema(schema).map_err(|e| {
                ConnectorError::Validation(format!("raw payload decoding: {e}"))
            })?;
            Ok(DecoderKind::Raw)
        }
        Format::Csv => {
            let delimiter = settings.field_delimiter.as_deref().ok_or_else(|| {
                ConnectorError::Validation("csv sources require 'fielddelimiter'".into())
            })?;
            let policy = settings.length_check_policy.as_deref().ok_or_else(|| {
                ConnectorError::Validation("csv sources require 'lengthcheckpolicy'".into())
            })?;
            Ok(DecoderKind::Csv {
                delimiter: delimiter_byte(delimiter)?,
                length_policy: policy.parse::<LengthCheckPolicy>()?,
            })
        }
    }
}

fn delimiter_byte(delimiter: &str) -> Result<u8, ConnectorError> {
    match delimiter.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ConnectorError::UnsupportedFormat(format!(
            "csv delimiter must be a single ASCII character, got '{delimiter}'"
        ))),
    }
}

fn client_properties(
    desc: &TableDescriptor,
    settings: &KafkaSourceSettings,
) -> BTreeMap<String, String> {
    let mut props = desc.raw_params_with_prefix(KAFKA_PROPERTY_PREFIX);
    // Consumed as the start offset spec, which may not be a valid client value
    if let Some(key) = KAFKA_AUTO_OFFSET_RESET_KEY.strip_prefix(KAFKA_PROPERTY_PREFIX) {
        props.remove(key);
    }
    if let Some(servers) = &settings.bootstrap_servers {
        props.insert("bootstrap.servers".into(), servers.clone());
    }
    if let Some(group) = &settings.group_id {
        props.insert("group.id".into(), group.clone());
    }
    props
}
