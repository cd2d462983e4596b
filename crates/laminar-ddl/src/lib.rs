//! # `LaminarDB` DDL Connectors
//!
//! Turns declarative table definitions (a table name, a field list and a
//! bag of options) into validated connector descriptors, and descriptors
//! into source operators attached to a streaming environment.
//!
//! - [`descriptor`] - Typed descriptors and the shared building steps
//! - [`registry`] - Structural marker rules and the connector parser registry
//! - [`kafka`] - Kafka source tables and the source factory
//! - [`lookup`] - Side (lookup) tables
//! - [`serde`] - Record decoders (JSON, delimited text, raw)
//! - [`environment`] - The seam to the execution environment
//! - [`testing`] - In-memory environment and helpers
//!
//! ## Flow
//!
//! ```text
//! options + field text
//!   -> ParserRegistry::parse (marker dispatch, setting coercion)
//!   -> TableDescriptor
//!   -> KafkaSourceFactory::construct (decoder, offsets, row type)
//!   -> StreamEnvironment::add_source + register_table
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Common test patterns that are acceptable
#![cfg_attr(
    test,
    allow(
        clippy::field_reassign_with_default,
        clippy::float_cmp,
        clippy::manual_let_else,
        clippy::unreadable_literal,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        unused_mut
    )
)]

/// Error types.
pub mod error;

/// Table option types and coercion.
pub mod config;

/// Field list parsing and row types.
pub mod schema;

/// Table descriptors.
pub mod descriptor;

/// Marker and parser registries.
pub mod registry;

/// Record deserialization framework.
pub mod serde;

/// Execution environment traits.
pub mod environment;

/// Kafka source tables.
pub mod kafka;

/// Side (lookup) tables.
pub mod lookup;

/// Testing utilities (recording environment, helpers).
pub mod testing;

pub use config::{ConfigKeySpec, PropertyValue, TableProperties};
pub use descriptor::{ConnectorKind, DescriptorBuilder, TableDescriptor, TableParser};
pub use environment::{SourceOperator, StreamEnvironment, StreamId, TableHandle};
pub use error::{ConnectorError, SerdeError};
pub use registry::{install_defaults, MarkerRegistry, ParserRegistry};
