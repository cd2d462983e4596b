//! Kafka source settings and topic addressing.
//!
//! [`KafkaSourceSettings`] holds the named options of a Kafka source
//! table as declared; nothing is defaulted here. [`TopicSubscription`]
//! is the resolved form of `topic` + `topicispattern`.

use regex::Regex;

use crate::config::TableProperties;
use crate::error::ConnectorError;

/// Prefix of pass-through Kafka client properties.
pub const KAFKA_PROPERTY_PREFIX: &str = "kafka.";

/// Pass-through key consulted when `offsetreset` is absent.
pub const KAFKA_AUTO_OFFSET_RESET_KEY: &str = "kafka.auto.offset.reset";

/// Named settings of a Kafka source table, as declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KafkaSourceSettings {
    /// Broker list.
    pub bootstrap_servers: Option<String>,
    /// Consumer group.
    pub group_id: Option<String>,
    /// Topic name, or a regular expression when `topic_is_pattern` is set.
    pub topic: Option<String>,
    /// Whether `topic` is a pattern.
    pub topic_is_pattern: Option<bool>,
    /// Start offset specification.
    pub offset_reset: Option<String>,
    /// Declared payload format.
    pub source_data_type: Option<String>,
    /// Delimiter for delimited payloads.
    pub field_delimiter: Option<String>,
    /// Field count mismatch handling for delimited payloads.
    pub length_check_policy: Option<String>,
}

impl KafkaSourceSettings {
    /// Reads the Kafka settings from table options.
    ///
    /// `offsetreset` falls back to the pass-through
    /// `kafka.auto.offset.reset` option.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if `topicispattern` is not a boolean.
    pub fn from_properties(props: &TableProperties) -> Result<Self, ConnectorError> {
        Ok(Self {
            bootstrap_servers: props.get_string("bootstrapservers"),
            group_id: props.get_string("groupid"),
            topic: props.get_string("topic"),
            topic_is_pattern: props.get_bool("topicispattern")?,
            offset_reset: props
                .get_string("offsetreset")
                .or_else(|| props.get_string(KAFKA_AUTO_OFFSET_RESET_KEY)),
            source_data_type: props.get_string("sourcedatatype"),
            field_delimiter: props.get_string("fielddelimiter"),
            length_check_policy: props.get_string("lengthcheckpolicy"),
        })
    }

    /// Resolves the topic addressing mode.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` if no topic is declared and
    /// `ConnectorError::Validation` if a pattern does not compile.
    pub fn subscription(&self) -> Result<TopicSubscription, ConnectorError> {
        let topic = self
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConnectorError::MissingConfig("topic".into()))?;

        if self.topic_is_pattern.unwrap_or(false) {
            Ok(TopicSubscription::Pattern(TopicPattern::new(topic)?))
        } else {
            Ok(TopicSubscription::Topic(topic.to_string()))
        }
    }
}

/// A compiled topic pattern.
///
/// Topics match when the whole name matches the expression.
#[derive(Debug, Clone)]
pub struct TopicPattern {
    source: String,
    regex: Regex,
}

impl TopicPattern {
    /// Compiles a topic pattern.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if the expression is invalid.
    pub fn new(pattern: &str) -> Result<Self, ConnectorError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            ConnectorError::Validation(format!("invalid topic pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `topic` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        self.regex.is_match(topic)
    }
}

impl PartialEq for TopicPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TopicPattern {}

/// How a source addresses its topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSubscription {
    /// A single named topic.
    Topic(String),
    /// Every topic matching a pattern.
    Pattern(TopicPattern),
}

impl TopicSubscription {
    /// Topic name or pattern text, as declared.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            TopicSubscription::Topic(t) => t,
            TopicSubscription::Pattern(p) => p.as_str(),
        }
    }

    /// Returns `true` for pattern subscriptions.
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, TopicSubscription::Pattern(_))
    }

    /// The string handed to the consumer's `subscribe` call.
    ///
    /// librdkafka treats subscriptions starting with `^` as patterns.
    #[must_use]
    pub fn subscribe_string(&self) -> String {
        match self {
            TopicSubscription::Topic(t) => t.clone(),
            TopicSubscription::Pattern(p) if p.as_str().starts_with('^') => p.as_str().to_string(),
            TopicSubscription::Pattern(p) => format!("^{}", p.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PropertyValue;

    #[test]
    fn test_settings_from_properties() {
        let props: TableProperties = [
            ("bootstrapServers", PropertyValue::from("b1:9092,b2:9092")),
            ("groupId", PropertyValue::from("g1")),
            ("topic", PropertyValue::from("orders")),
            ("topicIsPattern", PropertyValue::from(false)),
            ("sourceDataType", PropertyValue::from("json")),
        ]
        .into_iter()
        .collect();

        let s = KafkaSourceSettings::from_properties(&props).unwrap();
        assert_eq!(s.bootstrap_servers.as_deref(), Some("b1:9092,b2:9092"));
        assert_eq!(s.group_id.as_deref(), Some("g1"));
        assert_eq!(s.topic.as_deref(), Some("orders"));
        assert_eq!(s.topic_is_pattern, Some(false));
        assert_eq!(s.offset_reset, None);
        assert_eq!(s.field_delimiter, None);
    }

    #[test]
    fn test_offset_reset_fallback() {
        let props: TableProperties = [("kafka.auto.offset.reset", "earliest")]
            .into_iter()
            .collect();
        let s = KafkaSourceSettings::from_properties(&props).unwrap();
        assert_eq!(s.offset_reset.as_deref(), Some("earliest"));

        let props: TableProperties = [
            ("kafka.auto.offset.reset", "earliest"),
            ("offsetReset", "latest"),
        ]
        .into_iter()
        .collect();
        let s = KafkaSourceSettings::from_properties(&props).unwrap();
        assert_eq!(s.offset_reset.as_deref(), Some("latest"));
    }

    #[test]
    fn test_bad_pattern_flag() {
        let props: TableProperties = [("topicispattern", "maybe")].into_iter().collect();
        assert!(matches!(
            KafkaSourceSettings::from_properties(&props),
            Err(ConnectorError::Validation(_))
        ));
    }

    #[test]
    fn test_subscription_topic() {
        let s = KafkaSourceSettings {
            topic: Some(" clicks ".into()),
            ..Default::default()
        };
        let sub = s.subscription().unwrap();
        assert_eq!(sub, TopicSubscription::Topic("clicks".into()));
        assert_eq!(sub.identifier(), "clicks");
        assert!(!sub.is_pattern());
    }

    #[test]
    fn test_subscription_pattern() {
        let s = KafkaSourceSettings {
            topic: Some("orders-.*".into()),
            topic_is_pattern: Some(true),
            ..Default::default()
        };
        let sub = s.subscription().unwrap();
        assert!(sub.is_pattern());
        assert_eq!(sub.subscribe_string(), "^orders-.*");
        let TopicSubscription::Pattern(p) = sub else {
            panic!("expected pattern");
        };
        assert!(p.matches("orders-eu"));
        assert!(!p.matches("old-orders-eu"));
    }

    #[test]
    fn test_subscription_errors() {
        let missing = KafkaSourceSettings::default();
        assert!(matches!(
            missing.subscription(),
            Err(ConnectorError::MissingConfig(_))
        ));

        let bad = KafkaSourceSettings {
            topic: Some("orders-(".into()),
            topic_is_pattern: Some(true),
            ..Default::default()
        };
        assert!(matches!(bad.subscription(), Err(ConnectorError::Validation(_))));
    }
}
