use arrow_array::{Array, Int64Array, StringArray};
use arrow_schema::DataType;
use laminar_ddl::kafka::{KafkaSourceFactory, StartupMode, TopicSubscription};
use laminar_ddl::serde::{DecoderKind, Format, LengthCheckPolicy};
use laminar_ddl::testing::{properties, RecordingEnvironment};
use laminar_ddl::{install_defaults, ConnectorError, PropertyValue, TableDescriptor, TableProperties};

const FIELDS: &str = "msg VARCHAR, id BIGINT, amount DECIMAL(10, 2), ts TIMESTAMP";

fn parse(table: &str, props: &TableProperties) -> Result<TableDescriptor, ConnectorError> {
    install_defaults().parse("kafka11", table, FIELDS, props)
}

fn startup(offset_reset: Option<&str>) -> Result<StartupMode, ConnectorError> {
    let mut props = properties(&[("topic", "orders")]);
    if let Some(spec) = offset_reset {
        props.set("offsetReset", spec);
    }
    let desc = parse("t", &props)?;
    KafkaSourceFactory::new().resolve(&desc).map(|rt| rt.startup)
}

#[test]
fn build_and_construct_are_deterministic() {
    let props = properties(&[
        ("topic", "clicks"),
        ("bootstrapServers", "b1:9092"),
        ("groupId", "g1"),
        ("sourceDataType", "json"),
        ("offsetReset", r#"{"0": 10}"#),
        ("kafka.client.id", "c1"),
    ]);

    let first = parse("t1", &props).unwrap();
    let second = parse("t1", &props).unwrap();
    assert_eq!(first, second);

    let factory = KafkaSourceFactory::new();
    assert_eq!(factory.resolve(&first).unwrap(), factory.resolve(&second).unwrap());
}

#[test]
fn earliest_starts_from_earliest() {
    assert_eq!(startup(Some("earliest")).unwrap(), StartupMode::Earliest);
    assert_eq!(startup(Some("EARLIEST")).unwrap(), StartupMode::Earliest);
}

#[test]
fn json_offsets_start_each_partition() {
    let StartupMode::SpecificOffsets(offsets) = startup(Some(r#"{"0":100,"1":200}"#)).unwrap()
    else {
        panic!("expected explicit offsets");
    };
    assert_eq!(offsets.topic(), "orders");
    assert_eq!(offsets.offset_for(0).unwrap(), 100);
    assert_eq!(offsets.offset_for(1).unwrap(), 200);
    assert!(matches!(
        offsets.offset_for(2),
        Err(ConnectorError::UnsupportedOffsetSpec(_))
    ));
}

#[test]
fn anything_else_starts_from_latest() {
    for spec in [Some("latest"), Some(""), None] {
        assert_eq!(startup(spec).unwrap(), StartupMode::Latest);
    }
}

#[test]
fn malformed_offsets_are_rejected() {
    assert!(matches!(
        startup(Some(r#"{"x":100}"#)),
        Err(ConnectorError::UnsupportedOffsetSpec(_))
    ));
}

#[test]
fn format_dispatch() {
    let factory = KafkaSourceFactory::new();
    let decoder = |pairs: &[(&str, &str)]| {
        let mut props = properties(&[("topic", "t")]);
        for (k, v) in pairs {
            props.set(k, *v);
        }
        factory.resolve(&parse("t", &props)?).map(|rt| rt.decoder)
    };

    assert_eq!(decoder(&[("sourcedatatype", "Json")]).unwrap(), DecoderKind::Json);
    assert_eq!(decoder(&[("sourcedatatype", "JSON")]).unwrap(), DecoderKind::Json);
    assert_eq!(decoder(&[("sourcedatatype", "avro")]).unwrap(), DecoderKind::Raw);
    assert_eq!(decoder(&[]).unwrap(), DecoderKind::Raw);

    assert_eq!(
        decoder(&[
            ("sourcedatatype", "csv"),
            ("fielddelimiter", ","),
            ("lengthcheckpolicy", "skip"),
        ])
        .unwrap(),
        DecoderKind::Csv {
            delimiter: b',',
            length_policy: LengthCheckPolicy::Skip
        }
    );
    assert!(matches!(
        decoder(&[("sourcedatatype", "csv"), ("fielddelimiter", ",")]),
        Err(ConnectorError::Validation(_))
    ));
    assert!(matches!(
        decoder(&[("sourcedatatype", "csv"), ("lengthcheckpolicy", "pad")]),
        Err(ConnectorError::Validation(_))
    ));
}

#[test]
fn scalar_settings_are_coerced() {
    let with_parallelism = |value: Option<PropertyValue>| {
        let mut props = properties(&[("topic", "t")]);
        if let Some(v) = value {
            props.set("parallelism", v);
        }
        parse("t", &props)
    };

    assert_eq!(
        with_parallelism(Some(PropertyValue::from("5")))
            .unwrap()
            .parallelism(),
        Some(5)
    );
    assert_eq!(
        with_parallelism(Some(PropertyValue::from(5_i64)))
            .unwrap()
            .parallelism(),
        Some(5)
    );
    assert!(matches!(
        with_parallelism(Some(PropertyValue::from("abc"))),
        Err(ConnectorError::Validation(_))
    ));
    assert_eq!(with_parallelism(None).unwrap().parallelism(), None);
}

#[test]
fn invalid_field_lists_are_rejected() {
    let props = properties(&[("topic", "t")]);
    let registry = install_defaults();
    assert!(matches!(
        registry.parse("kafka", "t", "id INT, ID BIGINT", &props),
        Err(ConnectorError::Validation(_))
    ));
    assert!(matches!(
        registry.parse("kafka", "t", "", &props),
        Err(ConnectorError::Validation(_))
    ));
    assert!(matches!(
        registry.parse("kafka", "t", "id", &props),
        Err(ConnectorError::Validation(_))
    ));
}

#[test]
fn construct_attaches_named_operator() {
    let desc = parse(
        "t1",
        &properties(&[
            ("topic", "clicks"),
            ("sourceDataType", "json"),
            ("parallelism", "2"),
        ]),
    )
    .unwrap();

    let mut env = RecordingEnvironment::new();
    let handle = KafkaSourceFactory::new().construct(&desc, &mut env).unwrap();

    assert_eq!(handle.table_name, "t1");
    assert_eq!(handle.field_names, vec!["msg", "id", "amount", "ts"]);

    let op = env.source(handle.stream).unwrap();
    assert_eq!(op.name(), "clicks_t1");
    assert_eq!(op.parallelism(), Some(2));
    assert_eq!(
        op.consumer().subscription,
        TopicSubscription::Topic("clicks".into())
    );

    let schema = op.schema();
    assert_eq!(schema.field(2).data_type(), &DataType::Decimal128(10, 2));
    assert!(schema.fields().iter().all(|f| f.is_nullable()));

    let records: Vec<&[u8]> = vec![
        br#"{"id": 1, "msg": "hi", "amount": "12.50", "ts": 1700000000000}"#,
        br#"{"id": 2}"#,
    ];
    let batch = op.decode(&records).unwrap();
    assert_eq!(batch.num_rows(), 2);
    let ids = batch.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.value(1), 2);
    let msgs = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(msgs.value(0), "hi");
    assert!(msgs.is_null(1));
    assert_eq!(op.deserializer().format(), Format::Json);
}

#[test]
fn raw_payloads_need_a_varchar_first_column() {
    let props = properties(&[("topic", "t")]);
    let desc = install_defaults()
        .parse("kafka", "t", "id BIGINT, msg VARCHAR", &props)
        .unwrap();
    let mut env = RecordingEnvironment::new();
    assert!(matches!(
        KafkaSourceFactory::new().construct(&desc, &mut env),
        Err(ConnectorError::Validation(_))
    ));
    assert!(env.sources().is_empty());
}

#[test]
fn constructing_a_table_twice_keeps_one_source() {
    let desc = parse("t1", &properties(&[("topic", "clicks")])).unwrap();
    let factory = KafkaSourceFactory::new();
    let mut env = RecordingEnvironment::new();

    let handle = factory.construct(&desc, &mut env).unwrap();
    assert!(matches!(
        factory.construct(&desc, &mut env),
        Err(ConnectorError::Environment(_))
    ));

    assert_eq!(env.sources().len(), 1);
    assert_eq!(env.tables().len(), 1);
    assert!(env.source(handle.stream).is_some());
}

#[test]
fn side_tables_cannot_be_constructed_as_sources() {
    let desc = install_defaults()
        .parse("cassandra", "side", "id INT", &TableProperties::new())
        .unwrap();
    let mut env = RecordingEnvironment::new();
    assert!(matches!(
        KafkaSourceFactory::new().construct(&desc, &mut env),
        Err(ConnectorError::Validation(_))
    ));
    assert!(env.sources().is_empty());
}
