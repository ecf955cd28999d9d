/*!
 * Tests for database configuration construction
 */

use modelstore::configuration::{PORT_KEY, REQUIRED_KEYS};
use modelstore::{ConfigError, DatabaseConfiguration, Properties};
use proptest::prelude::*;

use crate::common::BOOTSTRAP_PROPERTIES;

fn bootstrap_properties() -> Properties {
    BOOTSTRAP_PROPERTIES.parse().expect("Failed to parse bootstrap properties")
}

#[test]
fn test_fromProperties_withBootstrapScenario_shouldParsePortAndSchema() {
    let configuration = DatabaseConfiguration::from_properties(&bootstrap_properties()).unwrap();

    assert_eq!(configuration.port(), 3306);
    assert_eq!(configuration.schema(), "test");
    assert_eq!(configuration, DatabaseConfiguration::bootstrap_default());
}

#[test]
fn test_fromProperties_withEachKeyMissing_shouldNameThatKey() {
    for key in REQUIRED_KEYS {
        let mut properties = bootstrap_properties();
        properties.remove(key);

        match DatabaseConfiguration::from_properties(&properties) {
            Err(ConfigError::MissingKey(missing)) => assert_eq!(missing, key),
            other => panic!("Expected missing key {}, got {:?}", key, other),
        }
    }
}

#[test]
fn test_fromProperties_withSeveralKeysMissing_shouldNameFirstInOrder() {
    let properties: Properties = [("PASSWORD", "x"), ("SCHEMA", "db")].into_iter().collect();

    let result = DatabaseConfiguration::from_properties(&properties);
    assert!(matches!(result, Err(ConfigError::MissingKey("USERNAME"))));
}

#[test]
fn test_fromProperties_withNonNumericPort_shouldFail() {
    for raw in ["abc", "", " 3306", "70000", "-1"] {
        let mut properties = bootstrap_properties();
        properties.set(PORT_KEY, raw);

        match DatabaseConfiguration::from_properties(&properties) {
            Err(ConfigError::InvalidPort { value, .. }) => assert_eq!(value, raw),
            other => panic!("Expected invalid port for {:?}, got {:?}", raw, other),
        }
    }
}

#[test]
fn test_builder_withMissingField_shouldNameField() {
    let result = DatabaseConfiguration::builder()
        .username("root")
        .password("secret")
        .hostname("localhost")
        .port(5432)
        .dialect("sqlite")
        .driver_class("rusqlite")
        .build();

    assert!(matches!(result, Err(ConfigError::MissingField("schema"))));
}

#[test]
fn test_builder_withAllFields_shouldMatchConstructor() {
    let built = DatabaseConfiguration::builder()
        .username("root")
        .password("root123")
        .hostname("localhost")
        .port(3306)
        .schema("test")
        .dialect("mysql")
        .driver_class("mysql-driver")
        .build()
        .unwrap();

    assert_eq!(built, DatabaseConfiguration::bootstrap_default());
}

#[test]
fn test_display_shouldMaskPassword() {
    let configuration = DatabaseConfiguration::bootstrap_default();

    let display = configuration.to_string();
    let debug = format!("{:?}", configuration);

    assert!(!display.contains("root123"));
    assert!(!debug.contains("root123"));
    assert!(display.contains("***"));
}

#[test]
fn test_toProperties_shouldRoundTrip() {
    let configuration = DatabaseConfiguration::new("app", "pw", "db.local", 0, "main", "sqlite", "rusqlite");

    let restored = DatabaseConfiguration::from_properties(&configuration.to_properties()).unwrap();
    assert_eq!(restored, configuration);
}

proptest! {
    #[test]
    fn prop_fromProperties_withValidValues_shouldExposeInputs(
        username in "[a-z][a-z0-9_]{0,12}",
        password in "[ -~]{0,16}",
        hostname in "[a-z]{1,10}(\\.[a-z]{1,6}){0,2}",
        port in any::<u16>(),
        schema in "[a-z_]{1,10}",
        dialect in "[a-z]{2,8}",
        driver_class in "[a-z.\\-]{1,16}",
    ) {
        let properties: Properties = [
            ("USERNAME", username.clone()),
            ("PASSWORD", password.clone()),
            ("HOSTNAME", hostname.clone()),
            ("PORT", port.to_string()),
            ("SCHEMA", schema.clone()),
            ("DIALECT", dialect.clone()),
            ("DRIVER_CLASS", driver_class.clone()),
        ]
        .into_iter()
        .collect();

        let configuration = DatabaseConfiguration::from_properties(&properties).unwrap();

        prop_assert_eq!(configuration.username(), username.as_str());
        prop_assert_eq!(configuration.password(), password.as_str());
        prop_assert_eq!(configuration.hostname(), hostname.as_str());
        prop_assert_eq!(configuration.port(), port);
        prop_assert_eq!(configuration.schema(), schema.as_str());
        prop_assert_eq!(configuration.dialect(), dialect.as_str());
        prop_assert_eq!(configuration.driver_class(), driver_class.as_str());
    }

    #[test]
    fn prop_textFormat_shouldPreserveConfiguration(
        password in "\\PC{0,20}",
        port in any::<u16>(),
    ) {
        let configuration =
            DatabaseConfiguration::new("root", password, "localhost", port, "test", "mysql", "mysql-driver");

        let mut buffer = Vec::new();
        configuration.write_properties(&mut buffer, Some("generated")).unwrap();
        let restored = DatabaseConfiguration::from_properties_reader(buffer.as_slice()).unwrap();

        prop_assert_eq!(restored, configuration);
    }
}
