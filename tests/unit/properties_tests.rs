/*!
 * Tests for the property list codec through the public API
 */

use modelstore::{ConfigError, Properties};

#[test]
fn test_load_fromReader_shouldMatchParse() {
    let text = "# header\nUSERNAME = root\nSCHEMA:test\n";

    let loaded = Properties::load(text.as_bytes()).unwrap();
    let parsed: Properties = text.parse().unwrap();

    assert_eq!(loaded, parsed);
    assert_eq!(loaded.get("USERNAME"), Some("root"));
    assert_eq!(loaded.get("SCHEMA"), Some("test"));
}

#[test]
fn test_load_withInvalidUtf8_shouldFailWithIo() {
    let bytes: &[u8] = &[b'K', b'=', 0xFF, 0xFE];
    let result = Properties::load(bytes);
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_store_shouldSortKeysAndWriteTimestamp() {
    let properties: Properties = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();

    let mut out = Vec::new();
    properties.store(&mut out, None).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with('#'));
    assert_eq!(&lines[1..], &["a=1", "b=2", "c=3"]);
}

#[test]
fn test_setAndRemove_shouldReportPreviousValue() {
    let mut properties = Properties::new();
    assert!(properties.is_empty());

    assert_eq!(properties.set("PORT", "3306"), None);
    assert_eq!(properties.set("PORT", "5432"), Some("3306".to_string()));
    assert!(properties.contains_key("PORT"));

    assert_eq!(properties.remove("PORT"), Some("5432".to_string()));
    assert!(!properties.contains_key("PORT"));
}

#[test]
fn test_iter_shouldYieldEntriesInKeyOrder() {
    let properties: Properties = [("SCHEMA", "test"), ("DIALECT", "mysql")].into_iter().collect();

    let keys: Vec<&str> = properties.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["DIALECT", "SCHEMA"]);
}

#[test]
fn test_loadFromXml_withMalformedDocument_shouldFailWithXml() {
    let result = Properties::load_from_xml("<properties><entry key=\"a\">1</properties>".as_bytes());
    assert!(matches!(result, Err(ConfigError::Xml(_))));
}
