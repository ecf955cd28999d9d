//! Database configuration module
//! This module holds the connection parameters of a database and loads them
//! from text property files, XML property lists or JSON.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::properties::Properties;

pub const USERNAME_KEY: &str = "USERNAME";
pub const PASSWORD_KEY: &str = "PASSWORD";
pub const HOSTNAME_KEY: &str = "HOSTNAME";
pub const PORT_KEY: &str = "PORT";
pub const SCHEMA_KEY: &str = "SCHEMA";
pub const DIALECT_KEY: &str = "DIALECT";
pub const DRIVER_CLASS_KEY: &str = "DRIVER_CLASS";

/// Keys every property source must carry, in the order they are checked
pub const REQUIRED_KEYS: [&str; 7] = [
    USERNAME_KEY,
    PASSWORD_KEY,
    HOSTNAME_KEY,
    PORT_KEY,
    SCHEMA_KEY,
    DIALECT_KEY,
    DRIVER_CLASS_KEY,
];

/// Immutable connection parameters of a database
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseConfiguration {
    username: String,
    password: String,
    hostname: String,
    port: u16,
    schema: String,
    dialect: String,
    driver_class: String,
}

impl DatabaseConfiguration {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
        port: u16,
        schema: impl Into<String>,
        dialect: impl Into<String>,
        driver_class: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            hostname: hostname.into(),
            port,
            schema: schema.into(),
            dialect: dialect.into(),
            driver_class: driver_class.into(),
        }
    }

    /// Start a builder that reports absent fields instead of requiring all
    /// of them up front
    pub fn builder() -> DatabaseConfigurationBuilder {
        DatabaseConfigurationBuilder::default()
    }

    /// The configuration written for new deployments
    pub fn bootstrap_default() -> Self {
        Self::new(
            "root",
            "root123",
            "localhost",
            3306,
            "test",
            "mysql",
            "mysql-driver",
        )
    }

    /// Build a configuration from a property set
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        for key in REQUIRED_KEYS {
            if !properties.contains_key(key) {
                return Err(ConfigError::MissingKey(key));
            }
        }

        let required = |key: &'static str| {
            properties
                .get(key)
                .map(str::to_string)
                .ok_or(ConfigError::MissingKey(key))
        };

        let raw_port = required(PORT_KEY)?;
        let port = raw_port.parse::<u16>().map_err(|source| ConfigError::InvalidPort {
            value: raw_port.clone(),
            source,
        })?;

        Ok(Self {
            username: required(USERNAME_KEY)?,
            password: required(PASSWORD_KEY)?,
            hostname: required(HOSTNAME_KEY)?,
            port,
            schema: required(SCHEMA_KEY)?,
            dialect: required(DIALECT_KEY)?,
            driver_class: required(DRIVER_CLASS_KEY)?,
        })
    }

    /// Read a text property stream
    pub fn from_properties_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Self::from_properties(&Properties::load(reader)?)
    }

    /// Read a text property file
    pub fn from_properties_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading database configuration from properties file {:?}", path);

        let properties = {
            let file = File::open(path)?;
            Properties::load(file)?
        };
        Self::from_properties(&properties)
    }

    /// Read an XML property list stream
    pub fn from_xml_reader<R: std::io::BufRead>(reader: R) -> Result<Self, ConfigError> {
        Self::from_properties(&Properties::load_from_xml(reader)?)
    }

    /// Read an XML property list file
    pub fn from_xml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading database configuration from XML file {:?}", path);

        let properties = {
            let file = File::open(path)?;
            Properties::load_from_xml(BufReader::new(file))?
        };
        Self::from_properties(&properties)
    }

    /// Read a JSON document with snake_case field names
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read a JSON file with snake_case field names
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading database configuration from JSON file {:?}", path);

        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// The configuration as a property set with the standard keys
    pub fn to_properties(&self) -> Properties {
        [
            (USERNAME_KEY, self.username.clone()),
            (PASSWORD_KEY, self.password.clone()),
            (HOSTNAME_KEY, self.hostname.clone()),
            (PORT_KEY, self.port.to_string()),
            (SCHEMA_KEY, self.schema.clone()),
            (DIALECT_KEY, self.dialect.clone()),
            (DRIVER_CLASS_KEY, self.driver_class.clone()),
        ]
        .into_iter()
        .collect()
    }

    pub fn write_properties<W: Write>(&self, writer: W, comment: Option<&str>) -> Result<(), ConfigError> {
        self.to_properties().store(writer, comment)
    }

    pub fn write_xml<W: Write>(&self, writer: W, comment: Option<&str>) -> Result<(), ConfigError> {
        self.to_properties().store_to_xml(writer, comment)
    }

    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<(), ConfigError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write the bootstrap default to a text property file
    pub fn store_default_to_properties<P: AsRef<Path>>(path: P, comment: &str) -> Result<(), ConfigError> {
        let writer = BufWriter::new(File::create(path)?);
        Self::bootstrap_default().write_properties(writer, Some(comment))
    }

    /// Write the bootstrap default to an XML property list file
    pub fn store_default_to_xml<P: AsRef<Path>>(path: P, comment: &str) -> Result<(), ConfigError> {
        let writer = BufWriter::new(File::create(path)?);
        Self::bootstrap_default().write_xml(writer, Some(comment))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    pub fn driver_class(&self) -> &str {
        &self.driver_class
    }

    /// `dialect://hostname:port/schema`, without credentials
    pub fn connection_url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.dialect.to_lowercase(),
            self.hostname,
            self.port,
            self.schema
        )
    }
}

impl TryFrom<&Properties> for DatabaseConfiguration {
    type Error = ConfigError;

    fn try_from(properties: &Properties) -> Result<Self, Self::Error> {
        Self::from_properties(properties)
    }
}

// The password never reaches logs or terminals
impl fmt::Debug for DatabaseConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfiguration")
            .field("username", &self.username)
            .field("password", &"***")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .field("dialect", &self.dialect)
            .field("driver_class", &self.driver_class)
            .finish()
    }
}

impl fmt::Display for DatabaseConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DatabaseConfiguration{{username='{}', password='***', hostname='{}', port={}, schema='{}', dialect='{}', driverClass='{}'}}",
            self.username, self.hostname, self.port, self.schema, self.dialect, self.driver_class
        )
    }
}

/// Collects configuration fields one by one; `build` fails on the first
/// absent string field
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfigurationBuilder {
    username: Option<String>,
    password: Option<String>,
    hostname: Option<String>,
    port: u16,
    schema: Option<String>,
    dialect: Option<String>,
    driver_class: Option<String>,
}

impl DatabaseConfigurationBuilder {
    pub fn username(mut self, value: impl Into<String>) -> Self {
        self.username = Some(value.into());
        self
    }

    pub fn password(mut self, value: impl Into<String>) -> Self {
        self.password = Some(value.into());
        self
    }

    pub fn hostname(mut self, value: impl Into<String>) -> Self {
        self.hostname = Some(value.into());
        self
    }

    pub fn port(mut self, value: u16) -> Self {
        self.port = value;
        self
    }

    pub fn schema(mut self, value: impl Into<String>) -> Self {
        self.schema = Some(value.into());
        self
    }

    pub fn dialect(mut self, value: impl Into<String>) -> Self {
        self.dialect = Some(value.into());
        self
    }

    pub fn driver_class(mut self, value: impl Into<String>) -> Self {
        self.driver_class = Some(value.into());
        self
    }

    pub fn build(self) -> Result<DatabaseConfiguration, ConfigError> {
        Ok(DatabaseConfiguration {
            username: self.username.ok_or(ConfigError::MissingField("username"))?,
            password: self.password.ok_or(ConfigError::MissingField("password"))?,
            hostname: self.hostname.ok_or(ConfigError::MissingField("hostname"))?,
            port: self.port,
            schema: self.schema.ok_or(ConfigError::MissingField("schema"))?,
            dialect: self.dialect.ok_or(ConfigError::MissingField("dialect"))?,
            driver_class: self
                .driver_class
                .ok_or(ConfigError::MissingField("driverClass"))?,
        })
    }
}
