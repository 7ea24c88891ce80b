use std::env;
use std::fmt::{self, Formatter};
use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use log::LevelFilter;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Overwrites the given fields with the value of the environment variable, if it is set and
/// can be parsed.
macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    match value.parse() {
                        Ok(value) => $config.$name = value,
                        Err(_) => eprintln!("Ignoring invalid value for {}", $key),
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loglevel: LevelFilter,
    pub bind: BindAddr,
    pub store: StoreKind,
    pub database: Database,
    pub authorization: Authorization,
}

impl Config {
    pub async fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        Self::from_slice(&buf)
    }

    pub fn from_slice(buf: &[u8]) -> Result<Self, ConfigError> {
        Ok(toml::from_slice(buf)?)
    }

    /// Overwrites all values that are set in the environment.
    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "KO_LOGLEVEL",
            loglevel,
            "KO_BIND",
            bind,
            "KO_STORE",
            store
        );
        self.database = self.database.with_environment();
        self.authorization = self.authorization.with_environment();

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: LevelFilter::Info,
            bind: BindAddr::Tcp(SocketAddr::new([0, 0, 0, 0].into(), 3000)),
            store: StoreKind::default(),
            database: Database::default(),
            authorization: Authorization::default(),
        }
    }
}

/// An address to bind the http server to.
///
/// This can currently be a tcp socket (net) or a unix socket (file).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum BindAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl FromStr for BindAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse() {
            return Ok(Self::Tcp(addr));
        }

        Ok(Self::Unix(s.to_owned().into()))
    }
}

impl<'de> Deserialize<'de> for BindAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BindAddrVisitor;

        impl<'de> Visitor<'de> for BindAddrVisitor {
            type Value = BindAddr;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("an address with port, or file path")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(BindAddrVisitor)
    }
}

/// The backend used to persist tournaments.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Tournaments only live as long as the process.
    #[default]
    Memory,
    Mysql,
}

impl FromStr for StoreKind {
    type Err = InvalidStoreKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "mysql" => Ok(Self::Mysql),
            _ => Err(InvalidStoreKind),
        }
    }
}

#[derive(Copy, Clone, Debug, Error)]
#[error("invalid store kind: expected \"memory\" or \"mysql\"")]
pub struct InvalidStoreKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// A prefix prepended to all table names.
    pub prefix: String,
}

impl Database {
    pub fn connect_string(&self) -> String {
        format!(
            "{}://{}:{}@{}:{}/{}?ssl-mode=DISABLED",
            self.driver, self.user, self.password, self.host, self.port, self.database
        )
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "KO_DB_DRIVER",
            driver,
            "KO_DB_HOST",
            host,
            "KO_DB_PORT",
            port,
            "KO_DB_USER",
            user,
            "KO_DB_PASSWORD",
            password,
            "KO_DB_DATABASE",
            database,
            "KO_DB_PREFIX",
            prefix,
        );

        self
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            driver: String::from("mysql"),
            host: String::from("localhost"),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::from("knockout"),
            prefix: String::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Authorization {
    pub alg: Algorithm,
    /// The shared secret used to validate bearer tokens.
    pub secret: String,
}

impl Authorization {
    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "KO_AUTH_ALG", alg, "KO_AUTH_SECRET", secret);

        self
    }
}

impl Default for Authorization {
    fn default() -> Self {
        Self {
            alg: Algorithm::HS256,
            secret: String::new(),
        }
    }
}

// Never print the secret.
impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
