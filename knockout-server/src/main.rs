mod auth;
mod config;
mod http;
mod logger;
mod signal;
mod state;
mod store;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use hyper::StatusCode;
use knockout_core::{Caller, Role};
use thiserror::Error;

pub use config::Config;
pub use state::State;

use auth::{Authorization, Claims};
use config::ConfigError;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the config file.
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Signs a bearer token with the configured secret and prints it.
    Token {
        /// The id of the user the token is issued to.
        #[arg(long, default_value_t = 0)]
        sub: u64,
        /// Grant admin privileges.
        #[arg(long)]
        admin: bool,
        /// The team the token holder is a member of.
        #[arg(long)]
        team: Option<String>,
        /// Lifetime of the token in seconds.
        #[arg(long, default_value_t = 86400)]
        ttl: u64,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_file(&args.config).await {
        Ok(config) => config.with_environment(),
        Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            eprintln!(
                "Config file {:?} not found, using default config",
                args.config
            );

            Config::default().with_environment()
        }
        Err(err) => {
            eprintln!("Failed to load config file {:?}: {}", args.config, err);
            process::exit(1);
        }
    };

    if let Some(Command::Token {
        sub,
        admin,
        team,
        ttl,
    }) = args.command
    {
        let caller = Caller {
            role: if admin { Role::Admin } else { Role::User },
            team,
        };

        let auth = match Authorization::from_config(&config.authorization) {
            Ok(auth) => auth,
            Err(err) => {
                eprintln!("Failed to sign token: {}", err);
                process::exit(1);
            }
        };

        match auth.encode_token(&Claims::new(sub, caller, ttl)) {
            Ok(token) => println!("{}", token),
            Err(err) => {
                eprintln!("Failed to sign token: {}", err);
                process::exit(1);
            }
        }

        return;
    }

    logger::init(config.loglevel);

    if let Err(err) = run(config).await {
        log::error!("{}", err);
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Error> {
    log::info!("Using store: {:?}", config.store);
    log::info!("Binding to {:?}", config.bind);

    let bind = config.bind.clone();
    let state = State::new(config)?;

    state.store.migrate().await?;

    let shutdown = state.shutdown.clone();
    tokio::task::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", err);
            return;
        }

        log::info!("Received shutdown signal");
        shutdown.terminate();
    });

    http::bind(bind, state).await
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    InvalidToken,
    #[error("no token secret configured: set authorization.secret or KO_AUTH_SECRET")]
    EmptySecret,
    #[error("the tournament was modified concurrently")]
    Conflict,
    #[error(transparent)]
    Core(#[from] knockout_core::Error),
    #[error(transparent)]
    StatusCodeError(#[from] StatusCodeError),
}

/// An error with an explicit HTTP status code. The message is returned to the client.
#[derive(Clone, Debug, Error)]
#[error("{code}: {message}")]
pub struct StatusCodeError {
    pub code: StatusCode,
    pub message: String,
}

impl StatusCodeError {
    pub fn new<T>(code: StatusCode, message: T) -> Self
    where
        T: ToString,
    {
        Self {
            code,
            message: message.to_string(),
        }
    }

    /// Replaces the message of the error.
    pub fn message<T>(mut self, message: T) -> Self
    where
        T: ToString,
    {
        self.message = message.to_string();
        self
    }

    fn from_code(code: StatusCode) -> Self {
        Self::new(code, code.canonical_reason().unwrap_or_default())
    }

    /// 400 Bad Request
    pub fn bad_request() -> Self {
        Self::from_code(StatusCode::BAD_REQUEST)
    }

    /// 401 Unauthorized
    pub fn unauthorized() -> Self {
        Self::from_code(StatusCode::UNAUTHORIZED)
    }

    /// 403 Forbidden
    pub fn forbidden() -> Self {
        Self::from_code(StatusCode::FORBIDDEN)
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::from_code(StatusCode::NOT_FOUND)
    }

    /// 405 Method Not Allowed
    pub fn method_not_allowed() -> Self {
        Self::from_code(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// 408 Request Timeout
    pub fn request_timeout() -> Self {
        Self::from_code(StatusCode::REQUEST_TIMEOUT)
    }

    /// 409 Conflict
    pub fn conflict() -> Self {
        Self::from_code(StatusCode::CONFLICT)
    }

    /// 411 Length Required
    pub fn length_required() -> Self {
        Self::from_code(StatusCode::LENGTH_REQUIRED)
    }

    /// 413 Payload Too Large
    pub fn payload_too_large() -> Self {
        Self::from_code(StatusCode::PAYLOAD_TOO_LARGE)
    }

    /// 500 Internal Server Error
    pub fn internal_server_error() -> Self {
        Self::from_code(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
