pub use empower_e2e_core::*;

use miette::Diagnostic;
use std::fmt::Display;
use thiserror::Error;

use crate::{
    genesis::GenesisError, identity::IdentityError, network::CliError, network::SetupError,
    resolve::ResolveError,
};

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("setup error: {0}")]
    #[diagnostic(help("check the node logs under the network root"))]
    SetupError(#[from] SetupError),

    #[error("genesis error: {0}")]
    GenesisError(#[from] GenesisError),

    #[error("identity error: {0}")]
    IdentityError(#[from] IdentityError),

    #[error("cli error: {0}")]
    CliError(#[from] CliError),

    #[error("resolve error: {0}")]
    ResolveError(#[from] ResolveError),

    #[error("{0}")]
    Message(String),
}

impl Error {
    pub fn config(text: impl Display) -> Error {
        Error::ConfigError(text.to_string())
    }

    pub fn parse(error: impl Display) -> Error {
        Error::ParseError(error.to_string())
    }

    pub fn message(text: impl Into<String>) -> Error {
        Error::Message(text.into())
    }
}

impl From<::config::ConfigError> for Error {
    fn from(value: ::config::ConfigError) -> Self {
        Error::config(value)
    }
}
