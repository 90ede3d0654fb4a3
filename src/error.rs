// src/error.rs

use crate::core::values::ConversionError;
use thiserror::Error;

/// A malformed router or command definition. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two keys of one router normalize to the same name.
    #[error("config error: command '{0}' is declared more than once")]
    DuplicateKey(String),
    /// A non-default key made only of commas, dashes or spaces.
    #[error("config error: key '{0}' does not contain a usable name")]
    EmptyKey(String),
    /// A [`crate::Rest`] parameter that is not the last one.
    #[error("config error: '{0}' declares a variadic parameter that is not the last parameter")]
    VariadicNotLast(String),
    /// A second registry entry for the same Rust type.
    #[error("config error: type {0} is already registered as a custom type")]
    DuplicateType(String),
}

/// Every way a dispatch call can fail.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The router definition itself is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A flag that no key, field or wildcard claims.
    #[error("-{0} is an unknown flag")]
    UnknownFlag(String),
    /// A bare `--`. It names nothing, so nothing can claim it.
    #[error("a flag token has no name after its dashes")]
    EmptyFlag,
    /// A command token that matches no key, with no default key to fall back to.
    #[error("'{0}' is not a known command")]
    UnknownCommand(String),
    /// Nothing left to run once the flags are applied.
    #[error("no command found")]
    NoCommandFound,
    /// A non-optional, non-bool assignment given no value.
    #[error("missing value for flag -{flag}, requires a {expected} value")]
    MissingValue {
        /// The flag or assignment name.
        flag: String,
        /// Display name of the expected type.
        expected: String,
    },
    /// Fewer positional tokens than fixed parameters.
    #[error("'{command}' has too few arguments. Requires arguments: {signature}, found {found:?}")]
    TooFewArguments {
        /// Name of the callable.
        command: String,
        /// Rendered [`crate::Signature`].
        signature: String,
        /// The tokens that were available.
        found: Vec<String>,
    },
    /// More positional tokens than a non-variadic callable takes.
    #[error("'{command}' has too many arguments. Requires arguments: {signature}, found {found:?}")]
    TooManyArguments {
        /// Name of the callable.
        command: String,
        /// Rendered [`crate::Signature`].
        signature: String,
        /// The tokens that were available.
        found: Vec<String>,
    },
    /// An [`crate::models::Argument`] whose recorded tokens were already removed.
    #[error("argument -{name} at position {position} no longer matches the command line")]
    StaleArgument {
        /// Flag name of the argument.
        name: String,
        /// Recorded position of the flag token.
        position: usize,
    },
    /// A token could not be converted into its target type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// The error a command returned, unchanged.
    #[error(transparent)]
    Callable(anyhow::Error),
}
