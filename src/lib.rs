//! Maps command-line arguments onto typed variables, functions and nested
//! command groups.
//!
//! A [`Router`] maps keys to assignment slots, callables or nested routers. A
//! [`Dispatcher`] tokenizes an argument list, applies the flags each level
//! knows, resolves the command and invokes it with converted parameters.

/// Process entry point.
pub mod cli;
/// Dispatch settings and their TOML loading.
pub mod config;
/// Defaults and reserved names.
pub mod constants;
/// The conversion and dispatch engine.
pub mod core;
/// Configuration and dispatch errors.
pub mod error;
/// Records shared by the tokenizer and the dispatcher.
pub mod models;

pub use crate::config::DispatchConfig;
pub use crate::core::arg_type::{ArgType, Rest};
pub use crate::core::custom_types::{Input, TypeRegistry};
pub use crate::core::dispatcher::{Dispatcher, HelpProvider, KeyListing};
pub use crate::core::fields::{Assignment, Field, Receiver, Slot, Wildcard};
pub use crate::core::output::{CommandReturn, Json, Output, Text};
pub use crate::core::router::{Callable, Router, Target};
pub use crate::core::signature::{Signature, signature_of};
pub use crate::core::values::{ConversionError, TypeDescriptor, TypeKind, Value};
pub use crate::error::{ConfigError, DispatchError};
