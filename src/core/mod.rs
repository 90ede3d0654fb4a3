// src/core/mod.rs

pub mod arg_type;
pub mod arguments;
pub mod custom_types;
pub mod dispatcher;
/// Slots, assignments and method receivers settable by flag.
pub mod fields;
/// What commands return and how it is printed.
pub mod output;
pub mod router;
pub mod signature;
pub mod values;
