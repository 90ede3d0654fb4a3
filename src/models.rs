// src/models.rs

use crate::core::values::{TypeDescriptor, Value, parse_bool};
use crate::error::DispatchError;

// --- MODELS FOR ARGUMENT PARSING ---
// Plain records produced by the tokenizer and consumed by the dispatcher.
// They are rebuilt on every dispatch call and never shared between calls.

/// A flag token together with the contiguous run of non-flag tokens after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// The flag name without its leading dashes.
    pub name: String,
    /// Index of the flag token in the token list it was read from.
    pub position: usize,
    /// Tokens following the flag, up to the next flag or the end of the line.
    pub parameters: Vec<String>,
}

impl Argument {
    /// Returns a copy of this argument keeping at most `count` parameters.
    pub fn trimmed(&self, count: usize) -> Self {
        Self {
            name: self.name.clone(),
            position: self.position,
            parameters: self.parameters.iter().take(count).cloned().collect(),
        }
    }

    /// Number of tokens this argument occupies, flag included.
    pub fn span(&self) -> usize {
        1 + self.parameters.len()
    }

    /// The first parameter, or an empty string when the flag stands alone.
    pub fn first_parameter(&self) -> &str {
        self.parameters.first().map(String::as_str).unwrap_or("")
    }
}

/// Declarative metadata attached to anything a flag can be bound to.
#[derive(Debug, Clone)]
pub struct FlagSpec {
    /// Names (case-insensitive) the flag answers to. Empty for router
    /// assignments, whose names come from the router key.
    pub names: Vec<String>,
    /// Type the flag value is converted into.
    pub descriptor: TypeDescriptor,
    /// Allows the flag to appear with no value.
    pub optional: bool,
    /// Excludes the target from flag matching entirely.
    pub hidden: bool,
}

impl FlagSpec {
    pub(crate) fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            names: Vec::new(),
            descriptor,
            optional: false,
            hidden: false,
        }
    }

    /// Checks whether the given flag name selects this spec.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim_start_matches('-');
        !self.hidden
            && self
                .names
                .iter()
                .any(|n| n.trim_start_matches('-').eq_ignore_ascii_case(name))
    }

    /// Trims the parameters of `arg` to what a single-value target accepts.
    ///
    /// # Logic:
    /// - Booleans keep their first parameter only if it parses as a boolean,
    ///   otherwise the flag fires on its own with the value `true`.
    /// - Every other type keeps exactly one parameter.
    /// - A missing value is an error unless the spec is optional.
    pub fn trim(&self, arg: &Argument) -> Result<Argument, DispatchError> {
        if self.descriptor.is_bool() {
            let keep = arg
                .parameters
                .first()
                .is_some_and(|p| parse_bool(p).is_some());
            return Ok(arg.trimmed(usize::from(keep)));
        }
        if arg.parameters.is_empty() && !self.optional {
            return Err(DispatchError::MissingValue {
                flag: arg.name.clone(),
                expected: self.descriptor.name().to_string(),
            });
        }
        Ok(arg.trimmed(1))
    }
}

/// Everything a callable needs for one invocation, already converted.
#[derive(Debug, Default)]
pub struct Invocation {
    /// Receiver field values, by index into the callable's field list.
    pub fields: Vec<(usize, Value)>,
    /// Unknown flags captured for the receiver's wildcard collector.
    pub extras: Vec<(String, String)>,
    /// Positional parameters in signature order. A variadic tail is a single
    /// `Value::List`.
    pub params: Vec<Value>,
}
