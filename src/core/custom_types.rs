//! # Custom Types
//!
//! An ordered registry of type-specific parsers that take precedence over the
//! built-in conversion rules. A handful of common types are pre-registered by
//! [`TypeRegistry::with_builtins`]: file handles, standard input, URLs, time
//! instants and durations.

use crate::core::arg_type::ArgType;
use crate::core::values::{BoxError, ConversionError, TypeDescriptor, Value, parse_duration};
use crate::error::ConfigError;
use chrono::{DateTime, FixedOffset};
use std::any::TypeId;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::time::Duration;
use url::Url;

type MatchFn = Box<dyn Fn(&TypeDescriptor) -> bool>;
type ParseFn = Box<dyn Fn(&str, &TypeDescriptor) -> Result<Value, ConversionError>>;

/// A single override: which targets it applies to and how it parses them.
pub struct ConversionEntry {
    name: String,
    type_id: Option<TypeId>,
    matcher: MatchFn,
    parse: ParseFn,
}

impl ConversionEntry {
    /// Display name of the entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this entry converts values for `target`.
    pub fn matches(&self, target: &TypeDescriptor) -> bool {
        (self.matcher)(target)
    }

    /// Runs the parser of this entry.
    pub fn parse(&self, raw: &str, target: &TypeDescriptor) -> Result<Value, ConversionError> {
        (self.parse)(raw, target)
    }
}

impl fmt::Debug for ConversionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered set of [`ConversionEntry`] values. The first matching
/// entry wins.
///
/// Populate it before dispatching. It is read-only while a command runs.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: Vec<ConversionEntry>,
}

impl TypeRegistry {
    /// An empty registry. Only the built-in kind rules apply.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in types, parsing time as RFC3339.
    pub fn with_builtins() -> Self {
        Self::with_time_format(None)
    }

    /// A registry holding the built-in types. `time_format` is a chrono
    /// format string used instead of RFC3339 when set.
    pub fn with_time_format(time_format: Option<&str>) -> Self {
        let mut registry = Self::new();
        registry.push_typed::<File, _>(|raw| Ok(File::open(raw)?));
        registry.push_typed::<Input, _>(|raw| Ok(Input::open(raw)?));
        registry.push_typed::<Url, _>(|raw| Ok(Url::parse(raw)?));

        let format = time_format.map(str::to_string);
        registry.push_typed::<DateTime<FixedOffset>, _>(move |raw| {
            let parsed = match &format {
                Some(fmt) => DateTime::parse_from_str(raw, fmt)?,
                None => DateTime::parse_from_rfc3339(raw)?,
            };
            Ok(parsed)
        });

        registry.entries.push(ConversionEntry {
            name: "Duration".to_string(),
            type_id: Some(TypeId::of::<Duration>()),
            matcher: Box::new(|target| target.is::<Duration>()),
            parse: Box::new(|raw, target| parse_duration(raw, target).map(Value::Duration)),
        });
        registry
    }

    /// Registers `parser` for the type `T`.
    ///
    /// Fails with [`ConfigError::DuplicateType`] if `T` already has a parser;
    /// call [`TypeRegistry::remove`] first to replace one.
    pub fn register_type<T, F>(&mut self, parser: F) -> Result<&mut Self, ConfigError>
    where
        T: ArgType,
        F: Fn(&str) -> Result<T, BoxError> + 'static,
    {
        if self.contains::<T>() {
            return Err(ConfigError::DuplicateType(
                T::descriptor().name().to_string(),
            ));
        }
        self.push_typed::<T, F>(parser);
        Ok(self)
    }

    /// Registers a parser for every target accepted by `predicate`.
    pub fn register_matching<P, F>(&mut self, name: &str, predicate: P, parser: F) -> &mut Self
    where
        P: Fn(&TypeDescriptor) -> bool + 'static,
        F: Fn(&str, &TypeDescriptor) -> Result<Value, ConversionError> + 'static,
    {
        self.entries.push(ConversionEntry {
            name: name.to_string(),
            type_id: None,
            matcher: Box::new(predicate),
            parse: Box::new(parser),
        });
        self
    }

    /// Removes the parser registered for `T`. Returns whether one existed.
    pub fn remove<T: 'static>(&mut self) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.type_id != Some(TypeId::of::<T>()));
        self.entries.len() != before
    }

    /// Whether `T` has an entry of its own.
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.type_id == Some(TypeId::of::<T>()))
    }

    /// The first entry whose registered type can be stored in `target`.
    pub fn find(&self, target: &TypeDescriptor) -> Option<&ConversionEntry> {
        self.entries.iter().find(|entry| entry.matches(target))
    }

    /// Whether some entry converts values for `target`.
    pub fn is_custom_type(&self, target: &TypeDescriptor) -> bool {
        self.find(target).is_some()
    }

    /// Number of entries, built-ins included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_typed<T, F>(&mut self, parser: F)
    where
        T: ArgType,
        F: Fn(&str) -> Result<T, BoxError> + 'static,
    {
        let descriptor = T::descriptor();
        self.entries.push(ConversionEntry {
            name: descriptor.name().to_string(),
            type_id: Some(descriptor.id()),
            matcher: Box::new(move |target| target.is_assignable_from(&descriptor)),
            parse: Box::new(move |raw, target| {
                parser(raw)
                    .map(T::into_value)
                    .map_err(|e| ConversionError::unmarshal(raw, target, e))
            }),
        });
    }
}

// --- BUILT-IN TYPES ---

/// A readable input named on the command line. `-` selects standard input.
#[derive(Debug)]
pub enum Input {
    /// Standard input, selected with `-`.
    Stdin(io::Stdin),
    /// A file opened by path.
    File(File),
}

impl Input {
    /// Opens `raw` as a file, or standard input for `-`.
    pub fn open(raw: &str) -> io::Result<Self> {
        if raw == "-" {
            return Ok(Self::Stdin(io::stdin()));
        }
        File::open(raw).map(Self::File)
    }

    /// True when reading from standard input.
    pub fn is_stdin(&self) -> bool {
        matches!(self, Self::Stdin(_))
    }
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Stdin(stdin) => stdin.read(buf),
            Self::File(file) => file.read(buf),
        }
    }
}

// MARK: --- UNIT TESTS ---
