//! # Values
//!
//! Converts raw command-line strings into typed [`Value`]s, driven by a
//! [`TypeDescriptor`]. The custom type registry is always consulted first;
//! only when no registered type matches are the built-in rules for each
//! [`TypeKind`] applied.

use crate::core::custom_types::TypeRegistry;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

lazy_static! {
    static ref TYPE_PATH_RE: Regex = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*::").unwrap();
    static ref DURATION_RE: Regex =
        Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|ms|s|m|h))+$").unwrap();
    static ref DURATION_PART_RE: Regex =
        Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|ms|s|m|h)").unwrap();
}

/// Boxed error produced by unmarshalling capabilities.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type DecodeText = fn(&str) -> Result<Box<dyn Any>, BoxError>;
type DecodeBytes = fn(&[u8]) -> Result<Box<dyn Any>, BoxError>;
type MakeZero = fn() -> Box<dyn Any>;

// --- ERRORS ---

/// Failure to turn a raw string into a value of the requested type.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The target kind has no conversion rule and no registry entry.
    #[error("{type_name} types are not supported as command line arguments")]
    TypeUnsupported {
        /// Display name of the target type.
        type_name: String,
    },
    /// The input does not follow the grammar of the target kind.
    #[error("'{raw}' could not be read as a {type_name}")]
    ParseFailed {
        /// The rejected input.
        raw: String,
        /// Display name of the target type.
        type_name: String,
    },
    /// A number that does not fit the width of the target.
    #[error("'{raw}' is out of range for a {type_name}")]
    Overflow {
        /// The rejected input.
        raw: String,
        /// Display name of the target type.
        type_name: String,
    },
    /// A struct decoder or registry parser rejected the input.
    #[error("'{raw}' could not be unmarshalled into a {type_name}: {source}")]
    UnmarshalFailed {
        /// The rejected input.
        raw: String,
        /// Display name of the target type.
        type_name: String,
        /// What the decoder reported.
        #[source]
        source: BoxError,
    },
    /// One segment of a delimited slice failed to convert.
    #[error("item '{segment}' could not be read as a {type_name}: {source}")]
    InvalidElement {
        /// The offending segment, trimmed.
        segment: String,
        /// Display name of the slice type.
        type_name: String,
        /// Why the segment failed.
        #[source]
        source: Box<ConversionError>,
    },
    /// A [`Value`] variant that the receiving Rust type cannot take.
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        /// The Rust type being filled.
        expected: String,
        /// The variant that arrived.
        found: String,
    },
}

impl ConversionError {
    fn parse_failed(raw: &str, target: &TypeDescriptor) -> Self {
        Self::ParseFailed {
            raw: raw.to_string(),
            type_name: target.name().to_string(),
        }
    }

    fn overflow(raw: &str, target: &TypeDescriptor) -> Self {
        Self::Overflow {
            raw: raw.to_string(),
            type_name: target.name().to_string(),
        }
    }

    pub(crate) fn unmarshal(raw: &str, target: &TypeDescriptor, source: BoxError) -> Self {
        Self::UnmarshalFailed {
            raw: raw.to_string(),
            type_name: target.name().to_string(),
            source,
        }
    }
}

// --- TYPE DESCRIPTORS ---

/// Storage width of an integer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    /// `i8` or `u8`.
    W8,
    /// `i16` or `u16`.
    W16,
    /// `i32` or `u32`.
    W32,
    /// `i64` or `u64`.
    W64,
    /// Pointer-sized, `isize` or `usize`.
    Size,
}

/// Storage width of a floating point kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    /// `f32`.
    F32,
    /// `f64`.
    F64,
}

/// Decoding capabilities of a struct-like type, in order of preference.
#[derive(Clone, Copy)]
pub struct StructCodec {
    zero: MakeZero,
    text: Option<DecodeText>,
    binary: Option<DecodeBytes>,
    json: Option<DecodeText>,
}

impl fmt::Debug for StructCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructCodec")
            .field("text", &self.text.is_some())
            .field("binary", &self.binary.is_some())
            .field("json", &self.json.is_some())
            .finish()
    }
}

/// JSON decoder of a map type.
#[derive(Clone, Copy)]
pub struct MapCodec {
    empty: MakeZero,
    decode: DecodeText,
}

impl fmt::Debug for MapCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapCodec")
    }
}

/// The closed set of shapes a conversion target can take.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Accepts the boolean grammar. Empty input means `true`.
    Bool,
    /// Signed integer of the given width.
    Int(IntWidth),
    /// Unsigned integer of the given width.
    Uint(IntWidth),
    /// Floating point number of the given width.
    Float(FloatWidth),
    /// Integer-backed span of time, parsed with the duration grammar.
    Duration,
    /// Text, passed through unchanged.
    Str,
    /// Delimited list of the element type.
    Slice(Box<TypeDescriptor>),
    /// JSON object keyed by strings.
    Map(MapCodec),
    /// Decoded through text, binary or JSON, in that order.
    Struct(StructCodec),
    /// An optional value; converts into the pointee and wraps it.
    Pointer(Box<TypeDescriptor>),
    /// An abstract capability, e.g. the error slot of a return type.
    Interface,
    /// A type known only by identity. Convertible solely through the registry.
    Opaque,
}

/// An immutable handle to the shape of a conversion target.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    name: String,
    kind: TypeKind,
}

impl TypeDescriptor {
    /// Describes the Rust type `T` as having the given kind.
    pub fn new<T: ?Sized + 'static>(kind: TypeKind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            kind,
        }
    }

    /// A distinct type built on top of `String`. It converts by passthrough.
    pub fn named_string<T: 'static>() -> Self {
        Self::new::<T>(TypeKind::Str)
    }

    /// A map type decoded from a JSON object.
    pub fn map<T: DeserializeOwned + Default + 'static>() -> Self {
        Self::new::<T>(TypeKind::Map(MapCodec {
            empty: zero_of::<T>,
            decode: json_of::<T>,
        }))
    }

    /// Starts describing a struct type. Its zero value is `T::default()`.
    pub fn structure<T: Default + 'static>() -> StructBuilder<T> {
        StructBuilder {
            codec: StructCodec {
                zero: zero_of::<T>,
                text: None,
                binary: None,
                json: None,
            },
            _marker: PhantomData,
        }
    }

    /// Identity of the described Rust type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Short display name, e.g. `Vec<i32>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape used to pick the conversion rule.
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Checks whether this descriptor describes `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Checks whether a value of type `other` may be stored in this type.
    pub fn is_assignable_from(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// True for booleans and optional booleans, which may stand alone as flags.
    pub fn is_bool(&self) -> bool {
        match &self.kind {
            TypeKind::Bool => true,
            TypeKind::Pointer(inner) => inner.is_bool(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Binary unmarshalling capability, the fallback after `FromStr`.
pub trait UnmarshalBinary: Sized {
    /// Decodes `data`, the raw argument bytes.
    fn unmarshal_binary(data: &[u8]) -> Result<Self, BoxError>;
}

/// Builder for struct descriptors returned by [`TypeDescriptor::structure`].
#[derive(Debug)]
pub struct StructBuilder<T> {
    codec: StructCodec,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Default + 'static> StructBuilder<T> {
    /// Decodes through `FromStr`. Preferred over every other capability.
    pub fn text(mut self) -> Self
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.codec.text = Some(text_of::<T>);
        self
    }

    /// Decodes the raw bytes through [`UnmarshalBinary`].
    pub fn binary(mut self) -> Self
    where
        T: UnmarshalBinary,
    {
        self.codec.binary = Some(binary_of::<T>);
        self
    }

    /// Decodes the raw string as a JSON document.
    pub fn json(mut self) -> Self
    where
        T: DeserializeOwned,
    {
        self.codec.json = Some(json_of::<T>);
        self
    }

    /// Finishes the descriptor.
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::new::<T>(TypeKind::Struct(self.codec))
    }
}

fn zero_of<T: Default + 'static>() -> Box<dyn Any> {
    Box::new(T::default())
}

fn text_of<T>(raw: &str) -> Result<Box<dyn Any>, BoxError>
where
    T: FromStr + 'static,
    T::Err: fmt::Display,
{
    match raw.parse::<T>() {
        Ok(v) => Ok(Box::new(v)),
        Err(e) => Err(e.to_string().into()),
    }
}

fn binary_of<T: UnmarshalBinary + 'static>(data: &[u8]) -> Result<Box<dyn Any>, BoxError> {
    Ok(Box::new(T::unmarshal_binary(data)?))
}

fn json_of<T: DeserializeOwned + 'static>(raw: &str) -> Result<Box<dyn Any>, BoxError> {
    Ok(Box::new(serde_json::from_str::<T>(raw)?))
}

/// Strips module paths from a `std::any::type_name`, e.g. `Vec<String>`.
pub(crate) fn short_type_name(full: &str) -> String {
    TYPE_PATH_RE.replace_all(full, "").into_owned()
}

// --- VALUES ---

/// A converted argument, not yet moved into its concrete Rust type.
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// Any signed integer, widened.
    Int(i64),
    /// Any unsigned integer, widened.
    Uint(u64),
    /// Any float, widened.
    Float(f64),
    /// A parsed duration.
    Duration(Duration),
    /// Text, including named-string types.
    Str(String),
    /// Slice elements, or the whole variadic tail.
    List(Vec<Value>),
    /// The pointee of an optional target.
    Some(Box<Value>),
    /// Structs, maps and registry-produced values.
    Opaque(Box<dyn Any>),
}

impl Value {
    /// Short name of the variant, for mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Duration(_) => "duration",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Some(_) => "pointer",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Moves an opaque value out as `T`.
    pub fn downcast<T: 'static>(self) -> Result<T, ConversionError> {
        let found = self.kind_name();
        match self {
            Self::Opaque(boxed) => boxed.downcast::<T>().map(|b| *b).map_err(|_| {
                ConversionError::TypeMismatch {
                    expected: short_type_name(std::any::type_name::<T>()),
                    found: "opaque value of another type".to_string(),
                }
            }),
            _ => Err(ConversionError::TypeMismatch {
                expected: short_type_name(std::any::type_name::<T>()),
                found: found.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Uint(v) => write!(f, "Uint({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Duration(v) => write!(f, "Duration({v:?})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Some(inner) => f.debug_tuple("Some").field(inner).finish(),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

// --- CONVERTER ---

/// Converts raw strings using a type registry and a slice delimiter.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'a> {
    types: &'a TypeRegistry,
    slice_delimiter: &'a str,
}

impl<'a> Converter<'a> {
    /// A converter consulting `types` first and splitting slices on `slice_delimiter`.
    pub fn new(types: &'a TypeRegistry, slice_delimiter: &'a str) -> Self {
        Self {
            types,
            slice_delimiter,
        }
    }

    /// Parses `raw` into a value of the type described by `target`.
    ///
    /// # Logic:
    /// - A registered custom type assignable to `target` always wins.
    /// - Pointers convert into their pointee and wrap the result.
    /// - Structs prefer `FromStr`, then binary, then JSON. Empty input is the zero value.
    /// - Slices split on the delimiter and convert each trimmed item.
    /// - Maps are JSON objects. Empty input is an empty map.
    /// - Numbers are parsed at full width, then checked against the target width.
    /// - Booleans default to `true` on empty input.
    pub fn convert(&self, raw: &str, target: &TypeDescriptor) -> Result<Value, ConversionError> {
        if let Some(entry) = self.types.find(target) {
            log::trace!("Converting '{}' with custom type {}", raw, entry.name());
            return entry.parse(raw, target);
        }

        match target.kind() {
            TypeKind::Pointer(inner) => Ok(Value::Some(Box::new(self.convert(raw, inner)?))),
            TypeKind::Struct(codec) => struct_from_string(raw, target, codec),
            TypeKind::Slice(element) => self.slice_from_string(raw, element),
            TypeKind::Map(codec) => map_from_string(raw, target, codec),
            TypeKind::Float(width) => float_from_string(raw, target, *width),
            TypeKind::Int(width) => int_from_string(raw, target, *width),
            TypeKind::Uint(width) => uint_from_string(raw, target, *width),
            TypeKind::Duration => parse_duration(raw, target).map(Value::Duration),
            TypeKind::Bool => bool_from_string(raw, target),
            TypeKind::Str => Ok(Value::Str(raw.to_string())),
            TypeKind::Interface | TypeKind::Opaque => Err(ConversionError::TypeUnsupported {
                type_name: target.name().to_string(),
            }),
        }
    }

    fn slice_from_string(
        &self,
        raw: &str,
        element: &TypeDescriptor,
    ) -> Result<Value, ConversionError> {
        if raw.is_empty() {
            return Ok(Value::List(Vec::new()));
        }
        let items = raw
            .split(self.slice_delimiter)
            .map(|segment| {
                let segment = segment.trim();
                self.convert(segment, element)
                    .map_err(|e| ConversionError::InvalidElement {
                        segment: segment.to_string(),
                        type_name: element.name().to_string(),
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::List(items))
    }
}

fn struct_from_string(
    raw: &str,
    target: &TypeDescriptor,
    codec: &StructCodec,
) -> Result<Value, ConversionError> {
    if raw.is_empty() {
        return Ok(Value::Opaque((codec.zero)()));
    }
    let decoded = if let Some(text) = codec.text {
        text(raw)
    } else if let Some(binary) = codec.binary {
        binary(raw.as_bytes())
    } else if let Some(json) = codec.json {
        json(raw)
    } else {
        return Err(ConversionError::TypeUnsupported {
            type_name: target.name().to_string(),
        });
    };
    decoded
        .map(Value::Opaque)
        .map_err(|e| ConversionError::unmarshal(raw, target, e))
}

fn map_from_string(
    raw: &str,
    target: &TypeDescriptor,
    codec: &MapCodec,
) -> Result<Value, ConversionError> {
    if raw.is_empty() {
        return Ok(Value::Opaque((codec.empty)()));
    }
    (codec.decode)(raw)
        .map(Value::Opaque)
        .map_err(|e| ConversionError::unmarshal(raw, target, e))
}

fn int_from_string(
    raw: &str,
    target: &TypeDescriptor,
    width: IntWidth,
) -> Result<Value, ConversionError> {
    let value = raw.parse::<i64>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
            ConversionError::overflow(raw, target)
        }
        _ => ConversionError::parse_failed(raw, target),
    })?;
    let fits = match width {
        IntWidth::W8 => i8::try_from(value).is_ok(),
        IntWidth::W16 => i16::try_from(value).is_ok(),
        IntWidth::W32 => i32::try_from(value).is_ok(),
        IntWidth::W64 => true,
        IntWidth::Size => isize::try_from(value).is_ok(),
    };
    if !fits {
        return Err(ConversionError::overflow(raw, target));
    }
    Ok(Value::Int(value))
}

fn uint_from_string(
    raw: &str,
    target: &TypeDescriptor,
    width: IntWidth,
) -> Result<Value, ConversionError> {
    let value = raw.parse::<u64>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => ConversionError::overflow(raw, target),
        _ => ConversionError::parse_failed(raw, target),
    })?;
    let fits = match width {
        IntWidth::W8 => u8::try_from(value).is_ok(),
        IntWidth::W16 => u16::try_from(value).is_ok(),
        IntWidth::W32 => u32::try_from(value).is_ok(),
        IntWidth::W64 => true,
        IntWidth::Size => usize::try_from(value).is_ok(),
    };
    if !fits {
        return Err(ConversionError::overflow(raw, target));
    }
    Ok(Value::Uint(value))
}

fn float_from_string(
    raw: &str,
    target: &TypeDescriptor,
    width: FloatWidth,
) -> Result<Value, ConversionError> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| ConversionError::parse_failed(raw, target))?;
    // Rust saturates to infinity where other grammars report a range error.
    if value.is_infinite() && !raw.to_ascii_lowercase().contains("inf") {
        return Err(ConversionError::overflow(raw, target));
    }
    if width == FloatWidth::F32 && value.is_finite() && value.abs() > f64::from(f32::MAX) {
        return Err(ConversionError::overflow(raw, target));
    }
    Ok(Value::Float(value))
}

fn bool_from_string(raw: &str, target: &TypeDescriptor) -> Result<Value, ConversionError> {
    if raw.is_empty() {
        return Ok(Value::Bool(true));
    }
    parse_bool(raw)
        .map(Value::Bool)
        .ok_or_else(|| ConversionError::parse_failed(raw, target))
}

/// Parses `1`, `t`, `true`, `0`, `f` and `false`, ignoring case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

/// Parses compound durations such as `24h`, `1h30m` or `1.5s`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted as the zero duration.
pub fn parse_duration(raw: &str, target: &TypeDescriptor) -> Result<Duration, ConversionError> {
    let raw = raw.trim();
    if raw == "0" {
        return Ok(Duration::ZERO);
    }
    if !DURATION_RE.is_match(raw) {
        return Err(ConversionError::parse_failed(raw, target));
    }

    let mut seconds = 0f64;
    for caps in DURATION_PART_RE.captures_iter(raw) {
        let amount = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| ConversionError::parse_failed(raw, target))?;
        let unit = match caps.get(2).map(|m| m.as_str()) {
            Some("ns") => 1e-9,
            Some("us") | Some("µs") => 1e-6,
            Some("ms") => 1e-3,
            Some("s") => 1.0,
            Some("m") => 60.0,
            Some("h") => 3600.0,
            _ => return Err(ConversionError::parse_failed(raw, target)),
        };
        seconds += amount * unit;
    }

    Duration::try_from_secs_f64(seconds).map_err(|_| ConversionError::overflow(raw, target))
}

// MARK: --- UNIT TESTS ---
