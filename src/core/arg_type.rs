//! Bridges converted [`Value`]s and concrete Rust types.
//!
//! Every parameter of a handler and every assignment slot is an [`ArgType`].
//! The descriptor drives the converter, and `from_value` moves the converted
//! value into its final type.

use crate::core::custom_types::Input;
use crate::core::values::{
    ConversionError, FloatWidth, IntWidth, TypeDescriptor, TypeKind, Value,
};
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::time::Duration;
use url::Url;

/// A type that can be produced from a command-line string.
pub trait ArgType: Sized + 'static {
    /// Set only by [`Rest`], which consumes the remaining positional tokens.
    const VARIADIC: bool = false;

    /// Shape of the type. For variadic types this is the element type.
    fn descriptor() -> TypeDescriptor;

    /// Moves a converted value into `Self`.
    fn from_value(value: Value) -> Result<Self, ConversionError>;

    /// Inverse of `from_value`, used when a custom parser produces `Self`.
    fn into_value(self) -> Value {
        Value::Opaque(Box::new(self))
    }
}

fn mismatch<T>(value: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: std::any::type_name::<T>().to_string(),
        found: value.kind_name().to_string(),
    }
}

macro_rules! impl_signed {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(
            impl ArgType for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::new::<$ty>(TypeKind::Int($width))
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(v).map_err(|_| ConversionError::Overflow {
                            raw: v.to_string(),
                            type_name: stringify!($ty).to_string(),
                        }),
                        other => Err(mismatch::<$ty>(&other)),
                    }
                }

                fn into_value(self) -> Value {
                    Value::Int(i64::from(self))
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(
            impl ArgType for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::new::<$ty>(TypeKind::Uint($width))
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Uint(v) => <$ty>::try_from(v).map_err(|_| ConversionError::Overflow {
                            raw: v.to_string(),
                            type_name: stringify!($ty).to_string(),
                        }),
                        other => Err(mismatch::<$ty>(&other)),
                    }
                }

                fn into_value(self) -> Value {
                    Value::Uint(u64::from(self))
                }
            }
        )*
    };
}

impl_signed!(i8 => IntWidth::W8, i16 => IntWidth::W16, i32 => IntWidth::W32, i64 => IntWidth::W64);
impl_unsigned!(u8 => IntWidth::W8, u16 => IntWidth::W16, u32 => IntWidth::W32, u64 => IntWidth::W64);

impl ArgType for isize {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Int(IntWidth::Size))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(v) => Self::try_from(v).map_err(|_| ConversionError::Overflow {
                raw: v.to_string(),
                type_name: "isize".to_string(),
            }),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        i64::try_from(self).map_or_else(|_| Value::Opaque(Box::new(self)), Value::Int)
    }
}

impl ArgType for usize {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Uint(IntWidth::Size))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Uint(v) => Self::try_from(v).map_err(|_| ConversionError::Overflow {
                raw: v.to_string(),
                type_name: "usize".to_string(),
            }),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        u64::try_from(self).map_or_else(|_| Value::Opaque(Box::new(self)), Value::Uint)
    }
}

impl ArgType for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Float(FloatWidth::F64))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl ArgType for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Float(FloatWidth::F32))
    }

    // The converter has already rejected values outside the f32 range.
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(v as Self),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl ArgType for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Bool)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ArgType for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Str)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Str(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl ArgType for Duration {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Duration)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Duration(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Duration(self)
    }
}

impl<T: ArgType> ArgType for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Slice(Box::new(T::descriptor())))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(T::into_value).collect())
    }
}

/// `Option<T>` is the pointer kind: the value is converted as `T` and wrapped.
impl<T: ArgType> ArgType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(TypeKind::Pointer(Box::new(T::descriptor())))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Some(inner) => T::from_value(*inner).map(Some),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Some(inner) => Value::Some(Box::new(inner.into_value())),
            None => Value::Opaque(Box::new(None::<T>)),
        }
    }
}

impl<V: DeserializeOwned + 'static> ArgType for HashMap<String, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map::<Self>()
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        value.downcast()
    }
}

impl<V: DeserializeOwned + 'static> ArgType for BTreeMap<String, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map::<Self>()
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        value.downcast()
    }
}

macro_rules! impl_registered {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ArgType for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::new::<$ty>(TypeKind::Opaque)
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    value.downcast()
                }
            }
        )*
    };
}

// Convertible only through the registry built by `TypeRegistry::with_builtins`.
impl_registered!(File, Input, Url, DateTime<FixedOffset>);

/// The variadic tail of a handler. Consumes every remaining positional token,
/// converting each one as `T`. Must be the last parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rest<T>(pub Vec<T>);

impl<T> Rest<T> {
    /// The collected elements.
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> std::ops::Deref for Rest<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ArgType> ArgType for Rest<T> {
    const VARIADIC: bool = true;

    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(T::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::List(self.0.into_iter().map(T::into_value).collect())
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_bridge_checks_width() {
        assert_eq!(i8::from_value(Value::Int(-5)).unwrap(), -5);
        assert!(matches!(
            i8::from_value(Value::Int(300)),
            Err(ConversionError::Overflow { .. })
        ));
        assert!(matches!(
            u32::from_value(Value::Int(1)),
            Err(ConversionError::TypeMismatch { .. })
        ));
        assert!(matches!(42u16.into_value(), Value::Uint(42)));
    }

    #[test]
    fn test_option_is_pointer_kind() {
        let desc = Option::<bool>::descriptor();
        assert!(matches!(desc.kind(), TypeKind::Pointer(_)));
        assert!(desc.is_bool());
        assert_eq!(
            Option::<bool>::from_value(Value::Some(Box::new(Value::Bool(true)))).unwrap(),
            Some(true)
        );
    }

    #[test]
    fn test_rest_describes_its_element() {
        assert!(<Rest<String> as ArgType>::VARIADIC);
        assert!(!<Vec<String> as ArgType>::VARIADIC);
        assert!(Rest::<String>::descriptor().is::<String>());

        let rest = Rest::<i32>::from_value(Value::List(vec![Value::Int(1), Value::Int(2)])).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest.into_inner(), vec![1, 2]);
    }

    #[test]
    fn test_opaque_types_downcast() {
        let url = Url::parse("http://localhost").unwrap();
        let value = url.clone().into_value();
        assert_eq!(Url::from_value(value).unwrap(), url);
        assert!(Url::from_value(Value::Str("http://localhost".into())).is_err());
    }
}
