// src/core/output.rs

use crate::core::values::{FloatWidth, IntWidth, TypeDescriptor, TypeKind};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// One rendered result of a dispatch call.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Rendered through `Display`.
    Text(String),
    /// Collections and serializable structs, printed as compact JSON.
    Json(serde_json::Value),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}

/// Anything a command may return.
///
/// Each implementation reports its declared return types (for signatures)
/// and turns the returned value into outputs. An `Err` aborts dispatch and is
/// surfaced verbatim.
pub trait CommandReturn: 'static {
    /// Declared return types, in order.
    fn return_types() -> Vec<TypeDescriptor>;

    /// Renders the returned value, or hands back the error it carries.
    fn into_outputs(self) -> anyhow::Result<Vec<Output>>;
}

fn declared<T: ?Sized + 'static>(kind: TypeKind) -> Vec<TypeDescriptor> {
    vec![TypeDescriptor::new::<T>(kind)]
}

impl CommandReturn for () {
    fn return_types() -> Vec<TypeDescriptor> {
        Vec::new()
    }

    fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
        Ok(Vec::new())
    }
}

macro_rules! impl_display_return {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl CommandReturn for $ty {
                fn return_types() -> Vec<TypeDescriptor> {
                    declared::<$ty>($kind)
                }

                fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
                    Ok(vec![Output::Text(self.to_string())])
                }
            }
        )*
    };
}

impl_display_return!(
    i8 => TypeKind::Int(IntWidth::W8),
    i16 => TypeKind::Int(IntWidth::W16),
    i32 => TypeKind::Int(IntWidth::W32),
    i64 => TypeKind::Int(IntWidth::W64),
    isize => TypeKind::Int(IntWidth::Size),
    u8 => TypeKind::Uint(IntWidth::W8),
    u16 => TypeKind::Uint(IntWidth::W16),
    u32 => TypeKind::Uint(IntWidth::W32),
    u64 => TypeKind::Uint(IntWidth::W64),
    usize => TypeKind::Uint(IntWidth::Size),
    f32 => TypeKind::Float(FloatWidth::F32),
    f64 => TypeKind::Float(FloatWidth::F64),
    bool => TypeKind::Bool,
    char => TypeKind::Str,
    String => TypeKind::Str,
    &'static str => TypeKind::Str,
);

impl CommandReturn for Duration {
    fn return_types() -> Vec<TypeDescriptor> {
        declared::<Self>(TypeKind::Duration)
    }

    fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
        Ok(vec![Output::Text(format!("{self:?}"))])
    }
}

macro_rules! impl_json_return {
    ($($ty:ident < $($param:ident),+ >),* $(,)?) => {
        $(
            impl<$($param: Serialize + 'static),+> CommandReturn for $ty<$($param),+> {
                fn return_types() -> Vec<TypeDescriptor> {
                    declared::<Self>(TypeKind::Opaque)
                }

                fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
                    Ok(vec![Output::Json(serde_json::to_value(&self)?)])
                }
            }
        )*
    };
}

impl_json_return!(Vec<T>, HashMap<K, V>, BTreeMap<K, V>);

/// Renders a serializable value as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize + 'static> CommandReturn for Json<T> {
    fn return_types() -> Vec<TypeDescriptor> {
        declared::<T>(TypeKind::Opaque)
    }

    fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
        Ok(vec![Output::Json(serde_json::to_value(&self.0)?)])
    }
}

/// Renders any `Display` value as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Text<T>(pub T);

impl<T: fmt::Display + 'static> CommandReturn for Text<T> {
    fn return_types() -> Vec<TypeDescriptor> {
        declared::<T>(TypeKind::Opaque)
    }

    fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
        Ok(vec![Output::Text(self.0.to_string())])
    }
}

/// `None` produces no output.
impl<T: CommandReturn> CommandReturn for Option<T> {
    fn return_types() -> Vec<TypeDescriptor> {
        T::return_types()
    }

    fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
        self.map_or_else(|| Ok(Vec::new()), T::into_outputs)
    }
}

impl<T, E> CommandReturn for Result<T, E>
where
    T: CommandReturn,
    E: Into<anyhow::Error> + 'static,
{
    fn return_types() -> Vec<TypeDescriptor> {
        let mut types = T::return_types();
        types.push(TypeDescriptor::new::<E>(TypeKind::Interface));
        types
    }

    fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
        match self {
            Ok(value) => value.into_outputs(),
            Err(e) => Err(e.into()),
        }
    }
}

macro_rules! impl_tuple_return {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: CommandReturn),+> CommandReturn for ($($name,)+) {
            fn return_types() -> Vec<TypeDescriptor> {
                let mut types = Vec::new();
                $(types.extend($name::return_types());)+
                types
            }

            fn into_outputs(self) -> anyhow::Result<Vec<Output>> {
                let ($($name,)+) = self;
                let mut outputs = Vec::new();
                $(outputs.extend($name.into_outputs()?);)+
                Ok(outputs)
            }
        }
    };
}

impl_tuple_return!(R1, R2);
impl_tuple_return!(R1, R2, R3);

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Serialize)]
    struct Entry {
        name: String,
        size: u64,
    }

    #[test]
    fn test_primitives_render_as_text() {
        assert_eq!(42i32.into_outputs().unwrap(), vec![Output::Text("42".into())]);
        assert_eq!(true.into_outputs().unwrap()[0].to_string(), "true");
        assert_eq!(
            Duration::from_millis(1500).into_outputs().unwrap()[0].to_string(),
            "1.5s"
        );
        assert!(().into_outputs().unwrap().is_empty());
    }

    #[test]
    fn test_collections_render_as_json() {
        let out = vec!["a".to_string(), "b".to_string()].into_outputs().unwrap();
        assert_eq!(out[0].to_string(), r#"["a","b"]"#);

        let mut map = BTreeMap::new();
        map.insert("k".to_string(), 1);
        assert_eq!(map.into_outputs().unwrap()[0].to_string(), r#"{"k":1}"#);

        let entry = Json(Entry {
            name: "a.txt".into(),
            size: 3,
        });
        assert_eq!(
            entry.into_outputs().unwrap()[0].to_string(),
            r#"{"name":"a.txt","size":3}"#
        );
    }

    #[test]
    fn test_result_error_aborts() {
        let ok: Result<i64, anyhow::Error> = Ok(7);
        assert_eq!(ok.into_outputs().unwrap()[0].to_string(), "7");

        let err: Result<i64, anyhow::Error> = Err(anyhow!("disk full"));
        assert_eq!(err.into_outputs().unwrap_err().to_string(), "disk full");

        let types = <Result<(), std::io::Error> as CommandReturn>::return_types();
        assert_eq!(types.len(), 1);
        assert!(matches!(types[0].kind(), TypeKind::Interface));
    }

    #[test]
    fn test_tuples_and_options() {
        let out = ("x".to_string(), None::<i32>, Text('c')).into_outputs().unwrap();
        assert_eq!(out, vec![Output::Text("x".into()), Output::Text("c".into())]);
        assert_eq!(<(i8, u8)>::return_types().len(), 2);
    }
}
