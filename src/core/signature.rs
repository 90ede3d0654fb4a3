//! # Signatures
//!
//! Static shape of a callable: its ordered parameter types, its return types
//! and whether the last parameter is a variadic tail. Plain functions and
//! closures implement [`Handler`]; functions taking a receiver as their first
//! argument implement [`MethodHandler`], and the receiver is left out of the
//! parameter list.

use crate::core::arg_type::ArgType;
use crate::core::output::CommandReturn;
use crate::core::values::{ConversionError, TypeDescriptor, Value};
use crate::error::ConfigError;
use std::fmt;

/// One declared parameter of a handler.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    /// Declared type. The element type for a variadic tail.
    pub descriptor: TypeDescriptor,
    /// Set for a [`crate::Rest`] parameter.
    pub variadic: bool,
}

impl ParamInfo {
    /// Describes a parameter of type `T`.
    pub fn of<T: ArgType>() -> Self {
        Self {
            descriptor: T::descriptor(),
            variadic: T::VARIADIC,
        }
    }
}

/// Ordered parameter and return types of a callable.
///
/// When `is_variadic` is set, the last parameter type is the element type of
/// the variadic tail.
#[derive(Debug, Clone)]
pub struct Signature {
    param_types: Vec<TypeDescriptor>,
    return_types: Vec<TypeDescriptor>,
    is_variadic: bool,
}

impl Signature {
    /// Builds a signature from declared parameters, checking that only the
    /// last one is variadic.
    pub fn from_params(
        name: &str,
        params: Vec<ParamInfo>,
        return_types: Vec<TypeDescriptor>,
    ) -> Result<Self, ConfigError> {
        let last = params.len().saturating_sub(1);
        if params.iter().enumerate().any(|(i, p)| p.variadic && i != last) {
            return Err(ConfigError::VariadicNotLast(name.to_string()));
        }
        let is_variadic = params.last().is_some_and(|p| p.variadic);
        Ok(Self {
            param_types: params.into_iter().map(|p| p.descriptor).collect(),
            return_types,
            is_variadic,
        })
    }

    /// Parameter types in order. A variadic tail is its element type.
    pub fn param_types(&self) -> &[TypeDescriptor] {
        &self.param_types
    }

    /// Return types in order, error slot included.
    pub fn return_types(&self) -> &[TypeDescriptor] {
        &self.return_types
    }

    /// Whether the last parameter is a variadic tail.
    pub fn is_variadic(&self) -> bool {
        self.is_variadic
    }

    /// Number of fixed (non-variadic) parameters.
    pub fn arity(&self) -> usize {
        if self.is_variadic {
            self.param_types.len().saturating_sub(1)
        } else {
            self.param_types.len()
        }
    }

    /// Element type of the variadic tail, if any.
    pub fn variadic_type(&self) -> Option<&TypeDescriptor> {
        if self.is_variadic {
            self.param_types.last()
        } else {
            None
        }
    }

    /// Fixed parameter types, variadic tail excluded.
    pub fn fixed_types(&self) -> &[TypeDescriptor] {
        self.param_types
            .get(..self.arity())
            .unwrap_or(self.param_types.as_slice())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .fixed_types()
            .iter()
            .map(|t| t.name().to_string())
            .chain(self.variadic_type().map(|t| format!("...{}", t.name())))
            .collect();
        let returns: Vec<&str> = self.return_types.iter().map(TypeDescriptor::name).collect();
        write!(f, "[{}]  Returns [{}]", params.join(", "), returns.join(", "))
    }
}

/// A free function or closure usable as a command.
///
/// Implemented for every `Fn(A, B, ..) -> R` of up to twelve [`ArgType`]
/// parameters whose return type is a [`CommandReturn`].
pub trait Handler<Args>: 'static {
    /// What the function returns.
    type Output: CommandReturn;

    /// Declared parameters, in order.
    fn params() -> Vec<ParamInfo>;

    /// Moves each value into its parameter type and calls the function.
    fn call(&self, args: Vec<Value>) -> Result<Self::Output, ConversionError>;
}

/// A function taking a receiver `&S` ahead of its command parameters.
pub trait MethodHandler<S, Args>: 'static {
    /// What the method returns.
    type Output: CommandReturn;

    /// Declared parameters after the receiver.
    fn params() -> Vec<ParamInfo>;

    /// Calls the method on `receiver` with the converted values.
    fn call(&self, receiver: &S, args: Vec<Value>) -> Result<Self::Output, ConversionError>;
}

fn next_arg<T: ArgType>(args: &mut std::vec::IntoIter<Value>) -> Result<T, ConversionError> {
    let value = args.next().ok_or_else(|| ConversionError::TypeMismatch {
        expected: T::descriptor().name().to_string(),
        found: "no value".to_string(),
    })?;
    T::from_value(value)
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables, unused_mut)]
        impl<Func, Ret, $($ty,)*> Handler<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Ret + 'static,
            Ret: CommandReturn,
            $($ty: ArgType,)*
        {
            type Output = Ret;

            fn params() -> Vec<ParamInfo> {
                vec![$(ParamInfo::of::<$ty>()),*]
            }

            fn call(&self, args: Vec<Value>) -> Result<Ret, ConversionError> {
                let mut args = args.into_iter();
                $(let $ty = next_arg::<$ty>(&mut args)?;)*
                Ok(self($($ty),*))
            }
        }

        #[allow(non_snake_case, unused_variables, unused_mut)]
        impl<Func, Recv, Ret, $($ty,)*> MethodHandler<Recv, ($($ty,)*)> for Func
        where
            Func: Fn(&Recv, $($ty),*) -> Ret + 'static,
            Ret: CommandReturn,
            $($ty: ArgType,)*
        {
            type Output = Ret;

            fn params() -> Vec<ParamInfo> {
                vec![$(ParamInfo::of::<$ty>()),*]
            }

            fn call(&self, receiver: &Recv, args: Vec<Value>) -> Result<Ret, ConversionError> {
                let mut args = args.into_iter();
                $(let $ty = next_arg::<$ty>(&mut args)?;)*
                Ok(self(receiver, $($ty),*))
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);

/// Derives the signature of a function or closure.
pub fn signature_of<Args, H: Handler<Args>>(name: &str, _handler: &H) -> Result<Signature, ConfigError> {
    Signature::from_params(name, H::params(), H::Output::return_types())
}

/// Derives the signature of a method, leaving out its receiver.
pub fn method_signature_of<S, Args, H: MethodHandler<S, Args>>(
    name: &str,
    _handler: &H,
) -> Result<Signature, ConfigError> {
    Signature::from_params(name, H::params(), H::Output::return_types())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arg_type::Rest;

    fn add(a: i32, b: i32) -> i32 {
        a + b
    }

    fn greet(prefix: String, names: Rest<String>) -> String {
        format!("{prefix} {}", names.join(" "))
    }

    fn misplaced(_rest: Rest<String>, _last: i32) {}

    fn fallible(value: u8) -> Result<u8, std::io::Error> {
        Ok(value)
    }

    struct Counter {
        step: i64,
    }

    fn bump(counter: &Counter, value: i64) -> i64 {
        value + counter.step
    }

    // --- Introspection ---
    #[test]
    fn test_plain_function_signature() {
        let sig = signature_of("add", &add).unwrap();
        assert_eq!(sig.param_types().len(), 2);
        assert!(sig.param_types().iter().all(|t| t.is::<i32>()));
        assert_eq!(sig.return_types().len(), 1);
        assert!(!sig.is_variadic());
        assert_eq!(sig.arity(), 2);
        assert_eq!(sig.to_string(), "[i32, i32]  Returns [i32]");
    }

    #[test]
    fn test_variadic_tail_is_element_type() {
        let sig = signature_of("greet", &greet).unwrap();
        assert!(sig.is_variadic());
        assert_eq!(sig.arity(), 1);
        assert!(sig.variadic_type().unwrap().is::<String>());
        assert_eq!(sig.to_string(), "[String, ...String]  Returns [String]");
    }

    #[test]
    fn test_variadic_must_be_last() {
        let err = signature_of("misplaced", &misplaced).unwrap_err();
        assert_eq!(err, ConfigError::VariadicNotLast("misplaced".to_string()));
    }

    #[test]
    fn test_all_return_types_are_captured() {
        let sig = signature_of("fallible", &fallible).unwrap();
        assert_eq!(sig.return_types().len(), 2);
        assert!(sig.return_types()[0].is::<u8>());

        let unit = signature_of("noop", &|| {}).unwrap();
        assert!(unit.return_types().is_empty());
        assert_eq!(unit.to_string(), "[]  Returns []");
    }

    #[test]
    fn test_method_excludes_receiver() {
        let sig = method_signature_of("bump", &bump).unwrap();
        assert_eq!(sig.param_types().len(), 1);
        assert!(sig.param_types()[0].is::<i64>());

        let counter = Counter { step: 2 };
        let out = MethodHandler::call(&bump, &counter, vec![Value::Int(40)]).unwrap();
        assert_eq!(out, 42);
    }

    // --- Invocation ---
    #[test]
    fn test_call_moves_values_into_parameters() {
        let out = Handler::call(&add, vec![Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(out, 5);

        let out = Handler::call(
            &greet,
            vec![
                Value::Str("hi".into()),
                Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]),
            ],
        )
        .unwrap();
        assert_eq!(out, "hi a b");

        assert!(Handler::call(&add, vec![Value::Int(2)]).is_err());
    }
}
