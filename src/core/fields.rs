// src/core/fields.rs

use crate::core::arg_type::ArgType;
use crate::core::values::{ConversionError, Value};
use crate::models::{FlagSpec, Invocation};
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// --- SLOTS ---

/// A shared variable that a router can assign from the command line.
///
/// Cloning a slot clones the handle, not the value.
pub struct Slot<T>(Rc<RefCell<T>>);

impl<T> Slot<T> {
    /// A new slot holding `value`.
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Overwrites the held value.
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    /// Overwrites the held value and returns the old one.
    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    /// Borrows the held value.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Runs `f` on the held value.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl<T: Clone> Slot<T> {
    /// A copy of the held value.
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.0.borrow()).finish()
    }
}

// --- ASSIGNMENTS ---

type Setter = Box<dyn Fn(Value) -> Result<(), ConversionError>>;

/// Router target that writes a converted value into a [`Slot`].
pub struct Assignment {
    spec: FlagSpec,
    setter: Setter,
}

impl Assignment {
    /// Assigns into `slot`.
    pub fn new<T: ArgType>(slot: &Slot<T>) -> Self {
        let slot = slot.clone();
        Self {
            spec: FlagSpec::new(T::descriptor()),
            setter: Box::new(move |value| {
                slot.set(T::from_value(value)?);
                Ok(())
            }),
        }
    }

    /// Accept the flag with no value. The empty string is converted instead.
    pub fn optional(mut self) -> Self {
        self.spec.optional = true;
        self
    }

    /// Never match this assignment as a flag. It stays reachable as a command.
    pub fn hidden(mut self) -> Self {
        self.spec.hidden = true;
        self
    }

    /// How this assignment matches and trims flags.
    pub fn spec(&self) -> &FlagSpec {
        &self.spec
    }

    /// Writes an already converted value into the slot.
    pub fn assign(&self, value: Value) -> Result<(), ConversionError> {
        (self.setter)(value)
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assignment")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Collects unmatched flags into a shared map, keyed by flag name.
pub struct Wildcard {
    sink: Box<dyn Fn(String, String)>,
}

impl Wildcard {
    /// Collects into the map held by `slot`.
    pub fn new(slot: &Slot<HashMap<String, String>>) -> Self {
        let slot = slot.clone();
        Self::from_fn(move |name, value| {
            slot.with(|map| map.insert(name, value));
        })
    }

    /// Hands each captured flag name and value to `sink`.
    pub fn from_fn(sink: impl Fn(String, String) + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Records one unmatched flag.
    pub fn collect(&self, name: String, value: String) {
        (self.sink)(name, value);
    }
}

impl fmt::Debug for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Wildcard")
    }
}

// --- RECEIVER FIELDS ---

type FieldSetter<S> = Box<dyn Fn(&mut S, Value) -> Result<(), ConversionError>>;
type WildcardAccess<S> = Box<dyn Fn(&mut S) -> &mut HashMap<String, String>>;

/// A receiver field settable by flag. Answers to every name it declares.
pub struct Field<S> {
    spec: FlagSpec,
    setter: FieldSetter<S>,
}

impl<S: 'static> Field<S> {
    /// `names` may hold several comma-separated names, e.g. `"verbose,v"`.
    pub fn new<T: ArgType>(names: &str, setter: impl Fn(&mut S, T) + 'static) -> Self {
        let mut spec = FlagSpec::new(T::descriptor());
        spec.names = names
            .split(',')
            .map(|n| n.trim().trim_start_matches('-').to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self {
            spec,
            setter: Box::new(move |receiver, value| {
                setter(receiver, T::from_value(value)?);
                Ok(())
            }),
        }
    }

    /// Adds another name. Leading dashes are ignored.
    pub fn alias(mut self, name: &str) -> Self {
        self.spec
            .names
            .push(name.trim().trim_start_matches('-').to_string());
        self
    }

    /// Accept the flag with no value.
    pub fn optional(mut self) -> Self {
        self.spec.optional = true;
        self
    }

    /// Never match this field as a flag.
    pub fn hidden(mut self) -> Self {
        self.spec.hidden = true;
        self
    }

    /// Names and options of this field.
    pub fn spec(&self) -> &FlagSpec {
        &self.spec
    }
}

impl<S> fmt::Debug for Field<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// How to build the receiver of a method command, and which of its fields
/// accept flags.
///
/// A fresh receiver is built for every invocation.
pub struct Receiver<S> {
    factory: Box<dyn Fn() -> S>,
    fields: Vec<Field<S>>,
    wildcard: Option<WildcardAccess<S>>,
}

impl<S: 'static> Receiver<S> {
    /// Builds each receiver with `factory`.
    pub fn new(factory: impl Fn() -> S + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            fields: Vec::new(),
            wildcard: None,
        }
    }

    /// Declares a field settable by flag.
    pub fn field(mut self, field: Field<S>) -> Self {
        self.fields.push(field);
        self
    }

    /// Routes unmatched flags into the map returned by `access`.
    pub fn wildcard(
        mut self,
        access: impl Fn(&mut S) -> &mut HashMap<String, String> + 'static,
    ) -> Self {
        self.wildcard = Some(Box::new(access));
        self
    }

    /// Flag specs of the declared fields, in order.
    pub fn specs(&self) -> Vec<FlagSpec> {
        self.fields.iter().map(|f| f.spec.clone()).collect()
    }

    /// Whether unmatched flags go to the receiver.
    pub fn has_wildcard(&self) -> bool {
        self.wildcard.is_some()
    }

    /// Builds a receiver and applies the converted field values and the
    /// wildcard captures of `invocation`.
    pub(crate) fn build(&self, invocation: &mut Invocation) -> Result<S, ConversionError> {
        let mut receiver = (self.factory)();
        for (index, value) in invocation.fields.drain(..) {
            if let Some(field) = self.fields.get(index) {
                (field.setter)(&mut receiver, value)?;
            }
        }
        if let Some(access) = &self.wildcard {
            let map = access(&mut receiver);
            for (name, value) in invocation.extras.drain(..) {
                map.insert(name, value);
            }
        }
        Ok(receiver)
    }
}

impl<S: Default + 'static> Default for Receiver<S> {
    fn default() -> Self {
        Self::new(S::default)
    }
}

impl<S> fmt::Debug for Receiver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("fields", &self.fields)
            .field("wildcard", &self.wildcard.is_some())
            .finish_non_exhaustive()
    }
}
