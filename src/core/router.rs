//! # Router
//!
//! One level of the command tree: an insertion-ordered mapping from keys to
//! [`Target`]s. A key may hold several comma-separated aliases, compared
//! case-insensitively with leading dashes ignored. The empty key is the
//! default target, used when the first token names no other key.
//!
//! Keys are only validated when the router is indexed at dispatch time, so a
//! conflicting configuration surfaces as a [`ConfigError`] on first use.

use crate::constants::DEFAULT_KEY;
use crate::core::arg_type::ArgType;
use crate::core::fields::{Assignment, Receiver, Slot, Wildcard};
use crate::core::output::{CommandReturn, Output};
use crate::core::signature::{Handler, MethodHandler, Signature, method_signature_of, signature_of};
use crate::core::values::short_type_name;
use crate::error::{ConfigError, DispatchError};
use crate::models::{FlagSpec, Invocation};
use std::fmt;

/// What a router key maps to.
#[derive(Debug)]
pub enum Target {
    /// Writes the converted value into a slot.
    Assignment(Assignment),
    /// Calls a function or method.
    Callable(Callable),
    /// Descends into a nested command group.
    Router(Router),
}

impl From<Assignment> for Target {
    fn from(value: Assignment) -> Self {
        Self::Assignment(value)
    }
}

impl From<Callable> for Target {
    fn from(value: Callable) -> Self {
        Self::Callable(value)
    }
}

impl From<Router> for Target {
    fn from(value: Router) -> Self {
        Self::Router(value)
    }
}

// --- CALLABLES ---

type Invoke = Box<dyn Fn(Invocation) -> Result<Vec<Output>, DispatchError>>;

/// A function or method bound as a command, with its derived signature.
pub struct Callable {
    name: String,
    signature: Result<Signature, ConfigError>,
    fields: Vec<FlagSpec>,
    has_wildcard: bool,
    invoke: Invoke,
}

impl Callable {
    /// Wraps a free function or closure.
    pub fn function<Args, H: Handler<Args>>(handler: H) -> Self {
        let name = short_type_name(std::any::type_name::<H>());
        let signature = signature_of(&name, &handler);
        Self {
            name,
            signature,
            fields: Vec::new(),
            has_wildcard: false,
            invoke: Box::new(move |invocation| {
                handler
                    .call(invocation.params)?
                    .into_outputs()
                    .map_err(DispatchError::Callable)
            }),
        }
    }

    /// Wraps a method. Each invocation builds a fresh receiver and applies
    /// the flags that matched its fields before calling `handler`.
    pub fn method<S, Args, H>(receiver: Receiver<S>, handler: H) -> Self
    where
        S: 'static,
        H: MethodHandler<S, Args>,
    {
        let name = short_type_name(std::any::type_name::<H>());
        let signature = method_signature_of(&name, &handler);
        let fields = receiver.specs();
        let has_wildcard = receiver.has_wildcard();
        Self {
            name,
            signature,
            fields,
            has_wildcard,
            invoke: Box::new(move |mut invocation| {
                let instance = receiver.build(&mut invocation)?;
                handler
                    .call(&instance, invocation.params)?
                    .into_outputs()
                    .map_err(DispatchError::Callable)
            }),
        }
    }

    /// Overrides the name used in error messages.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The derived signature, or the error found while deriving it.
    pub fn signature(&self) -> Result<&Signature, ConfigError> {
        self.signature.as_ref().map_err(Clone::clone)
    }

    /// Flag specs of the receiver fields, in declaration order.
    pub fn fields(&self) -> &[FlagSpec] {
        &self.fields
    }

    /// Whether the receiver collects unmatched flags.
    pub fn has_wildcard(&self) -> bool {
        self.has_wildcard
    }

    /// Builds the receiver if any, then calls the handler.
    pub fn invoke(&self, invocation: Invocation) -> Result<Vec<Output>, DispatchError> {
        (self.invoke)(invocation)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

// --- ROUTER ---

/// Where a normalized name leads within one router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Index into the router's entries.
    Entry(usize),
    /// One of the synthetic help keys.
    Help,
}

/// Validated name lookup for one router, rebuilt for each dispatch.
#[derive(Debug, Clone, Default)]
pub struct RouteIndex {
    names: Vec<(String, Route)>,
}

impl RouteIndex {
    /// Finds the route of a name, ignoring case and leading dashes.
    pub fn lookup(&self, name: &str) -> Option<Route> {
        let name = normalize(name);
        self.names
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, route)| *route)
    }

    /// Index of the default (`""`) entry, if declared.
    pub fn default_entry(&self) -> Option<usize> {
        self.names.iter().find_map(|(n, route)| match route {
            Route::Entry(i) if n.is_empty() => Some(*i),
            _ => None,
        })
    }

    /// Every normalized name, help keys included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(n, _)| n.as_str())
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_start_matches('-').to_lowercase()
}

/// Splits a key into its normalized aliases. The empty key is the default.
fn aliases(key: &str) -> Result<Vec<String>, ConfigError> {
    if key.trim() == DEFAULT_KEY {
        return Ok(vec![DEFAULT_KEY.to_string()]);
    }
    let names: Vec<String> = key
        .split(',')
        .map(normalize)
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Err(ConfigError::EmptyKey(key.to_string()));
    }
    Ok(names)
}

/// Names a callable after the first alias of its key, unless that is the default key.
fn named_after(key: &str, callable: Callable) -> Callable {
    match aliases(key).ok().and_then(|a| a.into_iter().next()) {
        Some(name) if !name.is_empty() => callable.named(&name),
        _ => callable,
    }
}

/// A name to target mapping for one level of the command tree.
#[derive(Debug, Default)]
pub struct Router {
    entries: Vec<(String, Target)>,
    wildcard: Option<Wildcard>,
}

impl Router {
    /// An empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `key` to any target.
    pub fn route(mut self, key: &str, target: impl Into<Target>) -> Self {
        self.entries.push((key.to_string(), target.into()));
        self
    }

    /// Maps `key` to a function or closure.
    pub fn command<Args, H: Handler<Args>>(self, key: &str, handler: H) -> Self {
        self.route(key, named_after(key, Callable::function(handler)))
    }

    /// Maps `key` to a method on a fresh receiver.
    pub fn method<S: 'static, Args, H: MethodHandler<S, Args>>(
        self,
        key: &str,
        receiver: Receiver<S>,
        handler: H,
    ) -> Self {
        self.route(key, named_after(key, Callable::method(receiver, handler)))
    }

    /// Maps `key` to a variable.
    pub fn flag<T: ArgType>(self, key: &str, slot: &Slot<T>) -> Self {
        self.route(key, Assignment::new(slot))
    }

    /// Nests `router` under `key`.
    pub fn group(self, key: &str, router: Self) -> Self {
        self.route(key, router)
    }

    /// Collects flags that nothing at or below this level claims.
    pub fn wildcard(mut self, wildcard: Wildcard) -> Self {
        self.wildcard = Some(wildcard);
        self
    }

    /// The collector for flags nobody claims, if set.
    pub fn wildcard_sink(&self) -> Option<&Wildcard> {
        self.wildcard.as_ref()
    }

    /// Keys and targets, in insertion order.
    pub fn entries(&self) -> &[(String, Target)] {
        &self.entries
    }

    /// The target at `index` in [`Router::entries`].
    pub fn target(&self, index: usize) -> Option<&Target> {
        self.entries.get(index).map(|(_, target)| target)
    }

    /// Looks up a target by name. Invalid keys are skipped.
    pub fn find(&self, name: &str) -> Option<&Target> {
        let name = normalize(name);
        self.entries
            .iter()
            .find(|(key, _)| aliases(key).is_ok_and(|a| a.contains(&name)))
            .map(|(_, target)| target)
    }

    /// Validates every key and builds the lookup table for one dispatch.
    ///
    /// # Logic:
    /// - Each key is split into aliases. An alias repeated within one key is harmless.
    /// - The same name declared by two different entries is a [`ConfigError::DuplicateKey`].
    /// - Help names are added last, and only where no entry already uses them.
    pub fn index(&self, help_flags: &[String]) -> Result<RouteIndex, ConfigError> {
        let mut names: Vec<(String, Route)> = Vec::new();
        for (position, (key, _)) in self.entries.iter().enumerate() {
            for alias in aliases(key)? {
                match names.iter().find(|(n, _)| *n == alias) {
                    Some((_, Route::Entry(existing))) if *existing != position => {
                        return Err(ConfigError::DuplicateKey(alias));
                    }
                    Some(_) => {}
                    None => names.push((alias, Route::Entry(position))),
                }
            }
        }
        for help in help_flags {
            let help = normalize(help);
            if !help.is_empty() && !names.iter().any(|(n, _)| *n == help) {
                names.push((help, Route::Help));
            }
        }
        Ok(RouteIndex { names })
    }
}

// MARK: --- UNIT TESTS ---
