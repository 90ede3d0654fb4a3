//! # Dispatcher
//!
//! Drives one dispatch call through the command tree. Every router level runs
//! the same protocol on its own slice of tokens:
//!
//! 1. Tokenize, and short-circuit to the help provider if a help flag is present.
//! 2. Bind the flags that name a key of this router and trim their parameters.
//! 3. Remove the bound flags, then apply assignments before callables.
//! 4. Resolve the first remaining token as a command, falling back to the
//!    default key with the whole token list, even when that list is empty.
//! 5. Recurse into a nested router, or convert the remaining tokens and
//!    invoke the leaf target.
//!
//! Flags nobody claims pass through to nested routers untouched. At a leaf
//! they are offered to the receiver fields and then to the nearest wildcard
//! before they become an [`DispatchError::UnknownFlag`] error. A bare `--`
//! names nothing and fails with [`DispatchError::EmptyFlag`] instead.

use crate::config::DispatchConfig;
use crate::core::arguments::Arguments;
use crate::core::custom_types::TypeRegistry;
use crate::core::fields::{Assignment, Wildcard};
use crate::core::output::Output;
use crate::core::router::{Callable, Route, Router, Target};
use crate::core::values::{Converter, Value};
use crate::error::DispatchError;
use crate::models::{Argument, Invocation};
use std::fmt;

/// Produces help for a router. Help text generation lives outside the engine.
pub trait HelpProvider {
    /// `subject` holds the positional tokens and the help flag's parameters,
    /// e.g. `["get"]` for `-help get`.
    fn help(&self, router: &Router, subject: &[String]) -> Result<Vec<Output>, DispatchError>;
}

/// Lists the keys of the router that `subject` leads to, one per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyListing;

impl HelpProvider for KeyListing {
    fn help(&self, router: &Router, subject: &[String]) -> Result<Vec<Output>, DispatchError> {
        let mut current = router;
        for token in subject {
            match current.find(token) {
                Some(Target::Router(nested)) => current = nested,
                _ => break,
            }
        }
        let mut keys: Vec<String> = current
            .entries()
            .iter()
            .map(|(key, _)| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        keys.sort();
        Ok(keys.into_iter().map(Output::Text).collect())
    }
}

/// Maps argument lists onto a [`Router`].
pub struct Dispatcher {
    config: DispatchConfig,
    types: TypeRegistry,
    help: Box<dyn HelpProvider>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// A dispatcher with the built-in custom types and the key listing help.
    pub fn new(config: DispatchConfig) -> Self {
        let types = TypeRegistry::with_time_format(config.time_format.as_deref());
        Self {
            config,
            types,
            help: Box::new(KeyListing),
        }
    }

    /// Replaces the custom type registry.
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Replaces the help provider.
    pub fn with_help(mut self, provider: impl HelpProvider + 'static) -> Self {
        self.help = Box::new(provider);
        self
    }

    /// Settings this dispatcher was built with.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The custom type registry consulted by every conversion.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Register custom types here before the first dispatch.
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Dispatches a full process argument vector, program name included.
    pub fn dispatch_argv(
        &self,
        router: &Router,
        argv: Vec<String>,
    ) -> Result<Vec<Output>, DispatchError> {
        let mut args = argv;
        if self.config.strip_program_name && !args.is_empty() {
            args.remove(0);
        }
        self.dispatch(router, args)
    }

    /// Dispatches `args` and returns the collected outputs.
    ///
    /// Flags applied before a failure stay applied.
    pub fn dispatch(&self, router: &Router, args: Vec<String>) -> Result<Vec<Output>, DispatchError> {
        log::debug!("Dispatching arguments: {:?}", args);
        self.dispatch_level(router, Arguments::new(args), None)
    }

    fn converter(&self) -> Converter<'_> {
        Converter::new(&self.types, &self.config.slice_delimiter)
    }

    fn dispatch_level(
        &self,
        router: &Router,
        mut args: Arguments,
        inherited: Option<&Wildcard>,
    ) -> Result<Vec<Output>, DispatchError> {
        let index = router.index(&self.config.help_flags)?;
        let wildcard = router.wildcard_sink().or(inherited);
        let flags = args.flags();
        log::trace!("Level tokens {:?}, flags {:?}", args.tokens(), flags);

        if let Some(help_arg) = flags
            .iter()
            .find(|a| index.lookup(&a.name) == Some(Route::Help))
        {
            let mut subject = args.positional();
            subject.extend(help_arg.parameters.iter().cloned());
            log::debug!("Help requested for {:?}", subject);
            return self.help.help(router, &subject);
        }

        // --- Bind and trim the flags this level knows ---
        let mut bound: Vec<(Argument, &Target)> = Vec::new();
        for arg in &flags {
            if arg.name.is_empty() {
                continue;
            }
            let Some(Route::Entry(entry)) = index.lookup(&arg.name) else {
                continue;
            };
            let Some(target) = router.target(entry) else {
                continue;
            };
            let trimmed = match target {
                Target::Assignment(assignment) if assignment.spec().hidden => continue,
                Target::Assignment(assignment) => assignment.spec().trim(arg)?,
                Target::Callable(callable) => {
                    let signature = callable.signature()?;
                    if signature.is_variadic() {
                        arg.clone()
                    } else {
                        arg.trimmed(signature.arity())
                    }
                }
                Target::Router(_) => arg.clone(),
            };
            log::debug!("Bound flag -{} to {:?}", trimmed.name, trimmed.parameters);
            bound.push((trimmed, target));
        }

        let bound_args: Vec<Argument> = bound.iter().map(|(arg, _)| arg.clone()).collect();
        args.remove_all(&bound_args)?;

        // --- Apply: assignments first, then callables and nested routers ---
        let mut outputs = Vec::new();
        for (arg, target) in &bound {
            if let Target::Assignment(assignment) = target {
                self.assign(assignment, arg.first_parameter())?;
            }
        }
        for (arg, target) in &bound {
            match target {
                Target::Callable(callable) => {
                    let params = Arguments::new(arg.parameters.clone());
                    outputs.extend(self.invoke_callable(callable, params, wildcard)?);
                }
                Target::Router(nested) => {
                    let params = Arguments::new(arg.parameters.clone());
                    outputs.extend(self.dispatch_level(nested, params, wildcard)?);
                }
                Target::Assignment(_) => {}
            }
        }

        // --- Resolve the command ---
        if let Some(token) = args.command().map(str::to_string) {
            match index.lookup(&token) {
                Some(Route::Entry(entry)) if !token.trim().is_empty() => {
                    args.shift();
                    log::debug!("Resolved command '{}'", token);
                    if let Some(target) = router.target(entry) {
                        outputs.extend(self.invoke_target(target, args, wildcard)?);
                    }
                    return Ok(outputs);
                }
                Some(Route::Help) => {
                    args.shift();
                    return self.help.help(router, &args.positional());
                }
                _ => {}
            }
        }

        if let Some(target) = index.default_entry().and_then(|i| router.target(i)) {
            log::debug!("Falling back to the default command");
            outputs.extend(self.invoke_target(target, args, wildcard)?);
            return Ok(outputs);
        }

        if let Some(token) = args.command() {
            return Err(DispatchError::UnknownCommand(token.to_string()));
        }
        match self.collect_unmatched(args, wildcard)?.first() {
            Some(token) => Err(DispatchError::UnknownCommand(token.clone())),
            None => Err(DispatchError::NoCommandFound),
        }
    }

    fn invoke_target(
        &self,
        target: &Target,
        args: Arguments,
        wildcard: Option<&Wildcard>,
    ) -> Result<Vec<Output>, DispatchError> {
        match target {
            Target::Router(nested) => self.dispatch_level(nested, args, wildcard),
            Target::Callable(callable) => self.invoke_callable(callable, args, wildcard),
            Target::Assignment(assignment) => {
                let spec = assignment.spec();
                let params = self.collect_unmatched(args, wildcard)?;
                if params.len() > 1 {
                    return Err(DispatchError::TooManyArguments {
                        command: spec.descriptor.name().to_string(),
                        signature: format!("[{}]  Returns []", spec.descriptor.name()),
                        found: params,
                    });
                }
                let raw = match params.first() {
                    Some(raw) => raw.as_str(),
                    None if spec.descriptor.is_bool() || spec.optional => "",
                    None => {
                        return Err(DispatchError::MissingValue {
                            flag: spec.descriptor.name().to_string(),
                            expected: spec.descriptor.name().to_string(),
                        });
                    }
                };
                self.assign(assignment, raw)?;
                Ok(Vec::new())
            }
        }
    }

    fn assign(&self, assignment: &Assignment, raw: &str) -> Result<(), DispatchError> {
        let value = self.converter().convert(raw, &assignment.spec().descriptor)?;
        assignment.assign(value)?;
        Ok(())
    }

    /// Hands every remaining flag to `wildcard`, or fails on the first one
    /// when there is none. Returns the tokens that are left.
    fn collect_unmatched(
        &self,
        mut args: Arguments,
        wildcard: Option<&Wildcard>,
    ) -> Result<Vec<String>, DispatchError> {
        let flags = args.flags();
        if flags.iter().any(|a| a.name.is_empty()) {
            return Err(DispatchError::EmptyFlag);
        }
        let Some(wildcard) = wildcard else {
            return match flags.into_iter().next() {
                Some(arg) => Err(DispatchError::UnknownFlag(arg.name)),
                None => Ok(args.into_tokens()),
            };
        };
        let mut captured = Vec::new();
        for arg in flags {
            let arg = arg.trimmed(1);
            wildcard.collect(arg.name.clone(), arg.first_parameter().to_string());
            captured.push(arg);
        }
        args.remove_all(&captured)?;
        Ok(args.into_tokens())
    }

    fn invoke_callable(
        &self,
        callable: &Callable,
        mut args: Arguments,
        wildcard: Option<&Wildcard>,
    ) -> Result<Vec<Output>, DispatchError> {
        let signature = callable.signature()?;
        let converter = self.converter();
        let mut invocation = Invocation::default();

        // --- Leaf flags: receiver fields, then wildcards ---
        let mut consumed = Vec::new();
        for arg in args.flags() {
            if arg.name.is_empty() {
                return Err(DispatchError::EmptyFlag);
            }
            let field = callable
                .fields()
                .iter()
                .enumerate()
                .find(|(_, spec)| spec.matches(&arg.name));
            if let Some((index, spec)) = field {
                let arg = spec.trim(&arg)?;
                let value = converter.convert(arg.first_parameter(), &spec.descriptor)?;
                invocation.fields.push((index, value));
                consumed.push(arg);
            } else if callable.has_wildcard() {
                let arg = arg.trimmed(1);
                invocation
                    .extras
                    .push((arg.name.clone(), arg.first_parameter().to_string()));
                consumed.push(arg);
            } else if let Some(wildcard) = wildcard {
                let arg = arg.trimmed(1);
                wildcard.collect(arg.name.clone(), arg.first_parameter().to_string());
                consumed.push(arg);
            } else {
                return Err(DispatchError::UnknownFlag(arg.name));
            }
        }
        args.remove_all(&consumed)?;
        let params = args.into_tokens();

        // --- Arity ---
        let arity = signature.arity();
        if params.len() < arity {
            return Err(DispatchError::TooFewArguments {
                command: callable.name().to_string(),
                signature: signature.to_string(),
                found: params,
            });
        }
        if !signature.is_variadic() && params.len() > arity {
            return Err(DispatchError::TooManyArguments {
                command: callable.name().to_string(),
                signature: signature.to_string(),
                found: params,
            });
        }

        // --- Conversion ---
        let mut values = Vec::with_capacity(signature.param_types().len());
        for (raw, target) in params.iter().zip(signature.fixed_types()) {
            values.push(converter.convert(raw, target)?);
        }
        if let Some(element) = signature.variadic_type() {
            let rest = params
                .get(arity..)
                .unwrap_or_default()
                .iter()
                .map(|raw| converter.convert(raw, element))
                .collect::<Result<Vec<_>, _>>()?;
            values.push(Value::List(rest));
        }
        invocation.params = values;

        log::debug!("Invoking '{}' with {:?}", callable.name(), params);
        callable.invoke(invocation)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arg_type::Rest;
    use crate::core::fields::{Field, Receiver, Slot};
    use crate::core::output::Json;
    use crate::core::values::ConversionError;
    use crate::error::ConfigError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn run(router: &Router, tokens: &[&str]) -> Result<Vec<Output>, DispatchError> {
        Dispatcher::default().dispatch(router, strings(tokens))
    }

    fn texts(outputs: Vec<Output>) -> Vec<String> {
        outputs.into_iter().map(|o| o.to_string()).collect()
    }

    fn echo(value: String) -> String {
        value
    }

    fn add(a: i64, b: i64) -> i64 {
        a + b
    }

    // --- Flag assignment ---
    #[test]
    fn test_single_parameter_trim_leaves_rest_positional() {
        let verbose = Slot::new(false);
        let name = Slot::new(String::new());
        let router = Router::new()
            .flag("v", &verbose)
            .flag("name", &name)
            .command("cmd", echo);

        let err = run(&router, &["-v", "-name", "hello", "world", "cmd", "arg1"]).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownCommand(ref t) if t == "world"));
        // Flags applied before the failure stay applied.
        assert!(verbose.get());
        assert_eq!(name.get(), "hello");
    }

    #[test]
    fn test_default_key_receives_whole_remainder() {
        let verbose = Slot::new(false);
        let name = Slot::new(String::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let router = Router::new()
            .flag("v", &verbose)
            .flag("name", &name)
            .command("", move |rest: Rest<String>| sink.borrow_mut().extend(rest.into_inner()));

        run(&router, &["-v", "-name", "hello", "world", "cmd", "arg1"]).unwrap();
        assert_eq!(*seen.borrow(), strings(&["world", "cmd", "arg1"]));
        assert_eq!(name.get(), "hello");
    }

    #[test]
    fn test_bool_flag_followed_by_flag() {
        let b = Slot::new(false);
        let c = Slot::new(false);
        let router = Router::new().flag("b", &b).flag("c", &c);
        // Flags alone name no command, but they are applied before that fails.
        assert!(matches!(run(&router, &["-b", "-c"]), Err(DispatchError::NoCommandFound)));
        assert!(b.get());
        assert!(c.get());

        let router = router.command("", || {});
        run(&router, &["--B", "false", "-c", "0"]).unwrap();
        assert!(!b.get());
        assert!(!c.get());
    }

    #[test]
    fn test_flags_only_line_runs_default_command() {
        let verbose = Slot::new(false);
        let ran = Slot::new(false);
        let hit = ran.clone();
        let router = Router::new()
            .flag("v", &verbose)
            .command("", move || hit.set(true));
        assert!(run(&router, &["-v"]).unwrap().is_empty());
        assert!(verbose.get());
        assert!(ran.get());

        let router = Router::new().flag("v", &verbose).command("ls", || {});
        assert!(matches!(run(&router, &["-v"]), Err(DispatchError::NoCommandFound)));
    }

    #[test]
    fn test_bool_assignment_as_command_converts_its_parameter() {
        let verbose = Slot::new(false);
        let router = Router::new().flag("verbose", &verbose);
        let err = run(&router, &["verbose", "xyz"]).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Conversion(ConversionError::ParseFailed { .. })
        ));
        assert!(!verbose.get());

        run(&router, &["verbose"]).unwrap();
        assert!(verbose.get());
        run(&router, &["verbose", "f"]).unwrap();
        assert!(!verbose.get());
    }

    #[test]
    fn test_non_bool_flag_without_value() {
        let name = Slot::new(String::from("unset"));
        let router = Router::new().flag("name", &name);
        assert!(matches!(
            run(&router, &["-name"]),
            Err(DispatchError::MissingValue { .. })
        ));

        let router = Router::new()
            .route("name", Assignment::new(&name).optional())
            .command("", || {});
        run(&router, &["-name"]).unwrap();
        assert_eq!(name.get(), "");

        let count = Slot::new(0u8);
        let router = Router::new().flag("count", &count);
        assert!(matches!(
            run(&router, &["count"]),
            Err(DispatchError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_hidden_assignment_is_not_a_flag() {
        let secret = Slot::new(0u8);
        let router = Router::new()
            .route("secret", Assignment::new(&secret).hidden())
            .command("noop", || {});
        assert!(matches!(
            run(&router, &["noop", "-secret", "3"]),
            Err(DispatchError::UnknownFlag(ref f)) if f == "secret"
        ));
        // Still reachable as a command.
        run(&router, &["secret", "3"]).unwrap();
        assert_eq!(secret.get(), 3);
    }

    #[test]
    fn test_assignment_conversion_error() {
        let count = Slot::new(0i32);
        let router = Router::new().flag("count", &count);
        let err = run(&router, &["-count", "many"]).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Conversion(ConversionError::ParseFailed { .. })
        ));
    }

    // --- Callables ---
    #[test]
    fn test_arity_checks() {
        let router = Router::new().command("add", add);
        assert_eq!(texts(run(&router, &["add", "2", "3"]).unwrap()), vec!["5"]);

        let err = run(&router, &["add", "2"]).unwrap_err();
        assert!(matches!(err, DispatchError::TooFewArguments { .. }));
        assert!(err.to_string().contains("[i64, i64]  Returns [i64]"));

        let err = run(&router, &["add", "1", "2", "3"]).unwrap_err();
        assert!(matches!(err, DispatchError::TooManyArguments { ref found, .. } if found.len() == 3));
    }

    #[test]
    fn test_variadic_tail() {
        fn join(prefix: String, rest: Rest<String>) -> Json<(String, Vec<String>)> {
            Json((prefix, rest.into_inner()))
        }
        let router = Router::new().command("f", join);
        let out = texts(run(&router, &["f", "pfx", "a", "b", "c"]).unwrap());
        assert_eq!(out, vec![r#"["pfx",["a","b","c"]]"#]);

        let out = texts(run(&router, &["f", "pfx"]).unwrap());
        assert_eq!(out, vec![r#"["pfx",[]]"#]);

        assert!(matches!(
            run(&router, &["f"]),
            Err(DispatchError::TooFewArguments { .. })
        ));
    }

    #[test]
    fn test_callable_error_surfaces() {
        let router = Router::new().command("fail", || -> Result<(), std::io::Error> {
            Err(std::io::Error::other("disk on fire"))
        });
        let err = run(&router, &["fail"]).unwrap_err();
        assert!(matches!(err, DispatchError::Callable(_)));
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_callable_bound_to_flag() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let router = Router::new()
            .command("out", move |path: String| sink.borrow_mut().push(path))
            .command("run", || "ran");

        let out = texts(run(&router, &["run", "-out", "file.txt"]).unwrap());
        assert_eq!(out, vec!["ran"]);
        assert_eq!(*log.borrow(), vec!["file.txt".to_string()]);
    }

    // --- Nested routers ---
    #[test]
    fn test_nested_router() {
        let verbose = Slot::new(false);
        let fetched = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&fetched);
        let get = Router::new()
            .command("", |url: String| format!("remote {url}"))
            .command("local", move |path: String| sink.replace(path))
            .flag("-v", &verbose);
        let router = Router::new().group("get", get);

        run(&router, &["get", "-v", "local", "path.txt"]).unwrap();
        assert!(verbose.get());
        assert_eq!(*fetched.borrow(), "path.txt");

        let out = texts(run(&router, &["GET", "http://x"]).unwrap());
        assert_eq!(out, vec!["remote http://x"]);
    }

    #[test]
    fn test_unknown_command_and_empty_input() {
        let router = Router::new().command("ls", || {});
        assert!(matches!(
            run(&router, &["rm"]),
            Err(DispatchError::UnknownCommand(ref t)) if t == "rm"
        ));
        assert!(matches!(run(&router, &[]), Err(DispatchError::NoCommandFound)));
        assert!(matches!(
            run(&router, &["-bogus", "x"]),
            Err(DispatchError::UnknownFlag(ref f)) if f == "bogus"
        ));
    }

    #[test]
    fn test_bare_double_dash_is_reported_as_nameless_flag() {
        let extras = Slot::<HashMap<String, String>>::default();
        let router = Router::new().command("cmd", echo);
        let err = run(&router, &["cmd", "x", "--"]).unwrap_err();
        assert!(matches!(err, DispatchError::EmptyFlag));
        assert_eq!(err.to_string(), "a flag token has no name after its dashes");

        let router = router.wildcard(Wildcard::new(&extras));
        assert!(matches!(run(&router, &["--", "cmd"]), Err(DispatchError::EmptyFlag)));
        assert!(extras.borrow().is_empty());
    }

    #[test]
    fn test_duplicate_keys_surface_at_dispatch() {
        let router = Router::new().command("ls", || {}).command("LS,list", || {});
        assert!(matches!(
            run(&router, &["ls"]),
            Err(DispatchError::Config(ConfigError::DuplicateKey(_)))
        ));
    }

    // --- Wildcards ---
    #[test]
    fn test_unknown_flag_without_wildcard() {
        let router = Router::new().command("cmd", echo);
        assert!(matches!(
            run(&router, &["cmd", "x", "-bogus", "value"]),
            Err(DispatchError::UnknownFlag(ref f)) if f == "bogus"
        ));
    }

    #[test]
    fn test_router_wildcard_captures_unknown_flag() {
        let extras = Slot::<HashMap<String, String>>::default();
        let router = Router::new()
            .command("cmd", echo)
            .wildcard(Wildcard::new(&extras));
        let out = texts(run(&router, &["cmd", "x", "-bogus", "value"]).unwrap());
        assert_eq!(out, vec!["x"]);
        assert_eq!(
            extras.borrow().get("bogus").map(String::as_str),
            Some("value")
        );
    }

    #[test]
    fn test_wildcard_is_inherited_by_nested_levels() {
        let extras = Slot::<HashMap<String, String>>::default();
        let router = Router::new()
            .group("sub", Router::new().command("leaf", || "ok"))
            .wildcard(Wildcard::new(&extras));
        let out = texts(run(&router, &["sub", "leaf", "-color"]).unwrap());
        assert_eq!(out, vec!["ok"]);
        assert_eq!(extras.borrow().get("color").map(String::as_str), Some(""));
    }

    // --- Method commands ---
    #[derive(Default)]
    struct Lister {
        all: bool,
        depth: u8,
        extra: HashMap<String, String>,
    }

    fn list(lister: &Lister, path: String) -> String {
        let mut extra: Vec<_> = lister.extra.keys().cloned().collect();
        extra.sort();
        format!("{path} all={} depth={} extra={}", lister.all, lister.depth, extra.join("+"))
    }

    fn lister() -> Receiver<Lister> {
        Receiver::default()
            .field(Field::new("all,a", |l: &mut Lister, v: bool| l.all = v))
            .field(Field::new("depth", |l: &mut Lister, v: u8| l.depth = v))
    }

    #[test]
    fn test_method_receiver_fields() {
        let router = Router::new().method("ls", lister(), list);
        let out = texts(run(&router, &["ls", "/tmp", "-A", "-depth", "2"]).unwrap());
        assert_eq!(out, vec!["/tmp all=true depth=2 extra="]);

        // Each call starts from a fresh receiver.
        let out = texts(run(&router, &["ls", "/tmp"]).unwrap());
        assert_eq!(out, vec!["/tmp all=false depth=0 extra="]);

        assert!(matches!(
            run(&router, &["ls", "/tmp", "-x"]),
            Err(DispatchError::UnknownFlag(ref f)) if f == "x"
        ));
    }

    #[test]
    fn test_method_receiver_wildcard() {
        let router = Router::new().method("ls", lister().wildcard(|l| &mut l.extra), list);
        let out = texts(run(&router, &["ls", "/tmp", "-x", "1", "-y"]).unwrap());
        assert_eq!(out, vec!["/tmp all=false depth=0 extra=x+y"]);
    }

    // --- Help ---
    #[test]
    fn test_help_short_circuits_flags() {
        let verbose = Slot::new(false);
        let router = Router::new()
            .flag("verbose", &verbose)
            .command("ls", || {})
            .group("get", Router::new().command("local", || {}).command("remote", || {}));

        let out = texts(run(&router, &["-verbose", "-help"]).unwrap());
        assert_eq!(out, vec!["get", "ls", "verbose"]);
        assert!(!verbose.get());

        let out = texts(run(&router, &["-?", "get"]).unwrap());
        assert_eq!(out, vec!["local", "remote"]);

        let out = texts(run(&router, &["help", "get"]).unwrap());
        assert_eq!(out, vec!["local", "remote"]);
    }

    struct Fixed;

    impl HelpProvider for Fixed {
        fn help(&self, _: &Router, subject: &[String]) -> Result<Vec<Output>, DispatchError> {
            Ok(vec![Output::Text(format!("usage: {}", subject.join(" ")))])
        }
    }

    #[test]
    fn test_custom_help_provider_and_user_help_key() {
        let router = Router::new().command("ls", || {});
        let dispatcher = Dispatcher::default().with_help(Fixed);
        let out = texts(dispatcher.dispatch(&router, strings(&["ls", "--help"])).unwrap());
        assert_eq!(out, vec!["usage: ls"]);

        let router = Router::new().command("help", || "mine");
        let out = texts(run(&router, &["-help"]).unwrap());
        assert_eq!(out, vec!["mine"]);
        let out = texts(run(&router, &["help"]).unwrap());
        assert_eq!(out, vec!["mine"]);
    }

    // --- Configuration ---
    #[test]
    fn test_slice_delimiter_and_argv() {
        let config = DispatchConfig {
            slice_delimiter: ";".to_string(),
            ..DispatchConfig::default()
        };
        let dispatcher = Dispatcher::new(config);
        let router = Router::new().command("sum", |xs: Vec<i64>| xs.iter().sum::<i64>());
        let out = dispatcher
            .dispatch_argv(&router, strings(&["/usr/bin/tool", "sum", "1;2;3"]))
            .unwrap();
        assert_eq!(texts(out), vec!["6"]);
    }

    #[test]
    fn test_custom_type_used_for_parameters() {
        #[derive(Debug, PartialEq)]
        struct Port(u16);

        impl crate::core::arg_type::ArgType for Port {
            fn descriptor() -> crate::core::values::TypeDescriptor {
                crate::core::values::TypeDescriptor::new::<Self>(crate::core::values::TypeKind::Opaque)
            }

            fn from_value(value: Value) -> Result<Self, ConversionError> {
                value.downcast()
            }
        }

        let mut dispatcher = Dispatcher::default();
        dispatcher
            .types_mut()
            .register_type::<Port, _>(|raw| Ok(Port(raw.trim_start_matches(':').parse()?)))
            .unwrap();
        let router = Router::new().command("serve", |port: Port| port.0);
        let out = dispatcher.dispatch(&router, strings(&["serve", ":8080"])).unwrap();
        assert_eq!(texts(out), vec!["8080"]);
    }
}
