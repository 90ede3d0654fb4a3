//! # Arguments
//!
//! Splits a raw argument list into flags, each owning the run of non-flag
//! tokens that follows it, and the positional tokens before the first flag.
//! Nothing is converted here; every value is still a string.

use crate::error::DispatchError;
use crate::models::Argument;

/// A token is a flag when it starts with a dash and is not the lone `-`.
pub fn is_flag(token: &str) -> bool {
    token.starts_with('-') && token != "-"
}

/// The flag name with every leading dash removed.
pub fn flag_name(token: &str) -> &str {
    token.trim_start_matches('-')
}

/// Splits `tokens` into flag arguments and leading positional tokens.
pub fn tokenize(tokens: &[String]) -> (Vec<Argument>, Vec<String>) {
    let positional = tokens
        .iter()
        .take_while(|t| !is_flag(t))
        .cloned()
        .collect();

    let mut flags: Vec<Argument> = Vec::new();
    for (position, token) in tokens.iter().enumerate() {
        if is_flag(token) {
            flags.push(Argument {
                name: flag_name(token).to_string(),
                position,
                parameters: Vec::new(),
            });
        } else if let Some(current) = flags.last_mut() {
            current.parameters.push(token.clone());
        }
    }
    (flags, positional)
}

/// The working token list of one router level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    tokens: Vec<String>,
}

impl Arguments {
    /// Wraps a token list as given.
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// The tokens still in the list.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Consumes the list, returning what is left.
    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    /// True when no token is left.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every flag in the list, with its parameters.
    pub fn flags(&self) -> Vec<Argument> {
        tokenize(&self.tokens).0
    }

    /// Tokens before the first flag.
    pub fn positional(&self) -> Vec<String> {
        tokenize(&self.tokens).1
    }

    /// The first token, when it is not a flag.
    pub fn command(&self) -> Option<&str> {
        self.tokens
            .first()
            .map(String::as_str)
            .filter(|t| !is_flag(t))
    }

    /// The first flag named `name`, ignoring case and dashes.
    pub fn argument(&self, name: &str) -> Option<Argument> {
        let name = flag_name(name);
        self.flags()
            .into_iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Removes the flag token of `arg` and its parameters.
    ///
    /// Removal is by the recorded position. The tokens found there must still
    /// be the flag and its parameters, otherwise the argument is stale and
    /// nothing is removed.
    pub fn remove(&mut self, arg: &Argument) -> Result<(), DispatchError> {
        let end = arg.position + arg.span();
        let matches = self.tokens.get(arg.position..end).is_some_and(|window| {
            window.split_first().is_some_and(|(flag, params)| {
                is_flag(flag) && flag_name(flag) == arg.name && params == arg.parameters.as_slice()
            })
        });
        if !matches {
            return Err(DispatchError::StaleArgument {
                name: arg.name.clone(),
                position: arg.position,
            });
        }
        self.tokens.drain(arg.position..end);
        Ok(())
    }

    /// Removes several arguments read from the current list. Later positions
    /// go first so earlier ones stay valid.
    pub fn remove_all(&mut self, args: &[Argument]) -> Result<(), DispatchError> {
        let mut ordered: Vec<&Argument> = args.iter().collect();
        ordered.sort_by(|a, b| b.position.cmp(&a.position));
        for arg in ordered {
            self.remove(arg)?;
        }
        Ok(())
    }

    /// Drops the leading command token.
    pub fn shift(&mut self) -> Option<String> {
        if self.tokens.is_empty() {
            None
        } else {
            Some(self.tokens.remove(0))
        }
    }
}

impl From<Vec<String>> for Arguments {
    fn from(tokens: Vec<String>) -> Self {
        Self::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    // --- Tokenizing ---
    #[test]
    fn test_flag_detection() {
        assert!(is_flag("-v"));
        assert!(is_flag("--verbose"));
        assert!(!is_flag("-"));
        assert!(!is_flag("value"));
        assert_eq!(flag_name("--name"), "name");
    }

    #[test]
    fn test_tokenize_groups_parameters_after_flags() {
        let tokens = strings(&["cmd", "arg", "-v", "-name", "hello", "world", "--", "x"]);
        let (flags, positional) = tokenize(&tokens);
        assert_eq!(positional, strings(&["cmd", "arg"]));
        assert_eq!(flags.len(), 3);

        assert_eq!(flags[0].name, "v");
        assert_eq!(flags[0].position, 2);
        assert!(flags[0].parameters.is_empty());

        assert_eq!(flags[1].name, "name");
        assert_eq!(flags[1].position, 3);
        assert_eq!(flags[1].parameters, strings(&["hello", "world"]));

        // `--` alone is a flag with an empty name.
        assert_eq!(flags[2].name, "");
        assert_eq!(flags[2].parameters, strings(&["x"]));
    }

    #[test]
    fn test_tokenize_without_flags_is_all_positional() {
        let tokens = strings(&["a", "-", "b"]);
        let (flags, positional) = tokenize(&tokens);
        assert!(flags.is_empty());
        assert_eq!(positional, tokens);
    }

    // --- Removal ---
    #[test]
    fn test_remove_uses_recorded_position() {
        // Both flags share a name, so searching by name would remove the wrong one.
        let mut args = Arguments::new(strings(&["-x", "1", "cmd", "-x", "2"]));
        let flags = args.flags();
        args.remove(&flags[1]).unwrap();
        assert_eq!(args.tokens(), strings(&["-x", "1", "cmd"]).as_slice());
    }

    #[test]
    fn test_remove_rejects_stale_argument() {
        let mut args = Arguments::new(strings(&["-a", "1", "-b", "2"]));
        let flags = args.flags();
        args.remove(&flags[0]).unwrap();
        let err = args.remove(&flags[1]).unwrap_err();
        assert!(matches!(err, DispatchError::StaleArgument { position: 2, .. }));
    }

    #[test]
    fn test_remove_all_then_retokenize_matches_deleting_spans_up_front() {
        let tokens = strings(&["-v", "-name", "hello", "world", "cmd", "-o", "out"]);
        let mut args = Arguments::new(tokens.clone());
        let flags = args.flags();
        let name = flags[1].trimmed(1);
        let out = flags[2].clone();
        args.remove_all(&[name, out]).unwrap();

        let expected = strings(&["-v", "world", "cmd"]);
        assert_eq!(args.tokens(), expected.as_slice());
        assert_eq!(args.flags(), tokenize(&expected).0);
    }

    #[test]
    fn test_command_and_argument_lookup() {
        let mut args = Arguments::new(strings(&["get", "-V", "local"]));
        assert_eq!(args.command(), Some("get"));
        let v = args.argument("--v").unwrap();
        assert_eq!(v.position, 1);
        assert_eq!(args.shift(), Some("get".to_string()));
        assert_eq!(args.command(), None);
        assert!(Arguments::default().command().is_none());
    }
}
