// src/constants.rs

/// The delimiter that splits one argument into slice elements.
pub const DEFAULT_SLICE_DELIMITER: &str = ",";

/// The long reserved help key, matched as `-help` or `--help`.
pub const HELP_FLAG_FULL: &str = "help";

/// The short reserved help key, matched as `-?`.
pub const HELP_FLAG_SHORT: &str = "?";

/// The router key selected when the first token names no other key.
pub const DEFAULT_KEY: &str = "";

/// Environment variable overriding the configured slice delimiter.
pub const SLICE_DELIMITER_ENV: &str = "MAINLINE_SLICE_DELIMITER";
