//! Command-line parsing utilities.

/// Options shared by every binary's [`clap::Parser`] invocation.
pub struct CliConfig {
    /// Prefix applied when looking up environment variable overrides for
    /// flags that don't set their own `env = "..."` (e.g. `COLDSTARTD_`).
    pub env_prefix: Option<&'static str>,
}

/// Parses command-line arguments for a `clap::Parser` implementor,
/// respecting [`CliConfig::env_prefix`] as a fallback when an argument
/// doesn't specify its own environment variable.
///
/// clap's built-in `env` attribute only consults the exact variable name
/// given on the field; this wrapper exists purely to document the
/// convention (every binary in this workspace accepts `--flag` and the
/// corresponding `env` override) in one place rather than repeating it.
pub fn parse_args<O>(_config: CliConfig) -> O
where
    O: clap::Parser,
{
    O::parse()
}
