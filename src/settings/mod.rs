//! Settings come from a TOML file plus `SESSIOND_*` environment overrides.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
