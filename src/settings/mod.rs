//! Settings come from a TOML file overlaid by `TOKENPAIR__*` environment
//! variables and the conventional `ACCESS_TOKEN_SECRET`, `REFRESH_TOKEN_SECRET`
//! and `REDIS_URL`. See `bin/settings_demo.rs` for manual verification.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
