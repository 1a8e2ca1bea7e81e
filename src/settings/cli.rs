use super::Parser;

/// Issue, rotate and revoke access/refresh token pairs over HTTP.
#[derive(Parser, Debug)]
#[command(name = "tokenpair", version)]
pub struct Cli {
    /// Settings file; defaults to settings/dev.toml (debug) or settings/release.toml.
    #[arg(long)]
    pub settings: Option<String>,

    /// Load and validate the settings, then exit without serving.
    #[arg(long)]
    pub check: bool,
}
