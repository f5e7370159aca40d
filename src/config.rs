use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::menu::Align;

static DURATION_REGEX: OnceLock<Regex> = OnceLock::new();

/// Parse `200ms`, `0.2s`, `1s` or a bare millisecond count.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let trimmed = s.trim().to_lowercase();
    let re = DURATION_REGEX.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)\s*(ms|s)?$").expect("duration regex is valid")
    });

    let caps = re
        .captures(&trimmed)
        .ok_or_else(|| ConfigError::InvalidDuration(s.to_string()))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
    let millis = match caps.get(2).map(|m| m.as_str()) {
        Some("s") => value * 1000.0,
        _ => value,
    };

    let duration = Duration::from_nanos((millis * 1_000_000.0).round() as u64);
    if duration.is_zero() {
        return Err(ConfigError::ZeroDuration(s.to_string()));
    }
    Ok(duration)
}

#[derive(Parser, Debug)]
#[command(name = "sketch-menu", version, about = "Project list with keyboard-driven dropdown menus")]
pub struct Cli {
    /// How long focus may be away from a menu before it closes
    #[arg(long, env = "MENU_GRACE", default_value = "200ms", value_parser = parse_duration)]
    pub grace: Duration,

    /// Event loop poll interval
    #[arg(long, default_value = "50ms", value_parser = parse_duration)]
    pub tick: Duration,

    /// Which edge of the trigger menus are aligned to
    #[arg(long, value_enum, default_value_t = Align::Right)]
    pub align: Align,

    /// Signed-in user name
    #[arg(short, long, default_value = "p5user")]
    pub user: String,

    /// Start signed out
    #[arg(long)]
    pub guest: bool,

    /// Write logs here (the terminal is taken by the UI)
    #[arg(long, env = "MENU_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub grace: Duration,
    pub tick: Duration,
    pub align: Align,
    pub user: String,
    pub authenticated: bool,
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Config {
            grace: cli.grace,
            tick: cli.tick,
            align: cli.align,
            user: cli.user.clone(),
            authenticated: !cli.guest,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            grace: crate::dismiss::DEFAULT_GRACE,
            tick: Duration::from_millis(50),
            align: Align::Right,
            user: "p5user".to_string(),
            authenticated: true,
        }
    }
}
