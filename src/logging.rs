use std::sync::OnceLock;

use owo_colors::OwoColorize;
use supports_color::Stream;
use tracing_subscriber::EnvFilter;

static ANSI_ENABLED: OnceLock<bool> = OnceLock::new();

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let ansi = detect_ansi();
    let _ = ANSI_ENABLED.set(ansi);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(())
}

pub fn category_menu() -> String {
    if ansi_enabled() {
        format!("{}", "MENU".bright_cyan().bold())
    } else {
        "MENU".to_string()
    }
}

pub fn category_process() -> String {
    if ansi_enabled() {
        format!("{}", "PROCESS".bright_green().bold())
    } else {
        "PROCESS".to_string()
    }
}

pub fn category_debug() -> String {
    if ansi_enabled() {
        format!("{}", "DEBUG".bright_magenta().bold())
    } else {
        "DEBUG".to_string()
    }
}

fn ansi_enabled() -> bool {
    *ANSI_ENABLED.get_or_init(detect_ansi)
}

fn detect_ansi() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    supports_color::on_cached(Stream::Stdout).is_some()
}
