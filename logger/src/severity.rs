use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Ordered from most to least important, so `a <= b` means `a` passes a `b` filter
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "warning", alias = "warn")]
    Warning,
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "debug")]
    Debug,
    #[serde(alias = "verbose")]
    Verbose,
}

impl Display for LogSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sev = match self {
            LogSeverity::Error => "Error",
            LogSeverity::Warning => "Warn",
            LogSeverity::Info => "Info",
            LogSeverity::Debug => "Debug",
            LogSeverity::Verbose => "Verbose",
        };
        write!(f, "{}", sev)
    }
}

impl FromStr for LogSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogSeverity::Error),
            "warn" | "warning" => Ok(LogSeverity::Warning),
            "info" => Ok(LogSeverity::Info),
            "debug" => Ok(LogSeverity::Debug),
            "verbose" => Ok(LogSeverity::Verbose),
            other => Err(format!("unknown log level `{}`", other)),
        }
    }
}
