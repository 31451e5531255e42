//! Injected identity of the hosting environment.
//!
//! Per-browser preferences are looked up by this identity instead of being
//! sniffed at runtime, which keeps configuration resolution pure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host browser family, as named in preference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Browser {
    #[serde(rename = "MSIE")]
    Msie,
    Firefox,
    Opera,
    Safari,
    Chrome,
    #[default]
    #[serde(rename = "other")]
    Other,
}

impl Browser {
    /// Key used in preference tables such as `MMLorHTML.prefer`.
    pub fn key(&self) -> &'static str {
        match self {
            Browser::Msie => "MSIE",
            Browser::Firefox => "Firefox",
            Browser::Opera => "Opera",
            Browser::Safari => "Safari",
            Browser::Chrome => "Chrome",
            Browser::Other => "other",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "msie" | "ie" => Ok(Browser::Msie),
            "firefox" => Ok(Browser::Firefox),
            "opera" => Ok(Browser::Opera),
            "safari" => Ok(Browser::Safari),
            "chrome" => Ok(Browser::Chrome),
            "other" => Ok(Browser::Other),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

/// What the hosting environment is and what it can render natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentIdentity {
    pub browser: Browser,
    /// Whether the host renders MathML natively.
    pub native_mathml: bool,
}

impl EnvironmentIdentity {
    pub fn new(browser: Browser, native_mathml: bool) -> Self {
        Self {
            browser,
            native_mathml,
        }
    }

    /// Default capabilities for a browser family.
    pub fn for_browser(browser: Browser) -> Self {
        let native_mathml = matches!(browser, Browser::Firefox | Browser::Msie);
        Self::new(browser, native_mathml)
    }
}

/// Output rendering preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererPreference {
    /// Native MathML output.
    Mml,
    /// HTML-with-CSS output.
    Html,
}

impl RendererPreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MML" => Some(RendererPreference::Mml),
            "HTML" => Some(RendererPreference::Html),
            _ => None,
        }
    }
}
