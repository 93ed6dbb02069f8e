use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Tooltip shown on the toggle while this theme is active.
    pub fn toggle_hint(self) -> &'static str {
        match self {
            Theme::Light => "Switch to dark mode",
            Theme::Dark => "Switch to light mode",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown theme '{0}', expected 'light' or 'dark'")]
pub struct UnknownTheme(String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(UnknownTheme(value.to_string())),
        }
    }
}

/// Application-wide dark mode flag.
#[derive(Debug, Default)]
pub struct ThemeToggle {
    dark: AtomicBool,
}

impl ThemeToggle {
    pub fn new(initial: Theme) -> Self {
        Self {
            dark: AtomicBool::new(initial == Theme::Dark),
        }
    }

    pub fn current(&self) -> Theme {
        Self::from_flag(self.dark.load(Ordering::Acquire))
    }

    pub fn set(&self, theme: Theme) {
        self.dark.store(theme == Theme::Dark, Ordering::Release);
    }

    /// Flips the flag and returns the theme now in effect.
    pub fn toggle(&self) -> Theme {
        let was_dark = self.dark.fetch_xor(true, Ordering::AcqRel);
        Self::from_flag(was_dark).toggled()
    }

    fn from_flag(dark: bool) -> Theme {
        if dark { Theme::Dark } else { Theme::Light }
    }
}
