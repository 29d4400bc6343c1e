//! User settings, stored as one object

use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultView {
    #[default]
    Tasks,
    Calendar,
    Timetable,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Self::System),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("Unknown theme: {}. Use: system, light or dark", s)),
        }
    }
}

impl std::fmt::Display for DefaultView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tasks => write!(f, "tasks"),
            Self::Calendar => write!(f, "calendar"),
            Self::Timetable => write!(f, "timetable"),
        }
    }
}

impl std::str::FromStr for DefaultView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tasks" => Ok(Self::Tasks),
            "calendar" => Ok(Self::Calendar),
            "timetable" => Ok(Self::Timetable),
            _ => Err(format!("Unknown view: {}. Use: tasks, calendar or timetable", s)),
        }
    }
}

/// Settings object; missing fields fall back to their defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,

    #[serde(default = "default_week_starts_on")]
    pub week_starts_on: Weekday,

    #[serde(default)]
    pub default_view: DefaultView,

    #[serde(default = "default_show_completed")]
    pub show_completed: bool,
}

fn default_week_starts_on() -> Weekday {
    Weekday::Mon
}

fn default_show_completed() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            week_starts_on: default_week_starts_on(),
            default_view: DefaultView::default(),
            show_completed: default_show_completed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_partial_json() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.week_starts_on, Weekday::Mon);
        assert!(settings.show_completed);
        assert_eq!(settings.default_view, DefaultView::Tasks);
    }

    #[test]
    fn test_enum_parse_matches_serde_names() {
        for theme in [Theme::System, Theme::Light, Theme::Dark] {
            assert_eq!(theme.to_string().parse::<Theme>().unwrap(), theme);
            assert_eq!(serde_json::to_value(theme).unwrap(), theme.to_string());
        }
        assert_eq!("Calendar".parse::<DefaultView>().unwrap(), DefaultView::Calendar);
        assert!("agenda".parse::<DefaultView>().is_err());
    }

    #[test]
    fn test_settings_field_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json.get("weekStartsOn").is_some());
        assert_eq!(json["showCompleted"], true);
    }
}
