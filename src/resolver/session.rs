//! Pre-configured resolver sessions.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::ResolverConfig;

/// Options a session accepts, with whether they take a boolean flag.
const KNOWN_OPTIONS: &[(&str, bool)] = &[
    ("webbrowser-executable", false),
    ("http-timeout", false),
    ("stream-timeout", false),
    ("twitch-supported-codecs", false),
    ("twitch-low-latency", true),
    ("twitch-api-header", false),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown session option: {0}")]
    UnknownOption(String),

    #[error("option {name} expects a {expected} value")]
    WrongType { name: String, expected: &'static str },
}

/// A reusable resolver session carrying fixed headers and options.
#[derive(Debug, Clone)]
pub struct ResolverSession {
    id: Uuid,
    created_at: Instant,
    headers: Vec<(String, String)>,
    options: BTreeMap<String, OptionValue>,
}

impl ResolverSession {
    /// Build a session with the service-wide defaults.
    pub fn new(config: &ResolverConfig) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            created_at: Instant::now(),
            headers: vec![("User-Agent".to_string(), config.user_agent.clone())],
            options: BTreeMap::new(),
        };
        if let Some(browser) = &config.webbrowser_executable {
            session.options.insert(
                "webbrowser-executable".to_string(),
                OptionValue::Text(browser.clone()),
            );
        }
        if let Some(timeout) = config.http_timeout_secs {
            session
                .options
                .insert("http-timeout".to_string(), OptionValue::Text(timeout.to_string()));
        }
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn age_secs(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.options.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Set a known option, checking its value type.
    pub fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), SessionError> {
        let &(_, is_flag) = KNOWN_OPTIONS
            .iter()
            .find(|(known, _)| *known == name)
            .ok_or_else(|| SessionError::UnknownOption(name.to_string()))?;

        let value_is_flag = matches!(value, OptionValue::Flag(_));
        match (value_is_flag, is_flag) {
            (true, true) | (false, false) => {
                self.options.insert(name.to_string(), value);
                Ok(())
            }
            (false, true) => Err(SessionError::WrongType {
                name: name.to_string(),
                expected: "boolean",
            }),
            (true, false) => Err(SessionError::WrongType {
                name: name.to_string(),
                expected: "text",
            }),
        }
    }
}

/// Apply platform-specific tuning to a session.
///
/// Only Twitch has hints: extra codecs, low latency and an optional OAuth
/// header for ad-free playback. Callers treat a failure here as non-fatal.
pub fn apply_platform_hints(
    session: &mut ResolverSession,
    platform: &str,
    twitch_oauth_token: Option<&str>,
) -> Result<(), SessionError> {
    if platform != "twitch" {
        return Ok(());
    }

    session.set_option(
        "twitch-supported-codecs",
        OptionValue::Text("h264,h265,av1".to_string()),
    )?;
    session.set_option("twitch-low-latency", OptionValue::Flag(true))?;
    if let Some(token) = twitch_oauth_token.filter(|t| !t.is_empty()) {
        session.set_option(
            "twitch-api-header",
            OptionValue::Text(format!("Authorization=OAuth {}", token)),
        )?;
    }
    Ok(())
}
