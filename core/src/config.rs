//! API origin configuration and host environment detection.
//!
//! The origin is only used to absolutize paths that start with `/`; it is
//! supplied either as a metadata JSON document or through the environment.

use serde::Deserialize;

use crate::error::ConfigError;

/// Base server address and platform segment for relative request paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub api_server: String,
    pub platform: String,
}

impl ApiConfig {
    pub fn new(api_server: &str, platform: &str) -> Self {
        Self {
            api_server: api_server.trim_end_matches('/').to_string(),
            platform: platform.to_string(),
        }
    }

    /// Parse a metadata document such as `{"apiServer": "...", "platform": "..."}`.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: ApiConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self::new(&config.api_server, &config.platform))
    }

    /// Read `API_SERVER` and `PLATFORM` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_server = non_empty_var("API_SERVER").ok_or(ConfigError::Missing("API_SERVER"))?;
        let platform = non_empty_var("PLATFORM").ok_or(ConfigError::Missing("PLATFORM"))?;
        Ok(Self::new(&api_server, &platform))
    }

    /// `<api_server>/<platform>`, the prefix for relative paths.
    pub fn origin(&self) -> String {
        format!("{}/{}", self.api_server, self.platform)
    }
}

/// Which host the code runs in. Decides the transport strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEnvironment {
    /// Browser extension content context; requests go through host messaging.
    Extension,
    /// Userscript manager; requests go through its xmlhttpRequest primitive.
    Userscript,
}

impl HostEnvironment {
    /// `Extension` when `CRX` is set to anything but empty, `0` or `false`.
    pub fn from_env() -> Self {
        Self::from_flag(std::env::var("CRX").ok().as_deref())
    }

    fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            None | Some("") | Some("0") => HostEnvironment::Userscript,
            Some(v) if v.eq_ignore_ascii_case("false") => HostEnvironment::Userscript,
            Some(_) => HostEnvironment::Extension,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_is_parsed() {
        let config =
            ApiConfig::from_json(r#"{"apiServer":"https://api.example.com/","platform":"welearn"}"#)
                .unwrap();
        assert_eq!(config.api_server, "https://api.example.com");
        assert_eq!(config.platform, "welearn");
        assert_eq!(config.origin(), "https://api.example.com/welearn");
    }

    #[test]
    fn metadata_missing_field_is_invalid() {
        let err = ApiConfig::from_json(r#"{"apiServer":"https://api.example.com"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn crx_flag_selects_extension() {
        assert_eq!(HostEnvironment::from_flag(Some("1")), HostEnvironment::Extension);
        assert_eq!(HostEnvironment::from_flag(Some("true")), HostEnvironment::Extension);
    }

    #[test]
    fn absent_or_falsy_crx_flag_selects_userscript() {
        assert_eq!(HostEnvironment::from_flag(None), HostEnvironment::Userscript);
        assert_eq!(HostEnvironment::from_flag(Some("")), HostEnvironment::Userscript);
        assert_eq!(HostEnvironment::from_flag(Some("0")), HostEnvironment::Userscript);
        assert_eq!(HostEnvironment::from_flag(Some("FALSE")), HostEnvironment::Userscript);
    }
}
