use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_FILE_NAME: &str = "ether.toml";
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSetting {
    Simple,
    #[default]
    Full,
}

impl std::str::FromStr for ProfileSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" | "lite" => Ok(Self::Simple),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown profile '{other}'; expected 'simple' or 'full'")),
        }
    }
}

/// Root of `ether.toml`. Every tuning key is optional; omitted keys keep the
/// renderer defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EtherConfig {
    pub version: u32,
    #[serde(default)]
    pub profile: Option<ProfileSetting>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub opacity: Option<f32>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub stars: StarsSection,
    #[serde(default)]
    pub liquid: LiquidSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StarsSection {
    pub enabled: Option<bool>,
    pub layers: Option<u32>,
    pub density: Option<f32>,
    pub drift_speed: Option<f32>,
    pub rotation_speed: Option<f32>,
    pub brightness: Option<f32>,
    pub twinkle_speed: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LiquidSection {
    pub flow_speed: Option<f32>,
    pub turbulence: Option<f32>,
    pub color_mixing: Option<f32>,
    pub color_intensity: Option<f32>,
    pub background_darkness: Option<f32>,
    pub initial_brightness: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Frames per second; `0` disables the cap.
    pub max_fps: Option<f32>,
    /// Minimum time between frames, e.g. `"66ms"`. Alternative to `max_fps`.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_budget: Option<Duration>,
    pub time_step: Option<f32>,
    pub force_fallback: Option<bool>,
    pub allow_software: Option<bool>,
    pub min_concurrency: Option<usize>,
}

/// Resolved presentation rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameCap {
    Unset,
    Uncapped,
    Fps(f32),
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_str(&humantime::format_duration(*duration).to_string())
        }
        None => serializer.serialize_none(),
    }
}

impl EtherConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: EtherConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Configuration equivalent to an empty file.
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            ..Self::default()
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn frame_cap(&self) -> FrameCap {
        match (self.runtime.max_fps, self.runtime.frame_budget) {
            (Some(fps), _) if fps == 0.0 => FrameCap::Uncapped,
            (Some(fps), _) => FrameCap::Fps(fps),
            (None, Some(budget)) if budget.is_zero() => FrameCap::Uncapped,
            (None, Some(budget)) => FrameCap::Fps(1.0 / budget.as_secs_f32()),
            (None, None) => FrameCap::Unset,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CURRENT_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CURRENT_VERSION}",
                self.version
            )));
        }

        if let Some(colors) = &self.colors {
            if colors.is_empty() {
                return Err(ConfigError::Invalid(
                    "colors must list at least one color".into(),
                ));
            }
            if let Some(index) = colors.iter().position(|c| c.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("colors[{index}] is empty")));
            }
        }

        if let Some(class_name) = &self.class_name {
            if class_name.trim().is_empty() {
                return Err(ConfigError::Invalid("class_name may not be blank".into()));
            }
        }

        if let Some(key) = self.style.keys().find(|key| key.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "style key '{key}' may not be blank"
            )));
        }

        let runtime = &self.runtime;
        if runtime.max_fps.is_some() && runtime.frame_budget.is_some() {
            return Err(ConfigError::Invalid(
                "runtime.max_fps and runtime.frame_budget are mutually exclusive".into(),
            ));
        }
        if let Some(fps) = runtime.max_fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("runtime.max_fps must be >= 0".into()));
            }
        }
        if let Some(step) = runtime.time_step {
            if !step.is_finite() || step < 0.0 {
                return Err(ConfigError::Invalid(
                    "runtime.time_step must be >= 0".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1
profile = "simple"
colors = ["#5227FF", "#FF9FFC", "lavender"]
opacity = 0.8
class_name = "hero-backdrop"

[style]
z-index = "-1"

[stars]
enabled = true
layers = 5
density = 1.5
twinkle_speed = 2.0

[liquid]
flow_speed = 0.6
background_darkness = 0.5

[runtime]
frame_budget = "50ms"
time_step = 0.02
allow_software = true
"##;

    #[test]
    fn parses_sample_config() {
        let config = EtherConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.profile, Some(ProfileSetting::Simple));
        assert_eq!(config.colors.as_ref().map(Vec::len), Some(3));
        assert_eq!(config.opacity, Some(0.8));
        assert_eq!(config.style.get("z-index").map(String::as_str), Some("-1"));
        assert_eq!(config.stars.layers, Some(5));
        assert_eq!(config.stars.enabled, Some(true));
        assert_eq!(config.liquid.flow_speed, Some(0.6));
        assert_eq!(config.liquid.turbulence, None);
        assert_eq!(config.runtime.frame_budget, Some(Duration::from_millis(50)));
        assert_eq!(config.frame_cap(), FrameCap::Fps(20.0));
    }

    #[test]
    fn minimal_config_is_valid() {
        let config = EtherConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, EtherConfig::empty());
        assert_eq!(config.frame_cap(), FrameCap::Unset);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = EtherConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_color_list() {
        let err = EtherConfig::from_toml_str("version = 1\ncolors = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("at least one")));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = EtherConfig::from_toml_str(
            r#"
version = 1
[runtime]
frame_budget = "soon"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_conflicting_rate_settings() {
        let err = EtherConfig::from_toml_str(
            r#"
version = 1
[runtime]
max_fps = 30
frame_budget = "10ms"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = EtherConfig::from_toml_str(
            r#"
version = 1
[liquid]
viscosity = 3.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let config = EtherConfig::from_toml_str("version = 1\n[runtime]\nmax_fps = 0").unwrap();
        assert_eq!(config.frame_cap(), FrameCap::Uncapped);
    }

    #[test]
    fn out_of_range_tuning_is_left_for_clamping() {
        let config = EtherConfig::from_toml_str(
            "version = 1\nopacity = 4.0\n[stars]\nlayers = 40",
        )
        .unwrap();
        assert_eq!(config.opacity, Some(4.0));
        assert_eq!(config.stars.layers, Some(40));
    }

    #[test]
    fn serialises_back_to_toml() {
        let config = EtherConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        let reparsed = EtherConfig::from_toml_str(&text).unwrap();
        assert_eq!(reparsed.colors, config.colors);
        assert_eq!(reparsed.profile, config.profile);
        assert_eq!(reparsed.runtime.frame_budget, Some(Duration::from_millis(50)));
    }

    #[test]
    fn profile_parses_from_cli_strings() {
        assert_eq!("Simple".parse::<ProfileSetting>(), Ok(ProfileSetting::Simple));
        assert!("ultra".parse::<ProfileSetting>().is_err());
    }
}
