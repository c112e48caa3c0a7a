use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

use crate::ephemeris::{EphemerisError, EphemerisSource, GeoLocation, TleCatalog, TleEphemeris};
use crate::events::{A4Config, A5Config, EventError};
use crate::handover::{SatelliteSelector, DEFAULT_MIN_ELEVATION_DEG};
use crate::signal::{
    ConstellationProfile, ProfileRegistry, PropagationError, PropagationMode, PropagationModel,
    Weather,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Signal(#[from] PropagationError),
    #[error(transparent)]
    Events(#[from] EventError),
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub observer: ObserverConfig,
    pub ephemeris: EphemerisConfig,
    #[serde(default)]
    pub constellation: ConstellationConfig,
    #[serde(default)]
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub records: Option<RecordsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EphemerisConfig {
    pub tle_folder: PathBuf,
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstellationConfig {
    /// Profile used for satellites without a recognised constellation tag.
    #[serde(default = "default_constellation")]
    pub name: String,
    /// Extra or replacement profiles.
    #[serde(default)]
    pub profiles: Vec<ConstellationProfile>,
}

fn default_constellation() -> String {
    "starlink".to_string()
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            name: default_constellation(),
            profiles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropagationConfig {
    #[serde(default)]
    pub mode: PropagationMode,
    #[serde(default = "default_rain_rate")]
    pub rain_rate_mm_h: f64,
}

fn default_rain_rate() -> f64 {
    Weather::default().rain_rate_mm_h
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            mode: PropagationMode::default(),
            rain_rate_mm_h: default_rain_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_min_elevation")]
    pub min_elevation_deg: f64,
}

fn default_min_elevation() -> f64 {
    DEFAULT_MIN_ELEVATION_DEG
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: default_min_elevation(),
        }
    }
}

/// Durations are humantime strings such as `5s` or `100ms`.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_delta_t")]
    pub delta_t: String,
    #[serde(default = "default_precision")]
    pub precision: String,
}

fn default_delta_t() -> String {
    "5s".to_string()
}

fn default_precision() -> String {
    "100ms".to_string()
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            delta_t: default_delta_t(),
            precision: default_precision(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsConfig {
    #[serde(default)]
    pub a4: Option<A4Config>,
    #[serde(default)]
    pub a5: Option<A5Config>,
    /// How far an event may sit from a predicted trigger and still agree.
    #[serde(default)]
    pub corroboration_tolerance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    pub path: PathBuf,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.location()?;
        self.profile()?;
        if !self.propagation.rain_rate_mm_h.is_finite() || self.propagation.rain_rate_mm_h < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "propagation.rain_rate_mm_h must be non-negative, got {}",
                self.propagation.rain_rate_mm_h
            )));
        }
        if !(0.0..90.0).contains(&self.selector.min_elevation_deg) {
            return Err(ConfigError::Invalid(format!(
                "selector.min_elevation_deg must be in [0, 90), got {}",
                self.selector.min_elevation_deg
            )));
        }
        positive_duration("prediction.delta_t", &self.prediction.delta_t)?;
        positive_duration("prediction.precision", &self.prediction.precision)?;
        self.corroboration_tolerance()?;
        if let Some(a4) = &self.events.a4 {
            a4.validate()?;
        }
        if let Some(a5) = &self.events.a5 {
            a5.validate()?;
        }
        Ok(())
    }

    pub fn location(&self) -> Result<GeoLocation, ConfigError> {
        GeoLocation::from_coordinates(&self.observer.coordinates, Some(self.observer.altitude_m))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "observer.coordinates must be \"lat, lon\", got {:?}",
                    self.observer.coordinates
                ))
            })
    }

    /// Built-in profiles with the configured ones layered on top.
    pub fn profiles(&self) -> Result<ProfileRegistry, ConfigError> {
        let mut registry = ProfileRegistry::default();
        for profile in &self.constellation.profiles {
            registry.insert(profile.clone())?;
        }
        Ok(registry)
    }

    pub fn profile(&self) -> Result<ConstellationProfile, ConfigError> {
        Ok(self.profiles()?.lookup(&self.constellation.name)?.clone())
    }

    pub fn propagation_model(&self) -> PropagationModel {
        PropagationModel::new(
            self.propagation.mode,
            Weather {
                rain_rate_mm_h: self.propagation.rain_rate_mm_h,
            },
        )
    }

    pub fn delta_t(&self) -> Result<Duration, ConfigError> {
        positive_duration("prediction.delta_t", &self.prediction.delta_t)
    }

    pub fn precision(&self) -> Result<Duration, ConfigError> {
        positive_duration("prediction.precision", &self.prediction.precision)
    }

    /// Defaults to the prediction precision.
    pub fn corroboration_tolerance(&self) -> Result<Duration, ConfigError> {
        match &self.events.corroboration_tolerance {
            Some(s) => positive_duration("events.corroboration_tolerance", s),
            None => self.precision(),
        }
    }

    pub fn tle_ephemeris(&self, base: &Path) -> Result<TleEphemeris, ConfigError> {
        let folder = base.join(&self.ephemeris.tle_folder);
        let catalog = TleCatalog::load_dir(&folder)?;
        log::info!(
            "Loaded {} satellites from {}",
            catalog.len(),
            folder.display()
        );
        let ephemeris = TleEphemeris::new(catalog);
        Ok(match self.ephemeris.query_timeout_ms {
            Some(ms) => ephemeris.with_query_timeout(std::time::Duration::from_millis(ms)),
            None => ephemeris,
        })
    }

    pub fn selector<E: EphemerisSource>(
        &self,
        ephemeris: E,
    ) -> Result<SatelliteSelector<E>, ConfigError> {
        Ok(
            SatelliteSelector::new(ephemeris, self.propagation_model(), self.profile()?)
                .with_min_elevation(self.selector.min_elevation_deg)
                .with_profiles(self.profiles()?),
        )
    }
}

fn positive_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    let duration = parse_duration(value)
        .map_err(|e| ConfigError::Invalid(format!("{}: {}", field, e)))?;
    if duration <= Duration::zero() {
        return Err(ConfigError::Invalid(format!("{} must be positive", field)));
    }
    Ok(duration)
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
        use crate::testing::{epoch, ScriptedEphemeris, ISS_TLE};
    use uuid::Uuid;

    const MINIMAL: &str = r#"
observer:
  coordinates: "25.03, 121.56"
ephemeris:
  tle_folder: tle
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str(MINIMAL).unwrap();
        assert_eq!(config.constellation.name, "starlink");
        assert_eq!(config.propagation.mode, PropagationMode::Physics);
        assert_eq!(config.selector.min_elevation_deg, 10.0);
        assert_eq!(config.delta_t().unwrap(), Duration::seconds(5));
        assert_eq!(config.precision().unwrap(), Duration::milliseconds(100));
        assert_eq!(
            config.corroboration_tolerance().unwrap(),
            Duration::milliseconds(100)
        );
        assert!(config.events.a4.is_none());
        assert!(config.records.is_none());

        let location = config.location().unwrap();
        assert_eq!(location.latitude_deg, 25.03);
        assert_eq!(location.altitude_m, 0.0);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
observer:
  coordinates: "-33.9, 18.4"
  altitude_m: 120
ephemeris:
  tle_folder: /var/lib/tle
  query_timeout_ms: 1500
constellation:
  name: test-sat
  profiles:
    - name: Test-Sat
      altitude_km: 600
      eirp_dbw: 30
      antenna_gain_dbi: 35
      frequency_ghz: 11.7
propagation:
  mode: linear_elevation
  rain_rate_mm_h: 0
selector:
  min_elevation_deg: 25
prediction:
  delta_t: 30s
  precision: 250ms
events:
  a4:
    threshold_dbm: -100
  a5:
    threshold1_dbm: -110
    threshold2_dbm: -100
    time_to_trigger_ms: 320
  corroboration_tolerance: 2s
records:
  path: out/predictions.jsonl
"#;
        let config = Config::from_str(yaml).unwrap();
        let profile = config.profile().unwrap();
        assert_eq!(profile.altitude_km, 600.0);
        assert_eq!(profile.design_margin_db, 3.0);
        assert_eq!(config.propagation_model().mode(), PropagationMode::LinearElevation);
        assert_eq!(config.delta_t().unwrap(), Duration::seconds(30));
        assert_eq!(config.corroboration_tolerance().unwrap(), Duration::seconds(2));
        assert_eq!(config.events.a4.unwrap().hysteresis_db, 2.0);
        assert_eq!(config.events.a5.unwrap().time_to_trigger_ms, 320);
        assert_eq!(
            config.records.unwrap().path,
            PathBuf::from("out/predictions.jsonl")
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_coordinates = MINIMAL.replace("25.03, 121.56", "north-ish");
        assert!(matches!(
            Config::from_str(&bad_coordinates),
            Err(ConfigError::Invalid(_))
        ));

        let unknown_constellation = format!("{}constellation:\n  name: kuiper\n", MINIMAL);
        assert!(matches!(
            Config::from_str(&unknown_constellation),
            Err(ConfigError::Signal(PropagationError::UnknownConstellation(_)))
        ));

        let zero_precision = format!("{}prediction:\n  precision: 0s\n", MINIMAL);
        assert!(matches!(
            Config::from_str(&zero_precision),
            Err(ConfigError::Invalid(_))
        ));

        let bad_ttt = format!("{}events:\n  a4:\n    time_to_trigger_ms: 0\n", MINIMAL);
        assert!(matches!(
            Config::from_str(&bad_ttt),
            Err(ConfigError::Events(EventError::InvalidConfig { .. }))
        ));

        assert!(matches!(
            Config::from_str("observer: [1, 2]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_selector_applies_config() {
        let yaml = format!("{}selector:\n  min_elevation_deg: 30\n", MINIMAL);
        let config = Config::from_str(&yaml).unwrap();
        let ephemeris = ScriptedEphemeris::new(epoch())
            .with_track("A", 25.0, 0.0)
            .with_track("B", 35.0, 0.0);
        let selector = config.selector(ephemeris).unwrap();
        assert_eq!(selector.min_elevation_deg(), 30.0);
        let observed = selector
            .observe(epoch(), &config.location().unwrap())
            .unwrap();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].id, "B");
    }

    #[test]
    fn test_tle_ephemeris_from_folder() {
        let base = std::env::temp_dir().join(format!("leo-handover-{}", Uuid::new_v4()));
        std::fs::create_dir_all(base.join("tle")).unwrap();
        std::fs::write(base.join("tle").join("stations.tle"), ISS_TLE).unwrap();

        let config = Config::from_str(MINIMAL).unwrap();
        let ephemeris = config.tle_ephemeris(&base).unwrap();
        assert_eq!(ephemeris.catalog().len(), 1);

        std::fs::remove_dir_all(&base).unwrap();
    }
}
