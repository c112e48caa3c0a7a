use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::signal::PropagationError;

/// Downlink parameters of one constellation, as used by the link budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstellationProfile {
    pub name: String,
    pub altitude_km: f64,
    pub eirp_dbw: f64,
    pub antenna_gain_dbi: f64,
    pub frequency_ghz: f64,
    #[serde(default = "default_design_margin_db")]
    pub design_margin_db: f64,
}

fn default_design_margin_db() -> f64 {
    3.0
}

impl ConstellationProfile {
    pub fn starlink() -> Self {
        Self {
            name: "starlink".to_string(),
            altitude_km: 550.0,
            eirp_dbw: 37.0,
            antenna_gain_dbi: 42.0,
            frequency_ghz: 12.2,
            design_margin_db: 3.0,
        }
    }

    pub fn oneweb() -> Self {
        Self {
            name: "oneweb".to_string(),
            altitude_km: 1200.0,
            eirp_dbw: 35.5,
            antenna_gain_dbi: 39.0,
            frequency_ghz: 17.8,
            design_margin_db: 4.0,
        }
    }

    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            altitude_km: 800.0,
            eirp_dbw: 36.0,
            antenna_gain_dbi: 40.0,
            frequency_ghz: 14.0,
            design_margin_db: 3.5,
        }
    }

    pub fn validate(&self) -> Result<(), PropagationError> {
        let positive = |value: f64, what: &str| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(PropagationError::InvalidGeometry(format!(
                    "constellation {}: {} must be positive, got {}",
                    self.name, what, value
                )))
            }
        };
        positive(self.altitude_km, "altitude_km")?;
        positive(self.frequency_ghz, "frequency_ghz")?;
        if !(self.eirp_dbw.is_finite()
            && self.antenna_gain_dbi.is_finite()
            && self.design_margin_db.is_finite())
        {
            return Err(PropagationError::InvalidGeometry(format!(
                "constellation {}: non-finite power parameter",
                self.name
            )));
        }
        Ok(())
    }
}

/// Name-keyed constellation profile lookup. Names are case-insensitive.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, ConstellationProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
        };
        for profile in [
            ConstellationProfile::starlink(),
            ConstellationProfile::oneweb(),
            ConstellationProfile::generic(),
        ] {
            registry.profiles.insert(profile.name.clone(), profile);
        }
        registry
    }
}

impl ProfileRegistry {
    /// Add or replace a profile. Invalid profiles are rejected.
    pub fn insert(&mut self, profile: ConstellationProfile) -> Result<(), PropagationError> {
        profile.validate()?;
        self.profiles.insert(profile.name.to_lowercase(), profile);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&ConstellationProfile, PropagationError> {
        self.profiles
            .get(&name.to_lowercase())
            .ok_or_else(|| PropagationError::UnknownConstellation(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
