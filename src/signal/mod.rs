mod error;
mod profile;
mod propagation;

pub use error::PropagationError;
pub use profile::{ConstellationProfile, ProfileRegistry};
pub use propagation::{
    check_rsrp_band, free_space_path_loss_db, slant_range_km, LinkGeometry, PropagationMode,
    PropagationModel, SignalEstimate, Weather, EARTH_RADIUS_KM, RSRP_MAX_DBM, RSRP_MIN_DBM,
};
