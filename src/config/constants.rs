// src/config/constants.rs
//! System-wide filtering constants

/// Frequency limits
pub mod frequency {
    /// Default lowest frequency any filter may be set to
    pub const DEFAULT_MIN_FREQUENCY_HZ: f64 = 0.1;
    /// The configurable floor is never allowed below this value
    pub const ABSOLUTE_MIN_FREQUENCY_HZ: f64 = 0.001;
    /// Design cutoffs are kept strictly below Nyquist by this ratio
    pub const MAX_NORMALIZED_CUTOFF: f64 = 0.9999;
}

/// Butterworth filter constants
pub mod butterworth {
    pub const DEFAULT_ORDER: usize = 2;
    pub const MIN_ORDER: usize = 1;
    pub const MAX_ORDER: usize = 32;
}

/// Notch filter constants
pub mod notch {
    /// Maximum number of notch fundamentals
    pub const MAX_NOTCHES: usize = 10;
    /// Stop-band width of each notch
    pub const NOTCH_WIDTH_HZ: f64 = 1.0;
    /// Fixed order of the band-stop (and of the substitute low-pass)
    pub const NOTCH_ORDER: usize = 2;
    /// Harmonics above the low-pass edge plus this many fundamentals are redundant
    pub const HARMONIC_GUARD_FUNDAMENTALS: f64 = 2.0;
    /// Two notch frequencies closer than this are the same notch
    pub const DUPLICATE_TOLERANCE_HZ: f64 = 1e-6;
}

/// Safe margin constants
pub mod margin {
    /// High-pass margin stops growing with order beyond this factor
    pub const HIGHPASS_MAX_ORDER_FACTOR: usize = 10;
    /// Empirical floor of the low-pass margin
    pub const LOWPASS_MIN_MARGIN_SAMPLES: usize = 10;
    /// At most this many notch filters extend the margin
    pub const NOTCH_MAX_FILTER_FACTOR: usize = 3;
    /// Hard ceiling of any margin
    pub const MAX_SAFE_MARGIN_SAMPLES: usize = 100_000;
}

/// Envelope constants
pub mod envelope {
    pub const DEFAULT_WIDTH_MS: f64 = 100.0;
    pub const MIN_WIDTH_MS: f64 = 1.0;
    pub const MIN_WINDOW_SAMPLES: usize = 3;
}

/// Spatial filter constants
pub mod spatial {
    /// Neighbors lie within this factor of the nearest-neighbor distance
    pub const NEIGHBOR_DISTANCE_FACTOR: f64 = 1.5;
    pub const MAX_NEIGHBORS: usize = 8;
    /// Coordinate file extension
    pub const COORDINATES_EXTENSION: &str = "xyz";
}

/// Parameter file locations
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "filters.toml";
    pub const LOCAL_CONFIG_FILE: &str = "filters.local.toml";
    pub const USER_CONFIG_DIR: &str = ".eeg-filters";
    /// Environment variable prefix for overrides
    pub const ENV_PREFIX: &str = "EEGF_";
}
