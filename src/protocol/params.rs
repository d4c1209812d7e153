//! Programmable parameter block and its fixed-width payload
//!
//! The device expects 19 unsigned 16-bit little-endian values in a fixed
//! order. Range checking is the caller's job; this layer only packs.

use std::fmt;

use tracing::debug;

use super::{DecodeError, PacingMode};

/// Number of fields in a parameter block
pub const PARAMETER_COUNT: usize = 19;

/// Size of the `SendParams` payload in bytes
pub const PARAMS_PAYLOAD_LEN: usize = PARAMETER_COUNT * 2;

/// Parameter fields in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterField {
    /// Pacing mode id
    Mode,
    /// Atrial refractory period (ms)
    Arp,
    /// Ventricular refractory period (ms)
    Vrp,
    /// Atrial amplitude in tenths of a volt
    AtrialAmplitude,
    /// Ventricular amplitude in tenths of a volt
    VentricularAmplitude,
    /// Atrial pulse width (ms)
    AtrialPulseWidth,
    /// Ventricular pulse width (ms)
    VentricularPulseWidth,
    /// Atrial comparator reference PWM duty
    AtrialRefPwm,
    /// Ventricular comparator reference PWM duty
    VentricularRefPwm,
    /// Rate-response reaction time (s)
    ReactionTime,
    /// Rate-response recovery time (min)
    RecoveryTime,
    /// Post-ventricular atrial refractory period (ms)
    Pvarp,
    /// Fixed AV delay (ms)
    AvDelay,
    /// Rate-response factor
    ResponseFactor,
    /// Activity threshold
    ActivityThreshold,
    /// Lower rate limit (ppm)
    LowerRateLimit,
    /// Upper rate limit (ppm)
    UpperRateLimit,
    /// Maximum sensor rate (ppm)
    MaxSensorRate,
    /// Rate smoothing (%)
    RateSmoothing,
}

impl ParameterField {
    /// All fields, in the order they appear on the wire
    pub const ALL: [Self; PARAMETER_COUNT] = [
        Self::Mode,
        Self::Arp,
        Self::Vrp,
        Self::AtrialAmplitude,
        Self::VentricularAmplitude,
        Self::AtrialPulseWidth,
        Self::VentricularPulseWidth,
        Self::AtrialRefPwm,
        Self::VentricularRefPwm,
        Self::ReactionTime,
        Self::RecoveryTime,
        Self::Pvarp,
        Self::AvDelay,
        Self::ResponseFactor,
        Self::ActivityThreshold,
        Self::LowerRateLimit,
        Self::UpperRateLimit,
        Self::MaxSensorRate,
        Self::RateSmoothing,
    ];

    /// Position of this field in the payload (in 16-bit words)
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Key used by the device model and by configuration files
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Mode => "MODE",
            Self::Arp => "ARP",
            Self::Vrp => "VRP",
            Self::AtrialAmplitude => "ATR_AMPLITUDE",
            Self::VentricularAmplitude => "VENT_AMPLITUDE",
            Self::AtrialPulseWidth => "ATR_PULSEWIDTH",
            Self::VentricularPulseWidth => "VENT_PULSEWIDTH",
            Self::AtrialRefPwm => "ATR_CMP_REF_PWM",
            Self::VentricularRefPwm => "VENT_CMP_REF_PWM",
            Self::ReactionTime => "REACTION_TIME",
            Self::RecoveryTime => "RECOVERY_TIME",
            Self::Pvarp => "PVARP",
            Self::AvDelay => "FIXED_AV_DELAY",
            Self::ResponseFactor => "RESPONSE_FACTOR",
            Self::ActivityThreshold => "ACTIVITY_THRESHOLD",
            Self::LowerRateLimit => "LOWER_RATE_LIMIT",
            Self::UpperRateLimit => "UPPER_RATE_LIMIT",
            Self::MaxSensorRate => "MAXIMUM_SENSOR_RATE",
            Self::RateSmoothing => "RATE_SMOOTHING",
        }
    }

    /// Look up a field by key (case-insensitive)
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Validated parameter block, ready for the wire.
///
/// Amplitudes are held in tenths of a volt. Fields the caller never sets
/// stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterSet {
    values: [u16; PARAMETER_COUNT],
}

impl ParameterSet {
    /// All-zero parameter set
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: [0; PARAMETER_COUNT],
        }
    }

    /// Build from values already in wire order
    #[must_use]
    pub const fn from_values(values: [u16; PARAMETER_COUNT]) -> Self {
        Self { values }
    }

    /// Values in wire order
    #[must_use]
    pub const fn values(&self) -> [u16; PARAMETER_COUNT] {
        self.values
    }

    /// Get a single field
    #[must_use]
    pub const fn get(&self, field: ParameterField) -> u16 {
        self.values[field.index()]
    }

    /// Set a single field
    pub fn set(&mut self, field: ParameterField, value: u16) {
        self.values[field.index()] = value;
    }

    /// Set a field, returning the updated set
    #[must_use]
    pub fn with(mut self, field: ParameterField, value: u16) -> Self {
        self.set(field, value);
        self
    }

    /// Set the pacing mode field
    #[must_use]
    pub fn with_mode(self, mode: PacingMode) -> Self {
        self.with(ParameterField::Mode, mode.id())
    }

    /// Pacing mode, if the mode field holds a known id
    #[must_use]
    pub fn mode(&self) -> Option<PacingMode> {
        PacingMode::from_id(self.get(ParameterField::Mode))
    }

    /// Convert a float to a wire value, truncating toward zero.
    ///
    /// Out-of-range values saturate; NaN becomes zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn truncate(value: f64) -> u16 {
        value as u16
    }

    /// Convert an amplitude in volts to tenths of a volt.
    ///
    /// Truncates after scaling, so 3.57 V becomes 35 rather than 36.
    #[must_use]
    pub fn amplitude_tenths(volts: f64) -> u16 {
        Self::truncate(volts * 10.0)
    }

    /// Build from `(key, value)` pairs using the device's field names.
    ///
    /// Values are truncated toward zero. Missing fields stay zero and unknown
    /// keys are skipped.
    pub fn from_named<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut set = Self::new();
        for (key, value) in pairs {
            match ParameterField::from_key(key) {
                Some(field) => set.set(field, Self::truncate(value)),
                None => debug!(key, "ignoring unknown parameter key"),
            }
        }
        set
    }

    /// Pack into the 38-byte `SendParams` payload
    #[must_use]
    pub fn encode(&self) -> [u8; PARAMS_PAYLOAD_LEN] {
        let mut bytes = [0u8; PARAMS_PAYLOAD_LEN];
        for (chunk, value) in bytes.chunks_exact_mut(2).zip(self.values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Unpack a `SendParams` payload
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::PayloadLength`] unless the payload is exactly
    /// 38 bytes.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() != PARAMS_PAYLOAD_LEN {
            return Err(DecodeError::PayloadLength {
                expected: PARAMS_PAYLOAD_LEN,
                got: payload.len(),
            });
        }

        let mut values = [0u16; PARAMETER_COUNT];
        for (value, chunk) in values.iter_mut().zip(payload.chunks_exact(2)) {
            *value = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Ok(Self { values })
    }
}
