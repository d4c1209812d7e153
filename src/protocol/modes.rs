//! Pacing modes and their device ids

use std::fmt;
use std::str::FromStr;

use super::Error;

/// Bradycardia pacing modes supported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum PacingMode {
    /// Atrium paced, no sensing
    Aoo = 0,
    /// Ventricle paced, no sensing
    Voo = 1,
    /// Atrium paced and sensed, inhibited
    Aai = 2,
    /// Ventricle paced and sensed, inhibited
    Vvi = 3,
    /// `AOO` with rate response
    Aoor = 4,
    /// `VOO` with rate response
    Voor = 5,
    /// `AAI` with rate response
    Aair = 6,
    /// `VVI` with rate response
    Vvir = 7,
    /// Dual chamber paced and sensed, dual response, rate adaptive
    Dddr = 8,
}

/// Heart chamber in a mode code position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chamber {
    /// `O`
    None,
    /// `A`
    Atrium,
    /// `V`
    Ventricle,
    /// `D`
    Dual,
}

/// Response to a sensed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// `O`
    None,
    /// `I`
    Inhibit,
    /// `T`
    Trigger,
    /// `D`
    Dual,
}

/// Decoded mode code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeInfo {
    /// Chamber paced
    pub paced: Chamber,
    /// Chamber sensed
    pub sensed: Chamber,
    /// Response to sensing
    pub response: Response,
    /// Rate modulation enabled
    pub rate_adaptive: bool,
}

impl PacingMode {
    /// Every mode, ordered by device id
    #[must_use]
    pub const fn all() -> [Self; 9] {
        [
            Self::Aoo,
            Self::Voo,
            Self::Aai,
            Self::Vvi,
            Self::Aoor,
            Self::Voor,
            Self::Aair,
            Self::Vvir,
            Self::Dddr,
        ]
    }

    /// Numeric id sent in the mode parameter field
    #[must_use]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Look up a mode by device id
    #[must_use]
    pub const fn from_id(id: u16) -> Option<Self> {
        match id {
            0 => Some(Self::Aoo),
            1 => Some(Self::Voo),
            2 => Some(Self::Aai),
            3 => Some(Self::Vvi),
            4 => Some(Self::Aoor),
            5 => Some(Self::Voor),
            6 => Some(Self::Aair),
            7 => Some(Self::Vvir),
            8 => Some(Self::Dddr),
            _ => None,
        }
    }

    /// Mode code, e.g. `"VVIR"`
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Aoo => "AOO",
            Self::Voo => "VOO",
            Self::Aai => "AAI",
            Self::Vvi => "VVI",
            Self::Aoor => "AOOR",
            Self::Voor => "VOOR",
            Self::Aair => "AAIR",
            Self::Vvir => "VVIR",
            Self::Dddr => "DDDR",
        }
    }

    /// Break the code into chamber and response positions
    #[must_use]
    pub const fn info(self) -> ModeInfo {
        let (paced, sensed, response) = match self {
            Self::Aoo | Self::Aoor => (Chamber::Atrium, Chamber::None, Response::None),
            Self::Voo | Self::Voor => (Chamber::Ventricle, Chamber::None, Response::None),
            Self::Aai | Self::Aair => (Chamber::Atrium, Chamber::Atrium, Response::Inhibit),
            Self::Vvi | Self::Vvir => (Chamber::Ventricle, Chamber::Ventricle, Response::Inhibit),
            Self::Dddr => (Chamber::Dual, Chamber::Dual, Response::Dual),
        };
        ModeInfo {
            paced,
            sensed,
            response,
            rate_adaptive: matches!(
                self,
                Self::Aoor | Self::Voor | Self::Aair | Self::Vvir | Self::Dddr
            ),
        }
    }

    /// One-line description for display
    #[must_use]
    pub fn describe(self) -> String {
        let info = self.info();
        format!(
            "{}: {} paced, {} sensed, {} response, {}",
            self.code(),
            info.paced,
            info.sensed,
            info.response,
            if info.rate_adaptive {
                "rate-responsive"
            } else {
                "no rate response"
            }
        )
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Atrium => "atrium",
            Self::Ventricle => "ventricle",
            Self::Dual => "dual",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "no",
            Self::Inhibit => "inhibit",
            Self::Trigger => "trigger",
            Self::Dual => "dual",
        };
        f.write_str(name)
    }
}

impl fmt::Display for PacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PacingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|mode| mode.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownMode(s.to_string()))
    }
}
