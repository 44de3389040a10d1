//! Wire types for the Remo local API

use serde::{Deserialize, Serialize};
use serde_json::error::Category;

/// Unit tag the device uses for every timing value (microseconds)
pub const FORMAT_MICROS: &str = "us";

/// IR sub-carrier frequency, as reported by the device
pub type Freq = i64;

/// On/off interval sequence of an IR signal.
///
/// When receiving, the device measures on-to-off and off-to-on intervals
/// and records them in order, starting with "on". When sending, it toggles
/// the sub-carrier with the same sequence.
pub type Data = Vec<i64>;

/// Unit of the values in [`Data`]
pub type Format = String;

/// An IR signal as exchanged with the device.
///
/// Fields missing from a record decode to their zero values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrSignal {
    /// Sub-carrier frequency
    #[serde(rename = "freq")]
    pub frequency: Freq,
    /// On/off durations in `format` units
    #[serde(rename = "data")]
    pub timings: Data,
    /// Unit tag, carried through verbatim
    pub format: Format,
}

impl IrSignal {
    /// Build a signal with microsecond timings
    pub fn new(frequency: Freq, timings: Data) -> Self {
        Self {
            frequency,
            timings,
            format: FORMAT_MICROS.to_string(),
        }
    }

    /// Total length of the waveform, in `format` units
    pub fn duration(&self) -> i64 {
        self.timings.iter().fold(0i64, |acc, t| acc.saturating_add(*t))
    }

    /// Serialize to the wire record
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode the first wire record in `body`; anything after it is ignored.
    ///
    /// Returns `Ok(None)` when the input ends before the record is closed.
    /// The firmware answers with `{"format":"us","freq":38,"data":[` and
    /// hangs up when it has nothing recorded.
    pub fn decode(body: &[u8]) -> serde_json::Result<Option<Self>> {
        match serde_json::Deserializer::from_slice(body)
            .into_iter::<Self>()
            .next()
        {
            Some(Ok(sig)) => Ok(Some(sig)),
            Some(Err(e)) if e.classify() == Category::Eof => Ok(None),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

impl std::fmt::Display for IrSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "freq={} intervals={} duration={}{}",
            self.frequency,
            self.timings.len(),
            self.duration(),
            self.format
        )
    }
}
