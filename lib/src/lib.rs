mod chart;
mod error;
mod lttb;
mod reporters;
mod sample;
pub mod telemetry;

pub use chart::*;
pub use error::Error;
pub use lttb::*;
pub use reporters::*;
pub use sample::*;
pub use telemetry::{read_payload, read_radar, IngestOptions, PayloadLog, RadarTrack};
