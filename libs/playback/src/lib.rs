//! Запись живого потока событий в bag и воспроизведение bag'а в UDP
//! с исходными интервалами между событиями.

pub mod error;
mod feed;
mod pacing;
mod recorder;
mod replayer;
mod sink;

pub use error::PlaybackError;
pub use feed::{UdpFeed, spawn_udp_feed};
pub use pacing::{ReplayState, remaining_gap};
pub use recorder::{RecordSummary, Recorder};
pub use replayer::{ReplaySummary, Replayer};
pub use sink::{DatagramSink, SinkFuture, UdpSink};
