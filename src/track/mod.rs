pub mod line;
pub mod volume;

pub use line::{LineTrack, Segment, MAX_CROSSINGS};
pub use volume::VolumeEstimator;
