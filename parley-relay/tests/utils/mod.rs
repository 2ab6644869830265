pub mod null_media;
pub mod relay_harness;

pub use null_media::*;
pub use relay_harness::*;
