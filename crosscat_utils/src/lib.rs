mod misc;
mod random;

pub use misc::*;
pub use random::*;
