pub mod error;

pub use error::{RoloError, RoloResult};
