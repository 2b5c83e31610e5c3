// Task lines: scanning, encoding, tags and date annotations.

pub mod annotation;
pub mod codec;
pub mod scan;
pub mod tags;

pub use codec::{close_in_place, decode, encode};
pub use tags::TagSet;
