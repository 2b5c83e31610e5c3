// Managed sections: locating headers and the task records beneath them.

pub mod parser;

pub use parser::{locate_sections, Section};
