// ghtasks-common: task line codec, section reconciliation and document
// assembly for syncing tracker items into a markdown note.

pub mod document;
pub mod reconcile;
pub mod section;
pub mod settings;
pub mod task;
pub mod types;

pub use document::{assemble, Assembled, SectionBatch, SectionReport};
pub use settings::{SettingsError, SyncSettings};
