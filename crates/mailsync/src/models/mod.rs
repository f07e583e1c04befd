//! Domain models for the sync pipeline

mod address;
mod email;
mod label;
mod window;

pub use address::{EmailAddress, extract_domain};
pub use email::{Attachment, BodyType, MISSING, NO_BODY, NormalizedEmail, NormalizedEmailBuilder};
pub use label::LabelId;
pub use window::{Extreme, SyncBound, SyncWindow};
