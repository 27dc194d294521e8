pub mod document;
pub mod profile;

pub use document::Document;
pub use profile::{AuthUser, Profile, Role};
