//! Generic helpers shared by integrations.

pub mod auth;
pub mod email;
pub mod json;

pub use auth::verify_bearer;
pub use email::{normalize_email, normalize_email_list};
pub use json::{
    compact, decode_configuration, embed_json, first_string, lookup_path,
    object_or_empty,
};
