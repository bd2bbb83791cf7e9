pub mod access;

pub use access::{has_access, AccessDecision, AccessPolicy, Caller};
