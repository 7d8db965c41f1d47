mod provision;

pub use provision::{DEFAULT_IDENTIFIER_MAX_LENGTH, ProvisionConfig};
