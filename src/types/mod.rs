mod field_type;
mod models;
mod outcome;

pub use field_type::FieldType;
pub use models::*;
pub use outcome::*;
