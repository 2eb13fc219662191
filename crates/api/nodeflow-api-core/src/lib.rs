//! nodeflow-api-core: socket value model and coercion rules (engine-agnostic)

pub mod coercion;
pub mod json;
pub mod value;

pub use value::{Value, ValueKind};
