//! # Domain Layer
//!
//! - `errors` - `IssuanceError` taxonomy
//! - `events` - `LedgerEvent` mirrored by the sync relay
//! - `value_objects` - `IssuanceConfig`, `ImportRequest`, `FormFields`

pub mod errors;
pub mod events;
pub mod value_objects;

pub use errors::IssuanceError;
pub use events::LedgerEvent;
pub use value_objects::{FormFields, ImportRequest, IssuanceConfig};
