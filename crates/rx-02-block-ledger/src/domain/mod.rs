//! # Domain Layer
//!
//! Pure domain logic for the Block Ledger subsystem.
//!
//! ## Modules
//!
//! - `entities` - Block, IssuedEntry, Prescription, PatientData
//! - `journal` - Append-only usage journal
//! - `serial` - Serial rendering schemes
//! - `reservation` - Leased claim on the next slot
//! - `invariants` - Per-block and cross-block consistency checks
//! - `value_objects` - Configuration, storage keys, stats
//! - `errors` - Domain error types

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod journal;
pub mod reservation;
pub mod serial;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use journal::Journal;
pub use reservation::Reservation;
pub use serial::{serial, serial_width, SerialScheme, MIN_SERIAL_WIDTH};
pub use value_objects::*;
