//! # Serial Computation
//!
//! Pure, deterministic rendering of a block slot into its human-readable
//! serial.
//!
//! ## Schemes
//!
//! | Scheme | Prefix | Index 0 | Index 1 |
//! |--------|--------|---------|---------|
//! | `Padded` | `B2024-001` | `B2024-001-001` | `B2024-001-002` |
//! | `Continuation` | `29-8448968` | `29-8448968` | `29-8448969` |
//!
//! `Padded` zero-pads `index + 1` to at least three digits, widening to the
//! digit count of the block's capacity so that serials of one block sort
//! lexicographically in issuance order. `Continuation` keeps the digit width
//! of the prefix's trailing number, and a block whose last serial would need
//! more digits is refused at import.

use serde::{Deserialize, Serialize};

/// Minimum digit width of the padded counter.
pub const MIN_SERIAL_WIDTH: usize = 3;

/// Serial for `index` with the minimum three-digit counter.
///
/// `serial("B2024-001", 0) == "B2024-001-001"`.
pub fn serial(prefix: &str, index: u32) -> String {
    padded(prefix, index, MIN_SERIAL_WIDTH)
}

/// Counter width for a block of the given capacity.
pub fn serial_width(capacity: u32) -> usize {
    let digits = capacity.max(1).to_string().len();
    digits.max(MIN_SERIAL_WIDTH)
}

fn padded(prefix: &str, index: u32, width: usize) -> String {
    let number = u64::from(index) + 1;
    format!("{}-{:0width$}", prefix, number, width = width)
}

/// How a block renders serials from its prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SerialScheme {
    /// `prefix-NNN`, counter starting at 1.
    #[default]
    Padded,
    /// Prefix is the full serial of the first form; later forms add the
    /// slot index to its trailing number.
    Continuation,
}

impl SerialScheme {
    /// Render the serial for a slot.
    pub fn render(&self, prefix: &str, index: u32, capacity: u32) -> String {
        match self {
            SerialScheme::Padded => padded(prefix, index, serial_width(capacity)),
            SerialScheme::Continuation => match ContinuationBase::parse(prefix) {
                Some(base) => base.render(index),
                None => padded(prefix, index, serial_width(capacity)),
            },
        }
    }

    /// Check that a prefix can render every slot of a block.
    pub fn validate_prefix(&self, prefix: &str, capacity: u32) -> Result<(), String> {
        if prefix.trim().is_empty() {
            return Err("serial prefix is empty".to_string());
        }
        match self {
            SerialScheme::Padded => Ok(()),
            SerialScheme::Continuation => {
                let base = ContinuationBase::parse(prefix).ok_or_else(|| {
                    format!("serial prefix '{}' has no trailing number to continue", prefix)
                })?;
                let last = base
                    .start
                    .checked_add(u64::from(capacity.saturating_sub(1)))
                    .ok_or_else(|| format!("serial prefix '{}' overflows", prefix))?;
                // A wider last number would break lexicographic order within the block.
                if last.to_string().len() > base.width {
                    return Err(format!(
                        "serial prefix '{}' cannot number {} forms within {} digits",
                        prefix, capacity, base.width
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Parsed first serial of a `Continuation` block.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ContinuationBase {
    /// Text before the final `-`, if any.
    base: Option<String>,
    /// Trailing number of the first form.
    start: u64,
    /// Digit count of the trailing number (leading zeros kept).
    width: usize,
}

impl ContinuationBase {
    fn parse(prefix: &str) -> Option<Self> {
        let (base, digits) = match prefix.rsplit_once('-') {
            Some((base, digits)) if !base.is_empty() => (Some(base.to_string()), digits),
            Some(_) => return None,
            None => (None, prefix),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let start = digits.parse::<u64>().ok()?;
        Some(Self {
            base,
            start,
            width: digits.len(),
        })
    }

    fn render(&self, index: u32) -> String {
        let number = self.start.saturating_add(u64::from(index));
        match &self.base {
            Some(base) => format!("{}-{:0width$}", base, number, width = self.width),
            None => format!("{:0width$}", number, width = self.width),
        }
    }
}
