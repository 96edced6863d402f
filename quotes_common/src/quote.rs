//! Quote data model.
//!
//! A `Quote` is the immutable payload served to clients: a stable integer id and a
//! non-empty text. On the wire it is the JSON object `{"id": <integer>, "text": <string>}`.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a quote, unique and stable for the lifetime of the process.
pub type QuoteId = u64;

/// A single quotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// Unique identifier assigned at load time.
    pub id: QuoteId,
    /// Quotation text.
    pub text: String,
}

impl Quote {
    /// Creates a quote from its parts.
    pub fn new(id: QuoteId, text: impl Into<String>) -> Self {
        Quote {
            id,
            text: text.into(),
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.text)
    }
}
