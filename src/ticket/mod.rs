//! Ticket identifiers and their statuses

mod extract;
mod identifier;
mod status;

pub use extract::{ExtractorError, TicketExtractor, CONTEXT_MARKERS, CONTEXT_WINDOW};
pub use identifier::Identifier;
pub use status::{Status, StatusCategory, StatusColor};
