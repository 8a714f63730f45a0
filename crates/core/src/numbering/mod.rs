//! Business document numbering.
//!
//! Every document type shares one numbering algorithm; what differs per type
//! (prefix, yearly reset, branch scope, whether it may carry a journal entry)
//! is a property of the closed `DocumentType` enum.

pub mod document_type;
pub mod error;
pub mod sequence;

pub use document_type::DocumentType;
pub use error::NumberingError;
pub use sequence::{
    AssignedNumber, NO_BRANCH, NO_FISCAL_YEAR, SequenceKey, fiscal_year_for, format_number,
};
