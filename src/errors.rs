use thiserror::Error;

use crate::decimal::Money;
use crate::types::{Collection, WriteOperation};

#[derive(Error, Debug)]
pub enum FeeError {
    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("payment exceeds outstanding balance: outstanding {outstanding}, requested {requested}")]
    PaymentExceedsOutstanding {
        outstanding: Money,
        requested: Money,
    },

    #[error("no books selected for payment")]
    NoBooksSelected,

    #[error("no academic year selected")]
    NoAcademicYear,

    #[error("student id already exists: {student_id}")]
    DuplicateStudentId {
        student_id: String,
    },

    #[error("student with the same name, parent name and phone already exists: {name}")]
    DuplicateStudent {
        name: String,
    },

    #[error("book already exists for class {class}: {title}")]
    DuplicateBook {
        title: String,
        class: String,
    },

    #[error("student not found: {student_id}")]
    StudentNotFound {
        student_id: String,
    },

    #[error("book not found: {book_id}")]
    BookNotFound {
        book_id: String,
    },

    #[error("academic year not found: {academic_year_id}")]
    AcademicYearNotFound {
        academic_year_id: String,
    },

    #[error("payment not found: {payment_id}")]
    PaymentNotFound {
        payment_id: String,
    },

    #[error("unknown class: {class}")]
    UnknownClass {
        class: String,
    },

    #[error("academic year must be in YYYY/YYYY format: {year}")]
    InvalidAcademicYear {
        year: String,
    },

    #[error("invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("store rejected {operation} on {collection}: {message}")]
    StoreWrite {
        collection: Collection,
        operation: WriteOperation,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeeError {
    /// true for the conditions a caller should present as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FeeError::StudentNotFound { .. }
                | FeeError::BookNotFound { .. }
                | FeeError::AcademicYearNotFound { .. }
                | FeeError::PaymentNotFound { .. }
        )
    }

    /// true for validation failures raised before any store interaction
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FeeError::InvalidPaymentAmount { .. }
                | FeeError::PaymentExceedsOutstanding { .. }
                | FeeError::NoBooksSelected
                | FeeError::NoAcademicYear
                | FeeError::UnknownClass { .. }
                | FeeError::InvalidAcademicYear { .. }
                | FeeError::InvalidField { .. }
        )
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            FeeError::DuplicateStudentId { .. }
                | FeeError::DuplicateStudent { .. }
                | FeeError::DuplicateBook { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FeeError>;
