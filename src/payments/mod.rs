pub mod allocation;
pub mod receipt;

use serde::{Deserialize, Serialize};

use crate::balance::{total_outstanding, OutstandingBook};
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::types::{AcademicYearId, BookId, PaymentMethod, StudentId};

pub use allocation::{allocate, Allocation, AllocationLine};
pub use receipt::{PaymentReceipt, ReceiptLine};

/// admin payment request against a chosen set of books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub student_id: StudentId,
    pub book_ids: Vec<BookId>,
    pub amount: Money,
    pub method: PaymentMethod,
    pub academic_year_id: Option<AcademicYearId>,
}

impl PaymentRequest {
    pub fn new(student_id: &str, book_ids: &[&str], amount: Money, academic_year_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            book_ids: book_ids.iter().map(|b| b.to_string()).collect(),
            amount,
            method: PaymentMethod::Cash,
            academic_year_id: Some(academic_year_id.to_string()),
        }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }
}

/// outstanding balances a payment is checked and allocated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentContext {
    pub student_id: StudentId,
    pub outstanding: Vec<OutstandingBook>,
}

impl PaymentContext {
    pub fn new(student_id: &str, outstanding: Vec<OutstandingBook>) -> Self {
        Self {
            student_id: student_id.to_string(),
            outstanding,
        }
    }

    pub fn total_outstanding(&self) -> Money {
        total_outstanding(&self.outstanding)
    }

    /// nothing left to pay on any of the books
    pub fn is_settled(&self) -> bool {
        self.outstanding.is_empty()
    }

    pub fn validate_amount(&self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(FeeError::InvalidPaymentAmount { amount });
        }
        Ok(())
    }

    /// reject non-positive amounts and amounts above the total outstanding
    pub fn validate_payment(&self, amount: Money) -> Result<()> {
        self.validate_amount(amount)?;

        let outstanding = self.total_outstanding();
        if amount > outstanding {
            return Err(FeeError::PaymentExceedsOutstanding {
                outstanding,
                requested: amount,
            });
        }

        Ok(())
    }

    /// validate then allocate in outstanding order
    pub fn allocate(&self, amount: Money) -> Result<Allocation> {
        self.validate_payment(amount)?;
        Ok(allocate(amount, &self.outstanding))
    }
}

/// result of a payment attempt that passed validation
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Recorded(PaymentReceipt),
    /// every selected book was already settled
    NothingToRecord,
}

impl PaymentOutcome {
    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match self {
            PaymentOutcome::Recorded(receipt) => Some(receipt),
            PaymentOutcome::NothingToRecord => None,
        }
    }
}
