use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::Money;

/// externally assigned student identifier
pub type StudentId = String;

/// time-based book identifier (`B{millis}`)
pub type BookId = String;

/// time-based academic year identifier (`AY{millis}`)
pub type AcademicYearId = String;

/// payment identifier, equal to the record key in the store
pub type PaymentId = String;

/// student enrolment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StudentStatus {
    #[default]
    Active,
    Graduated,
}

/// how a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    Cash,
    #[serde(rename = "Mobile Money")]
    MobileMoney,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::MobileMoney => "Mobile Money",
            PaymentMethod::BankTransfer => "Bank Transfer",
        };
        f.write_str(label)
    }
}

/// settlement status of a single book for a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// nothing left to pay
    Paid,
    /// something paid, something still owed
    Partial,
    /// nothing paid yet
    Unpaid,
}

impl PaymentStatus {
    /// classify from the lifetime balance and lifetime amount paid
    pub fn classify(balance: Money, lifetime_paid: Money) -> Self {
        if !balance.is_positive() {
            PaymentStatus::Paid
        } else if lifetime_paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

/// store collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collection {
    Students,
    Books,
    AcademicYears,
    Payments,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Students => "students",
            Collection::Books => "books",
            Collection::AcademicYears => "academicYears",
            Collection::Payments => "payments",
        };
        f.write_str(name)
    }
}

/// kind of write attempted against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOperation {
    Create,
    Update,
    Delete,
    Batch,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteOperation::Create => "create",
            WriteOperation::Update => "update",
            WriteOperation::Delete => "delete",
            WriteOperation::Batch => "batch",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification_is_total() {
        let price = Money::from_major(100);
        for paid_minor in [0_i64, 1, 5_000, 9_999, 10_000, 12_000] {
            let paid = Money::from_minor(paid_minor);
            let balance = price - paid;
            let status = PaymentStatus::classify(balance, paid);
            assert_eq!(status == PaymentStatus::Paid, !balance.is_positive());
        }

        assert_eq!(PaymentStatus::classify(Money::from_major(100), Money::ZERO), PaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::classify(Money::from_major(40), Money::from_major(60)), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::classify(Money::ZERO, Money::from_major(100)), PaymentStatus::Paid);
    }

    #[test]
    fn test_free_book_is_paid() {
        assert_eq!(PaymentStatus::classify(Money::ZERO, Money::ZERO), PaymentStatus::Paid);
    }

    #[test]
    fn test_payment_method_wire_names() {
        let json = serde_json::to_string(&PaymentMethod::MobileMoney).unwrap();
        assert_eq!(json, "\"Mobile Money\"");
        let back: PaymentMethod = serde_json::from_str("\"Bank Transfer\"").unwrap();
        assert_eq!(back, PaymentMethod::BankTransfer);
        assert_eq!(PaymentMethod::Cash.to_string(), "Cash");
    }
}
