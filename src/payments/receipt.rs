use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::balance_after_payment;
use crate::decimal::Money;
use crate::errors::Result;
use crate::records::{Book, Payment, Student};
use crate::types::{AcademicYearId, PaymentMethod, StudentId};

/// one book on a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub payment: Payment,
    pub book_title: String,
    pub balance_after: Money,
}

/// receipt for one or more payment records made together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub student_id: StudentId,
    pub student_name: String,
    pub class: String,
    pub academic_year_id: AcademicYearId,
    pub method: PaymentMethod,
    pub issued_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
    pub total_paid: Money,
}

impl PaymentReceipt {
    pub fn new(
        student: &Student,
        academic_year_id: AcademicYearId,
        method: PaymentMethod,
        issued_at: DateTime<Utc>,
        lines: Vec<ReceiptLine>,
    ) -> Self {
        let total_paid = lines.iter().map(|l| l.payment.amount_paid).sum();
        Self {
            student_id: student.student_id.clone(),
            student_name: student.student_name.clone(),
            class: student.class.clone(),
            academic_year_id,
            method,
            issued_at,
            lines,
            total_paid,
        }
    }

    /// reprint a receipt for a single past payment
    ///
    /// The balance shown is the one right after that payment, not today's.
    pub fn for_past_payment(
        student: &Student,
        book: &Book,
        payment: &Payment,
        all_payments: &[Payment],
    ) -> Result<Self> {
        let balance_after = balance_after_payment(payment, book, all_payments)?;
        let line = ReceiptLine {
            payment: payment.clone(),
            book_title: book.book_title.clone(),
            balance_after,
        };
        Ok(Self::new(
            student,
            payment.academic_year_id.clone(),
            payment.method,
            payment.date,
            vec![line],
        ))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::fixtures::{book, payment, student};

    #[test]
    fn test_past_payment_receipt_shows_balance_at_the_time() {
        let s = student("S1", "Prim1");
        let b = book("B1", "Maths", "Prim1", 100);
        let payments = vec![
            payment(1, "S1", "B1", "AY1", Money::from_major(40)),
            payment(2, "S1", "B1", "AY2", Money::from_major(35)),
        ];

        let receipt = PaymentReceipt::for_past_payment(&s, &b, &payments[0], &payments).unwrap();
        assert_eq!(receipt.lines[0].balance_after, Money::from_major(60));
        assert_eq!(receipt.total_paid, Money::from_major(40));
        assert_eq!(receipt.academic_year_id, "AY1");
        assert_eq!(receipt.issued_at, payments[0].date);
    }

    #[test]
    fn test_receipt_serializes() {
        let s = student("S1", "Prim1");
        let b = book("B1", "Maths", "Prim1", 100);
        let payments = vec![payment(1, "S1", "B1", "AY1", Money::from_major(40))];
        let receipt = PaymentReceipt::for_past_payment(&s, &b, &payments[0], &payments).unwrap();
        let json = receipt.to_json_pretty().unwrap();
        assert!(json.contains("\"bookTitle\": \"Maths\""));
        assert!(json.contains("\"balanceAfter\": \"60.00\""));
        assert!(json.contains("\"totalPaid\": \"40.00\""));
    }
}
