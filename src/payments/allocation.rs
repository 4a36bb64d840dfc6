use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::balance::OutstandingBook;
use crate::decimal::Money;
use crate::records::PaymentDraft;
use crate::types::{AcademicYearId, BookId, PaymentMethod};

/// portion of a payment assigned to one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub book_id: BookId,
    pub book_title: String,
    pub amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
}

/// result of spreading one payment over outstanding books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Allocation {
    pub lines: Vec<AllocationLine>,
    pub unallocated: Money,
}

impl Allocation {
    pub fn total_allocated(&self) -> Money {
        self.lines.iter().map(|l| l.amount).sum()
    }

    /// true when no book received anything
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// one payment record per line, all tagged with the same year and method
    pub fn to_drafts(
        &self,
        student_id: &str,
        academic_year_id: &AcademicYearId,
        method: PaymentMethod,
    ) -> Vec<PaymentDraft> {
        self.lines
            .iter()
            .map(|line| PaymentDraft {
                student_id: student_id.to_string(),
                book_id: line.book_id.clone(),
                academic_year_id: academic_year_id.clone(),
                amount_paid: line.amount,
                method,
            })
            .collect()
    }
}

/// greedily allocate `amount` across `outstanding` in the given order
///
/// Each book takes `min(remaining, balance)`; books with no balance get
/// nothing and no zero-amount line is ever produced. Whatever is left once
/// the list is exhausted comes back as `unallocated`. Rejecting amounts above
/// the total outstanding is the caller's job.
pub fn allocate(amount: Money, outstanding: &[OutstandingBook]) -> Allocation {
    let mut remaining = amount;
    let mut lines = Vec::new();

    for book in outstanding {
        if !remaining.is_positive() {
            break;
        }

        let portion = remaining.min(book.balance);
        if !portion.is_positive() {
            continue;
        }

        let balance_after = book.balance - portion;
        debug!(
            book_id = %book.book_id,
            portion = %portion,
            balance_after = %balance_after,
            "allocated to book"
        );

        lines.push(AllocationLine {
            book_id: book.book_id.clone(),
            book_title: book.book_title.clone(),
            amount: portion,
            balance_before: book.balance,
            balance_after,
        });
        remaining -= portion;
    }

    Allocation {
        lines,
        unallocated: remaining,
    }
}
