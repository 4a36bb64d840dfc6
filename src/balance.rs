//! Lifetime per-book balances.
//!
//! A balance is the book price minus every payment the student ever made for
//! that book. Academic years label payments for reporting; they never reset or
//! partition a balance.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::records::{Book, Payment, Student};
use crate::types::{BookId, PaymentStatus};

/// sum of every payment for the (student, book) pair, across all years
pub fn lifetime_paid(student_id: &str, book_id: &str, payments: &[Payment]) -> Money {
    payments
        .iter()
        .filter(|p| p.is_for(student_id, book_id))
        .map(|p| p.amount_paid)
        .sum()
}

/// sum of payments for the (student, book) pair inside one academic year
pub fn year_paid(
    student_id: &str,
    book_id: &str,
    academic_year_id: Option<&str>,
    payments: &[Payment],
) -> Money {
    let Some(year) = academic_year_id else {
        return Money::ZERO;
    };
    payments
        .iter()
        .filter(|p| p.is_for(student_id, book_id) && p.in_year(year))
        .map(|p| p.amount_paid)
        .sum()
}

/// price minus lifetime payments; zero or below means settled
pub fn compute_balance(student_id: &str, book: &Book, payments: &[Payment]) -> Money {
    book.price - lifetime_paid(student_id, &book.book_id, payments)
}

/// true when the student has at least one payment recorded for the book
pub fn has_history(student_id: &str, book_id: &str, payments: &[Payment]) -> bool {
    payments.iter().any(|p| p.is_for(student_id, book_id))
}

/// alphabetical title order used for allocation and display
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// balance view of one book for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookBalance {
    pub book_id: BookId,
    pub lifetime_paid: Money,
    pub balance: Money,
    pub status: PaymentStatus,
}

impl BookBalance {
    pub fn for_student(student_id: &str, book: &Book, payments: &[Payment]) -> Self {
        let lifetime_paid = lifetime_paid(student_id, &book.book_id, payments);
        let balance = book.price - lifetime_paid;
        Self {
            book_id: book.book_id.clone(),
            lifetime_paid,
            balance,
            status: PaymentStatus::classify(balance, lifetime_paid),
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.balance.is_positive()
    }
}

/// book with a positive balance, as fed to the allocator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingBook {
    pub book_id: BookId,
    pub book_title: String,
    pub class: String,
    pub price: Money,
    pub balance: Money,
}

/// books relevant to a student: their current class plus anything they
/// have ever paid towards, in input order without duplicates
pub fn relevant_books<'a>(student: &Student, books: &'a [Book], payments: &[Payment]) -> Vec<&'a Book> {
    let paid_for: HashSet<&str> = payments
        .iter()
        .filter(|p| p.student_id == student.student_id)
        .map(|p| p.book_id.as_str())
        .collect();

    let mut seen = HashSet::new();
    books
        .iter()
        .filter(|b| b.class == student.class || paid_for.contains(b.book_id.as_str()))
        .filter(|b| seen.insert(b.book_id.clone()))
        .collect()
}

/// positive balances among `books`, sorted by title
pub fn outstanding_among<'a, I>(student_id: &str, books: I, payments: &[Payment]) -> Vec<OutstandingBook>
where
    I: IntoIterator<Item = &'a Book>,
{
    let mut outstanding: Vec<OutstandingBook> = books
        .into_iter()
        .filter_map(|book| {
            let balance = compute_balance(student_id, book, payments);
            balance.is_positive().then(|| OutstandingBook {
                book_id: book.book_id.clone(),
                book_title: book.book_title.clone(),
                class: book.class.clone(),
                price: book.price,
                balance,
            })
        })
        .collect();

    outstanding.sort_by(|a, b| {
        compare_titles(&a.book_title, &b.book_title).then_with(|| a.book_id.cmp(&b.book_id))
    });
    outstanding
}

/// every outstanding balance the student carries, sorted by title
pub fn outstanding_books(student: &Student, books: &[Book], payments: &[Payment]) -> Vec<OutstandingBook> {
    outstanding_among(
        &student.student_id,
        relevant_books(student, books, payments),
        payments,
    )
}

pub fn total_outstanding(outstanding: &[OutstandingBook]) -> Money {
    outstanding.iter().map(|b| b.balance).sum()
}

/// balance remaining on the book right after `payment` was recorded
///
/// Payments for the pair are replayed oldest first (ties broken by payment
/// id) up to and including `payment`.
pub fn balance_after_payment(payment: &Payment, book: &Book, payments: &[Payment]) -> Result<Money> {
    let mut history: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.is_for(&payment.student_id, &payment.book_id))
        .collect();
    history.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.payment_id.cmp(&b.payment_id)));

    let mut paid = Money::ZERO;
    for p in history {
        paid += p.amount_paid;
        if p.payment_id == payment.payment_id {
            return Ok(book.price - paid);
        }
    }

    Err(FeeError::PaymentNotFound {
        payment_id: payment.payment_id.clone(),
    })
}
