//! Per-student financial profiles.
//!
//! A profile lists the books of the student's current class, whatever their
//! balance, plus any book from another class that the student has paid
//! towards and still owes on. Balances and statuses use lifetime payments;
//! the `total_paid` column only counts the selected academic year.

use serde::{Deserialize, Serialize};

use crate::balance::{compare_titles, has_history, lifetime_paid, year_paid};
use crate::classes::ClassSequence;
use crate::decimal::Money;
use crate::errors::Result;
use crate::records::{Book, Payment, Student};
use crate::types::{BookId, PaymentStatus, StudentId};

/// one row of a student's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBook {
    pub book_id: BookId,
    /// carry-forward titles carry their class, e.g. `Reader (Prim1)`
    pub book_title: String,
    pub class: String,
    pub book_price: Money,
    /// paid in the selected academic year only
    pub total_paid: Money,
    pub balance: Money,
    pub status: PaymentStatus,
    pub carried_forward: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFinancialProfile {
    pub student_id: StudentId,
    pub student_name: String,
    pub class: String,
    pub books: Vec<ProfileBook>,
    pub total_balance: Money,
}

impl StudentFinancialProfile {
    pub fn has_outstanding(&self) -> bool {
        self.total_balance.is_positive()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn profile_book(
    student_id: &str,
    book: &Book,
    payments: &[Payment],
    academic_year_id: Option<&str>,
    carried_forward: bool,
) -> ProfileBook {
    let lifetime = lifetime_paid(student_id, &book.book_id, payments);
    let balance = book.price - lifetime;
    let book_title = if carried_forward {
        format!("{} ({})", book.book_title, book.class)
    } else {
        book.book_title.clone()
    };

    ProfileBook {
        book_id: book.book_id.clone(),
        book_title,
        class: book.class.clone(),
        book_price: book.price,
        total_paid: year_paid(student_id, &book.book_id, academic_year_id, payments),
        balance,
        status: PaymentStatus::classify(balance, lifetime),
        carried_forward,
    }
}

/// build the profile of one student
pub fn build_profile(
    student: &Student,
    books: &[Book],
    payments: &[Payment],
    academic_year_id: Option<&str>,
) -> StudentFinancialProfile {
    let student_id = student.student_id.as_str();

    let mut rows: Vec<ProfileBook> = books
        .iter()
        .filter_map(|book| {
            if book.class == student.class {
                return Some(profile_book(student_id, book, payments, academic_year_id, false));
            }
            if !has_history(student_id, &book.book_id, payments) {
                return None;
            }
            let row = profile_book(student_id, book, payments, academic_year_id, true);
            row.balance.is_positive().then_some(row)
        })
        .collect();

    rows.sort_by(|a, b| {
        compare_titles(&a.book_title, &b.book_title).then_with(|| a.book_id.cmp(&b.book_id))
    });

    let total_balance = rows.iter().map(|r| r.balance).sum();

    StudentFinancialProfile {
        student_id: student.student_id.clone(),
        student_name: student.student_name.clone(),
        class: student.class.clone(),
        books: rows,
        total_balance,
    }
}

/// profiles for every active student, ordered by class then name
pub fn build_profiles(
    students: &[Student],
    books: &[Book],
    payments: &[Payment],
    academic_year_id: Option<&str>,
    sequence: &ClassSequence,
) -> Vec<StudentFinancialProfile> {
    let mut profiles: Vec<StudentFinancialProfile> = students
        .iter()
        .filter(|s| s.is_active())
        .map(|s| build_profile(s, books, payments, academic_year_id))
        .collect();

    profiles.sort_by(|a, b| {
        sequence
            .compare(&a.class, &b.class)
            .then_with(|| compare_titles(&a.student_name, &b.student_name))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    profiles
}

/// list filter applied on top of built profiles
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileFilter {
    /// keep students who owe something, and only their owing books
    pub outstanding_only: bool,
    /// case-insensitive substring of the student name
    pub search: Option<String>,
}

impl ProfileFilter {
    pub fn outstanding() -> Self {
        Self {
            outstanding_only: true,
            search: None,
        }
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search = Some(term.to_string());
        self
    }

    pub fn apply(&self, profiles: &[StudentFinancialProfile]) -> Vec<StudentFinancialProfile> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        profiles
            .iter()
            .filter(|p| !self.outstanding_only || p.has_outstanding())
            .filter(|p| match &needle {
                Some(n) => p.student_name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .map(|p| {
                let mut p = p.clone();
                if self.outstanding_only {
                    p.books.retain(|b| b.balance.is_positive());
                }
                p
            })
            .collect()
    }
}

/// grand totals across a list of profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub students: usize,
    pub total_price: Money,
    pub total_paid: Money,
    pub total_balance: Money,
}

impl ProfileSummary {
    pub fn of(profiles: &[StudentFinancialProfile]) -> Self {
        let mut summary = Self {
            students: profiles.len(),
            ..Self::default()
        };
        for profile in profiles {
            summary.total_balance += profile.total_balance;
            for book in &profile.books {
                summary.total_price += book.book_price;
                summary.total_paid += book.total_paid;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::fixtures::{book, payment, student};
    use crate::types::StudentStatus;

    #[test]
    fn test_settled_carry_forward_is_hidden() {
        let s = student("S1", "Prim2");
        let books = vec![
            book("B1", "Reader", "Prim1", 40),
            book("B2", "Atlas", "Prim1", 30),
            book("B3", "Maths", "Prim2", 50),
        ];
        let payments = vec![
            payment(1, "S1", "B1", "AY1", Money::from_major(40)),
            payment(2, "S1", "B2", "AY1", Money::from_major(15)),
        ];

        let profile = build_profile(&s, &books, &payments, Some("AY2"));
        let titles: Vec<&str> = profile.books.iter().map(|b| b.book_title.as_str()).collect();
        assert_eq!(titles, vec!["Atlas (Prim1)", "Maths"]);

        let atlas = &profile.books[0];
        assert!(atlas.carried_forward);
        assert_eq!(atlas.balance, Money::from_major(15));
        assert_eq!(atlas.status, PaymentStatus::Partial);
        assert_eq!(profile.total_balance, Money::from_major(65));
    }

    #[test]
    fn test_paid_column_is_year_scoped() {
        let s = student("S1", "Prim1");
        let books = vec![book("B1", "Maths", "Prim1", 100)];
        let payments = vec![
            payment(1, "S1", "B1", "AY1", Money::from_major(60)),
            payment(2, "S1", "B1", "AY2", Money::from_major(40)),
        ];

        let profile = build_profile(&s, &books, &payments, Some("AY2"));
        let row = &profile.books[0];
        assert_eq!(row.total_paid, Money::from_major(40));
        assert_eq!(row.balance, Money::ZERO);
        assert_eq!(row.status, PaymentStatus::Paid);

        let no_year = build_profile(&s, &books, &payments, None);
        assert_eq!(no_year.books[0].total_paid, Money::ZERO);
        assert_eq!(no_year.books[0].balance, Money::ZERO);
    }

    #[test]
    fn test_current_class_books_shown_when_paid() {
        let s = student("S1", "Prim1");
        let books = vec![book("B1", "Maths", "Prim1", 20), book("B2", "Art", "Prim1", 10)];
        let payments = vec![payment(1, "S1", "B1", "AY1", Money::from_major(20))];
        let profile = build_profile(&s, &books, &payments, Some("AY1"));
        assert_eq!(profile.books.len(), 2);
        assert_eq!(profile.books[0].status, PaymentStatus::Unpaid);
        assert_eq!(profile.books[1].status, PaymentStatus::Paid);
    }

    #[test]
    fn test_profiles_skip_graduates_and_sort_by_class() {
        let seq = ClassSequence::standard();
        let mut done = student("S4", "JHS3");
        done.status = StudentStatus::Graduated;

        let mut a = student("S1", "Prim2");
        a.student_name = "Zed".to_string();
        let mut b = student("S2", "Prim2");
        b.student_name = "abel".to_string();
        let c = student("S3", "KG1");

        let profiles = build_profiles(&[a, b, c, done], &[], &[], None, &seq);
        let ids: Vec<&str> = profiles.iter().map(|p| p.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S2", "S1"]);
    }

    #[test]
    fn test_filter_and_summary() {
        let seq = ClassSequence::standard();
        let mut owing = student("S1", "Prim1");
        owing.student_name = "Ama Owusu".to_string();
        let mut clear = student("S2", "Prim1");
        clear.student_name = "Kwame Boateng".to_string();

        let books = vec![book("B1", "Maths", "Prim1", 50), book("B2", "Art", "Prim1", 20)];
        let payments = vec![
            payment(1, "S1", "B2", "AY1", Money::from_major(20)),
            payment(2, "S2", "B1", "AY1", Money::from_major(50)),
            payment(3, "S2", "B2", "AY1", Money::from_major(20)),
        ];
        let profiles = build_profiles(&[owing, clear], &books, &payments, Some("AY1"), &seq);

        let filtered = ProfileFilter::outstanding().apply(&profiles);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].books.len(), 1);
        assert_eq!(filtered[0].books[0].book_id, "B1");

        let found = ProfileFilter::default().search("  BOAT").apply(&profiles);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].student_id, "S2");

        let summary = ProfileSummary::of(&profiles);
        assert_eq!(summary.students, 2);
        assert_eq!(summary.total_price, Money::from_major(140));
        assert_eq!(summary.total_paid, Money::from_major(90));
        assert_eq!(summary.total_balance, Money::from_major(50));
    }
}
