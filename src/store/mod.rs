//! Document store collaborator.
//!
//! The fee desk only ever talks to the four collections through
//! [`DocumentStore`]. Multi-record writes go through [`WriteBatch`] and land
//! all together or not at all.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::compare_titles;
use crate::errors::Result;
use crate::records::{AcademicYear, Book, Payment, PaymentDraft, Student, StudentPatch};
use crate::types::{BookId, Collection, PaymentId, StudentId};

pub use memory::InMemoryStore;

/// one write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOp {
    CreatePayment(PaymentDraft),
    UpdateStudent(StudentPatch),
    DeleteStudent(StudentId),
    DeleteBook(BookId),
    DeletePayment(PaymentId),
}

/// ordered list of writes committed as a unit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn push(&mut self, op: BatchOp) {
        self.ops.push(op);
    }

    pub fn create_payment(&mut self, draft: PaymentDraft) {
        self.push(BatchOp::CreatePayment(draft));
    }

    pub fn update_student(&mut self, patch: StudentPatch) {
        self.push(BatchOp::UpdateStudent(patch));
    }

    pub fn delete_student(&mut self, student_id: &str) {
        self.push(BatchOp::DeleteStudent(student_id.to_string()));
    }

    pub fn delete_book(&mut self, book_id: &str) {
        self.push(BatchOp::DeleteBook(book_id.to_string()));
    }

    pub fn delete_payment(&mut self, payment_id: &str) {
        self.push(BatchOp::DeletePayment(payment_id.to_string()));
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// the collection a failure of this batch is reported against
    ///
    /// Cascades name the record being deleted, not the payments swept with it.
    pub fn collection(&self) -> Collection {
        let touches = |wanted: fn(&BatchOp) -> bool| self.ops.iter().any(wanted);
        if touches(|op| matches!(op, BatchOp::DeleteStudent(_) | BatchOp::UpdateStudent(_))) {
            Collection::Students
        } else if touches(|op| matches!(op, BatchOp::DeleteBook(_))) {
            Collection::Books
        } else {
            Collection::Payments
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// full copy of all four collections, each in its listing order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub students: Vec<Student>,
    pub books: Vec<Book>,
    pub academic_years: Vec<AcademicYear>,
    pub payments: Vec<Payment>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// build a snapshot, putting each collection in listing order
    pub fn new(
        mut students: Vec<Student>,
        mut books: Vec<Book>,
        mut academic_years: Vec<AcademicYear>,
        mut payments: Vec<Payment>,
    ) -> Self {
        sort_students(&mut students);
        sort_books(&mut books);
        sort_academic_years(&mut academic_years);
        sort_payments(&mut payments);
        Self {
            students,
            books,
            academic_years,
            payments,
            taken_at: None,
        }
    }

    pub fn at(mut self, taken_at: DateTime<Utc>) -> Self {
        self.taken_at = Some(taken_at);
        self
    }

    /// the newest academic year, which counts as the current one
    pub fn latest_academic_year(&self) -> Option<&AcademicYear> {
        self.academic_years.first()
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.student_id == student_id)
    }
}

/// by name
pub fn sort_students(students: &mut [Student]) {
    students.sort_by(|a, b| {
        compare_titles(&a.student_name, &b.student_name).then_with(|| a.student_id.cmp(&b.student_id))
    });
}

/// by title
pub fn sort_books(books: &mut [Book]) {
    books.sort_by(|a, b| {
        compare_titles(&a.book_title, &b.book_title).then_with(|| a.book_id.cmp(&b.book_id))
    });
}

/// newest year first
pub fn sort_academic_years(years: &mut [AcademicYear]) {
    years.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then_with(|| b.academic_year_id.cmp(&a.academic_year_id))
    });
}

/// newest payment first
pub fn sort_payments(payments: &mut [Payment]) {
    payments.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.payment_id.cmp(&a.payment_id)));
}

/// the persistent collections the fee desk reads and writes
pub trait DocumentStore {
    /// server-assigned timestamp for writes
    fn now(&self) -> DateTime<Utc>;

    fn get_student(&self, student_id: &str) -> Result<Option<Student>>;
    fn get_book(&self, book_id: &str) -> Result<Option<Book>>;
    fn get_academic_year(&self, academic_year_id: &str) -> Result<Option<AcademicYear>>;
    fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>>;

    fn list_students(&self) -> Result<Vec<Student>>;
    fn list_books(&self) -> Result<Vec<Book>>;
    fn list_academic_years(&self) -> Result<Vec<AcademicYear>>;
    fn list_payments(&self) -> Result<Vec<Payment>>;

    /// payments of one student, newest first
    fn payments_for_student(&self, student_id: &str) -> Result<Vec<Payment>> {
        Ok(self
            .list_payments()?
            .into_iter()
            .filter(|p| p.student_id == student_id)
            .collect())
    }

    /// payments against one book, newest first
    fn payments_for_book(&self, book_id: &str) -> Result<Vec<Payment>> {
        Ok(self
            .list_payments()?
            .into_iter()
            .filter(|p| p.book_id == book_id)
            .collect())
    }

    fn create_student(&self, student: Student) -> Result<()>;
    /// merge the patch into the stored student
    fn update_student(&self, patch: StudentPatch) -> Result<Student>;
    fn create_book(&self, book: Book) -> Result<()>;
    fn update_book(&self, book: Book) -> Result<()>;
    fn create_academic_year(&self, year: AcademicYear) -> Result<()>;
    fn delete_payment(&self, payment_id: &str) -> Result<()>;

    /// apply every op or none; returns the id written by each op in order
    fn commit(&self, batch: WriteBatch) -> Result<Vec<String>>;

    fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(
            self.list_students()?,
            self.list_books()?,
            self.list_academic_years()?,
            self.list_payments()?,
        )
        .at(self.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(id: &str, label: &str) -> AcademicYear {
        AcademicYear {
            academic_year_id: id.to_string(),
            year: label.to_string(),
        }
    }

    #[test]
    fn test_latest_year_is_first() {
        let snapshot = Snapshot::new(
            vec![],
            vec![],
            vec![year("AY1", "2023/2024"), year("AY3", "2025/2026"), year("AY2", "2024/2025")],
            vec![],
        );
        let labels: Vec<&str> = snapshot.academic_years.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(labels, vec!["2025/2026", "2024/2025", "2023/2024"]);
        assert_eq!(snapshot.latest_academic_year().map(|y| y.academic_year_id.as_str()), Some("AY3"));
    }

    #[test]
    fn test_batch_builder() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());
        batch.delete_student("S1");
        batch.delete_payment("P1");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0], BatchOp::DeleteStudent("S1".to_string()));
    }

    #[test]
    fn test_batch_collection_follows_owning_record() {
        let mut payments_only = WriteBatch::new();
        payments_only.delete_payment("P1");
        assert_eq!(payments_only.collection(), Collection::Payments);

        let mut book_cascade = WriteBatch::new();
        book_cascade.delete_payment("P1");
        book_cascade.delete_book("B1");
        assert_eq!(book_cascade.collection(), Collection::Books);

        let mut promotion = WriteBatch::new();
        promotion.update_student(StudentPatch::new("S1").class("Prim2"));
        assert_eq!(promotion.collection(), Collection::Students);
    }
}
