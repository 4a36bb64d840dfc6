use chrono::{DateTime, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{FeeError, Result};
use crate::records::{AcademicYear, Book, Payment, Student, StudentPatch};
use crate::types::{AcademicYearId, BookId, Collection, PaymentId, StudentId, WriteOperation};

use super::{
    sort_academic_years, sort_books, sort_payments, sort_students, BatchOp, DocumentStore,
    Snapshot, WriteBatch,
};

#[derive(Debug, Clone, Default)]
struct Collections {
    students: BTreeMap<StudentId, Student>,
    books: BTreeMap<BookId, Book>,
    academic_years: BTreeMap<AcademicYearId, AcademicYear>,
    payments: BTreeMap<PaymentId, Payment>,
}

impl Collections {
    fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.students.values().cloned().collect(),
            self.books.values().cloned().collect(),
            self.academic_years.values().cloned().collect(),
            self.payments.values().cloned().collect(),
        )
    }

    /// apply one batch op, returning the id it wrote
    fn apply(&mut self, op: BatchOp, now: DateTime<Utc>) -> Result<String> {
        match op {
            BatchOp::CreatePayment(draft) => {
                let payment_id = Uuid::new_v4().to_string();
                let payment = draft.into_payment(payment_id.clone(), now);
                self.payments.insert(payment_id.clone(), payment);
                Ok(payment_id)
            }
            BatchOp::UpdateStudent(patch) => {
                let student = self.students.get_mut(&patch.student_id).ok_or_else(|| {
                    FeeError::StudentNotFound {
                        student_id: patch.student_id.clone(),
                    }
                })?;
                patch.apply(student);
                Ok(patch.student_id)
            }
            BatchOp::DeleteStudent(student_id) => {
                self.students
                    .remove(&student_id)
                    .ok_or_else(|| FeeError::StudentNotFound {
                        student_id: student_id.clone(),
                    })?;
                Ok(student_id)
            }
            BatchOp::DeleteBook(book_id) => {
                self.books
                    .remove(&book_id)
                    .ok_or_else(|| FeeError::BookNotFound {
                        book_id: book_id.clone(),
                    })?;
                Ok(book_id)
            }
            BatchOp::DeletePayment(payment_id) => {
                self.payments
                    .remove(&payment_id)
                    .ok_or_else(|| FeeError::PaymentNotFound {
                        payment_id: payment_id.clone(),
                    })?;
                Ok(payment_id)
            }
        }
    }
}

/// in-process document store with snapshot subscriptions
///
/// Timestamps come from the owned time provider so tests can pin and
/// advance the clock. `set_deny_writes(true)` makes every write fail the way
/// a permission denial would.
pub struct InMemoryStore {
    time: SafeTimeProvider,
    inner: Mutex<Collections>,
    subscribers: Mutex<Vec<Sender<Snapshot>>>,
    deny_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new(time: SafeTimeProvider) -> Self {
        Self {
            time,
            inner: Mutex::new(Collections::default()),
            subscribers: Mutex::new(Vec::new()),
            deny_writes: AtomicBool::new(false),
        }
    }

    /// store stamped with the system clock
    pub fn with_system_time() -> Self {
        Self::new(SafeTimeProvider::new(TimeSource::System))
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub fn set_deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    /// receive the current snapshot now and a fresh one after every write
    pub fn subscribe(&self) -> Receiver<Snapshot> {
        let (tx, rx) = mpsc::channel();
        let snapshot = self.collections().snapshot().at(self.time.now());
        if tx.send(snapshot).is_ok() {
            self.lock_subscribers().push(tx);
        }
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn collections(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Sender<Snapshot>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self, collection: Collection, operation: WriteOperation) -> Result<()> {
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(FeeError::StoreWrite {
                collection,
                operation,
                message: "permission denied".to_string(),
            });
        }
        Ok(())
    }

    /// fan the latest snapshot out, dropping receivers that hung up
    fn publish(&self) {
        let snapshot = self.collections().snapshot().at(self.time.now());
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        debug!(subscribers = subscribers.len(), "published snapshot");
    }

    fn write<T>(
        &self,
        collection: Collection,
        operation: WriteOperation,
        f: impl FnOnce(&mut Collections) -> Result<T>,
    ) -> Result<T> {
        self.check_writable(collection, operation)?;
        let result = {
            let mut inner = self.collections();
            f(&mut *inner)?
        };
        self.publish();
        Ok(result)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::with_system_time()
    }
}

fn already_exists(collection: Collection, id: &str) -> FeeError {
    FeeError::StoreWrite {
        collection,
        operation: WriteOperation::Create,
        message: format!("document {} already exists", id),
    }
}

impl DocumentStore for InMemoryStore {
    fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        Ok(self.collections().students.get(student_id).cloned())
    }

    fn get_book(&self, book_id: &str) -> Result<Option<Book>> {
        Ok(self.collections().books.get(book_id).cloned())
    }

    fn get_academic_year(&self, academic_year_id: &str) -> Result<Option<AcademicYear>> {
        Ok(self.collections().academic_years.get(academic_year_id).cloned())
    }

    fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>> {
        Ok(self.collections().payments.get(payment_id).cloned())
    }

    fn list_students(&self) -> Result<Vec<Student>> {
        let mut students: Vec<Student> = self.collections().students.values().cloned().collect();
        sort_students(&mut students);
        Ok(students)
    }

    fn list_books(&self) -> Result<Vec<Book>> {
        let mut books: Vec<Book> = self.collections().books.values().cloned().collect();
        sort_books(&mut books);
        Ok(books)
    }

    fn list_academic_years(&self) -> Result<Vec<AcademicYear>> {
        let mut years: Vec<AcademicYear> = self.collections().academic_years.values().cloned().collect();
        sort_academic_years(&mut years);
        Ok(years)
    }

    fn list_payments(&self) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.collections().payments.values().cloned().collect();
        sort_payments(&mut payments);
        Ok(payments)
    }

    fn create_student(&self, student: Student) -> Result<()> {
        self.write(Collection::Students, WriteOperation::Create, |c| {
            if c.students.contains_key(&student.student_id) {
                return Err(already_exists(Collection::Students, &student.student_id));
            }
            c.students.insert(student.student_id.clone(), student);
            Ok(())
        })
    }

    fn update_student(&self, patch: StudentPatch) -> Result<Student> {
        self.write(Collection::Students, WriteOperation::Update, |c| {
            let student = c
                .students
                .get_mut(&patch.student_id)
                .ok_or_else(|| FeeError::StudentNotFound {
                    student_id: patch.student_id.clone(),
                })?;
            patch.apply(student);
            Ok(student.clone())
        })
    }

    fn create_book(&self, book: Book) -> Result<()> {
        self.write(Collection::Books, WriteOperation::Create, |c| {
            if c.books.contains_key(&book.book_id) {
                return Err(already_exists(Collection::Books, &book.book_id));
            }
            c.books.insert(book.book_id.clone(), book);
            Ok(())
        })
    }

    fn update_book(&self, book: Book) -> Result<()> {
        self.write(Collection::Books, WriteOperation::Update, |c| {
            let stored = c.books.get_mut(&book.book_id).ok_or_else(|| FeeError::BookNotFound {
                book_id: book.book_id.clone(),
            })?;
            *stored = book;
            Ok(())
        })
    }

    fn create_academic_year(&self, year: AcademicYear) -> Result<()> {
        self.write(Collection::AcademicYears, WriteOperation::Create, |c| {
            if c.academic_years.contains_key(&year.academic_year_id) {
                return Err(already_exists(Collection::AcademicYears, &year.academic_year_id));
            }
            c.academic_years.insert(year.academic_year_id.clone(), year);
            Ok(())
        })
    }

    fn delete_payment(&self, payment_id: &str) -> Result<()> {
        self.write(Collection::Payments, WriteOperation::Delete, |c| {
            c.payments
                .remove(payment_id)
                .map(|_| ())
                .ok_or_else(|| FeeError::PaymentNotFound {
                    payment_id: payment_id.to_string(),
                })
        })
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<String>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let now = self.time.now();
        let op_count = batch.len();
        let collection = batch.collection();

        let written = self.write(collection, WriteOperation::Batch, |c| {
            // work on a copy so a failing op leaves the live collections untouched
            let mut staged = c.clone();
            let mut written = Vec::with_capacity(op_count);
            for op in batch.into_ops() {
                written.push(staged.apply(op, now)?);
            }
            *c = staged;
            Ok(written)
        });

        if let Err(e) = &written {
            warn!(ops = op_count, %collection, error = %e, "batch rejected, nothing applied");
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::fixtures::{book, student};
    use crate::decimal::Money;
    use crate::records::PaymentDraft;
    use crate::types::PaymentMethod;
    use chrono::{Duration, TimeZone};

    fn store() -> InMemoryStore {
        InMemoryStore::new(SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
        )))
    }

    fn draft(student_id: &str, book_id: &str, major: i64) -> PaymentDraft {
        PaymentDraft {
            student_id: student_id.to_string(),
            book_id: book_id.to_string(),
            academic_year_id: "AY1".to_string(),
            amount_paid: Money::from_major(major),
            method: PaymentMethod::Cash,
        }
    }

    #[test]
    fn test_commit_assigns_ids_and_server_time() {
        let store = store();
        let mut batch = WriteBatch::new();
        batch.create_payment(draft("S1", "B1", 10));
        batch.create_payment(draft("S1", "B2", 5));

        let ids = store.commit(batch).unwrap();
        assert_eq!(ids.len(), 2);

        let payment = store.get_payment(&ids[0]).unwrap().unwrap();
        assert_eq!(payment.payment_id, ids[0]);
        assert_eq!(payment.date, store.now());
    }

    #[test]
    fn test_failing_op_rolls_back_whole_batch() {
        let store = store();
        store.create_student(student("S1", "Prim1")).unwrap();

        let mut batch = WriteBatch::new();
        batch.create_payment(draft("S1", "B1", 10));
        batch.delete_student("S1");
        batch.delete_book("B404");

        assert!(matches!(store.commit(batch), Err(FeeError::BookNotFound { .. })));
        assert!(store.list_payments().unwrap().is_empty());
        assert!(store.get_student("S1").unwrap().is_some());
    }

    #[test]
    fn test_denied_writes_fail_without_changes() {
        let store = store();
        store.set_deny_writes(true);
        let err = store.create_book(book("B1", "Maths", "Prim1", 10)).unwrap_err();
        assert!(matches!(
            err,
            FeeError::StoreWrite {
                collection: Collection::Books,
                operation: WriteOperation::Create,
                ..
            }
        ));
        assert!(store.list_books().unwrap().is_empty());

        store.set_deny_writes(false);
        assert!(store.create_book(book("B1", "Maths", "Prim1", 10)).is_ok());
    }

    #[test]
    fn test_update_student_merges() {
        let store = store();
        store.create_student(student("S1", "Prim1")).unwrap();
        let updated = store
            .update_student(StudentPatch::new("S1").class("Prim2"))
            .unwrap();
        assert_eq!(updated.class, "Prim2");
        assert_eq!(updated.parent_phone, "0200000000");
        assert!(store.create_student(student("S1", "Prim3")).is_err());
    }

    #[test]
    fn test_payments_listed_newest_first() {
        let store = store();
        let control = store.time().test_control().unwrap();

        let mut first = WriteBatch::new();
        first.create_payment(draft("S1", "B1", 10));
        store.commit(first).unwrap();

        control.advance(Duration::minutes(5));
        let mut second = WriteBatch::new();
        second.create_payment(draft("S1", "B2", 20));
        second.create_payment(draft("S2", "B1", 30));
        store.commit(second).unwrap();

        let all = store.list_payments().unwrap();
        assert_eq!(all.last().map(|p| p.book_id.as_str()), Some("B1"));
        assert_eq!(all.last().map(|p| p.amount_paid), Some(Money::from_major(10)));

        assert_eq!(store.payments_for_student("S1").unwrap().len(), 2);
        assert_eq!(store.payments_for_book("B1").unwrap().len(), 2);
    }

    #[test]
    fn test_subscribers_get_snapshot_after_each_write() {
        let store = store();
        let rx = store.subscribe();
        assert!(rx.try_recv().unwrap().students.is_empty());

        store.create_student(student("S1", "Prim1")).unwrap();
        assert_eq!(rx.try_recv().unwrap().students.len(), 1);

        store.set_deny_writes(true);
        assert!(store.create_student(student("S2", "Prim1")).is_err());
        assert!(rx.try_recv().is_err());

        drop(rx);
        store.set_deny_writes(false);
        store.create_student(student("S3", "Prim1")).unwrap();
        assert_eq!(store.subscriber_count(), 0);
    }
}
