/// quick start - register a student, price a book, take a payment
use book_fee_ledger::{FeeDesk, InMemoryStore, Money, NewBook, NewStudent, PaymentRequest, SchoolConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = FeeDesk::new(SchoolConfig::default(), InMemoryStore::with_system_time())?;

    let year = desk.add_academic_year("2024/2025")?;
    desk.register_student(NewStudent {
        student_id: "S001".to_string(),
        student_name: "Ama Mensah".to_string(),
        class: "Prim1".to_string(),
        parent_name: "Kwame Mensah".to_string(),
        parent_phone: "0244123456".to_string(),
    })?;
    let book = desk.add_book(NewBook {
        book_title: "Mathematics".to_string(),
        class: "Prim1".to_string(),
        price: Money::from_major(120),
    })?;

    // pay part of the book
    let request = PaymentRequest::new("S001", &[book.book_id.as_str()], Money::from_major(70), &year.academic_year_id);
    let outcome = desk.record_payment(request)?;

    if let Some(receipt) = outcome.receipt() {
        println!("{}", receipt.to_json_pretty()?);
    }

    Ok(())
}
