/// dashboard - rebuild views from store snapshots as writes land
use book_fee_ledger::{
    FeeDesk, InMemoryStore, Money, NewBook, NewStudent, PaymentRequest, SchoolConfig, ViewPublisher,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut desk = FeeDesk::new(SchoolConfig::default(), InMemoryStore::with_system_time())?;
    let snapshots = desk.store().subscribe();
    let mut publisher = ViewPublisher::new(desk.config.class_sequence.clone());
    let views = publisher.subscribe();

    let old_year = desk.add_academic_year("2023/2024")?;
    let new_year = desk.add_academic_year("2024/2025")?;
    desk.register_student(NewStudent {
        student_id: "S001".to_string(),
        student_name: "Yaw Boateng".to_string(),
        class: "JHS1".to_string(),
        parent_name: "Akosua Boateng".to_string(),
        parent_phone: "0501112222".to_string(),
    })?;
    let science = desk.add_book(NewBook {
        book_title: "Integrated Science".to_string(),
        class: "JHS1".to_string(),
        price: Money::from_major(90),
    })?;
    let ids = [science.book_id.as_str()];
    desk.record_payment(PaymentRequest::new("S001", &ids, Money::from_major(40), &old_year.academic_year_id))?;
    desk.record_payment(PaymentRequest::new("S001", &ids, Money::from_major(15), &new_year.academic_year_id))?;

    // one view per snapshot, the last one reflects every write
    if let Some(view) = publisher.drain(&snapshots) {
        println!("views published: {}", views.try_iter().count());
        println!("{}", view.to_json_pretty()?);
    }

    // switching years rescopes received totals, balances stay lifetime
    if let Some(view) = publisher.select_year(Some(&old_year.academic_year_id)) {
        println!(
            "\n{}: received {}, outstanding {}",
            old_year.year, view.totals.total_received, view.totals.total_outstanding
        );
    }

    Ok(())
}
