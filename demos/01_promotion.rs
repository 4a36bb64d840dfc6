/// promotion - move a school up a class at year end with test time
use book_fee_ledger::promotion::default_selection;
use book_fee_ledger::{
    DocumentStore, FeeDesk, InMemoryStore, Money, NewBook, NewStudent, NextState, SafeTimeProvider,
    SchoolConfig, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};

fn student(id: &str, name: &str, class: &str) -> NewStudent {
    NewStudent {
        student_id: id.to_string(),
        student_name: name.to_string(),
        class: class.to_string(),
        parent_name: format!("{} Sr", name),
        parent_phone: "0200000000".to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== year end promotion ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap()));
    let mut desk = FeeDesk::new(SchoolConfig::default(), InMemoryStore::new(time))?;

    desk.add_academic_year("2024/2025")?;
    desk.register_student(student("S001", "Ama", "Prim5"))?;
    desk.register_student(student("S002", "Kofi", "Prim6"))?;
    desk.register_student(student("S003", "Esi", "JHS3"))?;
    desk.add_book(NewBook {
        book_title: "English Reader".to_string(),
        class: "Prim5".to_string(),
        price: Money::from_major(60),
    })?;
    desk.record_parent_payment("S001", Money::from_major(25))?;

    // the school year runs its course
    desk.store().time().test_control().unwrap().advance(Duration::days(300));
    println!("promotion day: {}\n", desk.store().now().format("%Y-%m-%d"));

    let selected = default_selection(&desk.store().list_students()?);
    let preview = desk.preview_promotion(&selected)?;
    println!(
        "preview: {} promote, {} graduate, {} stay",
        preview.to_promote, preview.to_graduate, preview.to_stay
    );

    let plan = desk.promote_students(&selected)?;
    for mv in &plan.moves {
        match &mv.next {
            NextState::Promote { next_class } => {
                println!("  {}: {} -> {}", mv.student_id, mv.from_class, next_class)
            }
            NextState::Graduate => println!("  {}: graduated from {}", mv.student_id, mv.from_class),
        }
    }

    // the unpaid reader follows Ama into the next class
    desk.add_academic_year("2025/2026")?;
    for profile in desk.profiles(None)? {
        println!("\n{} ({})", profile.student_name, profile.class);
        for line in &profile.books {
            println!("  {} balance {}", line.book_title, line.balance);
        }
    }

    Ok(())
}
