//! # Seed Data Generator
//!
//! Populates the database with a demo catalog, readers and loan history.
//!
//! ## Usage
//! ```bash
//! # Seed ./lectern.db (default)
//! cargo run -p lectern-db --bin seed
//!
//! # Specify database path
//! cargo run -p lectern-db --bin seed -- --db ./data/lectern.db
//! ```
//!
//! ## Generated Data
//! - 15 programming books with ISBNs and 1 to 4 copies each
//! - 15 readers
//! - 10 loans through the Loan Engine, 2 of them already returned
//!
//! Each table is skipped if it already has rows.

use std::env;

use lectern_core::{NewBook, NewReader};
use lectern_db::migrations::migration_status;
use lectern_db::{Database, DbConfig};

/// (title, author, year, isbn, copies)
const BOOKS: &[(&str, &str, i32, &str, i64)] = &[
    ("Clean Code", "Robert Martin", 2008, "9780132350884", 3),
    ("The Pragmatic Programmer", "Andrew Hunt, David Thomas", 1999, "9780201616224", 2),
    ("Design Patterns", "Erich Gamma, Richard Helm", 1994, "9780201633610", 1),
    ("Refactoring", "Martin Fowler", 1999, "9780201485677", 4),
    ("You Don't Know JS", "Kyle Simpson", 2015, "9781491924464", 2),
    ("The Art of Computer Programming", "Donald Knuth", 1968, "9780201896831", 1),
    ("Code Complete", "Steve McConnell", 2004, "9780735619678", 3),
    ("Introduction to Algorithms", "Thomas H. Cormen", 2009, "9780262033848", 2),
    ("Programming Pearls", "Jon Bentley", 1999, "9780201657883", 1),
    ("The Mythical Man-Month", "Frederick Brooks", 1995, "9780201835953", 2),
    (
        "Structure and Interpretation of Computer Programs",
        "Harold Abelson, Gerald Jay Sussman",
        1996,
        "9780262510875",
        1,
    ),
    ("Head First Design Patterns", "Eric Freeman, Elisabeth Robson", 2004, "9780596007126", 3),
    ("Cracking the Coding Interview", "Gayle Laakmann McDowell", 2015, "9780984782857", 2),
    ("Effective Java", "Joshua Bloch", 2017, "9780134685991", 1),
    ("The Clean Coder", "Robert Martin", 2011, "9780137081073", 2),
];

const READERS: &[(&str, &str)] = &[
    ("John Doe", "john.doe@example.com"),
    ("Jane Smith", "jane.smith@example.com"),
    ("Alice Johnson", "alice.johnson@example.com"),
    ("Bob Brown", "bob.brown@example.com"),
    ("Emma Wilson", "emma.wilson@example.com"),
    ("Michael Chen", "michael.chen@example.com"),
    ("Sarah Davis", "sarah.davis@example.com"),
    ("David Lee", "david.lee@example.com"),
    ("Laura Martinez", "laura.martinez@example.com"),
    ("James Taylor", "james.taylor@example.com"),
    ("Emily Clark", "emily.clark@example.com"),
    ("William Harris", "william.harris@example.com"),
    ("Olivia Lewis", "olivia.lewis@example.com"),
    ("Thomas Walker", "thomas.walker@example.com"),
    ("Sophia Young", "sophia.young@example.com"),
];

/// (book #, reader #, returned) as 1-based positions in the lists above
const LOANS: &[(usize, usize, bool)] = &[
    (1, 1, false),
    (2, 1, false),
    (3, 2, true),
    (4, 3, false),
    (5, 4, false),
    (6, 5, true),
    (7, 6, false),
    (8, 7, false),
    (9, 8, false),
    (10, 9, false),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./lectern.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lectern Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./lectern.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Lectern Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");

    let (total, applied) = migration_status(db.pool()).await?;
    println!("✓ Migrations applied ({}/{})", applied, total);

    let book_ids = seed_books(&db).await?;
    let reader_ids = seed_readers(&db).await?;

    match (book_ids, reader_ids) {
        (Some(books), Some(readers)) => seed_loans(&db, &books, &readers).await?,
        _ => println!("⚠ Skipping loans: catalog or readers were already present"),
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

async fn seed_books(db: &Database) -> anyhow::Result<Option<Vec<i64>>> {
    let existing = db.books().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} books, skipping", existing);
        return Ok(None);
    }

    let mut ids = Vec::with_capacity(BOOKS.len());
    for (title, author, year, isbn, copies) in BOOKS {
        let new = NewBook::new(*title, *author)
            .year(*year)
            .isbn(*isbn)
            .copies(*copies);
        ids.push(db.books().create(&new).await?.id);
    }

    println!("✓ Added {} books", ids.len());
    Ok(Some(ids))
}

async fn seed_readers(db: &Database) -> anyhow::Result<Option<Vec<i64>>> {
    let existing = db.readers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} readers, skipping", existing);
        return Ok(None);
    }

    let mut ids = Vec::with_capacity(READERS.len());
    for (name, email) in READERS {
        ids.push(db.readers().create(&NewReader::new(*name, *email)).await?.id);
    }

    println!("✓ Added {} readers", ids.len());
    Ok(Some(ids))
}

async fn seed_loans(db: &Database, books: &[i64], readers: &[i64]) -> anyhow::Result<()> {
    let existing = db.loans().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} loans, skipping", existing);
        return Ok(());
    }

    let engine = db.loan_engine();
    let mut returned = 0;

    for &(book, reader, is_returned) in LOANS {
        let (book_id, reader_id) = (books[book - 1], readers[reader - 1]);
        engine.borrow_book(book_id, reader_id).await?;
        if is_returned {
            engine.return_book(book_id, reader_id).await?;
            returned += 1;
        }
    }

    println!(
        "✓ Added {} loans ({} outstanding, {} returned)",
        LOANS.len(),
        LOANS.len() - returned,
        returned
    );
    Ok(())
}
