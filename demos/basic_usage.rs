//! Basic mapping usage example
//!
//! This example demonstrates the mapping layer end to end:
//! - Declaring an entity mapping
//! - Inserting and updating entities on a caller-owned connection
//! - Reading rows lazily with `query_with`
//! - Running the same flow through the async `SqliteContext`
//!
//! Run with: cargo run --example basic_usage

use num_bigint::BigInt;
use rusqlite::Connection;
use rust_decimal::Decimal;
use theta_orm::prelude::*;

#[derive(Default, Debug, Clone)]
struct Account {
    id: Option<BigInt>,
    balance: Option<Decimal>,
    owner: Option<String>,
}

impl Entity for Account {
    fn mapping() -> Mapping<Self> {
        Mapping::new()
            .table("accounts")
            .primary_key(&["id"])
            .column("id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
            .column("balance", |a: &Account| &a.balance, |a: &mut Account| &mut a.balance)
            .column("owner", |a: &Account| &a.owner, |a: &mut Account| &mut a.owner)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Theta ORM - Basic Usage Example ===\n");

    println!("1. Opening database...");
    let conn = Connection::open_in_memory()?;
    conn.execute(
        "CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance TEXT, owner TEXT)",
        [],
    )?;
    println!("   ✓ Table created\n");

    println!("2. Inserting accounts...");
    let accounts = vec![
        ("alice", Decimal::new(150_050, 2)),
        ("bob", Decimal::new(230_075, 2)),
        ("charlie", Decimal::new(98_025, 2)),
    ];
    for (i, (owner, balance)) in accounts.into_iter().enumerate() {
        let account = Account {
            id: Some(BigInt::from(i + 1)),
            balance: Some(balance),
            owner: Some(owner.to_string()),
        };
        let affected = conn.insert(&account)?;
        println!("   ✓ Inserted {} ({} row)", owner, affected);
    }
    println!();

    println!("3. Updating a balance...");
    let change = Account {
        id: Some(BigInt::from(2)),
        balance: Some(Decimal::new(10_000, 2)),
        owner: None,
    };
    let affected = conn.update(&change)?;
    println!("   ✓ Updated {} row (owner left untouched)\n", affected);

    println!("4. Reading the richest account lazily...");
    let richest = conn.query_with::<Account, _, _>(
        "SELECT id, owner, CAST(balance AS REAL) AS sort_key, balance AS bal_ance \
         FROM accounts ORDER BY sort_key DESC",
        &[],
        |mut records| records.next().transpose(),
    )?;
    if let Some(account) = richest {
        println!(
            "   ✓ {} holds {}\n",
            account.owner.unwrap_or_default(),
            account.balance.unwrap_or_default()
        );
    }

    println!("5. Same flow through the async context...");
    let ctx = SqliteContext::new(conn);
    ctx.insert(Account {
        id: Some(BigInt::from(4)),
        balance: Some(Decimal::new(320_000, 2)),
        owner: Some("diana".to_string()),
    })
    .await?;

    let all: Vec<Account> = ctx
        .fetch_all("SELECT * FROM accounts ORDER BY id", &[])
        .await?;
    for account in &all {
        println!(
            "   - #{} {:<8} {:>10}",
            account.id.clone().unwrap_or_default(),
            account.owner.clone().unwrap_or_default(),
            account.balance.unwrap_or_default()
        );
    }

    let conn = ctx.into_connection()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))?;
    println!("\n   ✓ Connection returned, {} accounts stored", count);

    println!("\n=== Example completed successfully ===");
    Ok(())
}
