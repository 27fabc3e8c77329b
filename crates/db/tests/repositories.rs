use chrono::Utc;
use rust_decimal::Decimal;

use stairbooks_core::domain::catalog::{ItemCategory, LineItemKind};
use stairbooks_core::domain::contact::{Contact, ContactId};
use stairbooks_core::domain::quote::{
    DistributionMethod, PaymentTerms, Quote, QuoteId, QuoteItem, QuoteItemId, VatSettings,
};
use stairbooks_db::{
    connect_with_settings, migrations, ContactRepository, DbPool, QuoteRepository,
    SqlContactRepository, SqlQuoteRepository,
};

async fn sqlite_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .expect("in-memory database");
    migrations::run_pending(&pool).await.expect("migrations");
    pool
}

fn quote_fixture(id: &str, client: &str) -> Quote {
    Quote {
        id: QuoteId(id.to_string()),
        client: Contact { name: client.to_string(), ..Contact::default() },
        selected_items: vec![QuoteItem {
            id: QuoteItemId("qi-1".to_string()),
            name: "Winder staircase".to_string(),
            description: "Three-winder oak staircase".to_string(),
            category: ItemCategory::Timber,
            supplier: None,
            cost: Decimal::from(2400),
            quantity: Decimal::ONE,
            markup: None,
            hide_in_quote: false,
            kind: Some(LineItemKind::Materials),
        }],
        hidden_costs: Vec::new(),
        global_markup: Decimal::from(20),
        distribution_method: DistributionMethod::Proportional,
        payment_terms: PaymentTerms::DepositInterimFinal,
        vat: VatSettings::default(),
        exclusions: vec!["Decoration".to_string()],
        notes: "Access from rear".to_string(),
        cached_grand_total: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn sqlite_quote_round_trip_preserves_the_aggregate() {
    let repo = SqlQuoteRepository::new(sqlite_pool().await);
    let quote = quote_fixture("Q-2025-001", "L Ashworth");

    repo.save(quote.clone()).await.expect("save quote");
    let found = repo.find_by_id(&quote.id).await.expect("find quote");

    assert_eq!(found, Some(quote));
}

#[tokio::test]
async fn sqlite_quote_save_is_an_upsert() {
    let repo = SqlQuoteRepository::new(sqlite_pool().await);
    let mut quote = quote_fixture("Q-2025-002", "L Ashworth");

    repo.save(quote.clone()).await.expect("first save");
    quote.global_markup = Decimal::from(30);
    repo.save(quote.clone()).await.expect("second save");

    let found = repo.find_by_id(&quote.id).await.expect("find").expect("stored quote");
    assert_eq!(found.global_markup, Decimal::from(30));
    assert_eq!(repo.list().await.expect("list").len(), 1);
}

#[tokio::test]
async fn sqlite_quote_delete_removes_the_record() {
    let repo = SqlQuoteRepository::new(sqlite_pool().await);
    let quote = quote_fixture("Q-2025-003", "L Ashworth");

    repo.save(quote.clone()).await.expect("save");
    repo.delete(&quote.id).await.expect("delete");

    assert!(repo.find_by_id(&quote.id).await.expect("find").is_none());
}

#[tokio::test]
async fn sqlite_contact_round_trip_and_ordering() {
    let repo = SqlContactRepository::new(sqlite_pool().await);
    let first = Contact {
        name: "A Brennan".to_string(),
        email: "a.brennan@example.co.uk".to_string(),
        ..Contact::default()
    };
    let second = Contact { name: "Z Carmichael".to_string(), ..Contact::default() };

    repo.save(&ContactId("c-2".to_string()), second.clone()).await.expect("save second");
    repo.save(&ContactId("c-1".to_string()), first.clone()).await.expect("save first");

    let found = repo.find_by_id(&ContactId("c-1".to_string())).await.expect("find");
    assert_eq!(found, Some(first.clone()));

    let listed = repo.list().await.expect("list");
    let names: Vec<&str> = listed.iter().map(|(_, contact)| contact.name.as_str()).collect();
    assert_eq!(names, vec!["A Brennan", "Z Carmichael"], "listing is ordered by name");

    repo.delete(&ContactId("c-1".to_string())).await.expect("delete");
    assert!(repo.find_by_id(&ContactId("c-1".to_string())).await.expect("find").is_none());
}
