/// portal walkthrough - a guest's first weeks, driven by a controlled clock
use chrono::{Duration, TimeZone, Utc};
use motel_ledger::payments::CheckoutRequest;
use motel_ledger::{
    AccountView, GuestLedgerService, InMemoryStore, LedgerConfig, LogNotifier, Money,
    PaymentNotification, Plan, RecordOutcome, SafeTimeProvider, TimeSource, VerificationCodes,
    VerificationRegistry,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== portal walkthrough ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 29, 15, 0, 0).unwrap()
    ));
    let controller = time.test_control().ok_or("clock is not test-controlled")?;

    let config = LedgerConfig::standard();
    let store = InMemoryStore::with_rooms(["1", "2", "3", "10", "12"])?;
    let mut service = GuestLedgerService::new(store, config.clone())?;

    // applicant verifies their email before checkout
    let mut codes = VerificationCodes::new(&config.verification);
    let mut registry = VerificationRegistry::new();
    let code = codes.issue("dana@example.com", &time)?;
    codes.verify("dana@example.com", &code, &time)?;
    registry.mark_email_verified("dana@example.com")?;
    registry.mark_id_verified("dana@example.com")?;
    println!("dana verified: {}", registry.is_verified("dana@example.com"));

    // checkout quote for a new weekly guest
    let request = CheckoutRequest {
        email: "dana@example.com".to_string(),
        name: "Dana Cruz".to_string(),
        plan: "weekly".to_string(),
        room_number: Some("10".to_string()),
        is_new_guest: true,
    };
    let quote = service.quote_checkout(&request)?;
    println!(
        "quote: {} ${} + move-in ${} = ${}",
        quote.description,
        quote.room_rate,
        quote.move_in_fee,
        quote.total
    );

    // the provider confirms the session; a partial payment first
    let metadata = request.metadata()?.to_map();
    service.complete_checkout(&metadata, Money::from_major(200), "cs_demo_1", &time)?;
    let summary = service.account_summary("dana@example.com")?;
    println!(
        "\nafter $200: status {:?}, balance ${}, next due ${}",
        summary.ledger.status, summary.ledger.balance, summary.ledger.next_due_amount
    );

    // the same webhook arrives twice
    let replay = service.complete_checkout(&metadata, Money::from_major(200), "cs_demo_1", &time)?;
    if let RecordOutcome::AlreadyRecorded { external_reference } = replay {
        println!("replayed {} ignored", external_reference);
    }

    // top-up two days later completes the first week
    controller.advance(Duration::days(2));
    let top_up = PaymentNotification {
        amount: Money::from_major(150),
        plan: Plan::Weekly,
        customer_email: "dana@example.com".to_string(),
        customer_name: "Dana Cruz".to_string(),
        external_reference: "cs_demo_2".to_string(),
        is_first_payment: false,
        room_number: None,
    };
    service.record_payment(top_up, &time)?;

    // five days on, the reminder window opens
    controller.advance(Duration::days(5));
    let run = service.due_reminders(&time, &LogNotifier)?;
    println!("\nreminders sent on {}: {}", time.now().format("%Y-%m-%d"), run.sent.len());
    for reminder in &run.sent {
        println!("{}", reminder.body);
    }

    let summary = service.account_summary("dana@example.com")?;
    println!("account json:\n{}", AccountView::from_summary(&summary).to_json_pretty()?);

    println!("\nevents recorded: {}", service.take_events().len());
    Ok(())
}
