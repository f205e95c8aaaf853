//! SQLite store as a data source.

use chrono::{NaiveDate, TimeZone, Utc};
use collections_core::{
    assembler::ReportAssembler,
    clock::ReportClock,
    config::EngineConfig,
    error::ReportError,
    fallback::FallbackProvider,
    filter::{DateWindow, RawReportFilter, ReportFilter},
    model::{
        Channel, DailyPerformance, Direction, InteractionEvent, InteractionStatus, LoanRecord,
        PromiseStatus, RawPromise, Specialist,
    },
    source::DataSource,
    store::ReportStore,
};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn july() -> DateWindow {
    DateWindow { start: date(7, 1), end: date(7, 31) }
}

fn officer(id: &str, active: bool) -> Specialist {
    Specialist {
        id:      id.into(),
        name:    format!("Officer {id}"),
        role:    "COLLECTION_SPECIALIST".into(),
        team:    "Early Collection".into(),
        contact: None,
        email:   Some(format!("{id}@bank.example")),
        active,
    }
}

fn case(id: &str, amount: f64, dpd: i64, status: &str) -> LoanRecord {
    LoanRecord {
        loan_id:             id.into(),
        customer_id:         format!("C-{id}"),
        customer_name:       Some(format!("Customer of {id}")),
        customer_type:       Some("sme".into()),
        product_type:        Some("murabaha".into()),
        loan_amount:         amount,
        outstanding_balance: amount / 2.0,
        overdue_amount:      amount / 10.0,
        dpd,
        status:              status.into(),
        priority:            Some("HIGH".into()),
        last_contact_date:   Some(date(7, 20)),
        next_action_date:    None,
    }
}

fn build() -> ReportStore {
    let store = ReportStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_officer(&officer("OFF001", true)).expect("officer");
    store.insert_officer(&officer("OFF009", false)).expect("officer");
    store
}

#[tokio::test]
async fn officers_round_trip_and_inactive_are_hidden() {
    let store = build();
    let found = store.specialist("OFF001").await.expect("officer exists");
    assert_eq!(found, officer("OFF001", true));

    let roster = store.specialists().await.expect("roster");
    let ids: Vec<&str> = roster.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["OFF001"]);

    let missing = store.specialist("OFF404").await;
    assert!(matches!(missing, Err(ReportError::SpecialistNotFound { .. })));
}

#[tokio::test]
async fn case_filters_are_pushed_into_sql() {
    let store = build();
    store.insert_case("OFF001", &case("L1", 100_000.0, 10, "overdue")).unwrap();
    store.insert_case("OFF001", &case("L2", 300_000.0, 95, "OVERDUE")).unwrap();
    store.insert_case("OFF001", &case("L3", 500_000.0, 200, "DEFAULT")).unwrap();
    store.insert_case("OFF009", &case("L4", 900_000.0, 95, "OVERDUE")).unwrap();

    let all = store
        .loan_cases("OFF001", &ReportFilter::for_specialist("OFF001"), 100)
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|c| c.loan_id.as_str()).collect();
    assert_eq!(ids, vec!["L3", "L2", "L1"], "most delinquent first, own cases only");
    assert_eq!(all[2].status, "OVERDUE", "status stored in canonical spelling");
    assert_eq!(all[0].last_contact_date, Some(date(7, 20)));

    let raw = RawReportFilter {
        specialist_id: "OFF001".into(),
        loan_status: Some("overdue".into()),
        min_dpd: Some(30.0),
        ..RawReportFilter::default()
    };
    let (filter, _) = ReportFilter::normalize(&raw);
    let narrowed = store.loan_cases("OFF001", &filter, 100).await.unwrap();
    let ids: Vec<&str> = narrowed.iter().map(|c| c.loan_id.as_str()).collect();
    assert_eq!(ids, vec!["L2"]);

    let limited = store
        .loan_cases("OFF001", &ReportFilter::for_specialist("OFF001"), 2)
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn activity_is_windowed() {
    let store = build();
    let at = |d: u32| Utc.with_ymd_and_hms(2024, 7, d, 9, 15, 0).unwrap();
    let event = |id: &str, d: u32| InteractionEvent {
        interaction_id:   id.into(),
        loan_id:          Some("L1".into()),
        channel:          Channel::Call,
        direction:        Direction::Inbound,
        timestamp:        at(d),
        status:           InteractionStatus::Answered,
        duration_seconds: Some(240),
        outcome:          Some("PROMISE_TO_PAY".into()),
        promise_flag:     true,
    };
    store.insert_interaction("OFF001", &event("I1", 3)).unwrap();
    store.insert_interaction("OFF001", &event("I2", 31)).unwrap();

    let window = DateWindow { start: date(7, 1), end: date(7, 30) };
    let events = store.interactions("OFF001", &window).await.unwrap();
    assert_eq!(events, vec![event("I1", 3)]);

    let promise = |id: &str, on: NaiveDate, status: PromiseStatus| RawPromise {
        promise_id:            id.into(),
        loan_id:               "L1".into(),
        customer_id:           Some("C-L1".into()),
        amount:                12_000.0,
        promise_date:          on,
        status,
        prior_status:          Some(PromiseStatus::Kept),
        created_at:            Some(at(1)),
        actual_payment_date:   None,
        actual_payment_amount: None,
    };
    store.insert_promise("OFF001", &promise("P1", date(7, 10), PromiseStatus::Broken)).unwrap();
    store.insert_promise("OFF001", &promise("P2", date(6, 10), PromiseStatus::Broken)).unwrap();
    store.insert_promise("OFF001", &promise("P3", date(8, 10), PromiseStatus::Active)).unwrap();

    let promises = store.promises("OFF001", &july()).await.unwrap();
    let ids: Vec<&str> = promises.iter().map(|p| p.promise_id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "P3"], "in-window plus still-active promises");
    assert_eq!(promises[0], promise("P1", date(7, 10), PromiseStatus::Broken));
}

#[tokio::test]
async fn performance_history_is_windowed() {
    let store = build();
    for d in [30u32, 1, 15] {
        let on = if d == 30 { date(6, d) } else { date(7, d) };
        store
            .insert_performance("OFF001", &DailyPerformance {
                metric_date:      on,
                calls_made:       30,
                calls_answered:   20,
                promises_made:    5,
                promises_kept:    3,
                amount_collected: 15_000.0,
            })
            .unwrap();
    }
    let history = store.performance_history("OFF001", &july()).await.unwrap();
    let dates: Vec<NaiveDate> = history.iter().map(|d| d.metric_date).collect();
    assert_eq!(dates, vec![date(7, 1), date(7, 15)]);
}

/// A seeded demo database serves a fully live report.
#[tokio::test]
async fn seeded_store_serves_a_live_report() {
    let config = EngineConfig::default_test();
    let clock = ReportClock::at_date(date(7, 25));
    let store = ReportStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.seed_demo(&FallbackProvider::new(&config), &clock).unwrap();

    let assembler = ReportAssembler::new(store, config);
    let request = RawReportFilter {
        specialist_id: "OFF001".into(),
        ..RawReportFilter::default()
    };
    let outcome = assembler.assemble(&request, &clock).await;

    assert!(outcome.success, "unexpected fallback: {:?}", outcome.error);
    assert_eq!(outcome.data.specialist.name, "Ahmed Mohammed Ali");
    assert!(!outcome.data.loans.is_empty());
    assert!(outcome.data.loans.iter().any(|l| l.loan_id == "LOAN001"));

    let roster = assembler.roster().await;
    assert!(roster.success);
    assert_eq!(roster.data.len(), 5);
}

#[test]
fn migrations_are_repeatable() {
    let store = ReportStore::in_memory().unwrap();
    store.migrate().expect("first migration");
    store.migrate().expect("second migration");
}

#[test]
fn reseeding_keeps_officers_and_their_cases() {
    let config = EngineConfig::default_test();
    let clock = ReportClock::at_date(date(7, 25));
    let fallback = FallbackProvider::new(&config);
    let store = ReportStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.seed_demo(&fallback, &clock).expect("first seed");
    store.seed_demo(&fallback, &clock).expect("second seed");
    store.insert_officer(&officer("OFF001", true)).expect("officer update with cases attached");
}

#[tokio::test]
async fn far_future_custom_range_still_assembles() {
    let config = EngineConfig::default_test();
    let clock = ReportClock::at_date(date(7, 25));
    let store = ReportStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.seed_demo(&FallbackProvider::new(&config), &clock).unwrap();

    let request = RawReportFilter {
        specialist_id: "OFF001".into(),
        date_range: Some("custom".into()),
        custom_start: Some("2024-01-01".into()),
        custom_end: Some("+262142-12-31".into()),
        ..RawReportFilter::default()
    };
    let outcome = ReportAssembler::new(store, config).assemble(&request, &clock).await;
    assert!(outcome.success, "unexpected fallback: {:?}", outcome.error);
    assert_eq!(outcome.data.period.end, NaiveDate::from_ymd_opt(2999, 12, 31).unwrap());
}

/// Risk is derived after the query, so the row limit must not cut off
/// matching cases that sort after riskier ones.
#[tokio::test]
async fn risk_filter_sees_cases_past_the_row_limit() {
    let store = build();
    let mut clean = case("L3", 100_000.0, 0, "ACTIVE");
    clean.overdue_amount = 0.0;
    store.insert_case("OFF001", &case("L1", 100_000.0, 200, "OVERDUE")).unwrap();
    store.insert_case("OFF001", &case("L2", 100_000.0, 150, "OVERDUE")).unwrap();
    store.insert_case("OFF001", &clean).unwrap();

    let raw = RawReportFilter {
        specialist_id: "OFF001".into(),
        risk_level: Some("very-low".into()),
        ..RawReportFilter::default()
    };
    let (filter, _) = ReportFilter::normalize(&raw);
    let found = store.loan_cases("OFF001", &filter, 2).await.unwrap();
    let ids: Vec<&str> = found.iter().map(|c| c.loan_id.as_str()).collect();
    assert_eq!(ids, vec!["L3"]);

    let config = EngineConfig { loan_limit: 2, ..EngineConfig::default_test() };
    let clock = ReportClock::at_date(date(7, 25));
    let outcome = ReportAssembler::new(store, config).assemble(&raw, &clock).await;
    assert!(outcome.success);
    let ids: Vec<&str> = outcome.data.loans.iter().map(|l| l.loan_id.as_str()).collect();
    assert_eq!(ids, vec!["L3"]);
}
