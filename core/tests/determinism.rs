//! Fallback data must be reproducible.
//!
//! Two providers, same seed, same clock.
//! They must produce identical slices. A report that shows different
//! sample numbers on every refresh is a blocker.

use collections_core::{
    clock::ReportClock,
    config::EngineConfig,
    fallback::FallbackProvider,
    types::LoanId,
};
use chrono::NaiveDate;

fn clock() -> ReportClock {
    ReportClock::at_date(NaiveDate::from_ymd_opt(2024, 7, 25).unwrap())
}

fn provider(seed: u64) -> FallbackProvider {
    let config = EngineConfig {
        fallback_seed: seed,
        ..EngineConfig::default_test()
    };
    FallbackProvider::new(&config)
}

#[test]
fn same_seed_produces_identical_slices() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
    let a = provider(SEED);
    let b = provider(SEED);
    let ids: Vec<LoanId> = a.loans().into_iter().map(|l| l.loan_id).collect();

    assert_eq!(a.loans(), b.loans());
    assert_eq!(a.interactions(&ids, &clock()), b.interactions(&ids, &clock()));
    assert_eq!(a.promises(&ids, &clock()), b.promises(&ids, &clock()));
    assert_eq!(a.performance_history(&clock()), b.performance_history(&clock()));
}

#[test]
fn repeated_calls_do_not_drift() {
    let p = provider(7);
    let first = p.interactions(&[], &clock());
    let _ = p.promises(&[], &clock());
    let _ = p.loans();
    let again = p.interactions(&[], &clock());
    assert_eq!(first, again, "calling other slices must not advance this stream");
}

#[test]
fn different_seeds_produce_different_portfolios() {
    let a = provider(42).loans();
    let b = provider(99).loans();

    // The fixed cases are shared; the generated tail is seeded.
    assert_eq!(a[..3], b[..3]);
    assert_ne!(a[3..], b[3..], "generated loans should differ between seeds");
}

#[test]
fn fixed_portfolio_leads_the_fallback_list() {
    let loans = provider(42).loans();
    let ids: Vec<&str> = loans.iter().take(3).map(|l| l.loan_id.as_str()).collect();
    assert_eq!(ids, vec!["LOAN001", "LOAN002", "LOAN003"]);
    assert_eq!(loans.len(), 3 + EngineConfig::default_test().fallback_generated_loans);
    assert_eq!(loans[0].dpd, 45);
    assert_eq!(loans[2].status.as_str(), "DEFAULT");
}

#[test]
fn unknown_specialist_keeps_requested_id() {
    let p = provider(42);
    let known = p.specialist("OFF002");
    assert_eq!(known.name, "Fatima Ahmed Al-Salem");

    let placeholder = p.specialist("OFF999");
    assert_eq!(placeholder.id, "OFF999");
    assert_eq!(p.roster().len(), 5);
}
