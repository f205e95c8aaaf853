//! Report assembly against scripted data sources.
//!
//! Each test scripts which slices fail (or stall) and checks that the
//! assembler still returns a complete report, tags every fallback slice
//! and reports success only when everything was live.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use collections_core::{
    assembler::ReportAssembler,
    clock::ReportClock,
    config::EngineConfig,
    error::{ReportError, ReportResult},
    event::{AssemblyEvent, AssemblyState, Slice},
    filter::{DateWindow, RawReportFilter, ReportFilter},
    guard::RequestGuard,
    model::{
        Channel, DailyPerformance, Direction, InteractionEvent, InteractionStatus, LoanRecord,
        PromiseStatus, RawPromise, Specialist,
    },
    source::DataSource,
    types::DataOrigin,
};
use std::time::Duration;

// ── Scripted source ──────────────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedSource {
    failing:  Vec<Slice>,
    stalling: Vec<Slice>,
    delay_ms: u64,
    loans:    Vec<LoanRecord>,
    events:   Vec<InteractionEvent>,
    promises: Vec<RawPromise>,
    history:  Vec<DailyPerformance>,
}

impl ScriptedSource {
    fn live() -> Self {
        Self {
            loans: vec![
                record("L1", 500_000.0, 150_000.0, 25_000.0, 45, "OVERDUE"),
                record("L2", 750_000.0, 150_000.0, 45_000.0, 75, "OVERDUE"),
                record("L3", 1_000_000.0, 200_000.0, 80_000.0, 120, "DEFAULT"),
            ],
            events: vec![
                interaction("I1", "L1", 23, Channel::Call, InteractionStatus::Answered),
                interaction("I2", "L2", 22, Channel::Call, InteractionStatus::NoAnswer),
                interaction("I3", "L3", 24, Channel::Sms, InteractionStatus::Delivered),
            ],
            promises: vec![RawPromise {
                promise_id:            "P1".into(),
                loan_id:               "L2".into(),
                customer_id:           None,
                amount:                60_000.0,
                promise_date:          date(7, 30),
                status:                PromiseStatus::Active,
                prior_status:          Some(PromiseStatus::Broken),
                created_at:            None,
                actual_payment_date:   None,
                actual_payment_amount: None,
            }],
            ..Self::default()
        }
    }

    fn failing(mut self, slices: &[Slice]) -> Self {
        self.failing = slices.to_vec();
        self
    }

    async fn gate(&self, slice: Slice) -> ReportResult<()> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.stalling.contains(&slice) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.failing.contains(&slice) {
            return Err(ReportError::upstream(slice.name(), "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn specialist(&self, specialist_id: &str) -> ReportResult<Specialist> {
        self.gate(Slice::Specialist).await?;
        Ok(Specialist {
            id:      specialist_id.to_string(),
            name:    "Live Specialist".into(),
            role:    "COLLECTION_SPECIALIST".into(),
            team:    "Early Collection".into(),
            contact: None,
            email:   None,
            active:  true,
        })
    }

    async fn specialists(&self) -> ReportResult<Vec<Specialist>> {
        self.gate(Slice::Specialist).await?;
        Ok(vec![self.specialist("OFF001").await?])
    }

    async fn loan_cases(&self, _: &str, _: &ReportFilter, _: usize) -> ReportResult<Vec<LoanRecord>> {
        self.gate(Slice::Loans).await?;
        Ok(self.loans.clone())
    }

    async fn interactions(&self, _: &str, _: &DateWindow) -> ReportResult<Vec<InteractionEvent>> {
        self.gate(Slice::Interactions).await?;
        Ok(self.events.clone())
    }

    async fn promises(&self, _: &str, _: &DateWindow) -> ReportResult<Vec<RawPromise>> {
        self.gate(Slice::Promises).await?;
        Ok(self.promises.clone())
    }

    async fn performance_history(&self, _: &str, _: &DateWindow) -> ReportResult<Vec<DailyPerformance>> {
        self.gate(Slice::Performance).await?;
        Ok(self.history.clone())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn clock() -> ReportClock {
    ReportClock::at_date(date(7, 25))
}

fn record(id: &str, amount: f64, outstanding: f64, overdue: f64, dpd: i64, status: &str) -> LoanRecord {
    LoanRecord {
        loan_id:             id.into(),
        customer_id:         format!("C-{id}"),
        customer_name:       None,
        customer_type:       Some("corporate".into()),
        product_type:        None,
        loan_amount:         amount,
        outstanding_balance: outstanding,
        overdue_amount:      overdue,
        dpd,
        status:              status.into(),
        priority:            None,
        last_contact_date:   None,
        next_action_date:    None,
    }
}

fn interaction(id: &str, loan: &str, day: u32, channel: Channel, status: InteractionStatus) -> InteractionEvent {
    InteractionEvent {
        interaction_id:   id.into(),
        loan_id:          Some(loan.into()),
        channel,
        direction:        Direction::Outbound,
        timestamp:        Utc.with_ymd_and_hms(2024, 7, day, 10, 0, 0).unwrap(),
        status,
        duration_seconds: None,
        outcome:          None,
        promise_flag:     false,
    }
}

fn request(specialist: &str) -> RawReportFilter {
    RawReportFilter {
        specialist_id: specialist.into(),
        ..RawReportFilter::default()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_live_slices_assemble_successfully() {
    let assembler = ReportAssembler::new(ScriptedSource::live(), EngineConfig::default_test());
    let outcome = assembler.assemble(&request("OFF001"), &clock()).await;

    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.state, AssemblyState::Assembled);
    assert!(outcome.sources.fallback_slices().is_empty());

    let report = &outcome.data;
    assert_eq!(report.specialist.name, "Live Specialist");
    assert_eq!(report.kpis.total_loans, report.loans.len());
    assert_eq!(report.kpis.total_loans, 3);
    assert_eq!(report.kpis.total_calls, 2);
    assert_eq!(report.kpis.response_rate, 50.0);
    assert_eq!(report.trends.len(), 30);
    assert_eq!(report.trends.last().unwrap().date, date(7, 25));
    assert_eq!(report.promises_to_pay[0].confidence, 20.0);
    assert_eq!(report.promises_to_pay[0].days_remaining, 5);
    assert_eq!(report.communication_data.len(), 5);
}

#[tokio::test]
async fn failed_loan_slice_uses_the_fallback_portfolio() {
    let assembler = ReportAssembler::new(
        ScriptedSource::live().failing(&[Slice::Loans]),
        EngineConfig::default_test(),
    );

    let first = assembler.assemble(&request("OFF001"), &clock()).await;
    let second = assembler.assemble(&request("OFF001"), &clock()).await;

    assert!(!first.success);
    assert!(first.uses_sample_data());
    assert_eq!(first.state, AssemblyState::FallbackAssembled);
    assert_eq!(first.sources.loans, DataOrigin::Fallback);
    assert_eq!(first.sources.interactions, DataOrigin::Live);
    assert!(first.error.as_deref().unwrap_or_default().contains("loans"));

    assert_eq!(first.data.loans, assembler.fallback().loans());
    assert_eq!(first.data, second.data, "fallback report must be stable");
}

#[tokio::test]
async fn every_slice_failing_still_yields_a_full_report() {
    let _ = env_logger::builder().is_test(true).try_init();
    let all = Slice::ALL;
    let assembler = ReportAssembler::new(ScriptedSource::live().failing(&all), EngineConfig::default_test());
    let outcome = assembler.assemble(&request("OFF003"), &clock()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.sources.fallback_slices(), all.to_vec());
    assert_eq!(outcome.data.specialist.id, "OFF003");
    assert_eq!(outcome.data.specialist.name, "Mohammed Abdullah Al-Najjar");
    assert!(!outcome.data.loans.is_empty());
    assert_eq!(outcome.data.trends.len(), 30);
    assert!(outcome.data.trends.iter().all(|p| p.origin == DataOrigin::Fallback));

    let failures = outcome
        .diagnostics
        .iter()
        .filter(|e| matches!(e, AssemblyEvent::SliceFailed { .. }))
        .count();
    assert_eq!(failures, 5);
}

/// One slice failing never takes another slice down with it.
#[tokio::test]
async fn slice_failures_are_isolated() {
    let assembler = ReportAssembler::new(
        ScriptedSource::live().failing(&[Slice::Promises]),
        EngineConfig::default_test(),
    );
    let outcome = assembler.assemble(&request("OFF001"), &clock()).await;

    assert_eq!(outcome.sources.fallback_slices(), vec![Slice::Promises]);
    assert_eq!(outcome.data.specialist.name, "Live Specialist");
    assert_eq!(outcome.data.kpis.total_loans, 3);
    // Fallback promises are attached to the live loans.
    for promise in &outcome.data.promises_to_pay {
        assert!(["L1", "L2", "L3"].contains(&promise.loan_id.as_str()));
    }
}

#[tokio::test]
async fn stalled_slice_times_out_into_fallback() {
    let source = ScriptedSource {
        stalling: vec![Slice::Performance],
        ..ScriptedSource::live()
    };
    let config = EngineConfig {
        slice_timeout_ms: 50,
        ..EngineConfig::default_test()
    };
    let assembler = ReportAssembler::new(source, config);
    let outcome = assembler.assemble(&request("OFF001"), &clock()).await;

    assert_eq!(outcome.sources.performance, DataOrigin::Fallback);
    assert!(outcome.error.as_deref().unwrap_or_default().contains("timed out"));
}

#[tokio::test]
async fn loan_filters_narrow_cases_and_activity() {
    let assembler = ReportAssembler::new(ScriptedSource::live(), EngineConfig::default_test());
    let input = RawReportFilter {
        delinquency_bucket: Some("61-90".into()),
        ..request("OFF001")
    };
    let outcome = assembler.assemble(&input, &clock()).await;

    let ids: Vec<&str> = outcome.data.loans.iter().map(|l| l.loan_id.as_str()).collect();
    assert_eq!(ids, vec!["L2"]);
    assert_eq!(outcome.data.kpis.total_loans, 1);
    assert_eq!(outcome.data.communication_stats.total_calls, 1, "only L2's call is in scope");
    assert_eq!(outcome.data.communication_stats.answered_calls, 0);
}

#[tokio::test]
async fn filter_corrections_are_reported_not_rejected() {
    let assembler = ReportAssembler::new(ScriptedSource::live(), EngineConfig::default_test());
    let input = RawReportFilter {
        risk_level: Some("purple".into()),
        ..request("OFF001")
    };
    let outcome = assembler.assemble(&input, &clock()).await;

    assert!(outcome.success);
    assert_eq!(outcome.data.kpis.total_loans, 3);
    assert!(outcome.diagnostics.iter().any(|e| matches!(
        e,
        AssemblyEvent::FilterCorrected { field, .. } if field == "riskLevel"
    )));
}

#[tokio::test]
async fn state_walks_forward_to_a_terminal_state() {
    let assembler = ReportAssembler::new(ScriptedSource::live(), EngineConfig::default_test());
    let outcome = assembler.assemble(&request("OFF001"), &clock()).await;

    let states: Vec<AssemblyState> = outcome
        .diagnostics
        .iter()
        .filter_map(|e| match e {
            AssemblyEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![AssemblyState::FetchingSlices, AssemblyState::Aggregating, AssemblyState::Assembled]
    );
    assert!(outcome.state.is_terminal());
}

#[tokio::test]
async fn roster_falls_back_when_the_source_is_down() {
    let live = ReportAssembler::new(ScriptedSource::live(), EngineConfig::default_test());
    let roster = live.roster().await;
    assert!(roster.success);
    assert_eq!(roster.origin, DataOrigin::Live);
    assert_eq!(roster.data.len(), 1);

    let down = ReportAssembler::new(
        ScriptedSource::live().failing(&[Slice::Specialist]),
        EngineConfig::default_test(),
    );
    let roster = down.roster().await;
    assert!(!roster.success);
    assert_eq!(roster.origin, DataOrigin::Fallback);
    assert_eq!(roster.data.len(), 5);
}

// ── Superseded requests ──────────────────────────────────────────────────────

#[tokio::test]
async fn latest_request_is_accepted() {
    let assembler = ReportAssembler::new(ScriptedSource::live(), EngineConfig::default_test());
    let guard = RequestGuard::new();
    let outcome = assembler.assemble_guarded(&guard, &request("OFF001"), &clock()).await;
    assert!(outcome.is_some());
}

#[tokio::test]
async fn superseded_request_is_discarded() {
    let source = ScriptedSource {
        delay_ms: 50,
        ..ScriptedSource::live()
    };
    let assembler = ReportAssembler::new(source, EngineConfig::default_test());
    let guard = RequestGuard::new();

    let slow_request = request("OFF001");
    let slow_clock = clock();
    let slow = assembler.assemble_guarded(&guard, &slow_request, &slow_clock);
    let newer = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        guard.begin(&ReportFilter::for_specialist("OFF002"))
    };
    let (stale, newer_ticket) = tokio::join!(slow, newer);

    assert!(stale.is_none(), "result for OFF001 must not land after OFF002 was requested");
    assert!(guard.is_current(&newer_ticket));
}

#[test]
fn guard_accepts_only_the_latest_ticket() {
    let guard = RequestGuard::new();
    let first = guard.begin(&ReportFilter::for_specialist("OFF001"));
    let second = guard.begin(&ReportFilter::for_specialist("OFF001"));

    assert_ne!(first.request_id, second.request_id);
    assert_eq!(guard.accept(&first, "old"), None);
    assert_eq!(guard.accept(&second, "new"), Some("new"));
}

/// Racing `begin` calls always leave exactly one ticket current.
#[test]
fn concurrent_begins_leave_one_current_ticket() {
    let guard = RequestGuard::new();
    for _ in 0..500 {
        let (a, b) = std::thread::scope(|scope| {
            let a = scope.spawn(|| guard.begin(&ReportFilter::for_specialist("OFF001")));
            let b = scope.spawn(|| guard.begin(&ReportFilter::for_specialist("OFF002")));
            (a.join().unwrap(), b.join().unwrap())
        });
        let current = [guard.is_current(&a), guard.is_current(&b)];
        assert_eq!(current.iter().filter(|c| **c).count(), 1, "{a:?} / {b:?}");
    }
}

#[test]
fn tickets_serialize_for_clients() {
    let guard = RequestGuard::new();
    let ticket = guard.begin(&ReportFilter::for_specialist("OFF001"));
    let json = serde_json::to_value(&ticket).unwrap();
    assert_eq!(json["requestId"], ticket.request_id.to_string());
    let back: collections_core::guard::RequestTicket = serde_json::from_value(json).unwrap();
    assert_eq!(back, ticket);
    assert!(guard.is_current(&back));
}

#[tokio::test]
async fn oversized_trend_window_is_capped() {
    let config = EngineConfig {
        trend_window: usize::MAX,
        ..EngineConfig::default_test()
    };
    let assembler = ReportAssembler::new(ScriptedSource::live(), config);
    let outcome = assembler.assemble(&request("OFF001"), &clock()).await;
    assert_eq!(outcome.data.trends.len(), collections_core::config::MAX_TREND_WINDOW);
    assert_eq!(outcome.data.trends.last().unwrap().date, date(7, 25));
}
