//! Report assembly: one filter in, one complete report out.
//!
//! ASSEMBLY ORDER (fixed):
//!   1. Normalize the filter (corrections recorded, never rejected).
//!   2. Fan out: specialist, loans, interactions, promises and daily
//!      performance are fetched concurrently.
//!   3. Fan in: each slice resolves to live data or, on failure, to that
//!      slice's deterministic fallback. One failure never aborts another.
//!   4. Aggregate: buckets/risk, communication, promises, KPIs, trends,
//!      segments, risk analysis, timeline.
//!
//! RULES:
//!   - No error crosses `assemble`. Every path returns a full report.
//!   - Branches share no mutable state; the merge happens after the join.
//!   - The assembler keeps nothing between requests.

use crate::{
    analysis,
    clock::ReportClock,
    communication,
    config::{EngineConfig, MAX_TREND_WINDOW},
    error::{ReportError, ReportResult},
    event::{AssemblyEvent, AssemblyState, Slice},
    fallback::FallbackProvider,
    filter::{DateWindow, RawReportFilter, ReportFilter},
    guard::RequestGuard,
    kpi,
    model::{LoanCase, PromiseStatus},
    promise,
    report::{ReportOutcome, RosterOutcome, SliceSources, SpecialistReport},
    source::{DataSource, Sourced},
    trend::{self, TrendSources},
    types::{DataOrigin, LoanId},
};
use chrono::Duration;
use std::collections::HashSet;
use std::future::Future;

/// Tracks state transitions and diagnostics for one assembly.
struct AssemblyRun {
    state:  AssemblyState,
    events: Vec<AssemblyEvent>,
}

impl AssemblyRun {
    fn new() -> Self {
        Self { state: AssemblyState::Idle, events: Vec::new() }
    }

    fn transition(&mut self, to: AssemblyState) {
        log::debug!("assembly: {:?} -> {:?}", self.state, to);
        self.events.push(AssemblyEvent::StateChanged { from: self.state, to });
        self.state = to;
    }

    fn record(&mut self, event: AssemblyEvent) {
        self.events.push(event);
    }

    /// Turn one slice's fetch result into a tagged slice, substituting
    /// the fallback on failure.
    fn resolve<T>(
        &mut self,
        slice: Slice,
        result: ReportResult<T>,
        records: impl Fn(&T) -> usize,
        fallback: impl FnOnce() -> T,
    ) -> Sourced<T> {
        let sourced = match result {
            Ok(value) => Sourced::live(value),
            Err(e) => {
                log::warn!("assembly: {} slice unavailable, using sample data: {e}", slice.name());
                self.record(AssemblyEvent::SliceFailed {
                    slice,
                    reason: e.to_string(),
                });
                Sourced::fallback(fallback(), e.to_string())
            }
        };
        self.record(AssemblyEvent::SliceResolved {
            slice,
            origin: sourced.origin,
            records: records(&sourced.value),
        });
        sourced
    }
}

pub struct ReportAssembler<S: DataSource> {
    source:   S,
    config:   EngineConfig,
    fallback: FallbackProvider,
}

impl<S: DataSource> ReportAssembler<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        let fallback = FallbackProvider::new(&config);
        Self { source, config, fallback }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fallback(&self) -> &FallbackProvider {
        &self.fallback
    }

    /// Bound a slice fetch by the configured timeout.
    async fn fetch<T>(
        &self,
        slice: Slice,
        fut: impl Future<Output = ReportResult<T>>,
    ) -> ReportResult<T> {
        let limit = std::time::Duration::from_millis(self.config.slice_timeout_ms);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ReportError::upstream(
                slice.name(),
                format!("timed out after {}ms", self.config.slice_timeout_ms),
            )),
        }
    }

    /// Active specialists, or the fallback roster.
    pub async fn roster(&self) -> RosterOutcome {
        match self.fetch(Slice::Specialist, self.source.specialists()).await {
            Ok(list) => RosterOutcome {
                success: true,
                data:    list.into_iter().filter(|s| s.active).collect(),
                error:   None,
                origin:  DataOrigin::Live,
            },
            Err(e) => {
                log::warn!("roster: specialist list unavailable, using sample data: {e}");
                RosterOutcome {
                    success: false,
                    data:    self.fallback.roster(),
                    error:   Some(e.to_string()),
                    origin:  DataOrigin::Fallback,
                }
            }
        }
    }

    /// Build a report from dashboard filter input.
    pub async fn assemble(&self, raw: &RawReportFilter, clock: &ReportClock) -> ReportOutcome {
        let (filter, issues) = ReportFilter::normalize(raw);
        let mut run = AssemblyRun::new();
        for issue in issues {
            run.record(AssemblyEvent::FilterCorrected {
                field:   issue.field,
                value:   issue.value,
                applied: issue.applied,
            });
        }
        self.assemble_with(filter, clock, run).await
    }

    /// Build a report from an already-normalized filter.
    pub async fn assemble_filter(&self, filter: ReportFilter, clock: &ReportClock) -> ReportOutcome {
        self.assemble_with(filter, clock, AssemblyRun::new()).await
    }

    /// Build a report under `guard`. Returns `None` when a newer request
    /// began before this one finished.
    pub async fn assemble_guarded(
        &self,
        guard: &RequestGuard,
        raw: &RawReportFilter,
        clock: &ReportClock,
    ) -> Option<ReportOutcome> {
        let (filter, _) = ReportFilter::normalize(raw);
        let ticket = guard.begin(&filter);
        let outcome = self.assemble(raw, clock).await;
        guard.accept(&ticket, outcome)
    }

    async fn assemble_with(
        &self,
        filter: ReportFilter,
        clock: &ReportClock,
        mut run: AssemblyRun,
    ) -> ReportOutcome {
        let today = clock.today();
        let period = filter.date_range.window(today);
        let trend_window = self.config.trend_window.min(MAX_TREND_WINDOW);
        let trend_start = today - Duration::days(trend_window.saturating_sub(1) as i64);
        let fetch_window = DateWindow {
            start: period.start.min(trend_start),
            end:   period.end.max(today),
        };
        let id = filter.specialist_id.as_str();

        // ── Fan out ────────────────────────────────────────────
        run.transition(AssemblyState::FetchingSlices);
        let (specialist, loans, interactions, promises, history) = tokio::join!(
            self.fetch(Slice::Specialist, self.source.specialist(id)),
            self.fetch(Slice::Loans, self.source.loan_cases(id, &filter, self.config.loan_limit)),
            self.fetch(Slice::Interactions, self.source.interactions(id, &fetch_window)),
            self.fetch(Slice::Promises, self.source.promises(id, &fetch_window)),
            self.fetch(Slice::Performance, self.source.performance_history(id, &fetch_window)),
        );

        // ── Fan in ─────────────────────────────────────────────
        let specialist = run.resolve(Slice::Specialist, specialist, |_| 1, || {
            self.fallback.specialist(id)
        });
        let loans = run.resolve(Slice::Loans, loans, Vec::len, || self.fallback.loan_records());

        let loan_cases: Vec<LoanCase> = loans
            .value
            .into_iter()
            .map(LoanCase::from_record)
            .filter(|loan| filter.matches_loan(loan))
            .take(self.config.loan_limit)
            .collect();
        let loan_ids: Vec<LoanId> = loan_cases.iter().map(|l| l.loan_id.clone()).collect();

        let interactions = run.resolve(Slice::Interactions, interactions, Vec::len, || {
            self.fallback.interactions(&loan_ids, clock)
        });
        let promises = run.resolve(Slice::Promises, promises, Vec::len, || {
            self.fallback.promises(&loan_ids, clock)
        });
        let history = run.resolve(Slice::Performance, history, Vec::len, || {
            self.fallback.performance_history(clock)
        });

        let sources = SliceSources {
            specialist:   specialist.origin,
            loans:        loans.origin,
            interactions: interactions.origin,
            promises:     promises.origin,
            performance:  history.origin,
        };
        let failures: Vec<String> = [
            &specialist.error,
            &loans.error,
            &interactions.error,
            &promises.error,
            &history.error,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

        // ── Aggregate ──────────────────────────────────────────
        run.transition(AssemblyState::Aggregating);

        // Loan-level filters narrow the activity slices to the same cases.
        let in_scope: Option<HashSet<&str>> = filter
            .has_loan_constraints()
            .then(|| loan_ids.iter().map(String::as_str).collect());
        let loan_in_scope = |loan_id: Option<&str>| match (&in_scope, loan_id) {
            (None, _)              => true,
            (Some(ids), Some(id))  => ids.contains(id),
            (Some(_), None)        => false,
        };

        let events: Vec<_> = interactions
            .value
            .iter()
            .filter(|e| filter.matches_event(e) && loan_in_scope(e.loan_id.as_deref()))
            .cloned()
            .collect();
        let events_in_period: Vec<_> = events
            .iter()
            .filter(|e| period.contains(e.timestamp.date_naive()))
            .cloned()
            .collect();
        let raw_promises: Vec<_> = promises
            .value
            .iter()
            .filter(|p| loan_in_scope(Some(p.loan_id.as_str())))
            .cloned()
            .collect();
        let promises_in_period: Vec<_> = raw_promises
            .iter()
            .filter(|p| p.status == PromiseStatus::Active || period.contains(p.promise_date))
            .cloned()
            .collect();
        let history_in_period: Vec<_> = history
            .value
            .iter()
            .filter(|d| period.contains(d.metric_date))
            .cloned()
            .collect();

        let comm = communication::aggregate(&events_in_period, self.config.work_week);
        let tracked = promise::track(&promises_in_period, clock.now(), &self.config.tickets);
        let promise_summary = promise::summarize(&tracked);
        let kpis = kpi::aggregate(&loan_cases, &comm.stats, &promise_summary);
        let performance = kpi::performance(&kpis, &comm.stats, &promise_summary, &history_in_period);

        let activity = trend::daily_activity(&events, &raw_promises);
        let trends = trend::synthesize(
            trend_window,
            today,
            &TrendSources {
                history:         &history.value,
                history_origin:  history.origin,
                activity:        &activity,
                activity_origin: if interactions.is_fallback() || promises.is_fallback() {
                    DataOrigin::Fallback
                } else {
                    DataOrigin::Live
                },
            },
            &self.fallback,
        );

        let customer_segments = analysis::customer_segments(&loan_cases);
        let risk_analysis = analysis::risk_analysis(&loan_cases, &promise_summary, &comm.stats);
        let timeline = analysis::timeline(&events_in_period, &tracked, self.config.timeline_limit);

        let data = SpecialistReport {
            specialist: specialist.value,
            summary: kpi::ReportSummary::from_kpis(&kpis),
            kpis,
            loans: loan_cases,
            communication_data: comm.daily,
            communication_stats: comm.stats,
            promises_to_pay: tracked,
            promise_summary,
            performance,
            trends,
            customer_segments,
            risk_analysis,
            timeline,
            filter,
            period,
            generated_at: clock.now(),
        };

        let fallback_slices = sources.fallback_slices();
        let success = fallback_slices.is_empty();
        let error = (!success).then(|| {
            let names: Vec<&str> = fallback_slices.iter().map(Slice::name).collect();
            match failures.first() {
                Some(first) => format!("Showing sample data for: {} ({first})", names.join(", ")),
                None => format!("Showing sample data for: {}", names.join(", ")),
            }
        });

        run.transition(if success {
            AssemblyState::Assembled
        } else {
            AssemblyState::FallbackAssembled
        });
        log::info!(
            "report: specialist={} loans={} promises={} success={success}",
            data.specialist.id,
            data.kpis.total_loans,
            data.promise_summary.total,
        );

        ReportOutcome {
            success,
            data,
            error,
            sources,
            state: run.state,
            diagnostics: run.events,
        }
    }
}
