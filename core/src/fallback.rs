//! Deterministic sample data for every report slice.
//!
//! Used whenever a live fetch fails. Everything is either a fixed table
//! or drawn from a seeded stream in `rng`, so the same seed and clock
//! always produce the same report.

use crate::{
    clock::ReportClock,
    config::EngineConfig,
    model::{
        Channel, DailyPerformance, Direction, InteractionEvent, InteractionStatus, LoanCase,
        LoanRecord, PromiseStatus, RawPromise, Specialist,
    },
    rng::{FallbackRng, FallbackSlot, SeedBank},
    trend::TrendPoint,
    types::{DataOrigin, LoanId},
};
use chrono::{Duration, NaiveDate, NaiveTime};

/// How many days of synthetic interactions and metrics to produce.
const ACTIVITY_DAYS: i64 = 30;

const ROSTER: [(&str, &str, &str, &str, &str); 5] = [
    ("OFF001", "Ahmed Mohammed Ali",         "COLLECTION_SPECIALIST", "Early Collection",    "+966501234567"),
    ("OFF002", "Fatima Ahmed Al-Salem",      "SENIOR_SPECIALIST",     "Late Collection",     "+966502345678"),
    ("OFF003", "Mohammed Abdullah Al-Najjar", "LEGAL_SPECIALIST",     "Legal Collection",    "+966503456789"),
    ("OFF004", "Nora Saad Al-Ghamdi",        "FIELD_SPECIALIST",      "Field Collection",    "+966504567890"),
    ("OFF005", "Khalid Abdulaziz Al-Mutairi", "ADVANCED_SPECIALIST",  "Advanced Collection", "+966505678901"),
];

const CUSTOMER_NAMES: [&str; 12] = [
    "Al-Qassim Logistics", "Najd Food Industries", "Eastern Steel Works", "Tabuk Farms",
    "Hail Building Supplies", "Abha Medical Center", "Yanbu Marine Services", "Salem Al-Harbi",
    "Huda Al-Otaibi", "Faisal Al-Dosari", "Reem Al-Shehri", "Majed Al-Zahrani",
];

const CUSTOMER_TYPES: [&str; 3] = ["individual", "corporate", "sme"];
const PRODUCT_TYPES: [&str; 3] = ["tawarruq", "murabaha", "ijara"];

pub struct FallbackProvider {
    bank: SeedBank,
    generated_loans: usize,
}

impl FallbackProvider {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            bank: SeedBank::new(config.fallback_seed),
            generated_loans: config.fallback_generated_loans,
        }
    }

    // ── Specialists ────────────────────────────────────────────

    pub fn roster(&self) -> Vec<Specialist> {
        ROSTER
            .iter()
            .map(|(id, name, role, team, contact)| Specialist {
                id:      id.to_string(),
                name:    name.to_string(),
                role:    role.to_string(),
                team:    team.to_string(),
                contact: Some(contact.to_string()),
                email:   Some(format!("{}@collections.example", id.to_ascii_lowercase())),
                active:  true,
            })
            .collect()
    }

    /// The roster entry for `id`, or a placeholder profile that keeps the
    /// requested id so the report still belongs to the right specialist.
    pub fn specialist(&self, id: &str) -> Specialist {
        self.roster()
            .into_iter()
            .find(|s| s.id == id)
            .unwrap_or_else(|| Specialist {
                id:      id.to_string(),
                name:    format!("Specialist {id}"),
                role:    "COLLECTION_SPECIALIST".into(),
                team:    "Unassigned".into(),
                contact: None,
                email:   None,
                active:  true,
            })
    }

    // ── Loans ──────────────────────────────────────────────────

    pub fn loan_records(&self) -> Vec<LoanRecord> {
        let mut records = fixed_loans();
        let mut rng = self.bank.for_slot(FallbackSlot::Loans);
        let first = records.len() + 1;
        for n in first..first + self.generated_loans {
            records.push(generated_loan(n, &mut rng));
        }
        records
    }

    pub fn loans(&self) -> Vec<LoanCase> {
        self.loan_records().into_iter().map(LoanCase::from_record).collect()
    }

    // ── Interactions ───────────────────────────────────────────

    /// Synthetic interactions over the last 30 days, attached to `loan_ids`
    /// (or to the fallback portfolio when none are given).
    pub fn interactions(&self, loan_ids: &[LoanId], clock: &ReportClock) -> Vec<InteractionEvent> {
        let loan_ids = self.loan_ids_or_default(loan_ids);
        let mut rng = self.bank.for_slot(FallbackSlot::Interactions);
        let today = clock.today();
        let mut events = Vec::new();

        for offset in (0..ACTIVITY_DAYS).rev() {
            let date = today - Duration::days(offset);
            let count = rng.range_u32(0, 5);
            for _ in 0..count {
                let seq = events.len() + 1;
                events.push(generated_interaction(seq, date, &loan_ids, &mut rng));
            }
        }
        events
    }

    // ── Promises ───────────────────────────────────────────────

    pub fn promises(&self, loan_ids: &[LoanId], clock: &ReportClock) -> Vec<RawPromise> {
        let loan_ids = self.loan_ids_or_default(loan_ids);
        let mut rng = self.bank.for_slot(FallbackSlot::Promises);
        let today = clock.today();
        let mut promises = Vec::new();

        for loan_id in &loan_ids {
            if !rng.chance(0.6) {
                continue;
            }
            let offset = rng.range_u32(0, 24) as i64 - 10;
            let promise_date = today + Duration::days(offset);
            let amount = (rng.range_f64(5_000.0, 80_000.0) / 500.0).round() * 500.0;

            let status = if promise_date >= today {
                PromiseStatus::Active
            } else {
                let roll = rng.next_f64();
                if roll < 0.55 {
                    PromiseStatus::Kept
                } else if roll < 0.75 {
                    PromiseStatus::Partial
                } else {
                    PromiseStatus::Broken
                }
            };
            let paid = match status {
                PromiseStatus::Kept    => Some(amount),
                PromiseStatus::Partial => Some((amount * 0.5).round()),
                _ => None,
            };

            promises.push(RawPromise {
                promise_id:            format!("PTP{:04}", promises.len() + 1),
                loan_id:               loan_id.clone(),
                customer_id:           None,
                amount,
                promise_date,
                status,
                prior_status:          None,
                created_at:            None,
                actual_payment_date:   paid.map(|_| promise_date),
                actual_payment_amount: paid,
            });
        }
        promises
    }

    // ── Daily metrics and trend ────────────────────────────────

    pub fn performance_history(&self, clock: &ReportClock) -> Vec<DailyPerformance> {
        let today = clock.today();
        (0..ACTIVITY_DAYS)
            .rev()
            .map(|offset| today - Duration::days(offset))
            .map(|date| {
                let mut rng = self.bank.for_day(FallbackSlot::Performance, date);
                let (calls, answered, promises, _) = day_volumes(&mut rng);
                let kept = (promises as f64 * rng.range_f64(0.5, 0.8)).round() as u32;
                DailyPerformance {
                    metric_date:      date,
                    calls_made:       calls,
                    calls_answered:   answered,
                    promises_made:    promises,
                    promises_kept:    kept,
                    amount_collected: (rng.range_f64(5_000.0, 60_000.0) / 100.0).round() * 100.0,
                }
            })
            .collect()
    }

    /// A synthetic point for one calendar day. Keyed by date only, so the
    /// same day always yields the same point.
    pub fn trend_point(&self, date: NaiveDate) -> TrendPoint {
        let mut rng = self.bank.for_day(FallbackSlot::Trend, date);
        let (calls, answered, promises, collected) = day_volumes(&mut rng);
        TrendPoint::new(date, collected, calls, answered, promises, DataOrigin::Fallback)
    }

    fn loan_ids_or_default(&self, loan_ids: &[LoanId]) -> Vec<LoanId> {
        if loan_ids.is_empty() {
            self.loan_records().into_iter().map(|r| r.loan_id).collect()
        } else {
            loan_ids.to_vec()
        }
    }
}

/// (calls, answered, promises, collected) for one synthetic day.
fn day_volumes(rng: &mut FallbackRng) -> (u32, u32, u32, f64) {
    let calls = rng.range_u32(20, 45);
    let answered = (calls as f64 * rng.range_f64(0.5, 0.8)).round() as u32;
    let promises = (answered as f64 * rng.range_f64(0.3, 0.6)).round() as u32;
    let collected = (rng.range_f64(5_000.0, 60_000.0) / 100.0).round() * 100.0;
    (calls, answered, promises, collected)
}

fn fixed_loans() -> Vec<LoanRecord> {
    let case = |id: &str, customer: &str, name: &str, amount: f64, outstanding: f64,
                overdue: f64, dpd: i64, status: &str, contact: (i32, u32, u32)| LoanRecord {
        loan_id:             id.into(),
        customer_id:         customer.into(),
        customer_name:       Some(name.into()),
        customer_type:       Some("corporate".into()),
        product_type:        Some("tawarruq".into()),
        loan_amount:         amount,
        outstanding_balance: outstanding,
        overdue_amount:      overdue,
        dpd,
        status:              status.into(),
        priority:            Some(if dpd > 90 { "HIGH" } else { "MEDIUM" }.into()),
        last_contact_date:   NaiveDate::from_ymd_opt(contact.0, contact.1, contact.2),
        next_action_date:    None,
    };
    vec![
        case("LOAN001", "1234567890", "Riyadh Trading Co.",      500_000.0,   150_000.0, 25_000.0, 45,  "OVERDUE", (2024, 7, 20)),
        case("LOAN002", "2345678901", "Jeddah Contracting Est.", 750_000.0,   150_000.0, 45_000.0, 75,  "OVERDUE", (2024, 7, 18)),
        case("LOAN003", "3456789012", "Dammam Industries Co.",   1_000_000.0, 200_000.0, 80_000.0, 120, "DEFAULT", (2024, 7, 15)),
    ]
}

fn generated_loan(n: usize, rng: &mut FallbackRng) -> LoanRecord {
    let loan_amount = (rng.range_f64(50_000.0, 1_500_000.0) / 1_000.0).round() * 1_000.0;
    let outstanding = (loan_amount * rng.range_f64(0.2, 0.9)).round();

    let dpd: i64 = match rng.next_u64_below(10) {
        0..=2 => 0,
        3..=5 => rng.range_u32(1, 60) as i64,
        6..=7 => rng.range_u32(61, 180) as i64,
        _     => rng.range_u32(181, 420) as i64,
    };
    let overdue = if dpd == 0 {
        0.0
    } else {
        (outstanding * rng.range_f64(0.05, 0.6)).round()
    };
    let status = match dpd {
        0       => "ACTIVE",
        1..=90  => "OVERDUE",
        _       => "DEFAULT",
    };

    LoanRecord {
        loan_id:             format!("LOAN{n:03}"),
        customer_id:         format!("C{:06}", 100 + n),
        customer_name:       Some(rng.pick(&CUSTOMER_NAMES).to_string()),
        customer_type:       Some(rng.pick(&CUSTOMER_TYPES).to_string()),
        product_type:        Some(rng.pick(&PRODUCT_TYPES).to_string()),
        loan_amount,
        outstanding_balance: outstanding,
        overdue_amount:      overdue,
        dpd,
        status:              status.into(),
        priority:            Some(if dpd > 90 { "HIGH" } else { "MEDIUM" }.into()),
        last_contact_date:   None,
        next_action_date:    None,
    }
}

fn generated_interaction(
    seq: usize,
    date: NaiveDate,
    loan_ids: &[LoanId],
    rng: &mut FallbackRng,
) -> InteractionEvent {
    let channel = match rng.next_u64_below(10) {
        0..=5 => Channel::Call,
        6     => Channel::Sms,
        7     => Channel::Whatsapp,
        8     => Channel::Email,
        _     => Channel::Visit,
    };
    let status = match channel {
        Channel::Call => {
            if rng.chance(0.65) {
                InteractionStatus::Answered
            } else if rng.chance(0.5) {
                InteractionStatus::NoAnswer
            } else {
                InteractionStatus::Busy
            }
        }
        Channel::Visit => InteractionStatus::Completed,
        _ => InteractionStatus::Delivered,
    };
    let duration_seconds = (channel == Channel::Call && status.is_answered())
        .then(|| rng.range_u32(45, 600));
    let promise_flag = status.is_answered() && rng.chance(0.35);
    let hour = rng.range_u32(8, 17);
    let minute = rng.range_u32(0, 59);
    let timestamp = date
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
        .and_utc();

    InteractionEvent {
        interaction_id: format!("INT{seq:05}"),
        loan_id:        Some(rng.pick(loan_ids).clone()),
        channel,
        direction:      if rng.chance(0.85) { Direction::Outbound } else { Direction::Inbound },
        timestamp,
        status,
        duration_seconds,
        outcome:        promise_flag.then(|| "PROMISE_TO_PAY".to_string()),
        promise_flag,
    }
}
