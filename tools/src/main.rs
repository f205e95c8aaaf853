//! report-runner: headless report builder for the collections dashboard.
//!
//! Usage:
//!   report-runner --db collections.db --specialist OFF001 --date-range current_month
//!   report-runner --seed-demo --specialist OFF002 --today 2024-07-25 --json
//!   report-runner --db collections.db --list
//!   report-runner --db collections.db --ipc-mode

use anyhow::Result;
use chrono::NaiveDate;
use collections_core::{
    assembler::ReportAssembler,
    clock::ReportClock,
    config::EngineConfig,
    filter::{RawReportFilter, ReportFilter},
    guard::{RequestGuard, RequestTicket},
    report::ReportOutcome,
    store::ReportStore,
};
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Report { filter: RawReportFilter },
    Roster,
    Quit,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcReply<'a> {
    Report { ticket: &'a RequestTicket, outcome: &'a ReportOutcome },
    Superseded { ticket: &'a RequestTicket },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let specialist = flag_value(&args, "--specialist").unwrap_or("OFF001");
    let date_range = flag_value(&args, "--date-range");
    let timeout_ms = parse_arg(&args, "--timeout-ms", 0u64);
    let ipc_mode = has_flag(&args, "--ipc-mode");
    let as_json = has_flag(&args, "--json");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if timeout_ms > 0 {
        config.slice_timeout_ms = timeout_ms;
    }

    let clock = match flag_value(&args, "--today") {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| anyhow::anyhow!("--today expects YYYY-MM-DD, got '{raw}': {e}"))?;
            ReportClock::at_date(date)
        }
        None => ReportClock::system(),
    };

    let store = ReportStore::open(db)?;
    store.migrate()?;
    let assembler = ReportAssembler::new(store, config);

    if has_flag(&args, "--seed-demo") {
        assembler.source().seed_demo(assembler.fallback(), &clock)?;
    }

    if ipc_mode {
        let input = BufReader::new(tokio::io::stdin());
        let output = Arc::new(Mutex::new(io::stdout()));
        return run_ipc_loop(Arc::new(assembler), clock, input, output).await;
    }

    if has_flag(&args, "--list") {
        let roster = assembler.roster().await;
        println!("{}", serde_json::to_string_pretty(&roster)?);
        return Ok(());
    }

    let filter = RawReportFilter {
        specialist_id: specialist.to_string(),
        date_range: date_range.map(str::to_string),
        ..RawReportFilter::default()
    };
    let outcome = assembler.assemble(&filter, &clock).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome, db);
    }
    Ok(())
}

/// One JSON command per stdin line, one JSON reply per stdout line.
/// Reports run as their own tasks while stdin keeps being read, so a
/// newer report supersedes one still in flight; the stale one is answered
/// with a `superseded` reply instead of its outcome.
async fn run_ipc_loop<R, W>(
    assembler: Arc<ReportAssembler<ReportStore>>,
    clock: ReportClock,
    input: R,
    output: Arc<Mutex<W>>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
{
    let guard = Arc::new(RequestGuard::new());
    let mut in_flight = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let cmd: IpcCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                reply(&output, &serde_json::json!({ "success": false, "error": e.to_string() }))?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Roster => reply(&output, &assembler.roster().await)?,
            IpcCommand::Report { filter } => {
                let (normalized, _) = ReportFilter::normalize(&filter);
                let ticket = guard.begin(&normalized);
                let assembler = Arc::clone(&assembler);
                let guard = Arc::clone(&guard);
                let output = Arc::clone(&output);
                in_flight.spawn(async move {
                    let outcome = assembler.assemble(&filter, &clock).await;
                    match guard.accept(&ticket, outcome) {
                        Some(outcome) => {
                            reply(&output, &IpcReply::Report { ticket: &ticket, outcome: &outcome })
                        }
                        None => {
                            log::info!("ipc: dropped superseded report for {}", filter.specialist_id);
                            reply(&output, &IpcReply::Superseded { ticket: &ticket })
                        }
                    }
                });
            }
        }
    }

    while let Some(done) = in_flight.join_next().await {
        done??;
    }
    Ok(())
}

/// Write one reply line. The output lock keeps lines from concurrent
/// tasks whole.
fn reply<W: Write, T: Serialize>(output: &Arc<Mutex<W>>, value: &T) -> Result<()> {
    let line = serde_json::to_string(value)?;
    let mut out = output
        .lock()
        .map_err(|_| anyhow::anyhow!("ipc output lock poisoned"))?;
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

fn print_summary(outcome: &ReportOutcome, db: &str) {
    let report = &outcome.data;
    let k = &report.kpis;

    println!("=== SPECIALIST REPORT ===");
    println!("  specialist:     {} ({})", report.specialist.name, report.specialist.id);
    println!("  team:           {}", report.specialist.team);
    println!("  period:         {} .. {}", report.period.start, report.period.end);
    println!("  db:             {db}");
    println!("  state:          {:?}", outcome.state);
    if let Some(err) = &outcome.error {
        println!("  notice:         {err}");
    }

    println!();
    println!("=== PORTFOLIO ===");
    println!("  loans:          {}", k.total_loans);
    println!("  portfolio:      {:.0}", k.total_portfolio_value);
    println!("  outstanding:    {:.0}", k.total_outstanding);
    println!("  overdue:        {:.0}", k.total_overdue_amount);
    println!("  avg dpd:        {:.1}", k.average_dpd);
    for stat in report.risk_analysis.buckets.iter().filter(|b| b.count > 0) {
        println!("    {:<8} {:>3} cases | overdue {:.0}", stat.bucket.label(), stat.count, stat.overdue_amount);
    }

    println!();
    println!("=== PERFORMANCE ===");
    println!("  collection:     {:.1}%", k.collection_rate);
    println!("  response:       {:.1}%", k.response_rate);
    println!("  conversion:     {:.1}%", k.conversion_rate);
    println!("  fulfillment:    {:.1}%", k.fulfillment_rate);
    println!("  efficiency:     {:.1}", report.performance.efficiency);
    println!("  quality score:  {:.1}", report.performance.quality_score);
    println!(
        "  promises:       {} total | {} kept | {} broken | {} pending",
        report.promise_summary.total,
        report.promise_summary.fulfilled,
        report.promise_summary.broken,
        report.promise_summary.pending,
    );
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn demo_assembler(clock: &ReportClock) -> Arc<ReportAssembler<ReportStore>> {
        let store = ReportStore::in_memory().unwrap();
        store.migrate().unwrap();
        let assembler = ReportAssembler::new(store, EngineConfig::default_test());
        assembler.source().seed_demo(assembler.fallback(), clock).unwrap();
        Arc::new(assembler)
    }

    fn replies(output: &Mutex<Vec<u8>>) -> Vec<serde_json::Value> {
        let bytes = output.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn newer_report_supersedes_one_in_flight() {
        let clock = ReportClock::at_date(NaiveDate::from_ymd_opt(2024, 7, 25).unwrap());
        let input = concat!(
            r#"{"type":"report","filter":{"specialistId":"OFF001"}}"#, "\n",
            r#"{"type":"report","filter":{"specialistId":"OFF002"}}"#, "\n",
            r#"{"type":"quit"}"#, "\n",
        );
        let output = Arc::new(Mutex::new(Vec::new()));
        run_ipc_loop(demo_assembler(&clock), clock, input.as_bytes(), Arc::clone(&output))
            .await
            .unwrap();

        let replies = replies(&output);
        assert_eq!(replies.len(), 2);
        let superseded: Vec<_> = replies.iter().filter(|r| r["type"] == "superseded").collect();
        let reports: Vec<_> = replies.iter().filter(|r| r["type"] == "report").collect();
        assert_eq!(superseded.len(), 1);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["outcome"]["data"]["specialist"]["id"], "OFF002");
        assert!(superseded[0]["ticket"]["signature"].as_str().unwrap().contains("OFF001"));
    }

    #[tokio::test]
    async fn bad_lines_get_an_error_reply() {
        let clock = ReportClock::at_date(NaiveDate::from_ymd_opt(2024, 7, 25).unwrap());
        let input = "not json\n{\"type\":\"roster\"}\n";
        let output = Arc::new(Mutex::new(Vec::new()));
        run_ipc_loop(demo_assembler(&clock), clock, input.as_bytes(), Arc::clone(&output))
            .await
            .unwrap();

        let replies = replies(&output);
        assert_eq!(replies[0]["success"], false);
        assert_eq!(replies[1]["data"].as_array().unwrap().len(), 5);
    }
}
