//! Communication analysis: interaction events rolled up per working day
//! and per channel.
//!
//! The daily series always has one entry per working day, in work-week
//! order, so charts get a fixed shape even for an idle specialist.

use crate::{
    model::{Channel, Direction, InteractionEvent},
    rates::{mean, percent, round1},
};
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkWeek {
    SundayToThursday,
    MondayToFriday,
}

impl WorkWeek {
    pub fn days(&self) -> [Weekday; 5] {
        use Weekday::*;
        match self {
            Self::SundayToThursday => [Sun, Mon, Tue, Wed, Thu],
            Self::MondayToFriday   => [Mon, Tue, Wed, Thu, Fri],
        }
    }

    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.days().contains(&day)
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Channels as the dashboard groups them: SMS and WhatsApp are both
/// "messages".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChannelGroup {
    Calls,
    Messages,
    Email,
    Visits,
}

impl ChannelGroup {
    pub fn of(channel: Channel) -> Self {
        match channel {
            Channel::Call                   => Self::Calls,
            Channel::Sms | Channel::Whatsapp => Self::Messages,
            Channel::Email                  => Self::Email,
            Channel::Visit                  => Self::Visits,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "calls" | "call" | "phone"                    => Some(Self::Calls),
            "messages" | "message" | "sms" | "whatsapp"   => Some(Self::Messages),
            "email" | "emails"                            => Some(Self::Email),
            "visits" | "visit" | "field_visit"            => Some(Self::Visits),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub day:            String,
    pub calls:          u32,
    pub answered_calls: u32,
    pub messages:       u32,
    pub emails:         u32,
    pub visits:         u32,
    pub promises:       u32,
}

impl DailyStat {
    fn empty(day: Weekday) -> Self {
        Self {
            day:            weekday_name(day).to_string(),
            calls:          0,
            answered_calls: 0,
            messages:       0,
            emails:         0,
            visits:         0,
            promises:       0,
        }
    }

    pub fn total(&self) -> u32 {
        self.calls + self.messages + self.emails + self.visits
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationStats {
    pub total_interactions:      u32,
    pub total_calls:             u32,
    pub answered_calls:          u32,
    pub missed_calls:            u32,
    pub total_messages:          u32,
    pub total_emails:            u32,
    pub total_visits:            u32,
    pub inbound:                 u32,
    pub outbound:                u32,
    pub promises_obtained:       u32,
    /// Answered calls as a percentage of calls made.
    pub response_rate:           f64,
    /// Promises obtained as a percentage of answered calls.
    pub promise_rate:            f64,
    pub avg_call_duration_minutes: f64,
    pub last_contact:            Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationSummary {
    pub daily: Vec<DailyStat>,
    pub stats: CommunicationStats,
}

pub fn aggregate(events: &[InteractionEvent], work_week: WorkWeek) -> CommunicationSummary {
    let days = work_week.days();
    let mut daily: Vec<DailyStat> = days.iter().map(|d| DailyStat::empty(*d)).collect();
    let mut stats = CommunicationStats::default();
    let mut call_durations = Vec::new();
    let mut off_days = 0u32;

    for event in events {
        let group = ChannelGroup::of(event.channel);
        let answered = group == ChannelGroup::Calls && event.status.is_answered();

        stats.total_interactions += 1;
        match event.direction {
            Direction::Inbound  => stats.inbound += 1,
            Direction::Outbound => stats.outbound += 1,
        }
        match group {
            ChannelGroup::Calls => {
                stats.total_calls += 1;
                if answered {
                    stats.answered_calls += 1;
                } else {
                    stats.missed_calls += 1;
                }
                if let Some(secs) = event.duration_seconds.filter(|s| *s > 0) {
                    call_durations.push(secs as f64 / 60.0);
                }
            }
            ChannelGroup::Messages => stats.total_messages += 1,
            ChannelGroup::Email    => stats.total_emails += 1,
            ChannelGroup::Visits   => stats.total_visits += 1,
        }
        if event.promise_flag {
            stats.promises_obtained += 1;
        }
        if stats.last_contact.map_or(true, |t| event.timestamp > t) {
            stats.last_contact = Some(event.timestamp);
        }

        let weekday = event.timestamp.weekday();
        let Some(slot) = days.iter().position(|d| *d == weekday) else {
            off_days += 1;
            continue;
        };
        let entry = &mut daily[slot];
        match group {
            ChannelGroup::Calls => {
                entry.calls += 1;
                if answered {
                    entry.answered_calls += 1;
                }
            }
            ChannelGroup::Messages => entry.messages += 1,
            ChannelGroup::Email    => entry.emails += 1,
            ChannelGroup::Visits   => entry.visits += 1,
        }
        if event.promise_flag {
            entry.promises += 1;
        }
    }

    if off_days > 0 {
        log::debug!("communication: {off_days} interaction(s) outside the work week");
    }

    stats.response_rate = round1(percent(stats.answered_calls as f64, stats.total_calls as f64));
    stats.promise_rate = round1(percent(
        stats.promises_obtained as f64,
        stats.answered_calls as f64,
    ));
    stats.avg_call_duration_minutes = round1(mean(call_durations));

    CommunicationSummary { daily, stats }
}
