use serde::Serialize;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Round-trip times, stored in milliseconds with sub-millisecond precision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundTripTimes {
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub total_ms: f64,
}

impl RoundTripTimes {
    pub fn record(&mut self, rtt: Duration) {
        self.record_ms(rtt.as_nanos() as f64 / 1_000_000.);
    }

    pub fn record_ms(&mut self, rtt: f64) {
        self.min_ms = Some(self.min_ms.map_or(rtt, |m| m.min(rtt)));
        self.max_ms = Some(self.max_ms.map_or(rtt, |m| m.max(rtt)));
        self.total_ms += rtt;
    }
}

/// Counters of one scope: the whole run or a single pattern
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterestCounters {
    pub sent: u64,
    pub received: u64,
    pub nacked: u64,
    pub timed_out: u64,
    pub content_inconsistencies: u64,
    pub rtt: RoundTripTimes,
}

impl InterestCounters {
    /// (sent - received) * 100 / sent, or 0 when nothing was sent
    pub fn loss_percentage(&self) -> f64 {
        if self.sent == 0 {
            0.
        } else {
            (self.sent as f64 - self.received as f64) * 100. / self.sent as f64
        }
    }

    /// inconsistencies * 100 / received, or 0 when nothing was received
    pub fn inconsistency_percentage(&self) -> f64 {
        if self.received == 0 {
            0.
        } else {
            self.content_inconsistencies as f64 * 100. / self.received as f64
        }
    }

    /// total RTT / received, or 0 when nothing was received
    pub fn average_rtt_ms(&self) -> f64 {
        if self.received == 0 {
            0.
        } else {
            self.rtt.total_ms / self.received as f64
        }
    }

    /// Interests whose fate is known (Data, Nack or timeout)
    pub fn completed(&self) -> u64 {
        self.received + self.nacked + self.timed_out
    }

    fn summary(&self) -> CountersSummary {
        CountersSummary {
            sent: self.sent,
            received: self.received,
            nacked: self.nacked,
            timed_out: self.timed_out,
            content_inconsistencies: self.content_inconsistencies,
            loss_percentage: self.loss_percentage(),
            inconsistency_percentage: self.inconsistency_percentage(),
            total_rtt_ms: self.rtt.total_ms,
            average_rtt_ms: self.average_rtt_ms(),
            min_rtt_ms: self.rtt.min_ms.unwrap_or(0.),
            max_rtt_ms: self.rtt.max_ms.unwrap_or(0.),
        }
    }
}

/// Global and per-pattern counters of the client. Patterns are identified by their index in the
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientStatistics {
    pub global: InterestCounters,
    pub patterns: Vec<InterestCounters>,
}

impl ClientStatistics {
    pub fn new(pattern_count: usize) -> Self {
        ClientStatistics {
            global: InterestCounters::default(),
            patterns: vec![InterestCounters::default(); pattern_count],
        }
    }

    /// Returns the (global, per-pattern) sequence numbers of this Interest
    pub fn record_sent(&mut self, pattern_id: usize) -> (u64, u64) {
        self.global.sent += 1;
        self.patterns[pattern_id].sent += 1;
        (self.global.sent, self.patterns[pattern_id].sent)
    }

    /// `consistent` is `None` when the pattern does not check the content
    pub fn record_data(&mut self, pattern_id: usize, rtt: Duration, consistent: Option<bool>) {
        for counters in [&mut self.global, &mut self.patterns[pattern_id]] {
            counters.received += 1;
            if consistent == Some(false) {
                counters.content_inconsistencies += 1;
            }
            counters.rtt.record(rtt);
        }
    }

    pub fn record_nack(&mut self, pattern_id: usize) {
        self.global.nacked += 1;
        self.patterns[pattern_id].nacked += 1;
    }

    pub fn record_timeout(&mut self, pattern_id: usize) {
        self.global.timed_out += 1;
        self.patterns[pattern_id].timed_out += 1;
    }

    /// A run is in error if some content was inconsistent or some Interest was not answered
    pub fn has_error(&self) -> bool {
        self.global.content_inconsistencies != 0 || self.global.sent != self.global.received
    }

    /// `descriptions` holds the canonical rendering of each pattern, in pattern order
    pub fn report(&self, descriptions: Vec<String>) -> ClientReport {
        ClientReport {
            has_error: self.has_error(),
            global: self.global.summary(),
            patterns: descriptions
                .into_iter()
                .zip(self.patterns.iter())
                .map(|(pattern, c)| PatternSummary {
                    pattern,
                    counters: c.summary(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountersSummary {
    pub sent: u64,
    pub received: u64,
    pub nacked: u64,
    pub timed_out: u64,
    pub content_inconsistencies: u64,
    pub loss_percentage: f64,
    pub inconsistency_percentage: f64,
    pub total_rtt_ms: f64,
    pub average_rtt_ms: f64,
    pub min_rtt_ms: f64,
    pub max_rtt_ms: f64,
}

impl Display for CountersSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Interests Sent        = {}", self.sent)?;
        writeln!(f, "Total Responses Received    = {}", self.received)?;
        writeln!(f, "Total Nacks Received        = {}", self.nacked)?;
        writeln!(f, "Total Timeouts              = {}", self.timed_out)?;
        writeln!(f, "Total Interest Loss         = {:.6}%", self.loss_percentage)?;
        writeln!(f, "Total Data Inconsistency    = {:.6}%", self.inconsistency_percentage)?;
        writeln!(f, "Total Round Trip Time       = {:.6}ms", self.total_rtt_ms)?;
        writeln!(f, "Average Round Trip Time     = {:.6}ms", self.average_rtt_ms)?;
        writeln!(f, "Minimum Round Trip Time     = {:.6}ms", self.min_rtt_ms)?;
        writeln!(f, "Maximum Round Trip Time     = {:.6}ms", self.max_rtt_ms)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternSummary {
    pub pattern: String,
    #[serde(flatten)]
    pub counters: CountersSummary,
}

/// Final report of a client run
#[derive(Debug, Clone, Serialize)]
pub struct ClientReport {
    pub has_error: bool,
    pub global: CountersSummary,
    pub patterns: Vec<PatternSummary>,
}

impl Display for ClientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Interest Traffic Report ==")?;
        writeln!(f, "Total Traffic Pattern Types = {}", self.patterns.len())?;
        write!(f, "{}", self.global)?;
        for (pattern_id, p) in self.patterns.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "Traffic Pattern Type #{}", pattern_id + 1)?;
            writeln!(f, "{}", p.pattern)?;
            write!(f, "{}", p.counters)?;
        }
        Ok(())
    }
}

/// Counters of the server
#[derive(Debug, Clone, Default)]
pub struct ServerStatistics {
    pub received: u64,
    pub patterns: Vec<u64>,
    pub registration_failures: usize,
}

impl ServerStatistics {
    pub fn new(pattern_count: usize) -> Self {
        ServerStatistics {
            received: 0,
            patterns: vec![0; pattern_count],
            registration_failures: 0,
        }
    }

    /// Returns the (global, per-pattern) sequence numbers of this Interest
    pub fn record_received(&mut self, pattern_id: usize) -> (u64, u64) {
        self.received += 1;
        self.patterns[pattern_id] += 1;
        (self.received, self.patterns[pattern_id])
    }

    pub fn report(&self, descriptions: Vec<String>, has_error: bool) -> ServerReport {
        ServerReport {
            has_error,
            received: self.received,
            registration_failures: self.registration_failures,
            patterns: descriptions
                .into_iter()
                .zip(self.patterns.iter())
                .map(|(pattern, received)| ServerPatternSummary {
                    pattern,
                    received: *received,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerPatternSummary {
    pub pattern: String,
    pub received: u64,
}

/// Final report of a server run
#[derive(Debug, Clone, Serialize)]
pub struct ServerReport {
    pub has_error: bool,
    pub received: u64,
    pub registration_failures: usize,
    pub patterns: Vec<ServerPatternSummary>,
}

impl Display for ServerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Interest Traffic Report ==")?;
        writeln!(f, "Total Traffic Pattern Types = {}", self.patterns.len())?;
        writeln!(f, "Total Interests Received    = {}", self.received)?;
        if self.registration_failures > 0 {
            writeln!(f, "Failed Prefix Registrations = {}", self.registration_failures)?;
        }
        for (pattern_id, p) in self.patterns.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "Traffic Pattern Type #{}", pattern_id + 1)?;
            writeln!(f, "{}", p.pattern)?;
            writeln!(f, "Total Interests Received    = {}", p.received)?;
        }
        Ok(())
    }
}

/// Log a rendered report line by line
pub fn log_report(report: &impl Display) {
    for line in report.to_string().lines() {
        log::info!("{line}");
    }
}

pub fn write_json_report(report: &impl Serialize, path: &Path) -> std::io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
