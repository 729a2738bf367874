//! Interest generator.
//!
//! The client owns its face and its statistics. It is driven by a periodic timer: each tick picks
//! a pattern according to the traffic percentages and expresses one Interest. Face callbacks never
//! touch the statistics directly, they post a completion to the engine channel.

use crossbeam_channel::{at, never, unbounded, Receiver, Sender};
use rand_core::SeedableRng;
use rand_pcg::Pcg32;
use std::time::{Duration, Instant};

use crate::face::Face;
use crate::stats::*;
use crate::structs::*;

pub mod nonce;
pub mod pattern;
pub mod selector;

pub use pattern::RequestPattern;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Delay between two generated Interests
    pub interval: Duration,
    /// Stop after this many Interests. Unbounded if `None`.
    pub max_interests: Option<u64>,
    /// Do not log each sent Interest and received Data
    pub quiet: bool,
    pub seed: Option<u64>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            interval: Duration::from_millis(1000),
            max_interests: None,
            quiet: false,
            seed: None,
        }
    }
}

/// Context of an expressed Interest, returned with its outcome
#[derive(Debug, Clone)]
struct PendingRequest {
    pattern_id: usize,
    global_id: u64,
    local_id: u64,
    name: Name,
    sent_at: Instant,
}

type Completion = (PendingRequest, InterestOutcome);

pub struct Client<F: Face> {
    options: ClientOptions,
    patterns: Vec<RequestPattern>,
    face: F,
    nonces: nonce::NonceCache,
    stats: ClientStatistics,
    rng: Pcg32,
    tx_completion: Sender<Completion>,
    rx_completion: Receiver<Completion>,
}

impl<F: Face> Client<F> {
    pub fn new(patterns: Vec<RequestPattern>, face: F, options: ClientOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };
        let total: u32 = patterns.iter().map(|p| u32::from(p.traffic_percentage)).sum();
        if !patterns.is_empty() && total != 100 {
            log::warn!("Traffic percentages sum to {total}% instead of 100%");
        }
        let (tx_completion, rx_completion) = unbounded();
        Client {
            stats: ClientStatistics::new(patterns.len()),
            options,
            patterns,
            face,
            nonces: nonce::NonceCache::default(),
            rng,
            tx_completion,
            rx_completion,
        }
    }

    pub fn statistics(&self) -> &ClientStatistics {
        &self.stats
    }

    fn all_sent(&self) -> bool {
        self.options
            .max_interests
            .is_some_and(|max| self.stats.global.sent >= max)
    }

    fn all_completed(&self) -> bool {
        self.options
            .max_interests
            .is_some_and(|max| self.stats.global.completed() >= max)
    }

    /// Express one Interest of a randomly selected pattern.
    /// Returns `false` if no Interest was sent.
    pub fn generate_traffic(&mut self) -> bool {
        if self.all_sent() {
            return false;
        }
        let percentages = self.patterns.iter().map(|p| p.traffic_percentage);
        let Some(pattern_id) = selector::select_pattern(percentages, &mut self.rng) else {
            log::debug!("No traffic pattern selected");
            return false;
        };

        let pattern = &mut self.patterns[pattern_id];
        let mut interest = pattern.build_interest(&mut self.rng);
        let duplication = pattern.nonce_duplication_percentage;
        interest.nonce = Some(self.nonces.next_nonce(duplication, &mut self.rng));

        let request = PendingRequest {
            pattern_id,
            global_id: self.stats.global.sent + 1,
            local_id: self.stats.patterns[pattern_id].sent + 1,
            name: interest.name.clone(),
            sent_at: Instant::now(),
        };
        let tx = self.tx_completion.clone();
        let on_outcome = Box::new(move |outcome| {
            let _ = tx.send((request, outcome));
        });
        let name = interest.name.clone();
        match self.face.express_interest(interest, on_outcome) {
            Ok(()) => {
                let (global_id, local_id) = self.stats.record_sent(pattern_id);
                if !self.options.quiet {
                    log::info!(
                        "Sending Interest - PatternType={}, GlobalID={global_id}, LocalID={local_id}, Name={name}",
                        pattern_id + 1
                    );
                }
                true
            }
            Err(e) => {
                log::error!("Cannot express Interest {name}: {e}");
                false
            }
        }
    }

    fn on_completion(&mut self, (request, outcome): Completion) {
        let PendingRequest {
            pattern_id,
            global_id,
            local_id,
            name,
            sent_at,
        } = request;
        let context = format!(
            "PatternType={}, GlobalID={global_id}, LocalID={local_id}, Name={name}",
            pattern_id + 1
        );
        match outcome {
            InterestOutcome::Data(data) => {
                let consistent = self.patterns[pattern_id].check_content(&data.content);
                self.stats
                    .record_data(pattern_id, sent_at.elapsed(), consistent);
                if !self.options.quiet {
                    let check = match consistent {
                        Some(true) => "Yes",
                        Some(false) => "No",
                        None => "NotChecked",
                    };
                    log::info!("Data Received - {context}, IsConsistent={check}");
                }
            }
            InterestOutcome::Nack(reason) => {
                self.stats.record_nack(pattern_id);
                log::info!("Interest Nack'd - {context}, NackReason={reason}");
            }
            InterestOutcome::Timeout => {
                self.stats.record_timeout(pattern_id);
                log::info!("Interest Timed Out - {context}");
            }
        }
    }

    /// Generate traffic until every Interest has completed or `shutdown` fires.
    /// `shutdown` fires on a message or when its senders are dropped.
    pub fn run(mut self, shutdown: Receiver<()>) -> ClientReport {
        if self.options.max_interests == Some(0) {
            log::info!("No Interest to send");
            return self.finish();
        }
        if self.patterns.is_empty() {
            log::warn!("No traffic pattern to generate");
            return self.finish();
        }

        let interval = self.options.interval;
        let rx_completion = self.rx_completion.clone();
        let mut next_tick = Some(Instant::now() + interval);
        loop {
            let timer = match next_tick {
                Some(deadline) => at(deadline),
                None => never(),
            };
            crossbeam_channel::select! {
                recv(timer) -> _ => {
                    self.generate_traffic();
                    next_tick = if self.all_sent() {
                        None
                    } else {
                        Some(Instant::now() + interval)
                    };
                }
                recv(rx_completion) -> completion => {
                    if let Ok(completion) = completion {
                        self.on_completion(completion);
                    }
                    if self.all_completed() {
                        break;
                    }
                }
                recv(shutdown) -> _ => {
                    log::info!("Interest generation interrupted");
                    break;
                }
            }
        }
        self.finish()
    }

    fn finish(mut self) -> ClientReport {
        self.face.shutdown();
        let descriptions = self.patterns.iter().map(|p| p.to_string()).collect();
        let report = self.stats.report(descriptions);
        log_report(&report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaceError;
    use crate::face::*;

    /// Answers every Interest synchronously with the same outcome, once `refusals` dispatches have
    /// been refused
    struct StaticFace {
        outcome: InterestOutcome,
        expressed: Vec<Interest>,
        closed: bool,
        refusals: usize,
    }

    impl Face for StaticFace {
        fn express_interest(
            &mut self,
            interest: Interest,
            on_outcome: OutcomeCallback,
        ) -> Result<(), FaceError> {
            if self.refusals > 0 {
                self.refusals -= 1;
                return Err(FaceError::Closed);
            }
            self.expressed.push(interest);
            on_outcome(self.outcome.clone());
            Ok(())
        }
        fn register_prefix(
            &mut self,
            _: &Name,
            _: InterestCallback,
            _: RegisterFailedCallback,
        ) -> Result<RegisteredPrefixId, FaceError> {
            unimplemented!()
        }
        fn unregister_prefix(&mut self, _: RegisteredPrefixId) {}
        fn sign(&mut self, _: &mut Data, _: &SigningInfo) -> Result<(), FaceError> {
            Ok(())
        }
        fn put(&mut self, _: Data) -> Result<(), FaceError> {
            Ok(())
        }
        fn shutdown(&mut self) {
            self.closed = true;
        }
    }

    fn pattern(name: &str) -> RequestPattern {
        RequestPattern {
            traffic_percentage: 100,
            name: Some(name.parse().unwrap()),
            ..Default::default()
        }
    }

    fn options(max: u64) -> ClientOptions {
        ClientOptions {
            interval: Duration::from_millis(1),
            max_interests: Some(max),
            quiet: false,
            seed: Some(0),
        }
    }

    #[test]
    fn zero_count_reports_immediately() {
        let face = StaticFace {
            outcome: InterestOutcome::Timeout,
            expressed: vec![],
            closed: false,
            refusals: 0,
        };
        let report = Client::new(vec![pattern("/a")], face, options(0)).run(never());
        assert_eq!(report.global.sent, 0);
        assert!(!report.has_error);
    }

    #[test]
    fn every_interest_completes() {
        let face = StaticFace {
            outcome: InterestOutcome::Nack(NackReason::Congestion),
            expressed: vec![],
            closed: false,
            refusals: 0,
        };
        let report = Client::new(vec![pattern("/a")], face, options(5)).run(never());
        assert_eq!(report.global.sent, 5);
        assert_eq!(report.global.nacked, 5);
        assert_eq!(report.global.loss_percentage, 100.);
        assert!(report.has_error);
    }

    #[test]
    fn generated_interests_carry_fresh_nonces() {
        let face = StaticFace {
            outcome: InterestOutcome::Timeout,
            expressed: vec![],
            closed: false,
            refusals: 0,
        };
        let mut client = Client::new(vec![pattern("/a")], face, options(3));
        for _ in 0..3 {
            assert!(client.generate_traffic());
        }
        assert!(!client.generate_traffic());
        let nonces: Vec<_> = client.face.expressed.iter().map(|i| i.nonce).collect();
        assert!(nonces.iter().all(Option::is_some));
        assert_ne!(nonces[0], nonces[1]);
        assert_ne!(nonces[1], nonces[2]);
        assert_eq!(client.statistics().global.sent, 3);
    }

    #[test]
    fn shutdown_interrupts_generation() {
        let face = StaticFace {
            outcome: InterestOutcome::Timeout,
            expressed: vec![],
            closed: false,
            refusals: 0,
        };
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(()).unwrap();
        let mut opts = options(10);
        opts.interval = Duration::from_secs(3600);
        let report = Client::new(vec![pattern("/a")], face, opts).run(rx);
        assert_eq!(report.global.sent, 0);
    }

    #[test]
    fn refused_dispatches_are_not_counted() {
        let face = StaticFace {
            outcome: InterestOutcome::Timeout,
            expressed: vec![],
            closed: false,
            refusals: 2,
        };
        let mut client = Client::new(vec![pattern("/a")], face, options(2));
        assert!(!client.generate_traffic());
        assert!(!client.generate_traffic());
        assert_eq!(client.statistics().global.sent, 0);
        assert!(client.generate_traffic());
        assert!(client.generate_traffic());
        assert!(!client.generate_traffic());
        assert_eq!(client.face.expressed.len(), 2);
        assert_eq!(client.statistics().global.sent, 2);
    }

    #[test]
    fn generation_goes_on_after_refused_dispatches() {
        let face = StaticFace {
            outcome: InterestOutcome::Data(Data::new("/a".parse().unwrap())),
            expressed: vec![],
            closed: false,
            refusals: 2,
        };
        let report = Client::new(vec![pattern("/a")], face, options(3)).run(never());
        assert_eq!(report.global.sent, 3);
        assert_eq!(report.global.received, 3);
        assert!(!report.has_error);
    }
}
