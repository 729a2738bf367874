//! Data responder.
//!
//! The server registers one prefix per pattern and answers every Interest it receives with Data
//! built from the pattern. Replies that must be delayed are kept in a deadline queue served by the
//! same event loop, so a slow pattern never blocks the other ones.

use crossbeam_channel::{at, never, unbounded, Receiver, Sender};
use rand_core::{RngCore, SeedableRng};
use rand_distr::{Distribution, Uniform};
use rand_pcg::Pcg32;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use crate::face::{Face, RegisteredPrefixId};
use crate::stats::*;
use crate::structs::*;

pub mod pattern;

pub use pattern::ResponsePattern;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Delay added to every reply
    pub content_delay: Option<Duration>,
    /// Stop after answering this many Interests. Unbounded if `None`.
    pub max_interests: Option<u64>,
    /// Do not log each received Interest
    pub quiet: bool,
    pub seed: Option<u64>,
}

#[derive(Debug)]
enum Event {
    Interest(usize, Interest),
    RegistrationFailed(usize, String),
}

/// Reply waiting for its deadline
#[derive(Debug)]
struct DeferredReply {
    due: Instant,
    order: u64,
    data: Data,
}

impl PartialEq for DeferredReply {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DeferredReply {}

impl PartialOrd for DeferredReply {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeferredReply {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.order).cmp(&(other.due, other.order))
    }
}

/// Random printable content
fn random_content(len: usize, rng: &mut impl RngCore) -> Vec<u8> {
    let ascii = Uniform::new(0u8, 128);
    ascii.sample_iter(rng).take(len).collect()
}

pub struct Server<F: Face> {
    options: ServerOptions,
    patterns: Vec<ResponsePattern>,
    face: F,
    stats: ServerStatistics,
    rng: Pcg32,
    tx_events: Sender<Event>,
    rx_events: Receiver<Event>,
    registrations: Vec<RegisteredPrefixId>,
    deferred: BinaryHeap<Reverse<DeferredReply>>,
    deferred_count: u64,
    registered: bool,
}

impl<F: Face> Server<F> {
    pub fn new(patterns: Vec<ResponsePattern>, face: F, options: ServerOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };
        let (tx_events, rx_events) = unbounded();
        Server {
            stats: ServerStatistics::new(patterns.len()),
            options,
            patterns,
            face,
            rng,
            tx_events,
            rx_events,
            registrations: vec![],
            deferred: BinaryHeap::new(),
            deferred_count: 0,
            registered: false,
        }
    }

    pub fn statistics(&self) -> &ServerStatistics {
        &self.stats
    }

    fn all_received(&self) -> bool {
        self.options
            .max_interests
            .is_some_and(|max| self.stats.received >= max)
    }

    fn all_registrations_failed(&self) -> bool {
        self.stats.registration_failures >= self.patterns.len()
    }

    /// Register the prefix of every pattern. Done once, by the first call.
    pub fn register_prefixes(&mut self) {
        if self.registered {
            return;
        }
        self.registered = true;
        for (pattern_id, pattern) in self.patterns.iter().enumerate() {
            let prefix = pattern.prefix();
            let tx = self.tx_events.clone();
            let on_interest = Box::new(move |interest| {
                let _ = tx.send(Event::Interest(pattern_id, interest));
            });
            let tx = self.tx_events.clone();
            let on_failure = Box::new(move |reason| {
                let _ = tx.send(Event::RegistrationFailed(pattern_id, reason));
            });
            match self.face.register_prefix(&prefix, on_interest, on_failure) {
                Ok(id) => {
                    log::info!("Prefix {prefix} registered for Traffic Pattern Type #{}", pattern_id + 1);
                    self.registrations.push(id);
                }
                Err(e) => {
                    log::error!("{e}");
                    self.stats.registration_failures += 1;
                }
            }
        }
    }

    fn on_registration_failed(&mut self, pattern_id: usize, reason: String) {
        log::error!(
            "Prefix registration failed for Traffic Pattern Type #{}: {reason}",
            pattern_id + 1
        );
        self.stats.registration_failures += 1;
    }

    /// Build the Data answering `interest` and send or schedule it.
    /// Interests arriving once the maximum is reached are ignored.
    pub fn on_interest(&mut self, pattern_id: usize, interest: Interest) {
        if self.all_received() {
            log::debug!("Interest ignored: {}", interest.name);
            return;
        }
        let pattern = &self.patterns[pattern_id];
        let mut data = Data::new(interest.name);
        data.content_type = pattern.content_type;
        data.freshness_period = pattern.freshness_period;
        data.content = match (&pattern.content, pattern.content_bytes) {
            (Some(content), _) if !content.is_empty() => content.as_bytes().to_vec(),
            (_, Some(len)) => random_content(len, &mut self.rng),
            _ => vec![],
        };
        let delay = pattern.content_delay.unwrap_or_default()
            + self.options.content_delay.unwrap_or_default();
        if let Err(e) = self.face.sign(&mut data, &pattern.signing_info) {
            log::error!("{e}");
            return;
        }

        let (global_id, local_id) = self.stats.record_received(pattern_id);
        if !self.options.quiet {
            log::info!(
                "Interest Received - PatternType={}, GlobalID={global_id}, LocalID={local_id}, Name={}",
                pattern_id + 1,
                data.name
            );
        }

        if delay.is_zero() {
            self.reply(data);
        } else {
            self.deferred_count += 1;
            self.deferred.push(Reverse(DeferredReply {
                due: Instant::now() + delay,
                order: self.deferred_count,
                data,
            }));
        }
    }

    fn reply(&mut self, data: Data) {
        let name = data.name.clone();
        if let Err(e) = self.face.put(data) {
            log::error!("Cannot send Data {name}: {e}");
        }
    }

    /// Send every deferred reply whose deadline has passed
    fn send_due_replies(&mut self) {
        let now = Instant::now();
        while self.deferred.peek().is_some_and(|Reverse(r)| r.due <= now) {
            if let Some(Reverse(r)) = self.deferred.pop() {
                self.reply(r.data);
            }
        }
    }

    /// Answer Interests until the maximum is reached or `shutdown` fires.
    /// `shutdown` fires on a message or when its senders are dropped.
    pub fn run(mut self, shutdown: Receiver<()>) -> ServerReport {
        if self.options.max_interests == Some(0) {
            log::info!("No Interest to answer");
            return self.finish(false);
        }
        if self.patterns.is_empty() {
            log::warn!("No traffic pattern to serve");
            return self.finish(false);
        }

        self.register_prefixes();
        let rx_events = self.rx_events.clone();
        let mut interrupted = false;
        loop {
            if self.all_registrations_failed() {
                log::error!("No prefix could be registered");
                return self.finish(true);
            }
            if self.all_received() && self.deferred.is_empty() {
                break;
            }
            let timer = match self.deferred.peek() {
                Some(Reverse(r)) => at(r.due),
                None => never(),
            };
            crossbeam_channel::select! {
                recv(rx_events) -> event => match event {
                    Ok(Event::Interest(pattern_id, interest)) => self.on_interest(pattern_id, interest),
                    Ok(Event::RegistrationFailed(pattern_id, reason)) => {
                        self.on_registration_failed(pattern_id, reason)
                    }
                    Err(_) => break,
                },
                recv(timer) -> _ => self.send_due_replies(),
                recv(shutdown) -> _ => {
                    log::info!("Data generation interrupted");
                    interrupted = true;
                    break;
                }
            }
        }
        if interrupted && !self.deferred.is_empty() {
            log::info!("{} delayed replies dropped", self.deferred.len());
        }
        self.finish(false)
    }

    fn finish(mut self, failed: bool) -> ServerReport {
        for id in self.registrations.drain(..) {
            self.face.unregister_prefix(id);
        }
        self.face.shutdown();
        let short = self
            .options
            .max_interests
            .is_some_and(|max| self.stats.received < max);
        let descriptions = self.patterns.iter().map(|p| p.to_string()).collect();
        let report = self.stats.report(descriptions, failed || short);
        log_report(&report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaceError;
    use crate::face::*;

    /// Records the registrations and the sent Data
    #[derive(Default)]
    struct RecordingFace {
        fail_registrations: bool,
        prefixes: Vec<Name>,
        sent: Vec<Data>,
    }

    impl Face for RecordingFace {
        fn express_interest(
            &mut self,
            _: Interest,
            _: OutcomeCallback,
        ) -> Result<(), FaceError> {
            unimplemented!()
        }
        fn register_prefix(
            &mut self,
            prefix: &Name,
            _: InterestCallback,
            _: RegisterFailedCallback,
        ) -> Result<RegisteredPrefixId, FaceError> {
            if self.fail_registrations {
                return Err(FaceError::Registration {
                    prefix: prefix.to_string(),
                    reason: "refused".into(),
                });
            }
            self.prefixes.push(prefix.clone());
            Ok(RegisteredPrefixId(self.prefixes.len() as u64))
        }
        fn unregister_prefix(&mut self, _: RegisteredPrefixId) {}
        fn sign(&mut self, data: &mut Data, info: &SigningInfo) -> Result<(), FaceError> {
            data.signature = Some(info.clone());
            Ok(())
        }
        fn put(&mut self, data: Data) -> Result<(), FaceError> {
            self.sent.push(data);
            Ok(())
        }
        fn shutdown(&mut self) {}
    }

    fn server(patterns: Vec<ResponsePattern>, face: RecordingFace) -> Server<RecordingFace> {
        Server::new(
            patterns,
            face,
            ServerOptions {
                max_interests: Some(2),
                seed: Some(0),
                ..Default::default()
            },
        )
    }

    #[test]
    fn literal_content_takes_precedence() {
        let pattern = ResponsePattern {
            name: Some("/a".parse().unwrap()),
            content: Some("hello".into()),
            content_bytes: Some(10),
            content_type: Some(0),
            ..Default::default()
        };
        let mut s = server(vec![pattern], RecordingFace::default());
        s.on_interest(0, Interest::new("/a/1".parse().unwrap()));
        let data = &s.face.sent[0];
        assert_eq!(data.content, b"hello");
        assert_eq!(data.content_type, Some(0));
        assert_eq!(data.signature, Some(SigningInfo::default()));
        assert_eq!(s.statistics().received, 1);
    }

    #[test]
    fn random_content_is_ascii() {
        let pattern = ResponsePattern {
            content_bytes: Some(64),
            ..Default::default()
        };
        let mut s = server(vec![pattern], RecordingFace::default());
        s.on_interest(0, Interest::new("/x".parse().unwrap()));
        let content = &s.face.sent[0].content;
        assert_eq!(content.len(), 64);
        assert!(content.iter().all(u8::is_ascii));
    }

    #[test]
    fn interests_beyond_maximum_are_ignored() {
        let mut s = server(vec![ResponsePattern::default()], RecordingFace::default());
        for i in 0..4 {
            s.on_interest(0, Interest::new(Name::new().append(i.to_string().as_str())));
        }
        assert_eq!(s.face.sent.len(), 2);
        assert_eq!(s.statistics().patterns, vec![2]);
    }

    #[test]
    fn delayed_replies_are_sent_in_deadline_order() {
        let slow = ResponsePattern {
            content_delay: Some(Duration::from_millis(40)),
            content: Some("slow".into()),
            ..Default::default()
        };
        let fast = ResponsePattern {
            content_delay: Some(Duration::from_millis(10)),
            content: Some("fast".into()),
            ..Default::default()
        };
        let mut s = server(vec![slow, fast], RecordingFace::default());
        s.on_interest(0, Interest::new("/s".parse().unwrap()));
        s.on_interest(1, Interest::new("/f".parse().unwrap()));
        assert!(s.face.sent.is_empty());
        std::thread::sleep(Duration::from_millis(50));
        s.send_due_replies();
        let contents: Vec<_> = s.face.sent.iter().map(|d| d.content.clone()).collect();
        assert_eq!(contents, vec![b"fast".to_vec(), b"slow".to_vec()]);
        let report = s.run(never());
        assert_eq!(report.received, 2);
        assert!(!report.has_error);
    }

    #[test]
    fn pattern_and_server_delays_add_up() {
        let pattern = ResponsePattern {
            content_delay: Some(Duration::from_millis(60)),
            ..Default::default()
        };
        let options = ServerOptions {
            content_delay: Some(Duration::from_millis(60)),
            max_interests: Some(1),
            seed: Some(0),
            ..Default::default()
        };
        let mut s = Server::new(vec![pattern], RecordingFace::default(), options);
        s.on_interest(0, Interest::new("/a".parse().unwrap()));
        std::thread::sleep(Duration::from_millis(80));
        s.send_due_replies();
        assert!(s.face.sent.is_empty());
        std::thread::sleep(Duration::from_millis(60));
        s.send_due_replies();
        assert_eq!(s.face.sent.len(), 1);
    }

    #[test]
    fn all_registrations_failing_is_an_error() {
        let face = RecordingFace {
            fail_registrations: true,
            ..Default::default()
        };
        let report = server(vec![ResponsePattern::default()], face).run(never());
        assert!(report.has_error);
        assert_eq!(report.registration_failures, 1);
    }

    #[test]
    fn interrupted_before_maximum_is_an_error() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(()).unwrap();
        let report = server(vec![ResponsePattern::default()], RecordingFace::default()).run(rx);
        assert!(report.has_error);
        assert_eq!(report.received, 0);
    }
}
