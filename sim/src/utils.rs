use std::time::{Duration, Instant};

use log::debug;

/// LogStopwatch-style sampled span logging.
///
/// - logs a begin/end wrapper for the event
/// - logs total event time on drop
/// - supports sequential spans (`span()` ends the previous span)
///
/// Sampling is by tick number rather than randomness so runs stay reproducible.
pub struct TickStopwatch {
    started: Option<Instant>,
    span: Option<(&'static str, Instant)>,
    name: &'static str,
    tick: u64,
    should_sample: bool,
}

impl TickStopwatch {
    /// Creates a new `TickStopwatch` that conditionally logs timing information.
    /// The tick number is only formatted into log lines when sampled.
    ///
    /// Sampling:
    /// - If `force_debug` is true, always logs.
    /// - Otherwise logs every `sample_every`-th tick (`0` never samples).
    pub fn new(name: &'static str, tick: u64, force_debug: bool, sample_every: u32) -> Self {
        let should_sample =
            force_debug || (sample_every > 0 && tick % u64::from(sample_every) == 0);

        if should_sample {
            debug!("--------- {name} {tick} begin ---------");
        }

        Self {
            started: should_sample.then(Instant::now),
            span: None,
            name,
            tick,
            should_sample,
        }
    }

    /// Starts a new span within the event, ending any previous span.
    pub fn span(&mut self, section_name: &'static str) {
        if !self.should_sample {
            return;
        }

        self.end_span();
        self.span = Some((section_name, Instant::now()));
    }

    /// Ends the current span, if any.
    pub fn end_span(&mut self) {
        if let Some((section, started)) = self.span.take() {
            debug!("{section}: {}", format_duration(started.elapsed()));
        }
    }

    /// Whether this event is currently being sampled/logged.
    pub fn should_sample(&self) -> bool {
        self.should_sample
    }
}

impl Drop for TickStopwatch {
    fn drop(&mut self) {
        if !self.should_sample {
            return;
        }

        // Close any open span first.
        self.end_span();

        if let Some(started) = self.started.take() {
            debug!("event_time: {}", format_duration(started.elapsed()));
        }

        debug!("---------- {} {} end ----------", self.name, self.tick);
    }
}

fn format_duration(d: Duration) -> String {
    format!("{:.3}ms", d.as_secs_f64() * 1_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_every_nth_tick() {
        assert!(TickStopwatch::new("tick", 0, false, 10).should_sample());
        assert!(!TickStopwatch::new("tick", 3, false, 10).should_sample());
        assert!(TickStopwatch::new("tick", 20, false, 10).should_sample());
        assert!(!TickStopwatch::new("tick", 0, false, 0).should_sample());
        assert!(TickStopwatch::new("tick", 3, true, 0).should_sample());
    }

    #[test]
    fn unsampled_spans_are_ignored() {
        let mut sw = TickStopwatch::new("tick", 1, false, 0);
        sw.span("clamp");
        assert!(sw.span.is_none());
    }

    #[test]
    fn sampled_spans_replace_each_other() {
        let mut sw = TickStopwatch::new("tick", 4, false, 2);
        sw.span("clamp");
        sw.span("finish_up");
        assert_eq!(sw.span.map(|(name, _)| name), Some("finish_up"));
        assert_eq!(sw.tick, 4);
    }
}
