//! Gapless, strictly ordered playback scheduling
//!
//! Each inbound chunk starts where the previous one ends, or immediately if
//! the queue has drained. An interruption stops everything scheduled and
//! resets the cursor.

use std::collections::VecDeque;
use tokio::time::Instant;
use tracing::debug;

use super::audio::duration_of;

/// Audio sink that plays sample buffers at scheduled instants
pub trait AudioOutput: Send {
    fn schedule(&mut self, samples: Vec<f32>, sample_rate: u32, start_at: Instant);

    /// Stop every scheduled buffer, including one already playing
    fn stop_all(&mut self);
}

/// Sink that discards audio, for headless sessions
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn schedule(&mut self, _samples: Vec<f32>, _sample_rate: u32, _start_at: Instant) {}
    fn stop_all(&mut self) {}
}

pub struct PlaybackQueue {
    output: Box<dyn AudioOutput>,
    sample_rate: u32,
    next_start: Option<Instant>,
    /// End instants of scheduled chunks, in order
    scheduled: VecDeque<Instant>,
}

impl PlaybackQueue {
    pub fn new(output: Box<dyn AudioOutput>, sample_rate: u32) -> Self {
        Self {
            output,
            sample_rate,
            next_start: None,
            scheduled: VecDeque::new(),
        }
    }

    /// Schedule a chunk after everything already queued; returns its start
    pub fn enqueue(&mut self, samples: Vec<f32>, now: Instant) -> Instant {
        self.prune(now);

        let start = match self.next_start {
            Some(next) if next > now => next,
            _ => now,
        };
        let end = start + duration_of(samples.len(), self.sample_rate);

        self.output.schedule(samples, self.sample_rate, start);
        self.scheduled.push_back(end);
        self.next_start = Some(end);
        start
    }

    /// Drop everything queued; the next chunk starts immediately
    pub fn interrupt(&mut self) {
        debug!(pending = self.scheduled.len(), "Playback interrupted");
        self.output.stop_all();
        self.scheduled.clear();
        self.next_start = None;
    }

    /// Release the sink once playback is over
    pub fn into_output(self) -> Box<dyn AudioOutput> {
        self.output
    }

    /// Chunks scheduled but not yet finished at `now`
    pub fn pending(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.scheduled.len()
    }

    fn prune(&mut self, now: Instant) {
        while self.scheduled.front().is_some_and(|end| *end <= now) {
            self.scheduled.pop_front();
        }
    }
}
