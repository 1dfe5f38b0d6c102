use crate::{Result, TrainerError};

/// Simulated session time in seconds.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    /// Moves the clock forward. Time never runs backwards.
    pub fn advance_to(&mut self, time_seconds: f64) {
        if time_seconds > self.time_seconds {
            self.time_seconds = time_seconds;
        }
    }

    pub fn now(&self) -> f64 {
        self.time_seconds
    }
}

/// What a repeating timer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Beat,
    Cadence,
}

impl TimerKind {
    /// Release order among timers due at the same instant. A beat goes out
    /// before a cadence tick that would replace its timer.
    fn priority(self) -> u8 {
        match self {
            TimerKind::Beat => 0,
            TimerKind::Cadence => 1,
        }
    }
}

/// Handle returned by [`Scheduler::schedule_interval`], used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    kind: TimerKind,
}

impl TimerHandle {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

/// A timer firing, handed to the owner of the scheduler for dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub handle: TimerHandle,
    pub time_seconds: f64,
    /// Generation the timer was registered under.
    pub generation: u64,
}

#[derive(Debug, Clone)]
struct IntervalTimer {
    handle: TimerHandle,
    period: f64,
    next_fire: f64,
    generation: u64,
}

/// Single-threaded tick source for repeating timers.
///
/// Events are released one at a time through [`Scheduler::pop_due`] so that a
/// callback may cancel or register timers before the next event is chosen.
/// Due events are ordered by time, then beats before cadence ticks, then by
/// registration order.
#[derive(Debug, Default)]
pub struct Scheduler {
    clock: PlaybackClock,
    timers: Vec<IntervalTimer>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Registers a timer that first fires `period` seconds from now and then
    /// every `period` seconds.
    pub fn schedule_interval(
        &mut self,
        kind: TimerKind,
        period: f64,
        generation: u64,
    ) -> Result<TimerHandle> {
        if !period.is_finite() || period <= 0.0 {
            return Err(TrainerError::InvalidInterval(period));
        }

        let handle = TimerHandle {
            id: self.next_id,
            kind,
        };
        self.next_id += 1;
        self.timers.push(IntervalTimer {
            handle,
            period,
            next_fire: self.clock.now() + period,
            generation,
        });
        Ok(handle)
    }

    /// Removes a timer. Returns `false` if it was not registered.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.handle != handle);
        self.timers.len() != before
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|timer| timer.handle == handle)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Time of the next firing of `handle`, if it is registered.
    pub fn next_fire(&self, handle: TimerHandle) -> Option<f64> {
        self.timers
            .iter()
            .find(|timer| timer.handle == handle)
            .map(|timer| timer.next_fire)
    }

    /// Releases the earliest event due at or before `until`, moving the clock
    /// to its time. Returns `None` once nothing else is due.
    pub fn pop_due(&mut self, until: f64) -> Option<ScheduledEvent> {
        let timer = self
            .timers
            .iter_mut()
            .filter(|timer| timer.next_fire <= until)
            .min_by(|a, b| {
                a.next_fire
                    .total_cmp(&b.next_fire)
                    .then(a.handle.kind.priority().cmp(&b.handle.kind.priority()))
                    .then(a.handle.id.cmp(&b.handle.id))
            })?;

        let event = ScheduledEvent {
            handle: timer.handle,
            time_seconds: timer.next_fire,
            generation: timer.generation,
        };
        timer.next_fire += timer.period;
        self.clock.advance_to(event.time_seconds);
        Some(event)
    }

    /// Finishes an advance once every due event has been dispatched.
    pub fn settle(&mut self, until: f64) {
        self.clock.advance_to(until);
    }

    /// Drains every event due up to `until` without interleaved dispatch.
    pub fn advance(&mut self, until: f64) -> Vec<ScheduledEvent> {
        let mut fired = Vec::new();
        while let Some(event) = self.pop_due(until) {
            fired.push(event);
        }
        self.settle(until);
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_at_fixed_interval() {
        let mut scheduler = Scheduler::new();
        let beat = scheduler
            .schedule_interval(TimerKind::Beat, 0.75, 0)
            .unwrap();

        let fired = scheduler.advance(3.0);
        let times: Vec<f64> = fired.iter().map(|event| event.time_seconds).collect();
        assert_eq!(times, vec![0.75, 1.5, 2.25, 3.0]);
        assert!(fired.iter().all(|event| event.handle == beat));
        assert_eq!(scheduler.now(), 3.0);
    }

    #[test]
    fn rejects_degenerate_periods() {
        let mut scheduler = Scheduler::new();
        for period in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            assert!(scheduler
                .schedule_interval(TimerKind::Beat, period, 0)
                .is_err());
        }
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancelled_timers_stop_firing() {
        let mut scheduler = Scheduler::new();
        let beat = scheduler.schedule_interval(TimerKind::Beat, 1.0, 0).unwrap();
        assert_eq!(scheduler.advance(1.5).len(), 1);

        assert!(scheduler.cancel(beat));
        assert!(!scheduler.cancel(beat));
        assert!(scheduler.advance(10.0).is_empty());
    }

    #[test]
    fn orders_simultaneous_events_by_registration() {
        let mut scheduler = Scheduler::new();
        let beat = scheduler.schedule_interval(TimerKind::Beat, 1.0, 0).unwrap();
        let cadence = scheduler
            .schedule_interval(TimerKind::Cadence, 2.0, 0)
            .unwrap();

        let fired: Vec<TimerHandle> = scheduler
            .advance(2.0)
            .into_iter()
            .map(|event| event.handle)
            .collect();
        assert_eq!(fired, vec![beat, beat, cadence]);
    }

    #[test]
    fn beats_go_out_before_cadence_ticks_at_the_same_instant() {
        let mut scheduler = Scheduler::new();
        let cadence = scheduler
            .schedule_interval(TimerKind::Cadence, 2.0, 0)
            .unwrap();
        let first = scheduler.schedule_interval(TimerKind::Beat, 2.0, 0).unwrap();
        let second = scheduler.schedule_interval(TimerKind::Beat, 2.0, 0).unwrap();

        let fired: Vec<TimerHandle> = scheduler
            .advance(2.0)
            .into_iter()
            .map(|event| event.handle)
            .collect();
        assert_eq!(fired, vec![first, second, cadence]);
    }

    #[test]
    fn new_timers_start_from_current_time() {
        let mut scheduler = Scheduler::new();
        scheduler.settle(4.25);
        let beat = scheduler.schedule_interval(TimerKind::Beat, 0.5, 3).unwrap();

        assert_eq!(scheduler.next_fire(beat), Some(4.75));
        let event = scheduler.pop_due(5.0).unwrap();
        assert_eq!(event.generation, 3);
        assert_eq!(scheduler.now(), event.time_seconds);
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut clock = PlaybackClock::default();
        clock.advance_to(2.0);
        clock.advance_to(1.0);
        assert_eq!(clock.now(), 2.0);
        clock.reset();
        assert_eq!(clock.now(), 0.0);
    }
}
