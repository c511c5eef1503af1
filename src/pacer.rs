//! # Adaptive Pacer (`pacer.rs`)
//!
//! Precise sleeping without pegging a core for the whole duration.
//!
//! OS sleep calls are cheap but imprecise: asking for one millisecond usually
//! returns somewhat later, and by how much depends on the scheduler. Spinning on
//! a clock is precise but burns CPU. The [`Pacer`] mixes the two. It sleeps in
//! one millisecond quanta while the remaining time is larger than its current
//! guess of what a quantum really costs, then spins for the residual.
//!
//! The guess is `mean + standard deviation` of every quantum observed so far,
//! maintained with Welford's online algorithm. The statistics persist for the
//! lifetime of the pacer, so the spin phase shrinks the longer the program runs.

use web_time::{Duration, Instant};

/// Time source and coarse sleep primitive used by the [`Pacer`].
pub trait Clock {
    /// Monotonic time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    /// Yields the thread for roughly `quantum`. May overshoot.
    fn coarse_sleep(&self, quantum: Duration);

    /// Called once per poll of the spin phase.
    fn spin(&self) {
        std::hint::spin_loop();
    }
}

/// Wall clock backed by a high resolution [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn coarse_sleep(&self, quantum: Duration) {
        std::thread::sleep(quantum);
    }
}

/// How a single [`Pacer::sleep`] call spent its time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pace {
    /// Number of coarse sleeps taken.
    pub coarse_sleeps: u32,
    /// Measured time spent in coarse sleeps.
    pub coarse: Duration,
    /// Time spent spinning for the residual.
    pub spin: Duration,
}

impl Pace {
    pub fn total(&self) -> Duration {
        self.coarse + self.spin
    }
}

/// Hybrid coarse-sleep / spin-wait timer that learns the cost of a sleep quantum.
#[derive(Debug)]
pub struct Pacer<C = SystemClock> {
    clock: C,
    /// Seconds one coarse quantum is expected to take, overhead included.
    estimate: f64,
    mean: f64,
    m2: f64,
    count: u64,
}

impl Default for Pacer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacer<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::default())
    }
}

impl<C: Clock> Pacer<C> {
    /// Length of a single coarse sleep.
    pub const QUANTUM: Duration = Duration::from_millis(1);

    // The statistics start from a single pseudo-observation of 5 ms.
    const INITIAL_ESTIMATE: f64 = 5e-3;

    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            estimate: Self::INITIAL_ESTIMATE,
            mean: Self::INITIAL_ESTIMATE,
            m2: 0.0,
            count: 1,
        }
    }

    /// Blocks for `duration`.
    ///
    /// Never returns early. Overshoot is limited to the final coarse quantum
    /// exceeding what remained, plus one clock poll.
    pub fn sleep(&mut self, duration: Duration) -> Pace {
        let mut pace = Pace::default();
        let mut remaining = duration.as_secs_f64();

        while remaining > self.estimate {
            let start = self.clock.now();
            self.clock.coarse_sleep(Self::QUANTUM);
            let observed = self.clock.now().saturating_sub(start);

            pace.coarse_sleeps += 1;
            pace.coarse += observed;

            let observed = observed.as_secs_f64();
            remaining -= observed;
            self.observe(observed);
        }

        let start = self.clock.now();
        loop {
            let spun = self.clock.now().saturating_sub(start);
            if spun.as_secs_f64() >= remaining {
                pace.spin = spun;
                break;
            }
            self.clock.spin();
        }

        pace
    }

    fn observe(&mut self, observed: f64) {
        self.count += 1;
        let delta = observed - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (observed - self.mean);

        let stddev = (self.m2 / (self.count - 1) as f64).sqrt();
        self.estimate = self.mean + stddev;
    }

    /// Current guess of what one coarse quantum costs.
    pub fn estimate(&self) -> Duration {
        Duration::from_secs_f64(self.estimate)
    }

    /// Mean observed quantum.
    pub fn mean(&self) -> Duration {
        Duration::from_secs_f64(self.mean)
    }

    /// Number of real quanta observed (the seed observation excluded).
    pub fn samples(&self) -> u64 {
        self.count - 1
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;

    use super::*;

    /// Deterministic clock: each coarse sleep takes the quantum plus the next
    /// overshoot from a fixed script, each spin poll advances one microsecond.
    #[derive(Debug)]
    pub(crate) struct ScriptedClock {
        now: Cell<Duration>,
        overshoots: Vec<Duration>,
        next: Cell<usize>,
    }

    impl ScriptedClock {
        pub(crate) fn new(overshoots_us: &[u64]) -> Self {
            Self {
                now: Cell::new(Duration::ZERO),
                overshoots: overshoots_us.iter().copied().map(Duration::from_micros).collect(),
                next: Cell::new(0),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for ScriptedClock {
        fn now(&self) -> Duration {
            self.now.get()
        }

        fn coarse_sleep(&self, quantum: Duration) {
            let index = self.next.get();
            self.next.set(index + 1);
            self.advance(quantum + self.overshoots[index % self.overshoots.len()]);
        }

        fn spin(&self) {
            self.advance(Duration::from_micros(1));
        }
    }

    const OVERSHOOTS_US: [u64; 5] = [100, 300, 200, 250, 150];
    const FRAME: Duration = Duration::from_millis(16);

    fn spread(values: &[Duration]) -> Duration {
        let max = values.iter().max().copied().unwrap_or_default();
        let min = values.iter().min().copied().unwrap_or_default();
        max - min
    }

    #[test]
    fn short_requests_only_spin() {
        let mut pacer = Pacer::with_clock(ScriptedClock::new(&OVERSHOOTS_US));
        let pace = pacer.sleep(Duration::from_millis(2));

        assert_eq!(pace.coarse_sleeps, 0);
        assert_eq!(pace.spin, Duration::from_millis(2));
        assert_eq!(pacer.samples(), 0);
        assert_eq!(pacer.estimate(), Duration::from_millis(5));
    }

    #[test]
    fn zero_duration_returns_immediately() {
        let mut pacer = Pacer::with_clock(ScriptedClock::new(&OVERSHOOTS_US));
        let pace = pacer.sleep(Duration::ZERO);
        assert_eq!(pace, Pace::default());
    }

    #[test]
    fn first_observation_folds_into_the_statistics() {
        let mut pacer = Pacer::with_clock(ScriptedClock::new(&[200]));
        pacer.sleep(Duration::from_millis(6));

        // one observation of 1.2 ms against the 5 ms seed:
        // mean = (5 + 1.2) / 2, m2 = 3.8 * 1.9, stddev = sqrt(m2 / 1)
        assert_eq!(pacer.samples(), 1);
        let mean = pacer.mean().as_secs_f64();
        assert!((mean - 3.1e-3).abs() < 1e-9, "mean = {mean}");
        let estimate = pacer.estimate().as_secs_f64();
        let expected = 3.1e-3 + (3.8e-3_f64 * 1.9e-3).sqrt();
        assert!((estimate - expected).abs() < 1e-9, "estimate = {estimate}");
        assert!((estimate - 5.787e-3).abs() < 1e-6);
    }

    #[test]
    fn larger_overshoots_raise_the_estimate() {
        let settle = |overshoots_us: &[u64]| {
            let mut pacer = Pacer::with_clock(ScriptedClock::new(overshoots_us));
            for _ in 0..300 {
                pacer.sleep(FRAME);
            }
            pacer.estimate()
        };

        let low = settle(&OVERSHOOTS_US);
        let high = settle(&[600, 1_000, 800, 900, 700]);

        assert!(high > low, "{high:?} <= {low:?}");
        // estimate = mean + stddev, so it never falls below the mean quantum
        assert!(high >= Duration::from_micros(1_800));
    }

    #[test]
    fn never_undersleeps_and_overshoots_by_less_than_a_quantum() {
        let mut pacer = Pacer::with_clock(ScriptedClock::new(&OVERSHOOTS_US));

        for _ in 0..300 {
            let start = pacer.clock().now();
            let pace = pacer.sleep(FRAME);
            let elapsed = pacer.clock().now() - start;

            assert!(elapsed >= FRAME, "undersleep: {elapsed:?}");
            assert!(elapsed <= FRAME + Pacer::<ScriptedClock>::QUANTUM, "oversleep: {elapsed:?}");
            assert_eq!(pace.total(), elapsed);
        }
    }

    #[test]
    fn estimate_converges_and_spinning_shrinks() {
        let mut pacer = Pacer::with_clock(ScriptedClock::new(&OVERSHOOTS_US));

        let mut estimates = Vec::new();
        let mut spins = Vec::new();
        for _ in 0..300 {
            let pace = pacer.sleep(FRAME);
            estimates.push(pacer.estimate());
            spins.push(pace.spin);
        }

        assert!(spread(&estimates[280..]) < spread(&estimates[..20]));

        let early: Duration = spins[..10].iter().sum();
        let late: Duration = spins[290..].iter().sum();
        assert!(late < early, "spin did not shrink: {early:?} -> {late:?}");

        // settles just above the true mean quantum of 1.2 ms
        let settled = pacer.estimate();
        assert!(settled > Duration::from_micros(1_200));
        assert!(settled < Duration::from_micros(1_500));
    }

    #[test]
    fn statistics_persist_across_calls() {
        let mut pacer = Pacer::with_clock(ScriptedClock::new(&OVERSHOOTS_US));
        pacer.sleep(FRAME);
        let after_one = pacer.samples();
        pacer.sleep(FRAME);
        assert!(pacer.samples() > after_one);
    }

    #[test]
    fn system_clock_never_undersleeps() {
        let mut pacer = Pacer::new();
        for millis in [0, 1, 3, 7] {
            let target = Duration::from_millis(millis);
            let start = Instant::now();
            pacer.sleep(target);
            assert!(start.elapsed() >= target);
        }
    }
}
