use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Converts whole milliseconds to clock nanoseconds.
pub const fn ms(ms: u64) -> u64 {
    ms * 1_000_000
}

/// Monotonic session clock. Timestamps are nanoseconds since the clock's epoch.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> u64;
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration);
}

/// Wall clock anchored at creation, with platform-specific short sleeps
#[derive(Debug, Clone)]
pub struct HighPrecisionClock {
    pub start: Instant,
}

impl Clock for HighPrecisionClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        self.spin_sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    // Coarse OS sleep for the bulk, spin for the last 100 µs.
    #[cfg(not(target_os = "linux"))]
    fn spin_sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let spin = Duration::from_micros(100);
        if duration > spin {
            std::thread::sleep(duration - spin);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

impl Default for HighPrecisionClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ns: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(ns)),
        }
    }

    /// Moves the clock to `ns`. Never moves backwards.
    pub fn set(&self, ns: u64) {
        self.now.fetch_max(ns, Ordering::SeqCst);
    }

    pub fn advance(&self, d: Duration) {
        self.now.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
    fn sleep(&self, d: Duration) {
        self.advance(d)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JitterStats {
    pub samples: usize,
    pub mean_ns: f64,
    pub jitter_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
}

/// Rolling record of how late delayed work actually ran
#[derive(Debug, Clone)]
pub struct JitterLog {
    pub samples: Vec<Duration>,
    pub max_samples: usize,
}

impl JitterLog {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples.min(1024)),
            max_samples,
        }
    }

    pub fn record(&mut self, d: Duration) {
        if self.max_samples == 0 {
            return;
        }
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push(d);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn stats(&self) -> JitterStats {
        let times: Vec<f64> = self.samples.iter().map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return JitterStats {
                samples: 0,
                mean_ns: 0.0,
                jitter_ns: 0.0,
                min_ns: 0.0,
                max_ns: 0.0,
            };
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        JitterStats {
            samples: times.len(),
            mean_ns: avg,
            jitter_ns: var.sqrt(),
            min_ns: times.iter().cloned().fold(f64::INFINITY, f64::min),
            max_ns: times.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl Default for JitterLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_and_monotonic() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.set(ms(5));
        assert_eq!(clock.now(), ms(5));
        handle.set(ms(2));
        assert_eq!(clock.now(), ms(5));
        clock.sleep(Duration::from_millis(1));
        assert_eq!(handle.now(), ms(6));
        assert_eq!(clock.elapsed(ms(4)), Duration::from_millis(2));
    }

    #[test]
    fn high_precision_clock_does_not_go_backwards() {
        let clock = HighPrecisionClock::new();
        let a = clock.now();
        clock.sleep(Duration::from_micros(200));
        let b = clock.now();
        assert!(b >= a + 200_000);
    }

    #[test]
    fn jitter_log_drops_oldest_and_reports_spread() {
        let mut log = JitterLog::new(3);
        for us in [100, 200, 300, 400] {
            log.record(Duration::from_micros(us));
        }
        let stats = log.stats();
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.min_ns, 200_000.0);
        assert_eq!(stats.max_ns, 400_000.0);
        assert_eq!(stats.mean_ns, 300_000.0);
        assert!(stats.jitter_ns > 0.0);
    }
}
