/// Lifecycle of one counter. Anything other than `Idle` counts as animated,
/// and there is no way back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterPhase {
    Idle,
    Running,
    Finished,
    Skipped,
}

impl CounterPhase {
    pub fn is_animated(self) -> bool {
        self != CounterPhase::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    AlreadyStarted,
    Animate,
    /// Target is not an integer, render the configured text as-is.
    Skip(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    Continue(i64),
    Finished(i64),
}

pub fn parse_target(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

pub fn ease_out_cubic(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
}

pub fn progress(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 || elapsed_ms.is_nan() {
        return 1.0;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0)
}

pub fn interpolate(target: i64, eased: f64) -> i64 {
    (eased * target as f64).floor() as i64
}

/// Formats an integer with digit groups of three, e.g. `2500` -> `2,500`.
pub fn format_grouped(value: i64, separator: char) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone)]
pub struct CounterAnimation {
    raw: String,
    target: Option<i64>,
    phase: CounterPhase,
    origin: Option<f64>,
    displayed: Option<i64>,
}

impl CounterAnimation {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let target = parse_target(&raw);
        Self {
            raw,
            target,
            phase: CounterPhase::Idle,
            origin: None,
            displayed: None,
        }
    }

    pub fn phase(&self) -> CounterPhase {
        self.phase
    }

    pub fn displayed(&self) -> Option<i64> {
        self.displayed
    }

    pub fn start(&mut self) -> StartOutcome {
        if self.phase.is_animated() {
            return StartOutcome::AlreadyStarted;
        }
        match self.target {
            Some(_) => {
                self.phase = CounterPhase::Running;
                StartOutcome::Animate
            }
            None => {
                self.phase = CounterPhase::Skipped;
                StartOutcome::Skip(self.raw.clone())
            }
        }
    }

    /// Advances the animation to `timestamp_ms`. Returns `None` unless running.
    pub fn step(&mut self, timestamp_ms: f64, duration_ms: f64) -> Option<FrameStep> {
        if self.phase != CounterPhase::Running {
            return None;
        }
        let target = self.target?;
        let origin = *self.origin.get_or_insert(timestamp_ms);
        let progress = progress(timestamp_ms - origin, duration_ms);

        if progress < 1.0 {
            let value = interpolate(target, ease_out_cubic(progress));
            self.displayed = Some(value);
            Some(FrameStep::Continue(value))
        } else {
            // Land exactly on the target, whatever flooring did along the way
            self.displayed = Some(target);
            self.phase = CounterPhase::Finished;
            Some(FrameStep::Finished(target))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("2500"), Some(2500));
        assert_eq!(parse_target("  42 "), Some(42));
        assert_eq!(parse_target("-7"), Some(-7));
        assert_eq!(parse_target("N/A"), None);
        assert_eq!(parse_target(""), None);
        assert_eq!(parse_target("2,500"), None);
        assert_eq!(parse_target("12.5"), None);
        assert_eq!(parse_target("12abc"), None);
    }

    #[test]
    fn test_ease_out_cubic() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
        assert_eq!(ease_out_cubic(-0.3), 0.0);
        assert_eq!(ease_out_cubic(1.7), 1.0);
    }

    #[test]
    fn test_progress_clamps() {
        assert_eq!(progress(-50.0, 1600.0), 0.0);
        assert_eq!(progress(800.0, 1600.0), 0.5);
        assert_eq!(progress(5000.0, 1600.0), 1.0);
        assert_eq!(progress(10.0, 0.0), 1.0);
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(0, ','), "0");
        assert_eq!(format_grouped(999, ','), "999");
        assert_eq!(format_grouped(2500, ','), "2,500");
        assert_eq!(format_grouped(2187, ','), "2,187");
        assert_eq!(format_grouped(1_234_567, ','), "1,234,567");
        assert_eq!(format_grouped(-1234, ','), "-1,234");
        assert_eq!(format_grouped(100_000, ' '), "100 000");
        assert_eq!(format_grouped(i64::MIN, ','), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn test_animation_midpoint_and_exact_finish() {
        let mut counter = CounterAnimation::new("2500");
        assert_eq!(counter.start(), StartOutcome::Animate);

        assert_eq!(counter.step(1000.0, 1600.0), Some(FrameStep::Continue(0)));
        assert_eq!(counter.step(1800.0, 1600.0), Some(FrameStep::Continue(2187)));
        assert_eq!(counter.step(2600.0, 1600.0), Some(FrameStep::Finished(2500)));
        assert_eq!(counter.phase(), CounterPhase::Finished);
        assert_eq!(counter.displayed(), Some(2500));

        // nothing after completion
        assert_eq!(counter.step(2700.0, 1600.0), None);
    }

    #[test]
    fn test_values_never_decrease() {
        let mut counter = CounterAnimation::new("997");
        counter.start();
        let mut last = i64::MIN;
        let mut ts = 0.0;
        loop {
            match counter.step(ts, 1600.0) {
                Some(FrameStep::Continue(v)) => {
                    assert!(v >= last);
                    assert!(v <= 997);
                    last = v;
                }
                Some(FrameStep::Finished(v)) => {
                    assert_eq!(v, 997);
                    break;
                }
                None => panic!("counter stopped running"),
            }
            ts += 16.7;
        }
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut counter = CounterAnimation::new("10");
        assert_eq!(counter.start(), StartOutcome::Animate);
        assert_eq!(counter.start(), StartOutcome::AlreadyStarted);
        assert_eq!(counter.phase(), CounterPhase::Running);
    }

    #[test]
    fn test_malformed_target_skips() {
        let mut counter = CounterAnimation::new("N/A");
        assert_eq!(counter.start(), StartOutcome::Skip("N/A".to_string()));
        assert_eq!(counter.phase(), CounterPhase::Skipped);
        assert!(counter.phase().is_animated());
        assert_eq!(counter.step(0.0, 1600.0), None);
        assert_eq!(counter.start(), StartOutcome::AlreadyStarted);
    }

    #[test]
    fn test_idle_counter_ignores_frames() {
        let mut counter = CounterAnimation::new("10");
        assert_eq!(counter.step(0.0, 1600.0), None);
        assert_eq!(counter.phase(), CounterPhase::Idle);
    }
}
