//! Gate envelope: a one-pole level follower driving a gain state machine
//! with hold and linear attack/release ramps.

/// One-pole envelope follower on the rectified signal:
/// `envelope = rectified + (envelope - rectified) * coeff`.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    coeff: f64,
    value: f64,
}

impl EnvelopeFollower {
    pub fn new(time_seconds: f64, sample_rate: f64) -> Self {
        let coeff = if time_seconds <= 0.0 {
            0.0
        } else {
            (-1.0 / (time_seconds * sample_rate)).exp()
        };
        EnvelopeFollower { coeff, value: 0.0 }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let rectified = input.abs();
        self.value = rectified + (self.value - rectified) * self.coeff;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Gate stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Open,
    Hold,
    Closing,
    Closed,
}

/// Gain state machine of a noise gate.
///
/// Opens (ramping up linearly over `attack`) whenever the detected level
/// exceeds the threshold, stays open for `hold` after it falls back, then
/// ramps down linearly over `release` to the `floor` gain.
#[derive(Debug, Clone)]
pub struct GateEnvelope {
    threshold: f64,
    floor: f64,
    hold_samples: usize,
    attack_step: f64,
    release_step: f64,
    hold_counter: usize,
    gain: f64,
    stage: GateStage,
}

impl GateEnvelope {
    /// `threshold` and `floor` are linear; times are in seconds.
    pub fn new(
        threshold: f64,
        floor: f64,
        attack: f64,
        hold: f64,
        release: f64,
        sample_rate: f64,
    ) -> Self {
        let floor = floor.clamp(0.0, 1.0);
        let span = 1.0 - floor;
        let step = |seconds: f64| {
            let n = (seconds * sample_rate).round();
            if n < 1.0 { span.max(f64::MIN_POSITIVE) } else { span / n }
        };
        let hold_samples = (hold.max(0.0) * sample_rate).round() as usize;
        GateEnvelope {
            threshold,
            floor,
            hold_samples,
            attack_step: step(attack),
            release_step: step(release),
            // Starts open so audio at the region start is not chopped.
            hold_counter: hold_samples,
            gain: 1.0,
            stage: GateStage::Open,
        }
    }

    /// Advance one sample given the detected level; returns the gain.
    #[inline]
    pub fn next_gain(&mut self, level: f64) -> f64 {
        let target = if level > self.threshold {
            self.hold_counter = self.hold_samples;
            self.stage = GateStage::Open;
            1.0
        } else if self.hold_counter > 0 {
            self.hold_counter -= 1;
            self.stage = GateStage::Hold;
            1.0
        } else {
            self.floor
        };

        if self.gain < target {
            self.gain = (self.gain + self.attack_step).min(target);
        } else if self.gain > target {
            self.gain = (self.gain - self.release_step).max(target);
            self.stage = GateStage::Closing;
        } else if target == self.floor {
            self.stage = GateStage::Closed;
        }
        self.gain
    }

    pub fn stage(&self) -> GateStage {
        self.stage
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follower_tracks_level() {
        let mut f = EnvelopeFollower::new(0.002, 44100.0);
        for _ in 0..2000 {
            f.process(-0.5);
        }
        assert!((f.value() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stays_open_above_threshold() {
        let mut g = GateEnvelope::new(0.01, 0.001, 0.001, 0.01, 0.1, 44100.0);
        for _ in 0..10_000 {
            assert_eq!(g.next_gain(0.5), 1.0);
        }
        assert_eq!(g.stage(), GateStage::Open);
    }

    #[test]
    fn closes_to_floor_after_hold_and_release() {
        let sr = 44100.0;
        let mut g = GateEnvelope::new(0.01, 0.001, 0.001, 0.01, 0.1, sr);
        let hold = (0.01 * sr) as usize;
        for _ in 0..hold {
            assert_eq!(g.next_gain(0.0), 1.0);
        }
        let release = (0.1 * sr) as usize;
        let mut last = 1.0;
        for _ in 0..release {
            let gain = g.next_gain(0.0);
            assert!(gain <= last);
            last = gain;
        }
        assert!((g.gain() - 0.001).abs() < 1e-9, "gain {}", g.gain());
        g.next_gain(0.0);
        g.next_gain(0.0);
        assert_eq!(g.stage(), GateStage::Closed);
        assert!(g.gain() > 0.0);
    }

    #[test]
    fn release_is_linear() {
        let mut g = GateEnvelope::new(0.5, 0.0, 0.0, 0.0, 1.0, 100.0);
        let a = g.next_gain(0.0);
        let b = g.next_gain(0.0);
        let c = g.next_gain(0.0);
        assert!(((a - b) - (b - c)).abs() < 1e-12);
        assert!((1.0 - a - 0.01).abs() < 1e-12);
    }

    #[test]
    fn reopens_with_attack_ramp() {
        let mut g = GateEnvelope::new(0.1, 0.0, 0.01, 0.0, 0.0, 1000.0);
        g.next_gain(0.0);
        assert_eq!(g.gain(), 0.0);
        let first = g.next_gain(1.0);
        assert!((first - 0.1).abs() < 1e-12);
        for _ in 0..10 {
            g.next_gain(1.0);
        }
        assert_eq!(g.gain(), 1.0);
    }
}
