use std::time::{Duration, Instant};

/// Drives the skinning shader's time uniform.
///
/// Time is accumulated in milliseconds from per-frame deltas, so pausing the
/// event loop never makes the animation jump.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    last_tick: Option<Instant>,
    elapsed_ms: f64,
    pub frames_per_second: f32,
}

/// Two consecutive palette slots and how far playback is between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub frame_a: u32,
    pub frame_b: u32,
    pub blend: f32,
}

impl FrameSample {
    pub const FIRST: FrameSample = FrameSample {
        frame_a: 0,
        frame_b: 0,
        blend: 0.0,
    };
}

impl AnimationClock {
    pub fn new(frames_per_second: f32) -> Self {
        Self {
            last_tick: None,
            elapsed_ms: 0.0,
            frames_per_second,
        }
    }

    /// Advances by the wall time since the previous tick. The first tick only
    /// starts the clock.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_tick = Some(now);
        self.advance(delta);
        delta
    }

    pub fn advance(&mut self, delta: Duration) {
        self.elapsed_ms += delta.as_secs_f64() * 1000.0;
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn sample(&self, frame_count: usize) -> FrameSample {
        sample_frames(self.elapsed_ms, frame_count, self.frames_per_second)
    }
}

/// Loops over `frame_count` palette slots at `fps`, blending each slot into
/// the next one. The last slot blends back into the first.
pub fn sample_frames(elapsed_ms: f64, frame_count: usize, fps: f32) -> FrameSample {
    if frame_count < 2 || !(fps > 0.0) {
        return FrameSample::FIRST;
    }
    let position = (elapsed_ms * fps as f64 / 1000.0).rem_euclid(frame_count as f64);
    let frame_a = (position.floor() as usize).min(frame_count - 1);
    let frame_b = (frame_a + 1) % frame_count;
    FrameSample {
        frame_a: frame_a as u32,
        frame_b: frame_b as u32,
        blend: (position - frame_a as f64) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_accumulates_in_milliseconds() {
        let mut clock = AnimationClock::new(30.0);
        clock.advance(Duration::from_millis(16));
        clock.advance(Duration::from_millis(17));
        assert!((clock.elapsed_ms() - 33.0).abs() < 1e-9);
    }

    #[test]
    fn first_tick_starts_at_zero() {
        let mut clock = AnimationClock::new(30.0);
        assert_eq!(clock.tick(), Duration::ZERO);
        assert_eq!(clock.elapsed_ms(), 0.0);
    }

    #[test]
    fn samples_blend_between_neighbours() {
        // 10 fps: one frame every 100ms
        let sample = sample_frames(250.0, 4, 10.0);
        assert_eq!((sample.frame_a, sample.frame_b), (2, 3));
        assert!((sample.blend - 0.5).abs() < 1e-5);
    }

    #[test]
    fn playback_loops() {
        let sample = sample_frames(350.0, 4, 10.0);
        assert_eq!((sample.frame_a, sample.frame_b), (3, 0));

        let wrapped = sample_frames(450.0, 4, 10.0);
        assert_eq!((wrapped.frame_a, wrapped.frame_b), (0, 1));
        assert!((wrapped.blend - 0.5).abs() < 1e-5);
    }

    #[test]
    fn single_frame_is_static() {
        assert_eq!(sample_frames(12345.0, 1, 30.0), FrameSample::FIRST);
        assert_eq!(sample_frames(12345.0, 0, 30.0), FrameSample::FIRST);
        assert_eq!(sample_frames(12345.0, 10, 0.0), FrameSample::FIRST);
    }
}
