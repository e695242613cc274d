#![no_std]

//! RGB indicator effects (pure logic).
//!
//! Kept in `libs/` so it can be covered by host-side unit tests; the firmware
//! only maps [`Rgb`] channel states onto GPIO/PWM.

/// On/off state of the three LED channels.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(false, false, false);

    pub const fn new(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }

    pub const fn is_off(&self) -> bool {
        !self.red && !self.green && !self.blue
    }
}

/// Colors the single RGB LED can show by mixing channels at full duty.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
    White,
    Yellow,
    Purple,
    Cyan,
}

impl Color {
    pub const fn channels(self) -> Rgb {
        match self {
            Color::Red => Rgb::new(true, false, false),
            Color::Green => Rgb::new(false, true, false),
            Color::Blue => Rgb::new(false, false, true),
            Color::White => Rgb::new(true, true, true),
            Color::Yellow => Rgb::new(true, true, false),
            Color::Purple => Rgb::new(true, false, true),
            Color::Cyan => Rgb::new(false, true, true),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::White => "white",
            Color::Yellow => "yellow",
            Color::Purple => "purple",
            Color::Cyan => "cyan",
        }
    }
}

/// Blink timing used by every outcome pattern.
pub const BLINK_ON_MS: u32 = 250;
pub const BLINK_OFF_MS: u32 = 250;

/// `times` flashes of one color, each `on_ms` lit then `off_ms` dark.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlinkPattern {
    pub color: Color,
    pub times: u8,
    pub on_ms: u32,
    pub off_ms: u32,
}

impl BlinkPattern {
    pub const fn new(color: Color, times: u8) -> Self {
        Self {
            color,
            times,
            on_ms: BLINK_ON_MS,
            off_ms: BLINK_OFF_MS,
        }
    }

    pub const fn duration_ms(&self) -> u32 {
        (self.on_ms + self.off_ms) * self.times as u32
    }

    /// Channel state `elapsed_ms` after the pattern started; dark once done.
    pub fn frame_at(&self, elapsed_ms: u32) -> Rgb {
        let period = self.on_ms + self.off_ms;
        if period == 0 || elapsed_ms >= self.duration_ms() {
            return Rgb::OFF;
        }
        if elapsed_ms % period < self.on_ms {
            self.color.channels()
        } else {
            Rgb::OFF
        }
    }
}

/// Idle "waiting for a tag" pulse.
pub const IDLE_PULSE_COLOR: Color = Color::Blue;
pub const IDLE_PULSE_PERIOD_MS: u32 = 2_000;

/// Brightness (logical %) of the idle pulse at `now_ms`.
pub fn idle_pulse_pct(now_ms: u32) -> u8 {
    breathing::triangle_breathe_pct(now_ms, IDLE_PULSE_PERIOD_MS, 100)
}

pub mod breathing {
    /// Triangle-wave brightness in logical percent: 0 at the period edges,
    /// `max_brightness_pct` (clamped to 100) at the midpoint. `now_ms` may
    /// wrap; only its phase within `period_ms` matters.
    #[inline]
    pub fn triangle_breathe_pct(now_ms: u32, period_ms: u32, max_brightness_pct: u8) -> u8 {
        let peak = u64::from(max_brightness_pct.min(100));
        if peak == 0 || period_ms < 2 {
            return 0;
        }

        // u64 so `peak * distance` cannot overflow for long periods.
        let period = u64::from(period_ms);
        let phase = u64::from(now_ms) % period;
        let distance = phase.min(period - phase);
        ((peak * distance) / (period / 2)).min(peak) as u8
    }

    /// Scale a logical percentage to an 8-bit PWM duty.
    #[inline]
    pub fn pct_to_duty(pct: u8) -> u8 {
        ((pct.min(100) as u16 * 255) / 100) as u8
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests {
    use super::breathing::{pct_to_duty, triangle_breathe_pct};
    use super::*;

    #[test]
    fn mixed_colors_light_expected_channels() {
        assert_eq!(Color::White.channels(), Rgb::new(true, true, true));
        assert_eq!(Color::Purple.channels(), Rgb::new(true, false, true));
        assert_eq!(Color::Cyan.channels(), Rgb::new(false, true, true));
        assert!(!Color::Yellow.channels().blue);
    }

    #[test]
    fn blink_pattern_alternates_then_goes_dark() {
        let p = BlinkPattern::new(Color::White, 4);
        assert_eq!(p.duration_ms(), 2_000);
        assert_eq!(p.frame_at(0), Color::White.channels());
        assert_eq!(p.frame_at(249), Color::White.channels());
        assert!(p.frame_at(250).is_off());
        assert_eq!(p.frame_at(1_500), Color::White.channels());
        assert!(p.frame_at(1_750).is_off());
        assert!(p.frame_at(1_999).is_off());
        assert!(p.frame_at(2_000).is_off());
    }

    #[test]
    fn zero_times_pattern_is_dark() {
        let p = BlinkPattern::new(Color::Red, 0);
        assert_eq!(p.duration_ms(), 0);
        assert!(p.frame_at(0).is_off());
    }

    #[test]
    fn idle_pulse_peaks_mid_period() {
        assert_eq!(idle_pulse_pct(0), 0);
        assert_eq!(idle_pulse_pct(IDLE_PULSE_PERIOD_MS / 2), 100);
        assert_eq!(idle_pulse_pct(IDLE_PULSE_PERIOD_MS), 0);
    }

    #[test]
    fn idle_pulse_rises_then_falls_each_period() {
        let quarter = IDLE_PULSE_PERIOD_MS / 4;
        assert_eq!(idle_pulse_pct(quarter), 50);
        assert_eq!(idle_pulse_pct(3 * quarter), 50);
        // the next period repeats the same curve
        assert_eq!(idle_pulse_pct(IDLE_PULSE_PERIOD_MS + quarter), 50);

        let mut last = 0;
        for t in (0..=IDLE_PULSE_PERIOD_MS / 2).step_by(100) {
            let pct = idle_pulse_pct(t);
            assert!(pct >= last);
            last = pct;
        }
        for t in (IDLE_PULSE_PERIOD_MS / 2..=IDLE_PULSE_PERIOD_MS).step_by(100) {
            let pct = idle_pulse_pct(t);
            assert!(pct <= last);
            last = pct;
        }
    }

    #[test]
    fn triangle_breathe_handles_degenerate_inputs() {
        assert_eq!(triangle_breathe_pct(123, 0, 50), 0);
        assert_eq!(triangle_breathe_pct(123, 1, 50), 0);
        assert_eq!(triangle_breathe_pct(500, 1000, 150), 100);
        assert_eq!(triangle_breathe_pct(u32::MAX / 2, u32::MAX, 100), 100);
    }

    #[test]
    fn duty_scaling_saturates() {
        assert_eq!(pct_to_duty(0), 0);
        assert_eq!(pct_to_duty(100), 255);
        assert_eq!(pct_to_duty(200), 255);
        assert_eq!(pct_to_duty(50), 127);
    }
}
