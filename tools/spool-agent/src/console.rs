use opentag_led_effects::breathing::pct_to_duty;
use opentag_led_effects::{IDLE_PULSE_COLOR, IDLE_PULSE_PERIOD_MS, idle_pulse_pct};
use opentag_spool_sync::{Indicator, Outcome, Scale};

/// Scale stand-in that always reports the weight given on the command line.
pub struct FixedWeight(pub u32);

impl Scale for FixedWeight {
    async fn read_weight(&mut self) -> u32 {
        self.0
    }
}

/// Prints the pattern the LED would show.
#[derive(Default)]
pub struct ConsoleIndicator;

pub fn describe(outcome: Outcome) -> String {
    let pattern = outcome.pattern();
    format!(
        "{} ({} x{}, {} ms)",
        outcome.as_str(),
        pattern.color.name(),
        pattern.times,
        pattern.duration_ms()
    )
}

/// The "waiting for a tag" pulse shown between cycles.
pub fn describe_idle() -> String {
    let peak = idle_pulse_pct(IDLE_PULSE_PERIOD_MS / 2);
    format!(
        "waiting ({} pulse, {} ms period, peak duty {})",
        IDLE_PULSE_COLOR.name(),
        IDLE_PULSE_PERIOD_MS,
        pct_to_duty(peak)
    )
}

impl Indicator for ConsoleIndicator {
    async fn signal(&mut self, outcome: Outcome) {
        println!("led: {}", describe(outcome));
    }
}
