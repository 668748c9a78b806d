//! Probe run configuration

use core::str::FromStr;

use thiserror_no_std::Error;

use crate::address::DeviceAddress;

/// What the harness does after printing a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run; the entry point idles forever
    #[default]
    Halt,
    /// Abandon the failing sensor and continue with the next one
    SkipSensor,
}

/// Error returned when a failure policy name is not recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown failure policy (expected \"halt\" or \"skip\")")]
pub struct ParsePolicyError;

impl FromStr for FailurePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("halt") {
            Ok(Self::Halt)
        } else if s.eq_ignore_ascii_case("skip") || s.eq_ignore_ascii_case("skip-sensor") {
            Ok(Self::SkipSensor)
        } else {
            Err(ParsePolicyError)
        }
    }
}

/// Sensors the probe knows how to exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// MCP9808
    Temperature,
    /// PCA9535A
    IoExtender,
    /// MAX44009
    Light,
    /// LPS25H
    Pressure,
    /// MPU-6050
    MotionTracker,
    /// LIS3DH
    Accelerometer,
}

impl SensorKind {
    /// Bus address of the sensor
    pub const fn address(self) -> DeviceAddress {
        match self {
            Self::Temperature => DeviceAddress::TEMPERATURE_SENSOR,
            Self::IoExtender => DeviceAddress::IO_EXTENDER,
            Self::Light => DeviceAddress::LIGHT_SENSOR,
            Self::Pressure => DeviceAddress::PRESSURE_SENSOR,
            Self::MotionTracker => DeviceAddress::MOTION_TRACKER,
            Self::Accelerometer => DeviceAddress::ACCELEROMETER,
        }
    }

    /// Section heading printed before the sensor's output
    pub const fn title(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::IoExtender => "IO Extender",
            Self::Light => "Light sensor",
            Self::Pressure => "Pressure sensor",
            Self::MotionTracker => "Motion tracking",
            Self::Accelerometer => "Accelerometer",
        }
    }
}

/// Every sensor, in the order the board is brought up.
pub const DEFAULT_SEQUENCE: &[SensorKind] = &[
    SensorKind::Temperature,
    SensorKind::IoExtender,
    SensorKind::Light,
    SensorKind::Pressure,
    SensorKind::MotionTracker,
    SensorKind::Accelerometer,
];

/// Harness configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Reaction to a fault
    pub failure_policy: FailurePolicy,
    /// Sensors to exercise, in order
    pub sequence: &'static [SensorKind],
    /// Wait for a temperature or pressure conversion
    pub conversion_delay_ms: u32,
    /// How long LED0 on the IO extender stays lit
    pub led_blink_ms: u32,
    /// Settling time after configuring the motion tracker
    pub motion_settle_ms: u32,
    /// Whether the run ends in the interrupt poll loop
    pub poll_interrupts: bool,
}

impl ProbeConfig {
    /// Defaults: halt on failure, all sensors, no poll loop.
    pub const fn new() -> Self {
        Self {
            failure_policy: FailurePolicy::Halt,
            sequence: DEFAULT_SEQUENCE,
            conversion_delay_ms: 250,
            led_blink_ms: 100,
            motion_settle_ms: 100,
            poll_interrupts: false,
        }
    }

    /// Set the failure policy.
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the sensor sequence.
    pub const fn with_sequence(mut self, sequence: &'static [SensorKind]) -> Self {
        self.sequence = sequence;
        self
    }

    /// Enable or disable the interrupt poll loop.
    pub const fn with_poll_interrupts(mut self, poll: bool) -> Self {
        self.poll_interrupts = poll;
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        assert_eq!("halt".parse::<FailurePolicy>(), Ok(FailurePolicy::Halt));
        assert_eq!(" SKIP ".parse::<FailurePolicy>(), Ok(FailurePolicy::SkipSensor));
        assert_eq!("skip-sensor".parse::<FailurePolicy>(), Ok(FailurePolicy::SkipSensor));
        assert_eq!("retry".parse::<FailurePolicy>(), Err(ParsePolicyError));
    }

    #[test]
    fn test_default_halts() {
        let config = ProbeConfig::default();
        assert_eq!(config.failure_policy, FailurePolicy::Halt);
        assert_eq!(config.sequence.len(), 6);
        assert!(!config.poll_interrupts);
    }

    #[test]
    fn test_sensor_addresses() {
        assert_eq!(SensorKind::Accelerometer.address().get(), 0x18);
        assert_eq!(SensorKind::Pressure.address().get(), 0x5C);
    }
}
