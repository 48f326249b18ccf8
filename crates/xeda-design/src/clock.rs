use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A design's declared clock: just a port name (spec §3 `rtl.clocks:
/// name->port`). Grounded on `original_source/src/xeda/design.py`'s
/// `Clock(port: Optional[str])`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub port: Option<String>,
}

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("could not parse '{0}' as a time or frequency value (expected e.g. \"1.5ns\" or \"200MHz\")")]
    UnparsableUnit(String),
    #[error("duty_cycle must be in (0, 1), got {0}")]
    InvalidDutyCycle(f64),
    #[error("clock port '{0}' does not exist in design.rtl.clocks")]
    UnknownPort(String),
}

/// A fully specified clock used by synthesis-flow settings (spec §3).
///
/// Invariant: `freq_mhz * period_ns == 1000`, reconciled at construction
/// from whichever of the two is supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalClock {
    pub name: String,
    pub port: String,
    pub period_ns: f64,
    pub freq_mhz: f64,
    pub rise_ns: f64,
    pub duty_cycle: f64,
    pub uncertainty_ns: Option<f64>,
    pub skew_ns: Option<f64>,
}

static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([0-9]*\.?[0-9]+)\s*(ps|ns|us|ms|s|hz|khz|mhz|ghz)?\s*$").unwrap()
});

/// Parse a human-readable time or frequency literal ("1.5ns", "200MHz",
/// or a bare number treated as nanoseconds) into (is_frequency, value_in_base_unit).
fn parse_unit(raw: &str) -> Result<(bool, f64), ClockError> {
    let caps = UNIT_RE
        .captures(raw)
        .ok_or_else(|| ClockError::UnparsableUnit(raw.to_string()))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| ClockError::UnparsableUnit(raw.to_string()))?;
    let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
    let (is_freq, scaled) = match unit.as_deref() {
        None | Some("ns") => (false, value),
        Some("ps") => (false, value / 1000.0),
        Some("us") => (false, value * 1000.0),
        Some("ms") => (false, value * 1_000_000.0),
        Some("s") => (false, value * 1_000_000_000.0),
        Some("hz") => (true, value / 1_000_000.0),
        Some("khz") => (true, value / 1_000.0),
        Some("mhz") => (true, value),
        Some("ghz") => (true, value * 1_000.0),
        _ => return Err(ClockError::UnparsableUnit(raw.to_string())),
    };
    Ok((is_freq, scaled))
}

impl PhysicalClock {
    /// Build from either a period or a frequency literal (at least one
    /// required); the other is derived so that `freq_mhz * period_ns == 1000`
    /// holds exactly.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        port: impl Into<String>,
        period: Option<&str>,
        freq: Option<&str>,
        rise: Option<&str>,
        duty_cycle: f64,
        uncertainty_ns: Option<f64>,
        skew_ns: Option<f64>,
    ) -> Result<Self, ClockError> {
        if !(0.0 < duty_cycle && duty_cycle < 1.0) {
            return Err(ClockError::InvalidDutyCycle(duty_cycle));
        }
        let (period_ns, freq_mhz) = match (period, freq) {
            (Some(p), _) => {
                let (_, ns) = parse_unit(p)?;
                (ns, 1000.0 / ns)
            }
            (None, Some(f)) => {
                let (_, mhz) = parse_unit(f)?;
                (1000.0 / mhz, mhz)
            }
            (None, None) => {
                return Err(ClockError::UnparsableUnit(
                    "neither period nor frequency given".to_string(),
                ))
            }
        };
        let rise_ns = match rise {
            Some(r) => parse_unit(r)?.1,
            None => 0.0,
        };
        Ok(Self {
            name: name.into(),
            port: port.into(),
            period_ns,
            freq_mhz,
            rise_ns,
            duty_cycle,
            uncertainty_ns,
            skew_ns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_freq_from_period() {
        let c = PhysicalClock::new("main", "clk", Some("10ns"), None, None, 0.5, None, None)
            .unwrap();
        assert!((c.freq_mhz - 100.0).abs() < 1e-9);
        assert!((c.period_ns * c.freq_mhz - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn derives_period_from_freq() {
        let c = PhysicalClock::new("main", "clk", None, Some("200MHz"), None, 0.5, None, None)
            .unwrap();
        assert!((c.period_ns - 5.0).abs() < 1e-9);
        assert!((c.period_ns * c.freq_mhz - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_duty_cycle() {
        let err =
            PhysicalClock::new("main", "clk", Some("10ns"), None, None, 1.5, None, None)
                .unwrap_err();
        assert!(matches!(err, ClockError::InvalidDutyCycle(_)));
    }

    #[test]
    fn rejects_unparsable_unit() {
        assert!(parse_unit("banana").is_err());
    }

    #[test]
    fn bare_number_defaults_to_nanoseconds() {
        let (is_freq, v) = parse_unit("10").unwrap();
        assert!(!is_freq);
        assert!((v - 10.0).abs() < 1e-9);
    }
}
