//! Edge-triggered threshold evaluation.

use hardhat_types::Condition;

use crate::config::SensorThreshold;

/// A change of condition that must be announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Condition,
    pub to: Condition,
}

/// Classify a value against its thresholds.
///
/// The critical check wins when both match, which only happens for
/// single-threshold sensors at exactly the threshold.
pub fn classify(value: f64, threshold: SensorThreshold) -> Condition {
    if value >= threshold.critical {
        Condition::Critical
    } else if value <= threshold.normal {
        Condition::Normal
    } else {
        Condition::None
    }
}

/// Decide whether a new value changes the stream's condition.
///
/// Absent and non-finite values never evaluate. A value in the dead band, or
/// one whose condition equals the previous flag, yields no transition.
pub fn evaluate(
    value: Option<f64>,
    threshold: SensorThreshold,
    previous: Condition,
) -> Option<Transition> {
    let value = value.filter(|v| v.is_finite())?;
    match classify(value, threshold) {
        Condition::None => None,
        condition if condition == previous => None,
        condition => Some(Transition {
            from: previous,
            to: condition,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: SensorThreshold = SensorThreshold::new(40.0, 20.0);

    /// Run a sequence through the evaluator, carrying the flag forward.
    fn run(values: &[f64]) -> Vec<Condition> {
        let mut flag = Condition::None;
        let mut fired = Vec::new();
        for &v in values {
            if let Some(t) = evaluate(Some(v), T, flag) {
                flag = t.to;
                fired.push(t.to);
            }
        }
        fired
    }

    #[test]
    fn repeated_critical_fires_once() {
        assert_eq!(run(&[41.0, 42.0, 43.0]), vec![Condition::Critical]);
    }

    #[test]
    fn recovery_fires_once() {
        assert_eq!(
            run(&[45.0, 10.0, 10.0, 11.0, 9.0]),
            vec![Condition::Critical, Condition::Normal]
        );
    }

    #[test]
    fn dead_band_never_fires() {
        for previous in [Condition::None, Condition::Normal, Condition::Critical] {
            assert!(evaluate(Some(25.0), T, previous).is_none());
        }
    }

    #[test]
    fn first_critical_reading_fires() {
        let t = evaluate(Some(40.0), T, Condition::None).unwrap();
        assert_eq!(t.from, Condition::None);
        assert_eq!(t.to, Condition::Critical);
    }

    #[test]
    fn dead_band_does_not_reset_flag() {
        // critical -> dead band -> critical stays a single alert
        assert_eq!(run(&[41.0, 30.0, 41.0]), vec![Condition::Critical]);
    }

    #[test]
    fn flapping_across_both_thresholds_alerts_each_change() {
        assert_eq!(
            run(&[41.0, 19.0, 41.0, 19.0]),
            vec![
                Condition::Critical,
                Condition::Normal,
                Condition::Critical,
                Condition::Normal
            ]
        );
    }

    #[test]
    fn absent_values_do_not_evaluate() {
        assert!(evaluate(None, T, Condition::None).is_none());
        assert!(evaluate(Some(f64::NAN), T, Condition::Normal).is_none());
        assert!(evaluate(Some(f64::INFINITY), T, Condition::None).is_none());
    }

    #[test]
    fn single_threshold_boundary_is_critical() {
        let single = SensorThreshold::single(300.0);
        assert_eq!(classify(300.0, single), Condition::Critical);
        assert_eq!(classify(299.9, single), Condition::Normal);
    }
}
