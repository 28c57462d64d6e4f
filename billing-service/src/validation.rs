use meter_client::ReadingSet;

use crate::engine::BillingError;

/// Pure validation of a submission against the stored baselines.
///
/// Rules:
/// - every reading must be at or above its meter's baseline.
pub fn validate_submission(previous: &ReadingSet, current: &ReadingSet) -> Result<(), BillingError> {
    for (meter, prev) in previous.iter() {
        let cur = current.get(meter);
        if cur < prev {
            return Err(BillingError::ReadingBelowBaseline {
                meter,
                previous: prev,
                current: cur,
            });
        }
    }
    Ok(())
}

/// The actual amount paid to the utility, if given, must be a finite number.
/// Zero or negative amounts are accepted and select flat-rate pricing.
pub fn validate_total_bill(actual_total_bill: Option<f64>) -> Result<(), BillingError> {
    match actual_total_bill {
        Some(total) if !total.is_finite() => Err(BillingError::InvalidInput(format!(
            "actual total bill must be a finite amount, got {total}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::MeterKey;

    #[test]
    fn submission_at_or_above_baseline_is_accepted() {
        let prev = ReadingSet::new(100, 100, 100, 60);
        assert!(validate_submission(&prev, &prev).is_ok());
        assert!(validate_submission(&prev, &ReadingSet::new(150, 120, 130, 90)).is_ok());
    }

    #[test]
    fn submission_below_baseline_names_the_meter() {
        let prev = ReadingSet::new(100, 100, 100, 60);
        let res = validate_submission(&prev, &ReadingSet::new(150, 99, 130, 90));
        assert!(matches!(
            res,
            Err(BillingError::ReadingBelowBaseline {
                meter: MeterKey::T2,
                previous: 100,
                current: 99
            })
        ));
    }

    #[test]
    fn total_bill_must_be_finite() {
        assert!(validate_total_bill(None).is_ok());
        assert!(validate_total_bill(Some(-1.0)).is_ok());
        assert!(matches!(validate_total_bill(Some(f64::NAN)), Err(BillingError::InvalidInput(_))));
        assert!(matches!(
            validate_total_bill(Some(f64::INFINITY)),
            Err(BillingError::InvalidInput(_))
        ));
    }
}
