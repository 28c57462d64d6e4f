use std::collections::BTreeMap;

use meter_client::{MeterKey, ReadingSet};
use serde::Serialize;

use super::BillingError;
use crate::validation::{validate_submission, validate_total_bill};

/// Flat rate charged per unit when no actual bill is supplied (₹10/unit).
pub const COST_PER_UNIT: f64 = 10.0;

/// Unrounded consumption for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    /// Own sub-meter delta per tenant.
    pub tenant_units: BTreeMap<MeterKey, f64>,
    pub water_units: f64,
    /// `water_units / 3`, charged to every tenant.
    pub water_share: f64,
    /// `tenant_units + water_share` per tenant.
    pub final_units: BTreeMap<MeterKey, f64>,
}

impl Allocation {
    pub fn total_units(&self) -> f64 {
        self.final_units.values().sum()
    }
}

/// Split the water pump's consumption equally across the three tenants.
pub fn allocate_units(previous: &ReadingSet, current: &ReadingSet) -> Result<Allocation, BillingError> {
    validate_submission(previous, current)?;

    let water_units = (current.water - previous.water) as f64;
    let water_share = water_units / MeterKey::TENANTS.len() as f64;

    let mut tenant_units = BTreeMap::new();
    let mut final_units = BTreeMap::new();
    for tenant in MeterKey::TENANTS {
        let own = (current.get(tenant) - previous.get(tenant)) as f64;
        tenant_units.insert(tenant, own);
        final_units.insert(tenant, own + water_share);
    }

    Ok(Allocation {
        tenant_units,
        water_units,
        water_share,
        final_units,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Pricing {
    FlatRate { cost_per_unit: f64 },
    /// The real amount paid to the utility, shared by usage.
    Proportional { total_bill: f64 },
}

impl Pricing {
    /// Proportional when a positive actual bill is given, flat rate otherwise.
    pub fn select(actual_total_bill: Option<f64>, cost_per_unit: f64) -> Result<Self, BillingError> {
        validate_total_bill(actual_total_bill)?;
        Ok(match actual_total_bill {
            Some(total_bill) if total_bill > 0.0 => Pricing::Proportional { total_bill },
            _ => Pricing::FlatRate { cost_per_unit },
        })
    }

    /// Unrounded amount due per tenant.
    ///
    /// In proportional mode with no consumption at all, the bill is split
    /// equally, so the amounts still add up to the bill.
    pub fn amounts(&self, allocation: &Allocation) -> BTreeMap<MeterKey, f64> {
        match *self {
            Pricing::FlatRate { cost_per_unit } => allocation
                .final_units
                .iter()
                .map(|(&t, &units)| (t, units * cost_per_unit))
                .collect(),
            Pricing::Proportional { total_bill } => {
                let total_units = allocation.total_units();
                let tenants = allocation.final_units.len() as f64;
                allocation
                    .final_units
                    .iter()
                    .map(|(&t, &units)| {
                        let amount = if total_units > 0.0 {
                            total_bill * units / total_units
                        } else {
                            total_bill / tenants
                        };
                        (t, amount)
                    })
                    .collect()
            }
        }
    }
}

/// Round to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn water_share_is_split_three_ways_before_rounding() {
        let prev = ReadingSet::new(0, 0, 0, 0);
        let cur = ReadingSet::new(5, 0, 2, 10);
        let a = allocate_units(&prev, &cur).unwrap();

        assert!(approx(a.water_share, 10.0 / 3.0));
        assert!(approx(a.final_units[&MeterKey::T1], 5.0 + 10.0 / 3.0));
        assert!(approx(a.final_units[&MeterKey::T2], 10.0 / 3.0));
        assert!(approx(a.final_units[&MeterKey::T3], 2.0 + 10.0 / 3.0));
        assert!(!a.final_units.contains_key(&MeterKey::Water));
    }

    #[test]
    fn final_units_follow_delta_plus_share_for_several_submissions() {
        let cases = [
            (ReadingSet::new(0, 0, 0, 0), ReadingSet::new(0, 0, 0, 0)),
            (ReadingSet::new(10, 20, 30, 40), ReadingSet::new(11, 25, 30, 41)),
            (ReadingSet::new(999, 5, 12345, 7), ReadingSet::new(1500, 5, 20000, 1007)),
        ];
        for (prev, cur) in cases {
            let a = allocate_units(&prev, &cur).unwrap();
            let share = (cur.water - prev.water) as f64 / 3.0;
            for t in MeterKey::TENANTS {
                let expected = (cur.get(t) - prev.get(t)) as f64 + share;
                assert!(approx(a.final_units[&t], expected), "{t}: {prev:?} -> {cur:?}");
            }
        }
    }

    #[test]
    fn negative_delta_is_rejected() {
        let res = allocate_units(&ReadingSet::new(10, 10, 10, 10), &ReadingSet::new(10, 10, 10, 9));
        assert!(matches!(
            res,
            Err(BillingError::ReadingBelowBaseline { meter: MeterKey::Water, .. })
        ));
    }

    #[test]
    fn non_positive_total_selects_flat_rate() {
        assert_eq!(
            Pricing::select(None, COST_PER_UNIT).unwrap(),
            Pricing::FlatRate { cost_per_unit: 10.0 }
        );
        assert_eq!(
            Pricing::select(Some(0.0), COST_PER_UNIT).unwrap(),
            Pricing::FlatRate { cost_per_unit: 10.0 }
        );
        assert_eq!(
            Pricing::select(Some(-250.0), COST_PER_UNIT).unwrap(),
            Pricing::FlatRate { cost_per_unit: 10.0 }
        );
        assert_eq!(
            Pricing::select(Some(1300.0), COST_PER_UNIT).unwrap(),
            Pricing::Proportional { total_bill: 1300.0 }
        );
    }

    #[test]
    fn flat_rate_sum_matches_cost_times_total_units() {
        let a = allocate_units(&ReadingSet::new(3, 7, 1, 2), &ReadingSet::new(17, 8, 9, 13)).unwrap();
        let amounts = Pricing::FlatRate { cost_per_unit: COST_PER_UNIT }.amounts(&a);
        let sum: f64 = amounts.values().sum();
        assert!(approx(sum, COST_PER_UNIT * a.total_units()));
    }

    #[test]
    fn proportional_amounts_add_up_to_the_bill_and_track_usage() {
        let a = allocate_units(&ReadingSet::new(100, 100, 100, 60), &ReadingSet::new(150, 120, 130, 90)).unwrap();
        let amounts = Pricing::Proportional { total_bill: 1234.56 }.amounts(&a);

        let sum: f64 = amounts.values().sum();
        assert!(approx(sum, 1234.56));
        // 60 : 30 : 40 units
        assert!(amounts[&MeterKey::T1] > amounts[&MeterKey::T3]);
        assert!(amounts[&MeterKey::T3] > amounts[&MeterKey::T2]);
        assert!(approx(amounts[&MeterKey::T2], 1234.56 * 30.0 / 130.0));
    }

    #[test]
    fn proportional_with_no_usage_splits_equally() {
        let same = ReadingSet::new(10, 10, 10, 10);
        let a = allocate_units(&same, &same).unwrap();
        let amounts = Pricing::Proportional { total_bill: 300.0 }.amounts(&a);
        assert!(amounts.values().all(|&v| approx(v, 100.0)));
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(3.333333), 3.33);
        assert_eq!(round2(6.666666), 6.67);
        assert_eq!(round2(600.0), 600.0);
    }
}
