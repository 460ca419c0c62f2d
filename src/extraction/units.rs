//! Unit normalization of trimmed fields

use crate::masked::MaskedArray;
use crate::variables::{UnitRule, Variable};
use log::debug;

/// Apply `rule` to the unmasked values of `data`
///
/// Conditional rules look at the unmasked extremes; a fully masked field never
/// satisfies their condition.
pub fn apply_unit_rule(rule: UnitRule, data: &mut MaskedArray) {
    match rule {
        UnitRule::Unchanged => {}
        UnitRule::Scale(factor) => data.map_unmasked_inplace(|v| v * factor),
        UnitRule::Offset(offset) => data.map_unmasked_inplace(|v| v + offset),
        UnitRule::OffsetIfMinAbove { offset, threshold } => {
            if data.min().is_some_and(|min| min > threshold) {
                data.map_unmasked_inplace(|v| v + offset);
            }
        }
        UnitRule::ScaleIfMaxBelow { factor, threshold } => {
            if data.max().is_some_and(|max| max < threshold) {
                data.map_unmasked_inplace(|v| v * factor);
            }
        }
    }
}

/// Convert a trimmed field of `variable` to the engine's common units
pub fn convert_units(variable: Variable, data: &mut MaskedArray) {
    let rule = variable.unit_rule();
    if rule != UnitRule::Unchanged {
        debug!("{variable}: applying {rule:?}");
    }
    apply_unit_rule(rule, data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    fn field(values: &[f64]) -> MaskedArray {
        MaskedArray::from_nan(arr1(values).into_dyn())
    }

    #[test]
    fn kelvin_to_celsius() {
        let mut tas = field(&[300.0, f64::NAN]);
        convert_units(Variable::Tas, &mut tas);
        assert_relative_eq!(tas.get(&[0]).unwrap(), 26.85, epsilon = 1e-9);
        assert_eq!(tas.get(&[1]), None);
    }

    #[test]
    fn precipitation_scaled() {
        let mut pr = field(&[2e-6, 0.0]);
        convert_units(Variable::Pr, &mut pr);
        assert_relative_eq!(pr.get(&[0]).unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(pr.get(&[1]), Some(0.0));
    }

    #[test]
    fn thetao_only_converted_when_in_kelvin() {
        let mut kelvin = field(&[275.0, 290.0]);
        convert_units(Variable::Thetao, &mut kelvin);
        assert_relative_eq!(kelvin.get(&[0]).unwrap(), 1.85, epsilon = 1e-9);

        let mut celsius = field(&[2.0, 18.0]);
        convert_units(Variable::Thetao, &mut celsius);
        assert_eq!(celsius.get(&[0]), Some(2.0));
        assert_eq!(celsius.get(&[1]), Some(18.0));
    }

    #[test]
    fn salinity_fraction_to_psu() {
        let mut fraction = field(&[0.035, 0.034]);
        convert_units(Variable::So, &mut fraction);
        assert_relative_eq!(fraction.get(&[0]).unwrap(), 35.0, epsilon = 1e-9);

        let mut psu = field(&[35.0, 34.0]);
        convert_units(Variable::So, &mut psu);
        assert_eq!(psu.get(&[0]), Some(35.0));
    }

    #[test]
    fn fully_masked_field_is_left_alone() {
        let mut empty = field(&[f64::NAN, f64::NAN]);
        convert_units(Variable::So, &mut empty);
        convert_units(Variable::Thetao, &mut empty);
        assert_eq!(empty.count_unmasked(), 0);
    }

    #[test]
    fn unchanged_variables_pass_through() {
        let mut uo = field(&[0.25, -0.5]);
        convert_units(Variable::Uo, &mut uo);
        assert_eq!(uo.get(&[0]), Some(0.25));
        assert_eq!(uo.get(&[1]), Some(-0.5));
    }
}
