use crate::error::CalibrationError;
use crate::protocol::RawCode;

/// Lowest raw code the sensor board reports
pub const MIN_RAW_CODE: i32 = 0;
/// Highest raw code the sensor board reports
pub const MAX_RAW_CODE: i32 = 255;

/// Production breakpoints (raw code, kPa), measured on the chuck line
const DEFAULT_BREAKPOINTS: [(RawCode, f64); 5] = [
    (0, 100.0),
    (48, 80.0),
    (95, 65.0),
    (125, 50.0),
    (255, 0.0),
];

/// Piecewise-linear calibration from raw sensor codes to pressure in kPa
///
/// Breakpoints are validated once on construction, so lookups never fail.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    points: Vec<(RawCode, f64)>,
}

impl CalibrationTable {
    /// Build a table from `(raw_code, kPa)` breakpoints
    ///
    /// Requires at least two breakpoints with strictly increasing raw codes.
    pub fn new(points: Vec<(RawCode, f64)>) -> Result<Self, CalibrationError> {
        if points.len() < 2 {
            return Err(CalibrationError::TooFewBreakpoints(points.len()));
        }

        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].0 <= pair[0].0)
        {
            return Err(CalibrationError::NonMonotonicCodes { index: index + 1 });
        }

        Ok(Self { points })
    }

    pub fn breakpoints(&self) -> &[(RawCode, f64)] {
        &self.points
    }

    /// Convert a raw code to kPa
    ///
    /// Input is clamped to 0-255 first. Codes outside the table's range return
    /// the nearest end breakpoint's pressure.
    pub fn convert(&self, raw: i32) -> f64 {
        let code = raw.clamp(MIN_RAW_CODE, MAX_RAW_CODE);

        let (Some(&(first_code, first_kpa)), Some(&(last_code, last_kpa))) =
            (self.points.first(), self.points.last())
        else {
            return f64::NAN;
        };

        if code <= i32::from(first_code) {
            return first_kpa;
        }
        if code >= i32::from(last_code) {
            return last_kpa;
        }

        for pair in self.points.windows(2) {
            let (x0, y0) = (i32::from(pair[0].0), pair[0].1);
            let (x1, y1) = (i32::from(pair[1].0), pair[1].1);

            if code >= x0 && code <= x1 {
                let t = f64::from(code - x0) / f64::from(x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }

        f64::NAN
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            points: DEFAULT_BREAKPOINTS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_breakpoints_map_exactly() {
        let table = CalibrationTable::default();

        for &(code, kpa) in table.breakpoints() {
            assert_eq!(table.convert(i32::from(code)), kpa);
        }
    }

    #[test]
    fn test_interpolation_between_breakpoints() {
        let table = CalibrationTable::default();

        // 24 is halfway between 0 (100 kPa) and 48 (80 kPa)
        assert_relative_eq!(table.convert(24), 90.0, epsilon = 1e-9);

        // 110 is halfway between 95 (65 kPa) and 125 (50 kPa)
        assert_relative_eq!(table.convert(110), 57.5, epsilon = 1e-9);

        // 190 is halfway between 125 (50 kPa) and 255 (0 kPa)
        assert_relative_eq!(table.convert(190), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_convert_clamps_input() {
        let table = CalibrationTable::default();

        assert_eq!(table.convert(-5), table.convert(0));
        assert_eq!(table.convert(999), table.convert(255));
        assert_eq!(table.convert(i32::MIN), 100.0);
        assert_eq!(table.convert(i32::MAX), 0.0);
    }

    #[test]
    fn test_convert_monotonic_decreasing() {
        let table = CalibrationTable::default();

        let mut previous = table.convert(0);
        for code in 1..=255 {
            let current = table.convert(code);
            assert!(current.is_finite());
            assert!(current <= previous, "code {} rose to {}", code, current);
            previous = current;
        }
    }

    #[test]
    fn test_clamps_to_table_range() {
        // Table that does not cover the full code range
        let table = CalibrationTable::new(vec![(20, 90.0), (200, 10.0)]).unwrap();

        assert_eq!(table.convert(0), 90.0);
        assert_eq!(table.convert(20), 90.0);
        assert_eq!(table.convert(200), 10.0);
        assert_eq!(table.convert(255), 10.0);
        assert_relative_eq!(table.convert(110), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_few_breakpoints() {
        assert_eq!(
            CalibrationTable::new(vec![(0, 100.0)]),
            Err(CalibrationError::TooFewBreakpoints(1))
        );
        assert_eq!(
            CalibrationTable::new(vec![]),
            Err(CalibrationError::TooFewBreakpoints(0))
        );
    }

    #[test]
    fn test_non_monotonic_codes() {
        let result = CalibrationTable::new(vec![(0, 100.0), (95, 65.0), (48, 80.0)]);
        assert_eq!(result, Err(CalibrationError::NonMonotonicCodes { index: 2 }));

        let result = CalibrationTable::new(vec![(0, 100.0), (0, 90.0)]);
        assert!(result.is_err());
    }
}
