//! Conversion of raw temperature sensor readings into kelvin.
//!
//! The device stores two factory constants per part: an `offset` (the ADC code corresponding to
//! absolute zero, extrapolated) and a `gain` (kelvin per ADC code, scaled by 2<sup>8</sup>). The
//! temperature is then `(raw - offset) * gain / 256`, rounded to the nearest kelvin.


use crate::error::CompensationError;


/// Number of fractional bits in [`Calibration::gain`].
pub const GAIN_FRACTION_BITS: u32 = 8;


/// A measured point on the temperature sensor's transfer curve.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationPoint {
    /// The ADC reading at this point.
    pub adc: u16,

    /// The temperature at this point, in tenths of a kelvin.
    pub decikelvin: i32,
}


/// Per-device calibration constants of the temperature sensor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// ADC code subtracted from every reading.
    pub offset: i16,

    /// Kelvin per ADC code with [`GAIN_FRACTION_BITS`] fractional bits.
    pub gain: u16,
}
impl Calibration {
    pub const fn new(offset: i16, gain: u16) -> Self {
        Self { offset, gain }
    }

    /// Derives offset and gain from two points of a factory temperature log.
    ///
    /// Temperature must rise with the ADC reading between the two points, steeply enough that the
    /// gain does not round down to zero.
    pub fn from_two_points(room: CalibrationPoint, hot: CalibrationPoint) -> Result<Self, CompensationError> {
        let adc_span = i64::from(hot.adc) - i64::from(room.adc);
        let temp_span = i64::from(hot.decikelvin) - i64::from(room.decikelvin);
        if adc_span == 0 || temp_span == 0 || (adc_span < 0) != (temp_span < 0) {
            return Err(CompensationError::DegenerateCalibration);
        }

        // gain = 256 * (dT / 10) / dADC
        let gain = round_half_up(temp_span << GAIN_FRACTION_BITS, adc_span * 10);
        let gain = u16::try_from(gain)
            .ok()
            .filter(|g| *g > 0)
            .ok_or(CompensationError::DegenerateCalibration)?;

        // room.adc - offset = room_temp * 256 / gain
        let room_codes = round_half_up(
            i64::from(room.decikelvin) << GAIN_FRACTION_BITS,
            i64::from(gain) * 10,
        );
        let offset = i16::try_from(i64::from(room.adc) - room_codes)
            .map_err(|_| CompensationError::DegenerateCalibration)?;

        Ok(Self { offset, gain })
    }

    /// Converts a raw ADC reading into kelvin, rounding half a kelvin upwards.
    pub fn to_kelvin(&self, raw: u16) -> i32 {
        let scaled = (i64::from(raw) - i64::from(self.offset)) * i64::from(self.gain);
        round_half_up(scaled, 1 << GAIN_FRACTION_BITS) as i32
    }
}


/// Divides by a positive `divisor`, rounding to the nearest integer with ties towards positive
/// infinity.
fn round_half_up(dividend: i64, divisor: i64) -> i64 {
    let divisor_sign = divisor.signum();
    let (dividend, divisor) = (dividend * divisor_sign, divisor * divisor_sign);
    (dividend + divisor / 2).div_euclid(divisor)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_calibration_passes_codes_through() {
        let cal = Calibration::new(0, 256);
        assert_eq!(cal.to_kelvin(0), 0);
        assert_eq!(cal.to_kelvin(297), 297);
        assert_eq!(cal.to_kelvin(u16::MAX), 65_535);
    }

    #[test]
    fn halves_round_up() {
        // half a kelvin per code
        let cal = Calibration::new(0, 128);
        assert_eq!(cal.to_kelvin(1), 1);
        assert_eq!(cal.to_kelvin(2), 1);
        assert_eq!(cal.to_kelvin(3), 2);

        let cal = Calibration::new(10, 128);
        assert_eq!(cal.to_kelvin(9), 0); // -0.5
        assert_eq!(cal.to_kelvin(8), -1); // -1.0
        assert_eq!(cal.to_kelvin(7), -1); // -1.5
    }

    #[test]
    fn matches_shift_formula() {
        // ((raw - offset) * gain + 0x80) >> 8
        let cal = Calibration::new(-7, 0xC3);
        for raw in [0u16, 1, 100, 255, 320, 400, 1023] {
            let expected = ((i32::from(raw) + 7) * 0xC3 + 0x80) >> 8;
            assert_eq!(cal.to_kelvin(raw), expected, "raw {}", raw);
        }
    }

    #[test]
    fn two_point_calibration_reproduces_both_points() {
        let room = CalibrationPoint { adc: 1000, decikelvin: 2980 };
        let hot = CalibrationPoint { adc: 2280, decikelvin: 3480 };
        let cal = Calibration::from_two_points(room, hot).unwrap();
        assert_eq!(cal.gain, 10);
        assert_eq!(cal.offset, -6629);
        assert_eq!(cal.to_kelvin(1000), 298);
        assert_eq!(cal.to_kelvin(2280), 348);
    }

    #[test]
    fn two_point_calibration_rejects_flat_or_falling_curves() {
        let room = CalibrationPoint { adc: 1000, decikelvin: 2980 };
        let same_adc = CalibrationPoint { adc: 1000, decikelvin: 3480 };
        let same_temp = CalibrationPoint { adc: 2000, decikelvin: 2980 };
        let falling = CalibrationPoint { adc: 900, decikelvin: 3480 };
        for hot in [same_adc, same_temp, falling] {
            assert_eq!(
                Calibration::from_two_points(room, hot),
                Err(CompensationError::DegenerateCalibration),
            );
        }
    }
}
