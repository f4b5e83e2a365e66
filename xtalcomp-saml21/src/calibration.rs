//! Functionality to obtain calibration values from NVM.


use xtalcomp::{Calibration, CalibrationPoint, CompensationError};


/// 0 °C in tenths of a kelvin, rounded.
const ZERO_CELSIUS_DECIKELVIN: i32 = 2732;


fn read_calibration_area() -> u32 {
    // SAM L21 datasheet, § 11.4
    let calibration_area_ptr = 0x0080_6020 as *const u32;
    unsafe { calibration_area_ptr.read_volatile() }
}

fn read_temperature_log_row() -> u64 {
    // SAM L21 datasheet, § 11.5
    let temperature_log_ptr = 0x0080_6030 as *const u32;
    let (low, high) = unsafe {
        (temperature_log_ptr.read_volatile(), temperature_log_ptr.add(1).read_volatile())
    };
    u64::from(low) | (u64::from(high) << 32)
}

/// The ADC linearity calibration value.
///
/// Bits 2:0; to be stored into `ADC.calib.biasrefbuf`.
pub(crate) fn adc_linearity() -> u8 {
    (read_calibration_area() & 0b111) as u8
}

/// The ADC bias calibration value.
///
/// Bits 5:3; to be stored into `ADC.calib.biascomp`.
pub(crate) fn adc_bias() -> u8 {
    ((read_calibration_area() >> 3) & 0b111) as u8
}

/// Decodes one point of the temperature log row.
///
/// The temperature is stored as whole degrees Celsius plus a separate tenths nibble; the ADC
/// value is the 12-bit reading of the temperature sensor at that temperature with the 1.0 V
/// internal reference.
fn log_point(row: u64, int_shift: u32, dec_shift: u32, adc_shift: u32) -> CalibrationPoint {
    let whole = ((row >> int_shift) & 0xFF) as i32;
    let tenths = ((row >> dec_shift) & 0xF) as i32;
    CalibrationPoint {
        adc: ((row >> adc_shift) & 0xFFF) as u16,
        decikelvin: whole * 10 + tenths + ZERO_CELSIUS_DECIKELVIN,
    }
}

/// The room temperature point of the temperature log.
///
/// `ROOM_TEMP_VAL_INT` bits 7:0, `ROOM_TEMP_VAL_DEC` bits 11:8, `ROOM_ADC_VAL` bits 51:40.
pub(crate) fn room_temperature_point() -> CalibrationPoint {
    log_point(read_temperature_log_row(), 0, 8, 40)
}

/// The hot temperature point of the temperature log.
///
/// `HOT_TEMP_VAL_INT` bits 19:12, `HOT_TEMP_VAL_DEC` bits 23:20, `HOT_ADC_VAL` bits 63:52.
pub(crate) fn hot_temperature_point() -> CalibrationPoint {
    log_point(read_temperature_log_row(), 12, 20, 52)
}

/// Offset and gain of the temperature sensor, derived from the factory temperature log.
///
/// The sensor yields roughly 10 codes per kelvin, so the gain (kelvin per code, 8 fractional
/// bits) rounds to an integer near 26 and carries about 1.5 % quantization error away from the
/// room point. The `ROOM_INT1V_VAL`/`HOT_INT1V_VAL` corrections of the 1.0 V reference are not
/// applied either. Both only matter far from 25 °C, where the drift table is steep enough that a
/// kelvin of error shifts the compensation by a few table steps.
pub(crate) fn temperature_sensor() -> Result<Calibration, CompensationError> {
    Calibration::from_two_points(room_temperature_point(), hot_temperature_point())
}
