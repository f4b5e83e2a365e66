//! Binds the compensation loop to the SAM L21 peripherals.


use xtalcomp::TickHardware;

use crate::{adc, rtc};


/// The RTC and ADC of this board, as driven by the tick handler.
pub(crate) struct Board;
impl TickHardware for Board {
    fn start_conversion(&mut self) {
        adc::start_conversion();
    }

    fn set_period(&mut self, period: u16) {
        rtc::set_period(period);
    }

    fn clear_tick_flag(&mut self) {
        rtc::clear_overflow();
    }
}
