//! Code to sample the internal temperature sensor with the ADC.


use atsaml21g18b::{Interrupt, Peripherals};
use cortex_m::peripheral::NVIC;

use crate::calibration;


/// NVIC priority of the ADC result-ready interrupt; below [`rtc::INTERRUPT_PRIORITY`].
///
/// [`rtc::INTERRUPT_PRIORITY`](crate::rtc::INTERRUPT_PRIORITY)
pub(crate) const INTERRUPT_PRIORITY: u8 = 0x80;


#[inline]
fn register_block() -> &'static atsaml21g18b::adc::RegisterBlock {
    unsafe { &*atsaml21g18b::ADC::PTR }
}


/// Enables the clocks for ADC.
pub(crate) fn enable_clock(peripherals: &mut Peripherals) {
    // enable CLK_ADC_APB
    peripherals.MCLK.apbdmask.modify(|_, w| w
        .adc_().set_bit()
    );

    // GCLK_ADC is connected in init::setup_clocks
}


/// Sets up the ADC for single conversions of the temperature sensor.
///
/// Conversions are only ever started by [`start_conversion`]; there is no free-running mode.
pub(crate) fn setup_adc(peripherals: &mut Peripherals) {
    enable_clock(peripherals);

    // the temperature log was recorded against the 1.0 V reference
    peripherals.SUPC.vref.modify(|_, w| w
        .sel()._1v0() // 1.0 V internal reference
        .tsen().set_bit() // enable temperature sensor
        .ondemand().set_bit() // only run while the ADC needs it
    );

    let register_block = register_block();

    // reset ADC
    register_block.ctrla.modify(|_, w| w
        .swrst().set_bit()
    );
    while register_block.syncbusy.read().swrst().bit_is_set() {
    }

    register_block.calib.write(|w| w
        .biasrefbuf().variant(calibration::adc_linearity())
        .biascomp().variant(calibration::adc_bias())
    );

    register_block.ctrlb.modify(|_, w| w
        .prescaler().div4() // 4 MHz / 4 = 1 MHz
    );
    register_block.refctrl.modify(|_, w| w
        .refsel().intref() // SUPC.VREF
    );
    register_block.inputctrl.modify(|_, w| w
        .muxpos().temp() // temperature sensor
        .muxneg().gnd() // single-ended
    );
    while register_block.syncbusy.read().inputctrl().bit_is_set() {
    }
    register_block.ctrlc.modify(|_, w| w
        .ressel()._12bit() // the temperature log holds 12-bit readings
        .freerun().clear_bit() // one conversion per trigger
    );
    while register_block.syncbusy.read().ctrlc().bit_is_set() {
    }
    register_block.sampctrl.modify(|_, w| w
        .samplen().variant(63) // the temperature sensor needs a long sampling time
    );
    while register_block.syncbusy.read().sampctrl().bit_is_set() {
    }

    // interrupt on result ready
    register_block.intenset.modify(|_, w| w
        .resrdy().set_bit()
    );

    register_block.ctrla.modify(|_, w| w
        .enable().set_bit()
    );
    while register_block.syncbusy.read().enable().bit_is_set() {
    }
}


/// Starts a single conversion; [`Interrupt::ADC`] fires once the result is ready.
pub(crate) fn start_conversion() {
    register_block().swtrig.write(|w| w
        .start().set_bit()
    );
}


/// Reads the latest result, which also clears the result-ready flag.
pub(crate) fn read_result() -> u16 {
    register_block().result.read().result().bits()
}


/// Enable the ADC interrupt.
pub(crate) fn enable_interrupt(nvic: &mut NVIC) {
    unsafe {
        nvic.set_priority(Interrupt::ADC, INTERRUPT_PRIORITY);
        NVIC::unmask(Interrupt::ADC)
    }
}
