//! Code to control the real-time counter whose period is being compensated.


use atsaml21g18b::{Interrupt, Peripherals};
use cortex_m::peripheral::NVIC;


/// NVIC priority of the RTC overflow interrupt.
///
/// Numerically lower than the ADC's, so a tick may preempt a temperature sample being processed,
/// but not the other way around.
pub(crate) const INTERRUPT_PRIORITY: u8 = 0x40;


#[inline]
fn register_block() -> &'static atsaml21g18b::rtc::MODE1 {
    unsafe { (*atsaml21g18b::RTC::PTR).mode1() }
}


/// Enables the clocks for RTC.
pub(crate) fn enable_clock(peripherals: &mut Peripherals) {
    // enable CLK_RTC_APB
    peripherals.MCLK.apbamask.modify(|_, w| w
        .rtc_().set_bit()
    );

    // CLK_RTC_OSC always enabled (source configured directly in OSC32KCTRL)
}


/// Sets up RTC.
///
/// raw frequency: 32_768 Hz, no prescaler; the counter overflows once per `period + 1` crystal
/// cycles and the period is rewritten on every overflow.
/// => a 16-bit counter is enough
/// => use RTC mode 1
pub(crate) fn setup_rtc(peripherals: &mut Peripherals, period: u16) {
    enable_clock(peripherals);

    let register_block = register_block();

    // reset RTC
    register_block.ctrla.modify(|_, w| w
        .swrst().set_bit()
    );
    while register_block.syncbusy.read().swrst().bit_is_set() {
    }

    // basic configuration
    register_block.ctrla.modify(|_, w| w
        .mode().count16() // mode 1 (16-bit counter)
        .prescaler().div1() // count every crystal cycle
        .countsync().set_bit() // keep COUNT readable
        .enable().clear_bit() // don't start yet
    );

    set_period(period);

    // interrupt on overflow
    register_block.intenset.modify(|_, w| w
        .ovf().set_bit()
    );

    // start
    register_block.ctrla.modify(|_, w| w
        .enable().set_bit() // start
    );
    while register_block.syncbusy.read().enable().bit_is_set() {
    }
}


/// Sets the period register.
///
/// The new value takes effect at the next overflow, i.e. for the interval that is starting.
pub(crate) fn set_period(period: u16) {
    let register_block = register_block();
    register_block.per.write(|w| w
        .per().variant(period)
    );
    while register_block.syncbusy.read().per().bit_is_set() {
    }
}


/// Clears the overflow flag so the next overflow raises the interrupt again.
pub(crate) fn clear_overflow() {
    register_block().intflag.write(|w| w
        .ovf().set_bit()
    );
}


/// Enable the RTC interrupt.
pub(crate) fn enable_interrupt(nvic: &mut NVIC) {
    unsafe {
        nvic.set_priority(Interrupt::RTC, INTERRUPT_PRIORITY);
        NVIC::unmask(Interrupt::RTC)
    }
}
