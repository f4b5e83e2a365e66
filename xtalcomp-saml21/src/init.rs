//! Initialization code.


use atsaml21g18b::Peripherals;


/// The speed of the slow clock, timed by the XOSC32K crystal.
pub const SLOW_CLOCK_SPEED_HZ: u32 = 32_768;


/// Generic clock generator feeding the ADC.
pub const ADC_CLOCK_GENERATOR: usize = 1;


/// Sets up the microcontroller's clocks that will be used.
///
/// The following clock setup is used by `xtalcomp-saml21`:
///
/// ```
/// ┌────────┐                                  ┌───────┐
/// │ OSC16M │               (reset default)    │ CPU   │
/// │ 4 MHz  ├──────────┬───────────────────────┤ 4 MHz │
/// └────────┘          │                       └───────┘
///                     │  ┌───────┐
///                     │  │ GCG1  │            ┌────────────────────┐
///                     └──┤ 4 MHz ├────────────┤ ADC (temperature)  │
///                        └───────┘            │ prescaler: 4       │
///                                             └────────────────────┘
///
/// ┌────────────┐                              ┌──────────────────────┐
/// │ XOSC32K    │                              │ RTC (compensated)    │
/// │ crystal    ├──────────────────────────────┤ raw: 32.768 kHz      │
/// │ 32.768 kHz │                              │ prescaler: 1         │
/// └────────────┘                              └──────────────────────┘
/// ```
///
/// The RTC counts raw crystal cycles so that its period can be shortened one cycle at a time.
pub(crate) fn setup_clocks(peripherals: &mut Peripherals) {
    // initialize XOSC32K with the crystal under compensation
    peripherals.OSC32KCTRL.xosc32k.modify(|_, w| w
        .ondemand().clear_bit() // run even if not explicitly requested
        .runstdby().set_bit() // run in standby mode too
        .xtalen().set_bit() // a crystal is connected, not an oscillator
        .en32k().set_bit() // enable 32kHz output
        .startup().variant(6) // longest startup time; the crystal needs to settle
    );

    // start XOSC32K
    peripherals.OSC32KCTRL.xosc32k.modify(|_, w| w
        .enable().set_bit()
    );
    while peripherals.OSC32KCTRL.status.read().xosc32krdy().bit_is_clear() {
    }

    // CLK_RTC_OSC is not routed through GCLK; select the crystal directly
    peripherals.OSC32KCTRL.rtcctrl.modify(|_, w| w
        .rtcsel().xosc32k()
    );

    // changes to GCLK registers must be synchronized
    // (they are governed by a different clock than the CPU core)
    // => always wait for the corresponding SYNCBUSY register bit to clear

    // plug OSC16M into GCG1
    peripherals.GCLK.genctrl[ADC_CLOCK_GENERATOR].modify(|_, w| w
        .divsel().clear_bit() // interpret divisor as DIV, not 2**(DIV+1)
        .div().variant(1) // divide by 1 (= no division)
        .runstdby().clear_bit() // the ADC only runs while awake
        .idc().clear_bit() // no need to improve duty cycle; we are not dividing
        .oe().clear_bit() // no explicit I/O output
        .src().osc16m() // take time from OSC16M
        .genen().set_bit() // turn on
    );
    while peripherals.GCLK.syncbusy.read().genctrl1().bit_is_set() {
    }

    // connect GCG1 to ADC
    const GCLK_ADC: usize = 30;
    peripherals.GCLK.pchctrl[GCLK_ADC].modify(|_, w| w
        .gen().gclk1() // take from GCG1
        .chen().set_bit() // enable
    );
    while peripherals.GCLK.pchctrl[GCLK_ADC].read().chen().bit_is_clear() {
    }
}


/// Performs microcontroller initialization.
pub(crate) fn initialize_microcontroller(peripherals: &mut Peripherals) {
    // 4 MHz is well within performance level 0, which is active after reset

    setup_clocks(peripherals);
}
