#![no_std]
#![no_main]


mod adc;
mod board;
mod calibration;
mod init;
mod rtc;


use core::cell::Cell;
use core::panic::PanicInfo;

use atsaml21g18b::{interrupt, Peripherals};
use cortex_m::interrupt::Mutex;
use cortex_m_rt::entry;
use defmt_rtt as _;
use xtalcomp::{
    DriftModel, ErrorIntegrator, PendingCompensation, RtcConfig, SamplerConfig, TemperatureSampler,
};

use crate::board::Board;
use crate::init::SLOW_CLOCK_SPEED_HZ;


/// The crystal's drift curve.
const DRIFT_MODEL: DriftModel = DriftModel::FINE;

/// One-second interval; no whole-cycle static error has been measured for this board.
const RTC_CONFIG: RtcConfig = RtcConfig::new(SLOW_CLOCK_SPEED_HZ, 0);

/// The temperature log calibration yields kelvin.
const SAMPLER_CONFIG: SamplerConfig = SamplerConfig::KELVIN;

/// Log the loop's counters once per hour.
const DIAGNOSTICS_INTERVAL_TICKS: u32 = 3600;

const INITIAL_INTEGRATOR: ErrorIntegrator = match ErrorIntegrator::new(DRIFT_MODEL, RTC_CONFIG) {
    Ok(integrator) => integrator,
    Err(_) => panic!("RTC configuration cannot hold the drift model's corrections"),
};


/// The compensation measured by the ADC handler for the next tick.
static PENDING: PendingCompensation = PendingCompensation::new();

/// Handed from `main` to the ADC handler once calibration has been read.
static SAMPLER: Mutex<Cell<Option<TemperatureSampler>>> = Mutex::new(Cell::new(None));


#[inline]
fn noppage() {
    for _ in 0..65536 {
        cortex_m::asm::nop();
    }
}


#[panic_handler]
fn panicked(_reason: &PanicInfo) -> ! {
    // the RTC free-runs at its last period from here on
    let peripherals = unsafe {
        // ain't no rest for the wicked
        Peripherals::steal()
    };

    // blink the LED on PA27
    const LED: u32 = 1 << 27;
    peripherals.PORT.group0.dirset.write(|w| unsafe { w.bits(LED) });

    loop {
        peripherals.PORT.group0.outset.write(|w| unsafe { w.bits(LED) });
        noppage();
        peripherals.PORT.group0.outclr.write(|w| unsafe { w.bits(LED) });
        noppage();
    }
}


#[entry]
fn main() -> ! {
    let mut peripherals = Peripherals::take()
        .expect("peripherals already taken?!");
    let mut core_peripherals = cortex_m::Peripherals::take()
        .expect("core peripherals already taken?!");

    crate::init::initialize_microcontroller(&mut peripherals);

    crate::adc::setup_adc(&mut peripherals);

    // without calibration, conversion results are ignored and only the static error is corrected
    match calibration::temperature_sensor() {
        Ok(cal) => {
            defmt::info!("temperature sensor: offset {}, gain {}", cal.offset, cal.gain);
            let sampler = TemperatureSampler::new(cal, SAMPLER_CONFIG, *DRIFT_MODEL.table());
            cortex_m::interrupt::free(|cs| SAMPLER.borrow(cs).set(Some(sampler)));

            crate::adc::enable_interrupt(&mut core_peripherals.NVIC);
        },
        Err(e) => {
            defmt::error!("temperature log unusable ({}); compensating static error only", e);
        },
    }

    crate::rtc::setup_rtc(&mut peripherals, INITIAL_INTEGRATOR.initial_period());
    crate::rtc::enable_interrupt(&mut core_peripherals.NVIC);

    loop {
        cortex_m::asm::wfi();
    }
}


#[interrupt]
fn RTC() {
    static mut INTEGRATOR: ErrorIntegrator = INITIAL_INTEGRATOR;

    // errors are logged by the integrator; the loop carries on regardless
    let _ = INTEGRATOR.on_tick(&PENDING, &mut Board);

    if INTEGRATOR.ticks() % DIAGNOSTICS_INTERVAL_TICKS == 0 {
        defmt::info!(
            "ticks {}, corrected cycles {}, faults {}, remainder {}",
            INTEGRATOR.ticks(),
            INTEGRATOR.corrected_cycles(),
            INTEGRATOR.faults(),
            INTEGRATOR.accumulated_error(),
        );
    }
}


#[interrupt]
fn ADC() {
    static mut SAMPLER_STATE: Option<TemperatureSampler> = None;

    let raw = crate::adc::read_result();

    if SAMPLER_STATE.is_none() {
        *SAMPLER_STATE = cortex_m::interrupt::free(|cs| SAMPLER.borrow(cs).take());
    }
    if let Some(sampler) = SAMPLER_STATE.as_mut() {
        sampler.on_sample_ready(raw, &PENDING);
    }
}
