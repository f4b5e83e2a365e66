use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

use xtalcomp::{
    Calibration, Compensator, DriftModel, ErrorIntegrator, PendingCompensation, RtcConfig,
    SamplerConfig, TemperatureSampler, TickHardware,
};


/// Keeps every record so the test can inspect what was logged.
struct Recorder {
    records: Mutex<Vec<(Level, String)>>,
}
impl Log for Recorder {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records.lock().unwrap().push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {
    }
}

static RECORDER: Recorder = Recorder { records: Mutex::new(Vec::new()) };


struct NullBoard;
impl TickHardware for NullBoard {
    fn start_conversion(&mut self) {}
    fn set_period(&mut self, _period: u16) {}
    fn clear_tick_flag(&mut self) {}
}


fn logged(level: Level, needle: &str) -> bool {
    RECORDER.records.lock().unwrap()
        .iter()
        .any(|(l, message)| *l == level && message.contains(needle))
}


// one test per binary: the logger is process-global
#[test]
fn control_loop_events_reach_the_logger() {
    log::set_logger(&RECORDER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let mut comp = Compensator::new(
        DriftModel::FINE,
        RtcConfig::ONE_SECOND,
        SamplerConfig::AVR_KELVIN,
        Calibration::new(0, 256),
    ).unwrap();
    assert!(logged(Level::Debug, "drift model: 101 entries"));

    comp.on_sample_ready(0);
    assert!(logged(Level::Warn, "temperature 0 K outside drift table, clamped"));

    // 960 + 1311 per tick, the second tick crosses one cycle
    comp.on_tick(&mut NullBoard).unwrap();
    comp.on_tick(&mut NullBoard).unwrap();
    assert!(logged(Level::Trace, "removing 1 cycle(s), period 32766"));

    // a sampler on the fine table feeding an integrator on the coarse one
    let mut sampler = TemperatureSampler::new(
        Calibration::new(0, 256),
        SamplerConfig::AVR_KELVIN,
        *DriftModel::FINE.table(),
    );
    let mut integrator = ErrorIntegrator::new(DriftModel::COARSE, RtcConfig::ONE_SECOND).unwrap();
    let pending = PendingCompensation::new();
    sampler.on_sample_ready(297 + 100, &pending);
    assert!(integrator.on_tick(&pending, &mut NullBoard).is_err());
    assert!(logged(Level::Error, "correction skipped: pending compensation 1311 exceeds model maximum 131"));
}
