//! The crystal drift model: a look-up table of fine timing error versus temperature.
//!
//! Tuning-fork crystals drift parabolically around their turnover temperature (25 °C), so the error
//! is symmetric and only the non-negative half of the curve is stored. Index 0 corresponds to the
//! reference temperature; every index step is one kelvin away from it.


use crate::error::CompensationError;


/// Fine error per second versus temperature, at a resolution of 10<sup>-8</sup> (10 ns per second).
///
/// Starts at 25 °C, one entry per kelvin, up to 125 °C.
pub const FINE_DRIFT_TABLE: [u16; 101] = [
    0, 0, 1, 1, 2, 3, 5, 6, 8, 11,
    13, 16, 19, 22, 26, 29, 34, 38, 42, 47,
    52, 58, 63, 69, 75, 82, 89, 96, 103, 110,
    118, 126, 134, 143, 152, 161, 170, 179, 189, 199,
    210, 220, 231, 242, 254, 265, 277, 290, 302, 315,
    328, 341, 354, 368, 382, 396, 411, 426, 441, 456,
    472, 488, 504, 520, 537, 554, 571, 588, 606, 624,
    642, 661, 679, 698, 718, 737, 757, 777, 797, 818,
    839, 860, 881, 903, 925, 947, 969, 992, 1015, 1038,
    1062, 1085, 1109, 1134, 1158, 1183, 1208, 1233, 1259, 1285,
    1311,
];

/// Fine error per second versus temperature, at a resolution of 10<sup>-7</sup> (100 ns per second).
///
/// Same range as [`FINE_DRIFT_TABLE`], originally stored as 8-bit values to save flash.
pub const COARSE_DRIFT_TABLE: [u16; 101] = [
    0, 0, 0, 0, 0, 0, 0, 1, 1, 1,
    1, 2, 2, 2, 3, 3, 3, 4, 4, 5,
    5, 6, 6, 7, 8, 8, 9, 10, 10, 11,
    12, 13, 13, 14, 15, 16, 17, 18, 19, 20,
    21, 22, 23, 24, 25, 27, 28, 29, 30, 31,
    33, 34, 35, 37, 38, 40, 41, 43, 44, 46,
    47, 49, 50, 52, 54, 55, 57, 59, 61, 62,
    64, 66, 68, 70, 72, 74, 76, 78, 80, 82,
    84, 86, 88, 90, 92, 95, 97, 99, 102, 104,
    106, 109, 111, 113, 116, 118, 121, 123, 126, 128,
    131,
];


/// An ordered, non-decreasing table mapping the distance from the reference temperature to a fine
/// timing error.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CompensationTable {
    entries: &'static [u16],
}
impl CompensationTable {
    /// Wraps a table after checking that it is non-empty and never decreases.
    pub const fn new(entries: &'static [u16]) -> Result<Self, CompensationError> {
        if entries.is_empty() {
            return Err(CompensationError::EmptyTable);
        }
        let mut index = 1;
        while index < entries.len() {
            if entries[index] < entries[index - 1] {
                return Err(CompensationError::NonMonotonicTable { index });
            }
            index += 1;
        }
        Ok(Self { entries })
    }

    /// The number of entries, i.e. one more than the largest deviation that can be looked up
    /// without clamping.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// The raw table entries.
    pub const fn entries(&self) -> &'static [u16] {
        self.entries
    }

    /// The largest entry; as the table never decreases, this is the last one.
    pub const fn max_entry(&self) -> u16 {
        self.entries[self.entries.len() - 1]
    }

    /// Looks up the fine error for a deviation (in kelvin) from the reference temperature.
    ///
    /// The sign of the deviation is ignored. Deviations beyond the end of the table saturate to
    /// the last entry.
    pub fn lookup(&self, deviation: i32) -> u16 {
        self.lookup_clamped(deviation).0
    }

    /// Like [`lookup`](CompensationTable::lookup), but also reports whether the deviation had to be
    /// clamped to the table's range.
    pub fn lookup_clamped(&self, deviation: i32) -> (u16, bool) {
        let index = deviation.unsigned_abs() as usize;
        match self.entries.get(index) {
            Some(&value) => (value, false),
            None => (self.max_entry(), true),
        }
    }
}


/// A compensation table together with the error units it is expressed in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DriftModel {
    table: CompensationTable,
    max_error_per_cycle: u16,
    static_fine_error: u16,
}
impl DriftModel {
    /// The 16-bit model: one 32.768 kHz period is 30.52 µs, static error measured as 9.6 µs.
    pub const FINE: Self = unwrap_model(Self::new(&FINE_DRIFT_TABLE, 3052, 960));

    /// The 8-bit model: one 32.768 kHz period is 30.5 µs, static error measured as 9.6 µs.
    pub const COARSE: Self = unwrap_model(Self::new(&COARSE_DRIFT_TABLE, 305, 96));

    /// Assembles a drift model.
    ///
    /// `max_error_per_cycle` is the error one crystal period represents and `static_fine_error` the
    /// temperature-independent error accumulated every interval, both in table units.
    ///
    /// Fails unless the worst case of the accumulator (a full cycle of remainder plus the static
    /// error plus the largest table entry) fits into 16 bits.
    pub const fn new(
        entries: &'static [u16],
        max_error_per_cycle: u16,
        static_fine_error: u16,
    ) -> Result<Self, CompensationError> {
        let table = match CompensationTable::new(entries) {
            Ok(t) => t,
            Err(e) => return Err(e),
        };
        if max_error_per_cycle == 0 {
            return Err(CompensationError::ZeroCycleError);
        }
        let worst_case = max_error_per_cycle as u32
            + static_fine_error as u32
            + table.max_entry() as u32;
        if worst_case > u16::MAX as u32 {
            return Err(CompensationError::AccumulatorOverflow);
        }
        Ok(Self { table, max_error_per_cycle, static_fine_error })
    }

    pub const fn table(&self) -> &CompensationTable {
        &self.table
    }

    pub const fn max_error_per_cycle(&self) -> u16 {
        self.max_error_per_cycle
    }

    pub const fn static_fine_error(&self) -> u16 {
        self.static_fine_error
    }

    /// The largest number of whole cycles a single interval can ever remove.
    pub const fn max_cycles_per_interval(&self) -> u16 {
        let per_interval = self.static_fine_error as u32 + self.table.max_entry() as u32;
        let cycle = self.max_error_per_cycle as u32;
        ((per_interval + cycle - 1) / cycle) as u16
    }
}

const fn unwrap_model(model: Result<DriftModel, CompensationError>) -> DriftModel {
    match model {
        Ok(m) => m,
        Err(_) => panic!("built-in drift model is invalid"),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fine_table_never_decreases() {
        let table = DriftModel::FINE.table();
        for d in 1..table.len() as i32 {
            assert!(table.lookup(d) >= table.lookup(d - 1), "decrease at {}", d);
        }
    }

    #[test]
    fn fine_table_matches_drift_data() {
        let table = DriftModel::FINE.table();
        assert_eq!(table.len(), 101);
        assert_eq!(table.lookup(0), 0);
        assert_eq!(table.lookup(42), 231);
        assert_eq!(table.lookup(50), 328);
        assert_eq!(table.lookup(100), 1311);
        assert_eq!(table.max_entry(), 1311);
    }

    #[test]
    fn coarse_table_matches_drift_data() {
        let table = DriftModel::COARSE.table();
        assert_eq!(table.len(), 101);
        assert_eq!(table.lookup(7), 1);
        assert_eq!(table.lookup(50), 33);
        assert_eq!(table.max_entry(), 131);
    }

    #[test]
    fn lookup_is_symmetric() {
        let table = DriftModel::FINE.table();
        for d in 0..table.len() as i32 {
            assert_eq!(table.lookup(d), table.lookup(-d));
        }
    }

    #[test]
    fn lookup_saturates_outside_table() {
        let table = DriftModel::FINE.table();
        assert_eq!(table.lookup_clamped(100), (1311, false));
        assert_eq!(table.lookup_clamped(101), (1311, true));
        assert_eq!(table.lookup_clamped(-250), (1311, true));
        assert_eq!(table.lookup_clamped(i32::MIN), (1311, true));
    }

    #[test]
    fn rejects_malformed_tables() {
        static EMPTY: [u16; 0] = [];
        static DIP: [u16; 4] = [0, 5, 4, 9];
        assert_eq!(CompensationTable::new(&EMPTY), Err(CompensationError::EmptyTable));
        assert_eq!(
            CompensationTable::new(&DIP),
            Err(CompensationError::NonMonotonicTable { index: 2 }),
        );
    }

    #[test]
    fn rejects_models_that_overflow_the_accumulator() {
        static BIG: [u16; 2] = [0, 62_000];
        assert_eq!(DriftModel::new(&BIG, 3052, 960), Err(CompensationError::AccumulatorOverflow));
        assert_eq!(DriftModel::new(&FINE_DRIFT_TABLE, 0, 960), Err(CompensationError::ZeroCycleError));
    }

    #[test]
    fn accumulator_limit_is_inclusive() {
        // 3052 + 960 + 61_523 = 65_535
        static FITS: [u16; 2] = [0, 61_523];
        // one more
        static SPILLS: [u16; 2] = [0, 61_524];
        assert!(DriftModel::new(&FITS, 3052, 960).is_ok());
        assert_eq!(DriftModel::new(&SPILLS, 3052, 960), Err(CompensationError::AccumulatorOverflow));
    }

    #[test]
    fn at_most_one_cycle_per_second_for_builtin_models() {
        assert_eq!(DriftModel::FINE.max_cycles_per_interval(), 1);
        assert_eq!(DriftModel::COARSE.max_cycles_per_interval(), 1);
    }
}
