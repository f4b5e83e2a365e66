//! State shared between the sampling and the tick interrupt handlers.


use vcell::VolatileCell;


mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Types that 32-bit cores such as the Cortex-M0+ load and store with a single instruction.
///
/// A handler preempting a write to such a value can only ever observe the complete old or the
/// complete new value. This does not hold on 8-bit cores (e.g. AVR), where `u16` and `u32`
/// accesses take several instructions and need a critical section instead.
pub trait SingleAccess: Copy + sealed::Sealed {}
impl SingleAccess for u8 {}
impl SingleAccess for u16 {}
impl SingleAccess for u32 {}


/// A volatile cell that may be placed in a `static` and accessed from interrupt handlers.
///
/// Restricted to [`SingleAccess`] types so that no reader can see a torn value.
#[repr(transparent)]
pub struct SyncVolatileCell<T> {
    cell: VolatileCell<T>,
}
impl<T: SingleAccess> SyncVolatileCell<T> {
    pub const fn new(value: T) -> Self {
        Self { cell: VolatileCell::new(value) }
    }

    #[inline(always)]
    pub fn get(&self) -> T {
        self.cell.get()
    }

    #[inline(always)]
    pub fn set(&self, value: T) {
        self.cell.set(value)
    }
}
// single 32-bit core; reads and writes of T are indivisible
unsafe impl<T: SingleAccess> Sync for SyncVolatileCell<T> {
}


/// The fine error the sampler computed for the next correction interval.
///
/// Written only by [`TemperatureSampler`](crate::sampler::TemperatureSampler), read by
/// [`ErrorIntegrator`](crate::integrator::ErrorIntegrator). Starts out as zero so that ticks
/// arriving before the first conversion apply only the static error.
#[repr(transparent)]
pub struct PendingCompensation {
    value: SyncVolatileCell<u16>,
}
impl PendingCompensation {
    pub const fn new() -> Self {
        Self { value: SyncVolatileCell::new(0) }
    }

    /// The most recently stored compensation value.
    #[inline(always)]
    pub fn get(&self) -> u16 {
        self.value.get()
    }

    #[inline(always)]
    pub(crate) fn set(&self, value: u16) {
        self.value.set(value)
    }
}
impl Default for PendingCompensation {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    static PENDING: PendingCompensation = PendingCompensation::new();

    #[test]
    fn pending_starts_at_zero_and_keeps_last_write() {
        let pending = PendingCompensation::new();
        assert_eq!(pending.get(), 0);
        pending.set(231);
        pending.set(328);
        assert_eq!(pending.get(), 328);
    }

    #[test]
    fn usable_from_a_static() {
        PENDING.set(42);
        assert_eq!(PENDING.get(), 42);
    }
}
