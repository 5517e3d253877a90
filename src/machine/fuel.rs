//! Fuel for the machine

/// A step budget. Every machine transition taken by [`super::Machine::run_with_fuel`]
/// consumes one unit.
#[derive(Debug, Clone)]
pub struct Fuel {
    fuel: u64,
    interrupted: bool,
}

impl Fuel {
    pub fn empty() -> Self {
        Self::with(0)
    }

    pub fn with(fuel: u64) -> Self {
        Self {
            fuel,
            interrupted: false,
        }
    }

    /// Effectively no limit.
    pub fn unbounded() -> Self {
        Self::with(u64::MAX)
    }

    /// Refills fuel up to a given maximum and also clears the interrupt flag.
    ///
    /// Intended to be called between runs that reuse one budget: it credits fuel without
    /// letting it grow past `max_fuel`.
    pub fn refill(&mut self, fuel: u64, max_fuel: u64) {
        self.fuel = self.fuel.saturating_add(fuel).min(max_fuel);
        self.interrupted = false;
    }

    pub fn consume(&mut self, fuel: u64) {
        self.fuel = self.fuel.saturating_sub(fuel);
    }

    pub fn remaining(&self) -> u64 {
        self.fuel
    }

    /// Marks that the running machine should stop before its next step, without
    /// consuming any fuel.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Returns true if we have positive fuel remaining *and* we have not been interrupted.
    pub fn should_continue(&self) -> bool {
        self.fuel > 0 && !self.interrupted
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::Fuel;

    #[test]
    fn consume_saturates() {
        let mut fuel = Fuel::with(2);
        fuel.consume(1);
        check!(fuel.should_continue());
        fuel.consume(5);
        check!(fuel.remaining() == 0);
        check!(!fuel.should_continue());
    }

    #[test]
    fn refill_caps_and_clears_interrupt() {
        let mut fuel = Fuel::with(3);
        fuel.interrupt();
        check!(!fuel.should_continue());

        fuel.refill(10, 8);
        check!(fuel.remaining() == 8);
        check!(!fuel.is_interrupted());
        check!(fuel.should_continue());

        check!(!Fuel::empty().should_continue());
    }
}
