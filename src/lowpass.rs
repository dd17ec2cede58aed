use crate::{Coeff, ConfigError, Lag, Shift, WORD_BITS, overflowed, scale};

/// Cascaded fixed-point lowpass filter engine. DC gain is 1.
///
/// `N` single-pole stages in series share one lag parameter `L`. The engine
/// owns its configuration and pole bank exclusively; one call per sampling
/// tick, no allocation, bounded work.
///
/// The engine cycles between a restarting state, in which the next tick
/// seeds the pole bank with the scaled raw input and passes it through, and
/// a steady state running the cascade. Arithmetic overflow anywhere in the
/// cascade reports failure and re-enters the restarting state so the
/// following tick recovers cleanly instead of filtering corrupted state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Lowpass<const N: usize, L = Coeff> {
    corner_freq: u32,
    sample_period: u32,
    lag: L,
    adc_resolution_bits: u32,
    enabled: bool,
    restarting: bool,
    // IIR state storage, one register per stage
    pole: [i32; N],
}

/// General multiply engine.
pub type FixedLowpass<const N: usize> = Lowpass<N, Coeff>;

/// Four-pole shift-approximated filter for the 50 µs ADC sampling task.
pub type AdcLowpass = Lowpass<4, Shift>;

impl<const N: usize, L: Lag> Lowpass<N, L> {
    /// Create a filter with an externally supplied lag parameter.
    ///
    /// The parameter is taken as given and only re-derived when a tick
    /// requests a different corner frequency. The filter starts enabled and
    /// restarting: the first tick seeds the pole bank.
    ///
    /// # Args
    /// * `corner_freq`: Corner frequency in Hz.
    /// * `sample_period`: Sample period in µs.
    /// * `lag`: Initial lag parameter.
    /// * `adc_resolution_bits`: ADC input resolution, reporting only.
    pub fn new(corner_freq: u32, sample_period: u32, lag: L, adc_resolution_bits: u32) -> Self {
        const { assert!(N > 0) }
        Self {
            corner_freq,
            sample_period,
            lag,
            adc_resolution_bits,
            enabled: true,
            restarting: true,
            pole: [0; N],
        }
    }

    /// Create a filter, deriving the lag parameter from the configuration.
    pub fn with_config(
        corner_freq: u32,
        sample_period: u32,
        adc_resolution_bits: u32,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            corner_freq,
            sample_period,
            L::derive(corner_freq, sample_period)?,
            adc_resolution_bits,
        ))
    }

    /// Derive and store the lag parameter for a new configuration.
    ///
    /// On rejection nothing is stored: the active corner frequency, sample
    /// period, lag parameter and pole bank are untouched.
    pub fn configure(&mut self, corner_freq: u32, sample_period: u32) -> Result<(), ConfigError> {
        let lag = L::derive(corner_freq, sample_period)?;
        self.corner_freq = corner_freq;
        self.sample_period = sample_period;
        self.lag = lag;
        Ok(())
    }

    /// Update the filter with a new raw ADC reading.
    ///
    /// The first element of the return value is always usable: the filtered
    /// value on success, the scaled raw reading otherwise. The success flag
    /// is `false` when the filter is disabled, the requested corner
    /// frequency is unsupported, or the cascade overflowed (which also
    /// forces a restart on the next tick).
    ///
    /// # Args
    /// * `x`: Raw ADC reading.
    /// * `corner_freq`: Requested corner frequency in Hz; a change from the
    ///   active configuration re-derives the lag parameter.
    ///
    /// # Return
    /// Output in Q16.16 and the success flag.
    ///
    /// ```
    /// use adclp::AdcLowpass;
    ///
    /// let mut lp = AdcLowpass::with_config(100, 50, 12).unwrap();
    /// // First tick after restart seeds and passes through.
    /// assert_eq!(lp.update(16, 100), (16 << 16, true));
    /// // Corner frequencies outside the shift table are rejected.
    /// assert_eq!(lp.update(16, 42), (16 << 16, false));
    /// ```
    pub fn update(&mut self, x: i32, corner_freq: u32) -> (i32, bool) {
        let scaled = scale(x);
        if !self.enabled {
            return (scaled, false);
        }
        if corner_freq != self.corner_freq
            && self.configure(corner_freq, self.sample_period).is_err()
        {
            return (scaled, false);
        }
        if self.restarting {
            self.pole.fill(scaled);
            self.restarting = false;
            return (scaled, true);
        }
        match self.cascade(scaled) {
            Some(y) => (y, true),
            None => {
                self.restarting = true;
                (scaled, false)
            }
        }
    }

    /// Run the N-stage difference equation, feeding each stage's output to
    /// the next. `None` aborts on the first overflowing add/subtract,
    /// leaving whatever poles were already written; the caller restarts.
    fn cascade(&mut self, x: i32) -> Option<i32> {
        let mut current = x;
        for pole in self.pole.iter_mut() {
            let diff = current.wrapping_sub(*pole);
            if overflowed(current, pole.wrapping_neg(), diff) {
                return None;
            }
            let lag = self.lag.apply(diff)?;
            let next = lag.wrapping_add(*pole);
            if overflowed(lag, *pole, next) {
                return None;
            }
            *pole = next;
            current = next;
        }
        Some(current)
    }

    /// Request a restart: the next tick reseeds the pole bank.
    pub fn restart(&mut self) {
        self.restarting = true;
    }

    /// Turn filtering on.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Turn filtering off. Ticks pass the scaled raw value through with a
    /// `false` success flag.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Whether filtering is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// ADC input resolution in bits
    pub fn adc_resolution_bits(&self) -> u32 {
        self.adc_resolution_bits
    }

    /// Filter register width in bits
    pub fn word_bits(&self) -> u32 {
        WORD_BITS
    }

    /// Active corner frequency in Hz
    pub fn corner_freq(&self) -> u32 {
        self.corner_freq
    }

    /// Active sample period in µs
    pub fn sample_period(&self) -> u32 {
        self.sample_period
    }

    /// Active lag parameter
    pub fn lag(&self) -> L {
        self.lag
    }

    /// Return the current filter output
    pub fn output(&self) -> i32 {
        self.pole[N - 1]
    }
}
