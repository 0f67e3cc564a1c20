/// Continuous domain → pixel range mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain_min: f64,
    domain_max: f64,
    range_min: f64,
    range_max: f64,
}

impl LinearScale {
    pub fn new(domain_min: f64, domain_max: f64, range_min: f64, range_max: f64) -> Self {
        Self {
            domain_min,
            domain_max,
            range_min,
            range_max,
        }
    }

    /// `[0, max]` value axis with a floor of 1 so all-zero data still gets
    /// a non-degenerate scale.
    pub fn zero_based(max: f64, range_min: f64, range_max: f64) -> Self {
        let top = if max.is_finite() { max.max(1.0) } else { 1.0 };
        Self::new(0.0, top, range_min, range_max)
    }

    #[must_use]
    pub fn map(&self, value: f64) -> f64 {
        let d = self.domain_max - self.domain_min;
        if d.abs() < 1e-12 {
            return self.range_min;
        }
        let t = (value - self.domain_min) / d;
        self.range_min + t * (self.range_max - self.range_min)
    }

    /// Evenly spaced ticks including both domain endpoints.
    #[must_use]
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let n = count.max(2);
        let span = self.domain_max - self.domain_min;
        (0..n)
            .map(|i| self.domain_min + span * (i as f64 / (n - 1) as f64))
            .collect()
    }

    /// Extend the upper domain bound to a "nice" round number (1, 2, 2.5, 5 × 10ⁿ
    /// per tick) so tick labels read cleanly.
    #[must_use]
    pub fn nice(self, tick_count: usize) -> Self {
        let n = tick_count.max(2) - 1;
        let span = self.domain_max - self.domain_min;
        if !(span > 0.0) || !span.is_finite() {
            return self;
        }
        let raw_step = span / n as f64;
        let magnitude = 10f64.powf(raw_step.log10().floor());
        let step = [1.0, 2.0, 2.5, 5.0, 10.0]
            .into_iter()
            .map(|m| m * magnitude)
            .find(|s| *s >= raw_step)
            .unwrap_or(10.0 * magnitude);
        Self {
            domain_max: self.domain_min + step * n as f64,
            ..self
        }
    }
}

/// Discrete bands (bar chart categories).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandScale {
    count: usize,
    start: f64,
    step: f64,
    band_width: f64,
}

impl BandScale {
    pub fn new(
        count: usize,
        range_min: f64,
        range_max: f64,
        padding_inner: f64,
        padding_outer: f64,
    ) -> Self {
        if count == 0 {
            return Self {
                count: 0,
                start: range_min,
                step: 0.0,
                band_width: 0.0,
            };
        }
        let count_f = count as f64;
        let span = (range_max - range_min).max(0.0);
        let denom = (count_f - padding_inner + 2.0 * padding_outer).max(1e-6);
        let step = span / denom;
        let band_width = step * (1.0 - padding_inner).max(0.0);
        let start = range_min + step * padding_outer;
        Self {
            count,
            start,
            step,
            band_width,
        }
    }

    #[must_use]
    pub fn band_width(&self) -> f64 {
        self.band_width
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[must_use]
    pub fn band_start(&self, idx: usize) -> Option<f64> {
        if idx >= self.count {
            return None;
        }
        Some(self.start + self.step * idx as f64)
    }

    #[must_use]
    pub fn center(&self, idx: usize) -> Option<f64> {
        self.band_start(idx).map(|x| x + self.band_width * 0.5)
    }
}

/// Discrete points spread across a range (line chart x axis).
///
/// A single point sits in the middle of the range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointScale {
    count: usize,
    range_min: f64,
    range_max: f64,
}

impl PointScale {
    pub fn new(count: usize, range_min: f64, range_max: f64) -> Self {
        Self {
            count,
            range_min,
            range_max,
        }
    }

    #[must_use]
    pub fn position(&self, idx: usize) -> Option<f64> {
        if idx >= self.count {
            return None;
        }
        if self.count == 1 {
            return Some((self.range_min + self.range_max) * 0.5);
        }
        let t = idx as f64 / (self.count - 1) as f64;
        Some(self.range_min + t * (self.range_max - self.range_min))
    }

    /// Distance between neighbouring points.
    #[must_use]
    pub fn step(&self) -> f64 {
        if self.count < 2 {
            self.range_max - self.range_min
        } else {
            (self.range_max - self.range_min) / (self.count - 1) as f64
        }
    }
}
