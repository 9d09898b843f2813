/// Reusable 1D histogram with uniform bin widths.
///
/// Bins span the closed range `[min, max]`; as for `numpy.histogram`, a value
/// equal to `max` lands in the last bin.
#[derive(Debug, Clone)]
pub struct Histogram {
    min: f64,
    max: f64,
    bin_width: f64,
    bins: Vec<f64>,
    /// Number of values that landed in a bin
    total: f64,
}

impl Histogram {
    /// Create a new histogram with `num_bins` equal bins between `min` and `max`.
    pub fn new(min: f64, max: f64, num_bins: usize) -> Self {
        assert!(max > min, "max must be greater than min");
        assert!(num_bins > 0, "at least one bin is required");
        Self {
            min,
            max,
            bin_width: (max - min) / num_bins as f64,
            bins: vec![0.0; num_bins],
            total: 0.0,
        }
    }

    /// Increment the bin corresponding to `value`.
    /// Out-of-range and non-finite values are silently ignored.
    pub fn add(&mut self, value: f64) {
        if let Some(bin) = self.bin_index(value) {
            self.bins[bin] += 1.0;
            self.total += 1.0;
        }
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Center of the i-th bin.
    pub fn bin_center(&self, i: usize) -> f64 {
        (i as f64 + 0.5).mul_add(self.bin_width, self.min)
    }

    /// Bin width.
    pub const fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Number of values inside the histogram range.
    pub const fn total(&self) -> f64 {
        self.total
    }

    /// Iterator over `(bin_center, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.bins
            .iter()
            .enumerate()
            .map(|(i, &count)| (self.bin_center(i), count))
    }

    /// Iterator over `(bin_center, density)` pairs where `Σ density · bin_width = 1`.
    ///
    /// All densities are zero if the histogram is empty.
    pub fn density(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let norm = if self.total > 0.0 {
            1.0 / (self.total * self.bin_width)
        } else {
            0.0
        };
        self.iter().map(move |(x, count)| (x, count * norm))
    }

    /// Raw bin index for a value, or `None` if out of range.
    fn bin_index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.min || value > self.max {
            return None;
        }
        let i = ((value - self.min) / self.bin_width) as usize;
        Some(i.min(self.bins.len() - 1))
    }

    /// Direct read access to the count in the i-th bin.
    #[cfg(test)]
    pub fn count(&self, i: usize) -> f64 {
        self.bins[i]
    }
}

impl Extend<f64> for Histogram {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        iter.into_iter().for_each(|value| self.add(value));
    }
}
