//! Stride downsampling for display
//!
//! **Problem**: charting tens of thousands of joined rows is wasteful when
//! the viewport can only show about a thousand.
//!
//! **Solution**: keep every `ceil(L / M)`-th row, then force the final row in.
//! Output length is at most `M + 1`, the first and last input rows are
//! always present, and relative order is preserved.

/// Default cap on rows handed to a chart
pub const DEFAULT_MAX_POINTS: usize = 1_000;

/// Indices selected when reducing `len` rows to at most `max_points` (+1).
///
/// A `max_points` of zero is treated as one.
///
/// # Examples
///
/// ```rust
/// use trueno_metrics::downsample::sample_indices;
///
/// assert_eq!(sample_indices(10, 4), vec![0, 3, 6, 9]);
/// assert_eq!(sample_indices(10, 3), vec![0, 4, 8, 9]);
/// assert_eq!(sample_indices(3, 5), vec![0, 1, 2]);
/// ```
#[must_use]
pub fn sample_indices(len: usize, max_points: usize) -> Vec<usize> {
    let max_points = max_points.max(1);
    if len <= max_points {
        return (0..len).collect();
    }

    let stride = len.div_ceil(max_points);
    let mut indices: Vec<usize> = (0..len).step_by(stride).collect();
    let last = len - 1;
    if indices.last() != Some(&last) {
        indices.push(last);
    }
    indices
}

/// Trait for bounding the length of an ordered row sequence.
pub trait Downsample<T> {
    /// Reduce to at most `max_points + 1` rows, keeping first and last.
    ///
    /// Returns a copy of the input unchanged when it already fits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trueno_metrics::downsample::Downsample;
    ///
    /// let rows: Vec<u32> = (0..10).collect();
    /// assert_eq!(rows.downsample(3), vec![0, 4, 8, 9]);
    /// ```
    fn downsample(&self, max_points: usize) -> Vec<T>;
}

impl<T: Clone> Downsample<T> for [T] {
    fn downsample(&self, max_points: usize) -> Vec<T> {
        sample_indices(self.len(), max_points)
            .into_iter()
            .map(|index| self[index].clone())
            .collect()
    }
}
