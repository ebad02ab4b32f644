use crate::error::{InvalidSpec, Result};
use num_traits::{Float, FloatConst};

/// Uniform frequency grid over [0, pi].
///
/// The grid contains `density * order` samples `w_i = i * pi / (M - 1)`, in
/// ascending order, with `w_0 = 0` and `w_{M-1} = pi`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyGrid<T> {
    freqs: Vec<T>,
}

impl<T: Float + FloatConst> FrequencyGrid<T> {
    /// Creates the grid for a filter of the given order.
    ///
    /// Fails if the order is zero or if the grid would have fewer samples than
    /// the `order + 1` unknowns of the design problem, or more than fit in a
    /// `usize`.
    pub fn new(order: usize, density: usize) -> Result<FrequencyGrid<T>> {
        if order == 0 {
            return Err(InvalidSpec::OrderZero.into());
        }
        let samples = density
            .checked_mul(order)
            .ok_or(InvalidSpec::GridTooLarge { order, density })?;
        let required = (order + 1).max(2);
        if samples < required {
            return Err(InvalidSpec::GridTooCoarse { samples, required }.into());
        }
        let scale = T::PI() / T::from(samples - 1).unwrap();
        let mut freqs: Vec<T> = (0..samples)
            .map(|j| T::from(j).unwrap() * scale)
            .collect();
        // Avoid rounding pushing the last sample away from pi.
        freqs[samples - 1] = T::PI();
        Ok(FrequencyGrid { freqs })
    }
}

impl<T: Copy> FrequencyGrid<T> {
    /// Returns the grid frequencies.
    pub fn freqs(&self) -> &[T] {
        &self.freqs
    }

    /// Returns the number of samples M.
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    /// Returns true if the grid is empty. A constructed grid never is.
    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }
}
