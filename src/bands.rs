use crate::{
    error::{InvalidSpec, Result},
    grid::FrequencyGrid,
};
use num_traits::Float;

/// Partition of the grid samples into passband, transition and stopband.
///
/// Each field lists grid indices in ascending order. The transition samples
/// are not constrained by the optimizer, except for the non-negativity of the
/// power spectrum.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct BandIndices {
    /// Samples with `w <= passband_edge`.
    pub passband: Vec<usize>,
    /// Samples with `passband_edge < w < stopband_edge`.
    pub transition: Vec<usize>,
    /// Samples with `w >= stopband_edge`.
    pub stopband: Vec<usize>,
}

impl BandIndices {
    /// Splits the grid at the band edges.
    ///
    /// A sample that falls exactly on a band edge belongs to that band. Fails
    /// if the band edges are in the wrong order or if one of the bands
    /// receives no samples.
    pub fn partition<T: Float>(
        grid: &FrequencyGrid<T>,
        passband_edge: T,
        stopband_edge: T,
    ) -> Result<BandIndices> {
        if passband_edge >= stopband_edge {
            return Err(InvalidSpec::BandEdgesWrongOrder.into());
        }
        let mut bands = BandIndices {
            passband: Vec::new(),
            transition: Vec::new(),
            stopband: Vec::new(),
        };
        for (j, &w) in grid.freqs().iter().enumerate() {
            if w <= passband_edge {
                bands.passband.push(j);
            } else if w >= stopband_edge {
                bands.stopband.push(j);
            } else {
                bands.transition.push(j);
            }
        }
        if bands.passband.is_empty() {
            return Err(InvalidSpec::EmptyPassband.into());
        }
        if bands.stopband.is_empty() {
            return Err(InvalidSpec::EmptyStopband.into());
        }
        Ok(bands)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use std::f64::consts::PI;

    #[test]
    fn disjoint_and_complete() {
        let grid = FrequencyGrid::<f64>::new(10, 15).unwrap();
        let (wp, ws) = (0.3 * PI, 0.5 * PI);
        let bands = BandIndices::partition(&grid, wp, ws).unwrap();
        let total = bands.passband.len() + bands.transition.len() + bands.stopband.len();
        assert_eq!(total, grid.len());
        // the grid is ascending, so the three index sets are contiguous runs
        assert_eq!(*bands.passband.last().unwrap() + 1, bands.transition[0]);
        assert_eq!(*bands.transition.last().unwrap() + 1, bands.stopband[0]);
        for &j in &bands.transition {
            let w = grid.freqs()[j];
            assert!(w > wp && w < ws);
        }
        assert!(bands.passband.iter().all(|&j| grid.freqs()[j] <= wp));
        assert!(bands.stopband.iter().all(|&j| grid.freqs()[j] >= ws));
    }

    #[test]
    fn edges_on_grid_samples_belong_to_bands() {
        let grid = FrequencyGrid::<f64>::new(1, 5).unwrap();
        // grid is 0, pi/4, pi/2, 3pi/4, pi
        let wp = grid.freqs()[1];
        let ws = grid.freqs()[3];
        let bands = BandIndices::partition(&grid, wp, ws).unwrap();
        assert_eq!(bands.passband, vec![0, 1]);
        assert_eq!(bands.transition, vec![2]);
        assert_eq!(bands.stopband, vec![3, 4]);
    }

    #[test]
    fn empty_transition() {
        let grid = FrequencyGrid::<f64>::new(1, 5).unwrap();
        let ws = grid.freqs()[2];
        let wp = ws - 1e-12;
        let bands = BandIndices::partition(&grid, wp, ws).unwrap();
        assert_eq!(bands.passband, vec![0, 1]);
        assert!(bands.transition.is_empty());
        assert_eq!(bands.stopband, vec![2, 3, 4]);
    }

    #[test]
    fn empty_bands() {
        let grid = FrequencyGrid::<f64>::new(1, 5).unwrap();
        assert!(matches!(
            BandIndices::partition(&grid, -0.1, 0.5),
            Err(Error::InvalidSpec(InvalidSpec::EmptyPassband))
        ));
        assert!(matches!(
            BandIndices::partition(&grid, 2.5, 3.2),
            Err(Error::InvalidSpec(InvalidSpec::EmptyStopband))
        ));
        assert!(matches!(
            BandIndices::partition(&grid, 1.0, 1.0),
            Err(Error::InvalidSpec(InvalidSpec::BandEdgesWrongOrder))
        ));
    }
}
