//! Anti-aliased linear rescaling of n-dimensional arrays.
//!
//! Every axis is handled independently: an optional Gaussian pre-filter
//! followed by linear interpolation onto the new grid. Both steps are
//! separable, so running them axis by axis gives the same result as the full
//! multi-linear filter. All arithmetic happens in `f64`.

use ndarray::{Array, ArrayView, Axis, Dimension, Zip};

use crate::voxel::Voxel;

const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Rescales `input` by a per-axis `scale` factor and casts back to `T`.
///
/// Output lengths are `max(round_half_even(len * scale), 1)`. Axes with a
/// factor of exactly 1.0 are left untouched. With `anti_aliasing`, each
/// shrinking axis is smoothed first with sigma `(len / out_len - 1) / 2`.
/// Values are never normalised; the input range is preserved.
///
/// # Panics
/// If `scale` does not have one entry per axis.
pub fn rescale<T: Voxel, D: Dimension>(
    input: ArrayView<'_, T, D>,
    scale: &[f64],
    anti_aliasing: bool,
) -> Array<T, D> {
    assert_eq!(scale.len(), input.ndim(), "one scale factor per axis");

    let mut work = input.mapv(T::to_f64);
    for (index, &factor) in scale.iter().enumerate() {
        if factor == 1.0 {
            continue;
        }
        let axis = Axis(index);
        let len = work.len_of(axis);
        let out_len = output_len(len, factor);

        if anti_aliasing {
            let sigma = ((len as f64 / out_len as f64 - 1.0) / 2.0).max(0.0);
            if sigma > 0.0 {
                work = convolve_axis(&work, axis, &gaussian_kernel(sigma));
            }
        }
        if out_len != len {
            work = resample_axis(&work, axis, out_len);
        }
    }
    work.mapv(T::from_f64)
}

pub fn output_len(len: usize, factor: f64) -> usize {
    ((len as f64 * factor).round_ties_even() as usize).max(1)
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Index into `0..len` with mirror boundary (`d c b | a b c d | c b a`).
fn mirror(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let folded = index.rem_euclid(period);
    if folded >= len as isize {
        (period - folded) as usize
    } else {
        folded as usize
    }
}

fn convolve_axis<D: Dimension>(
    input: &Array<f64, D>,
    axis: Axis,
    kernel: &[f64],
) -> Array<f64, D> {
    let radius = (kernel.len() / 2) as isize;
    let mut output = Array::zeros(input.raw_dim());
    Zip::from(output.lanes_mut(axis))
        .and(input.lanes(axis))
        .for_each(|mut dst, src| {
            let len = src.len();
            for (i, value) in dst.iter_mut().enumerate() {
                *value = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * src[mirror(i as isize + k as isize - radius, len)])
                    .sum();
            }
        });
    output
}

/// Linear interpolation onto `out_len` samples with pixel-centre alignment.
fn resample_axis<D: Dimension>(
    input: &Array<f64, D>,
    axis: Axis,
    out_len: usize,
) -> Array<f64, D> {
    let len = input.len_of(axis);
    let ratio = len as f64 / out_len as f64;
    let mut dim = input.raw_dim();
    dim[axis.index()] = out_len;
    let mut output = Array::zeros(dim);
    Zip::from(output.lanes_mut(axis))
        .and(input.lanes(axis))
        .for_each(|mut dst, src| {
            for (i, value) in dst.iter_mut().enumerate() {
                let position = (i as f64 + 0.5) * ratio - 0.5;
                let lower = position.floor();
                let frac = position - lower;
                let lower = lower as isize;
                *value = (1.0 - frac) * src[mirror(lower, len)]
                    + frac * src[mirror(lower + 1, len)];
            }
        });
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array1, Array3};

    #[test]
    fn mirror_reflects_without_repeating_the_edge() {
        let folded: Vec<usize> = (-3..7).map(|i| mirror(i, 4)).collect();
        assert_eq!(folded, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(mirror(-5, 1), 0);
    }

    #[test]
    fn output_length_rounds_half_to_even() {
        assert_eq!(output_len(64, 0.5), 32);
        assert_eq!(output_len(33, 0.5), 16);
        assert_eq!(output_len(3, 0.5), 2);
        assert_eq!(output_len(5, 0.5), 2);
        assert_eq!(output_len(1, 0.5), 1);
    }

    #[test]
    fn kernel_is_normalised() {
        let kernel = gaussian_kernel(0.5);
        assert_eq!(kernel.len(), 5);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(kernel[2] > kernel[1] && kernel[1] > kernel[0]);
    }

    #[test]
    fn plain_interpolation_averages_neighbours() {
        let input: Array1<f32> = arr1(&[0.0, 2.0, 4.0, 6.0]);
        let output = rescale(input.view(), &[0.5], false);
        assert_eq!(output, arr1(&[1.0f32, 5.0]));
    }

    #[test]
    fn integer_results_truncate_toward_zero() {
        // pixel centres land halfway between neighbours: 0.5 and 2.5
        let input: Array1<u8> = arr1(&[0, 1, 2, 3]);
        let output = rescale(input.view(), &[0.5], false);
        assert_eq!(output, arr1(&[0u8, 2]));
    }

    #[test]
    fn constant_volume_is_preserved() {
        let input = Array3::<u16>::from_elem((6, 10, 7), u16::MAX);
        let output = rescale(input.view(), &[0.5, 0.5, 0.5], true);
        assert_eq!(output.shape(), &[3, 5, 4]);
        // ulp-level filter error may truncate one step below the input
        assert!(output.iter().all(|&v| v >= u16::MAX - 1));
    }

    #[test]
    fn unit_axes_are_untouched() {
        let input = Array3::from_shape_fn((2, 4, 4), |(z, y, x)| (z * 16 + y * 4 + x) as i32);
        let output = rescale(input.view(), &[1.0, 1.0, 1.0], true);
        assert_eq!(output, input);
    }

    #[test]
    fn filtered_values_stay_in_range() {
        let input = Array3::from_shape_fn((8, 8, 8), |(z, y, x)| {
            if (z + y + x) % 2 == 0 {
                255u8
            } else {
                0u8
            }
        });
        let output = rescale(input.view(), &[0.5, 0.5, 0.5], true);
        assert_eq!(output.shape(), &[4, 4, 4]);
        // a checkerboard smooths towards its mean instead of aliasing to one phase
        assert!(output.iter().all(|&v| v > 64 && v < 192));
    }
}
