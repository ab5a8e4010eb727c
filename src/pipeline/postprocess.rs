//! Conversion of decoder output back into an image.

use super::stage::StageValue;
use crate::core::{RectifyError, RectifyResult};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::{Axis, Ix2, Ix3};
use tracing::warn;

/// Fill color of the placeholder returned when postprocessing fails.
pub const PLACEHOLDER_COLOR: Rgb<u8> = Rgb([128, 128, 128]);

/// Turns decoder output into an RGB image of `original_size`.
///
/// Accepted layouts, after squeezing a leading batch axis of size one:
/// `H x W`, `H x W x 1`, `H x W x 3` and `3 x H x W`. Outputs whose maximum is
/// at most 1.0 are treated as `[0, 1]` and scaled by 255; anything else is
/// clamped to `[0, 255]`.
pub fn try_postprocess(output: &StageValue, original_size: (u32, u32)) -> RectifyResult<RgbImage> {
    let (orig_w, orig_h) = original_size;
    if orig_w == 0 || orig_h == 0 {
        return Err(RectifyError::postprocess(format!(
            "invalid target size {orig_w}x{orig_h}"
        )));
    }

    let mut arr = output.data().view();
    if arr.is_empty() {
        return Err(RectifyError::postprocess("decoder output is empty"));
    }

    if arr.ndim() == 4 {
        if arr.shape()[0] != 1 {
            return Err(RectifyError::postprocess(format!(
                "cannot squeeze batch axis of size {} from shape {:?}",
                arr.shape()[0],
                arr.shape()
            )));
        }
        arr = arr.index_axis_move(Axis(0), 0);
    }
    if arr.ndim() == 3 && arr.shape()[0] == 3 {
        arr = arr.permuted_axes(vec![1, 2, 0]);
    }

    let max = arr.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let unit_range = max <= 1.0;
    let to_u8 = |v: f32| -> u8 {
        let v = if unit_range { v * 255.0 } else { v };
        // `as` saturates and maps NaN to 0.
        v.clamp(0.0, 255.0) as u8
    };

    let image = match arr.ndim() {
        2 => {
            let gray = arr
                .into_dimensionality::<Ix2>()
                .map_err(|e| RectifyError::postprocess(e.to_string()))?;
            let (h, w) = gray.dim();
            RgbImage::from_fn(w as u32, h as u32, |x, y| {
                let v = to_u8(gray[[y as usize, x as usize]]);
                Rgb([v, v, v])
            })
        }
        3 => {
            let hwc = arr
                .into_dimensionality::<Ix3>()
                .map_err(|e| RectifyError::postprocess(e.to_string()))?;
            let (h, w, c) = hwc.dim();
            match c {
                1 => RgbImage::from_fn(w as u32, h as u32, |x, y| {
                    let v = to_u8(hwc[[y as usize, x as usize, 0]]);
                    Rgb([v, v, v])
                }),
                3 => RgbImage::from_fn(w as u32, h as u32, |x, y| {
                    let (x, y) = (x as usize, y as usize);
                    Rgb([
                        to_u8(hwc[[y, x, 0]]),
                        to_u8(hwc[[y, x, 1]]),
                        to_u8(hwc[[y, x, 2]]),
                    ])
                }),
                other => {
                    return Err(RectifyError::postprocess(format!(
                        "unsupported channel count {other} in shape {:?}",
                        hwc.shape()
                    )));
                }
            }
        }
        n => {
            return Err(RectifyError::postprocess(format!(
                "cannot interpret rank-{n} output {:?} as an image",
                arr.shape()
            )));
        }
    };

    if image.dimensions() == original_size {
        return Ok(image);
    }
    Ok(imageops::resize(&image, orig_w, orig_h, FilterType::Lanczos3))
}

/// Like [`try_postprocess`], but falls back to a uniform gray image of
/// `original_size` on failure.
pub fn postprocess(output: &StageValue, original_size: (u32, u32)) -> RgbImage {
    match try_postprocess(output, original_size) {
        Ok(image) => image,
        Err(e) => {
            warn!(error = %e, shape = ?output.shape(), "using placeholder image");
            RgbImage::from_pixel(original_size.0, original_size.1, PLACEHOLDER_COLOR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn tensor(shape: &[usize], value: f32) -> StageValue {
        StageValue::Tensor(ArrayD::from_elem(IxDyn(shape), value))
    }

    #[test]
    fn test_nchw_unit_output_becomes_rgb_of_original_size() {
        let img = postprocess(&tensor(&[1, 3, 256, 256], 0.5), (640, 480));
        assert_eq!(img.dimensions(), (640, 480));
        assert_eq!(img.get_pixel(10, 10), &Rgb([127, 127, 127]));
    }

    #[test]
    fn test_output_size_always_matches_original() {
        for shape in [vec![1, 3, 16, 16], vec![16, 16], vec![1, 48], vec![8, 8, 3], vec![8, 8, 1]] {
            let img = postprocess(&tensor(&shape, 0.2), (33, 17));
            assert_eq!(img.dimensions(), (33, 17), "shape {shape:?}");
        }
    }

    #[test]
    fn test_large_values_are_clamped() {
        let mut arr = ArrayD::from_elem(IxDyn(&[2, 2, 3]), 300.0f32);
        arr[[0, 0, 0]] = -20.0;
        arr[[0, 0, 1]] = 100.0;
        let img = try_postprocess(&StageValue::Array(arr), (2, 2)).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 100, 255]));
        assert_eq!(img.get_pixel(1, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_grayscale_is_broadcast() {
        let mut arr = ArrayD::from_elem(IxDyn(&[1, 2]), 0.0f32);
        arr[[0, 1]] = 1.0;
        let img = try_postprocess(&StageValue::Array(arr), (2, 1)).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_nan_maps_to_zero() {
        let mut arr = ArrayD::from_elem(IxDyn(&[1, 2]), 0.5f32);
        arr[[0, 0]] = f32::NAN;
        let img = try_postprocess(&StageValue::Tensor(arr), (2, 1)).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_uninterpretable_output_yields_placeholder() {
        for value in [tensor(&[2, 3, 4, 4], 0.5), tensor(&[4, 4, 5], 0.5), tensor(&[7], 0.5), tensor(&[0, 3], 0.5)] {
            assert!(try_postprocess(&value, (5, 5)).is_err());
            let img = postprocess(&value, (5, 5));
            assert_eq!(img.dimensions(), (5, 5));
            assert!(img.pixels().all(|p| *p == PLACEHOLDER_COLOR));
        }
    }
}
