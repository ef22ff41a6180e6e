//! Recognition model tensor codec (batched input encoding).

use crate::core::config::ModelConfig;
use crate::core::errors::OcrError;
use crate::core::Tensor4D;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

/// Encodes a batch of crops into one recognition input tensor.
///
/// Each crop is resized preserving its aspect ratio so it fits within the
/// model's fixed (height, width), then zero-padded on the bottom or the right
/// (whichever side the resize left short) so every element of the batch
/// shares identical dimensions. The whole tensor is normalized with the
/// recognition family's statistics; padding therefore carries the normalized
/// value of a zero pixel, matching what the models were trained against.
///
/// Output shape is `(N, H, W, 3)` with crops in input order.
pub fn encode_recognition_batch(
    crops: &[RgbImage],
    model: &ModelConfig,
) -> Result<Tensor4D, OcrError> {
    let height = model.input_height as usize;
    let width = model.input_width as usize;

    let mean = 255.0 * model.mean;
    let std = 255.0 * model.std;
    let padding = (0.0 - mean) / std;

    let mut tensor = Array4::<f32>::from_elem((crops.len(), height, width, 3), padding);

    for (batch_index, crop) in crops.iter().enumerate() {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(OcrError::zero_sized_image(crop.width(), crop.height()));
        }

        let (resize_w, resize_h) = fit_within(crop.width(), crop.height(), model);
        let resized = imageops::resize(crop, resize_w, resize_h, FilterType::Nearest);

        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                tensor[[batch_index, y as usize, x as usize, channel]] =
                    (pixel[channel] as f32 - mean) / std;
            }
        }
    }

    Ok(tensor)
}

/// Computes the aspect-ratio-preserving resize target for one crop.
///
/// A crop wider (relative to the target aspect ratio) than the model input is
/// pinned to the full target width and padded on the bottom; a narrower crop
/// is pinned to the full target height and padded on the right.
fn fit_within(crop_w: u32, crop_h: u32, model: &ModelConfig) -> (u32, u32) {
    let target_h = model.input_height as f32;
    let target_w = model.input_width as f32;
    let aspect = model.aspect_ratio();

    let (w, h) = if aspect * crop_h as f32 > crop_w as f32 {
        // Height-bound: scale to full target height, width follows.
        let scaled_w = (target_h * crop_w as f32 / crop_h as f32).round();
        (scaled_w, target_h)
    } else {
        // Width-bound: scale to full target width, height follows.
        let scaled_h = (target_w * crop_h as f32 / crop_w as f32).round();
        (target_w, scaled_h)
    };

    (
        (w as u32).clamp(1, model.input_width),
        (h as u32).clamp(1, model.input_height),
    )
}
