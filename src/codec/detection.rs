//! Detection model tensor codec.

use crate::core::config::ModelConfig;
use crate::core::errors::OcrError;
use crate::core::Tensor4D;
use crate::geometry::HeatMap;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{ArrayD, Array4};

/// Encodes a source image into the detection model's input tensor.
///
/// The image is resized to the model's fixed (height, width), converted to
/// floating point, and normalized with the detection family's statistics
/// (`(v - 255*mean) / (255*std)`). Output shape is `(1, H, W, 3)`.
pub fn encode_detection_input(image: &RgbImage, model: &ModelConfig) -> Result<Tensor4D, OcrError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::zero_sized_image(image.width(), image.height()));
    }

    let height = model.input_height as usize;
    let width = model.input_width as usize;
    let resized = imageops::resize(
        image,
        model.input_width,
        model.input_height,
        FilterType::Nearest,
    );

    let mean = 255.0 * model.mean;
    let std = 255.0 * model.std;

    let mut tensor = Array4::<f32>::zeros((1, height, width, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, y as usize, x as usize, channel]] =
                (pixel[channel] as f32 - mean) / std;
        }
    }

    Ok(tensor)
}

/// Decodes raw detection output into a probability heatmap.
///
/// Singleton dimensions are squeezed away; the remaining two axes are taken
/// as (height, width) and each probability is quantized to an 8-bit pixel.
pub fn decode_detection_heatmap(output: &ArrayD<f32>) -> Result<HeatMap, OcrError> {
    let squeezed_dims: Vec<usize> = output
        .shape()
        .iter()
        .copied()
        .filter(|&dim| dim != 1)
        .collect();

    if squeezed_dims.len() != 2 {
        return Err(OcrError::TensorShape {
            operation: "detection decode".to_string(),
            expected: "two non-singleton axes (height, width)".to_string(),
            actual: output.shape().to_vec(),
        });
    }

    let (height, width) = (squeezed_dims[0], squeezed_dims[1]);
    let mut pixels = Vec::with_capacity(height * width);
    for &probability in output.iter() {
        pixels.push((probability.clamp(0.0, 1.0) * 255.0).round() as u8);
    }

    HeatMap::new(width as u32, height as u32, pixels)
}
