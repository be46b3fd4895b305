use image::{DynamicImage, GrayImage};
use tracing::{debug, instrument};

use crate::error::SegmentError;
use crate::graph::FlowGraph;
use crate::grid::build_grid_graph;
use crate::maxflow::MaxFlow;
use crate::segment::{extract_labels, LabelGrid};
use crate::{ImageEnergy, Label};

/// Tuning constants of the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MrfParams {
    /// Variance of the zero-mean Gaussian noise assumed on every intensity.
    pub noise_var : f64,
    /// Capacity of every neighbor arc, the price of a label change between neighbors.
    pub smoothness : f64,
}

impl Default for MrfParams {
    fn default() -> Self {
        MrfParams { noise_var : 0.09, smoothness : 0.5 }
    }
}

impl MrfParams {
    pub fn validate(&self) -> Result<(), SegmentError> {
        if !(self.noise_var.is_finite() && self.noise_var > 0.0) {
            return Err(SegmentError::InvalidParameter { name : "noise_var", value : self.noise_var });
        }
        if !(self.smoothness.is_finite() && self.smoothness >= 0.0) {
            return Err(SegmentError::InvalidParameter { name : "smoothness", value : self.smoothness });
        }
        Ok(())
    }
}

/// Unnormalized Gaussian likelihood of a deviation `x`.
pub fn likelihood(x : f64, noise_var : f64) -> f64 {
    (-(x * x) / (2.0 * noise_var)).exp()
}

/// Negative log of `likelihood`.
pub fn cost(x : f64, noise_var : f64) -> f64 {
    (x * x) / (2.0 * noise_var)
}

/// Grayscale image with intensities in [0, 1], row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityGrid {
    width : usize,
    height : usize,
    values : Vec<f64>,
}

impl IntensityGrid {
    pub fn new(width : usize, height : usize, values : Vec<f64>) -> Result<Self, SegmentError> {
        if width == 0 || height == 0 {
            return Err(SegmentError::EmptyImage);
        }
        if values.len() != width * height {
            return Err(SegmentError::ShapeMismatch {
                width,
                height,
                len : values.len(),
                expected : width * height,
            });
        }
        if let Some(i) = values.iter().position(|v| !(0.0..=1.0).contains(v)) {
            return Err(SegmentError::IntensityOutOfRange { x : i % width, y : i / width, value : values[i] });
        }
        Ok(IntensityGrid { width, height, values })
    }

    pub fn from_fn(width : usize, height : usize, mut f : impl FnMut(usize, usize) -> f64) -> Result<Self, SegmentError> {
        let mut values = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Self::new(width, height, values)
    }

    /// 8-bit luma scaled to [0, 1].
    pub fn from_luma(img : &GrayImage) -> Result<Self, SegmentError> {
        let (w, h) = img.dimensions();
        let values = img.pixels().map(|p| p.0[0] as f64 / 255.0).collect();
        Self::new(w as usize, h as usize, values)
    }

    pub fn from_image(img : &DynamicImage) -> Result<Self, SegmentError> {
        Self::from_luma(&img.to_luma8())
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, x : usize, y : usize) -> f64 {
        self.values[(y * self.width) + x]
    }
}

/// Gaussian noise model over a binary image.
///
/// A pixel is tied to the foreground terminal by `cost(intensity)` and to the background
/// terminal by `cost(1 - intensity)`, so bright pixels hold on to foreground and dark ones to
/// background. Neighbors with different labels pay a flat `smoothness`.
pub struct GaussianNoiseEnergy<'a> {
    pub image : &'a IntensityGrid,
    pub params : MrfParams,
}

impl ImageEnergy<f64> for GaussianNoiseEnergy<'_> {
    fn dimensions(&self) -> (usize, usize) {
        self.image.dimensions()
    }

    fn single_energy(&self, x : usize, y : usize, label : Label) -> f64 {
        let intensity = self.image.get(x, y);
        match label {
            Label::Background => cost(1.0 - intensity, self.params.noise_var),
            Label::Foreground => cost(intensity, self.params.noise_var),
        }
    }

    fn dual_energy(&self, _x1 : usize, _y1 : usize, label1 : Label, _x2 : usize, _y2 : usize, label2 : Label) -> f64 {
        if label1 == label2 {
            return 0.0;
        }
        return self.params.smoothness;
    }
}

/// A binary field over one image: its flow network and, once solved, the max flow.
#[derive(Clone, Debug)]
pub struct Mrf {
    graph : FlowGraph<f64>,
    width : usize,
    height : usize,
    flow : Option<MaxFlow<f64>>,
}

impl Mrf {
    #[instrument(skip_all, fields(width = image.width, height = image.height))]
    pub fn from_image(image : &IntensityGrid, params : MrfParams) -> Result<Self, SegmentError> {
        params.validate()?;
        let energy = GaussianNoiseEnergy { image, params };
        let graph = build_grid_graph(&energy)?;
        Ok(Mrf { graph, width : image.width, height : image.height, flow : None })
    }

    pub fn solve(&mut self) -> Result<MaxFlow<f64>, SegmentError> {
        let flow = self.graph.solve()?;
        self.flow = Some(flow);
        Ok(flow)
    }

    /// The last solve result, if any.
    pub fn flow(&self) -> Option<MaxFlow<f64>> {
        self.flow
    }

    pub fn labels(&self) -> Result<LabelGrid, SegmentError> {
        extract_labels(&self.graph, self.width, self.height)
    }

    pub fn graph(&self) -> &FlowGraph<f64> {
        &self.graph
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Builds the field for `image`, solves it and returns the labels.
pub fn segment(image : &IntensityGrid, params : MrfParams) -> Result<LabelGrid, SegmentError> {
    let mut mrf = Mrf::from_image(image, params)?;
    let flow = mrf.solve()?;
    debug!(value = flow.value, augmentations = flow.augmentations, "field solved");
    mrf.labels()
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::search::find_augmenting_path;

    fn uniform(width : usize, height : usize, value : f64) -> IntensityGrid {
        IntensityGrid::from_fn(width, height, |_, _| value).unwrap()
    }

    #[test]
    fn bright_pixels_tie_harder_to_foreground() {
        let energy = GaussianNoiseEnergy { image : &uniform(1, 1, 0.9), params : MrfParams::default() };
        let u0 = energy.single_energy(0, 0, Label::Background);
        let u1 = energy.single_energy(0, 0, Label::Foreground);
        assert!((u0 - 0.01 / 0.18).abs() < 1e-12);
        assert!((u1 - 0.81 / 0.18).abs() < 1e-12);
        assert!(u1 > u0);
        assert!((cost(0.4, 0.09) + likelihood(0.4, 0.09).ln()).abs() < 1e-12);
        assert_eq!(energy.dual_energy(0, 0, Label::Background, 1, 0, Label::Foreground), 0.5);
        assert_eq!(energy.dual_energy(0, 0, Label::Foreground, 1, 0, Label::Foreground), 0.0);
    }

    #[test]
    fn uniform_bright_image_is_all_foreground() {
        for (w, h) in [(1, 1), (4, 3), (7, 7)] {
            let labels = segment(&uniform(w, h, 1.0), MrfParams::default()).unwrap();
            assert_eq!(labels.count(Label::Foreground), w * h);
        }
    }

    #[test]
    fn uniform_dark_image_is_all_background() {
        let labels = segment(&uniform(5, 4, 0.0), MrfParams::default()).unwrap();
        assert_eq!(labels.count(Label::Background), 20);
    }

    #[test]
    fn clean_halves_are_recovered() {
        let image = IntensityGrid::from_fn(4, 3, |x, _| if x < 2 { 1.0 } else { 0.0 }).unwrap();
        let mut mrf = Mrf::from_image(&image, MrfParams::default()).unwrap();
        let flow = mrf.solve().unwrap();
        // Seven neighbor edges cross the seam, plus the bottom-left -w-1 edge, at 0.5 each.
        assert!((flow.value - 4.0).abs() < 1e-9);
        let labels = mrf.labels().unwrap();
        for y in 0..3 {
            for x in 0..4 {
                let expected = if x < 2 { Label::Foreground } else { Label::Background };
                assert_eq!(labels.get(x, y), Some(expected));
            }
        }
        assert!(find_augmenting_path(mrf.graph()).unwrap().is_none());
    }

    #[test]
    fn isolated_speck_is_smoothed_away() {
        let image = IntensityGrid::from_fn(5, 5, |x, y| if (x, y) == (2, 2) { 0.7 } else { 0.0 }).unwrap();
        let labels = segment(&image, MrfParams::default()).unwrap();
        assert_eq!(labels.count(Label::Foreground), 0);
    }

    #[test]
    fn strong_speck_survives() {
        let image = IntensityGrid::from_fn(5, 5, |x, y| if (x, y) == (2, 2) { 1.0 } else { 0.0 }).unwrap();
        let labels = segment(&image, MrfParams::default()).unwrap();
        assert_eq!(labels.count(Label::Foreground), 1);
        assert_eq!(labels.get(2, 2), Some(Label::Foreground));
    }

    #[test]
    fn solved_field_has_no_augmenting_path() {
        let image = IntensityGrid::from_fn(6, 5, |x, y| ((x * 7 + y * 3) % 11) as f64 / 10.0).unwrap();
        let mut mrf = Mrf::from_image(&image, MrfParams::default()).unwrap();
        assert_eq!(mrf.flow(), None);
        let flow = mrf.solve().unwrap();
        assert_eq!(mrf.flow(), Some(flow));
        assert!(find_augmenting_path(mrf.graph()).unwrap().is_none());
        assert!(mrf.graph().edges().all(|(_, _, e)| e.usage() <= e.capacity()));
    }

    #[test]
    fn segmentation_is_deterministic() {
        let image = IntensityGrid::from_fn(8, 6, |x, y| ((x * 5 + y * 9) % 13) as f64 / 12.0).unwrap();
        let first = segment(&image, MrfParams::default()).unwrap();
        let second = segment(&image, MrfParams::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn intensity_grid_validation() {
        assert_eq!(IntensityGrid::new(0, 3, vec![]), Err(SegmentError::EmptyImage));
        assert_eq!(
            IntensityGrid::new(2, 2, vec![0.0; 3]),
            Err(SegmentError::ShapeMismatch { width : 2, height : 2, len : 3, expected : 4 })
        );
        assert_eq!(
            IntensityGrid::new(2, 2, vec![0.0, 0.5, 1.5, 1.0]),
            Err(SegmentError::IntensityOutOfRange { x : 0, y : 1, value : 1.5 })
        );
        assert!(IntensityGrid::new(1, 1, vec![f64::NAN]).is_err());
    }

    #[test]
    fn params_validation() {
        let bad_var = MrfParams { noise_var : 0.0, ..MrfParams::default() };
        assert_eq!(
            Mrf::from_image(&uniform(2, 2, 0.5), bad_var).unwrap_err(),
            SegmentError::InvalidParameter { name : "noise_var", value : 0.0 }
        );
        let bad_smoothness = MrfParams { smoothness : -1.0, ..MrfParams::default() };
        assert!(bad_smoothness.validate().is_err());
        assert!(MrfParams::default().validate().is_ok());
    }

    #[test]
    fn luma_is_normalized() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        let grid = IntensityGrid::from_luma(&img).unwrap();
        assert_eq!(grid.dimensions(), (2, 1));
        assert_eq!(grid.get(0, 0), 0.0);
        assert_eq!(grid.get(1, 0), 1.0);

        let labels = segment(&IntensityGrid::from_image(&DynamicImage::ImageLuma8(img)).unwrap(), MrfParams::default()).unwrap();
        assert_eq!(labels.to_luma().unwrap().get_pixel(1, 0).0, [255]);
    }
}
