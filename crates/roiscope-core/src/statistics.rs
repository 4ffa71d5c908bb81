use ndarray::{Array2, ArrayView2};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::consts::{ENTROPY_HISTOGRAM_BINS, ENTROPY_HISTOGRAM_RANGE, MAD_GAUSSIAN_SCALE};
use crate::error::{Result, RoiscopeError};
use crate::frame::Frame;
use crate::roi::{Roi, RoiGeometry};

/// Why statistics could not be computed for one ROI.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatError {
    #[error("out of bounds")]
    OutOfBounds,

    #[error("no pixels in mask")]
    EmptyMask,

    #[error("{0}")]
    InvalidImage(String),
}

/// Statistics of one ROI against one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RoiStatistics {
    Point {
        pixel_value: f64,
        x: i64,
        y: i64,
    },
    Region {
        mean: f64,
        std: f64,
        min: f64,
        max: f64,
        pixel_count: usize,
    },
}

impl RoiStatistics {
    /// Representative scalar: the pixel value of a point, the mean of a region.
    pub fn value(&self) -> f64 {
        match self {
            Self::Point { pixel_value, .. } => *pixel_value,
            Self::Region { mean, .. } => *mean,
        }
    }
}

/// Per-ROI statistics in ROI creation order.
#[derive(Clone, Debug, Default)]
pub struct RoiStatisticsReport {
    entries: Vec<(String, std::result::Result<RoiStatistics, StatError>)>,
}

impl RoiStatisticsReport {
    pub fn new(entries: Vec<(String, std::result::Result<RoiStatistics, StatError>)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<&std::result::Result<RoiStatistics, StatError>> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, stats)| stats)
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, &std::result::Result<RoiStatistics, StatError>)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Channel-reduced view of `image` used for ROI statistics.
pub fn reduced_image(image: &Frame) -> Result<Array2<f64>> {
    image.reduced()
}

/// Statistics of `roi` against `image`.
pub fn roi_statistics(roi: &Roi, image: &Frame) -> std::result::Result<RoiStatistics, StatError> {
    let reduced = reduced_image(image).map_err(|e| StatError::InvalidImage(e.to_string()))?;
    roi_statistics_on(roi, &reduced)
}

/// Statistics of `roi` against an already channel-reduced image.
pub fn roi_statistics_on(
    roi: &Roi,
    reduced: &Array2<f64>,
) -> std::result::Result<RoiStatistics, StatError> {
    if let RoiGeometry::Point(p) = roi.geometry() {
        let (row, col) = p.index_in(reduced.dim()).ok_or(StatError::OutOfBounds)?;
        return Ok(RoiStatistics::Point {
            pixel_value: reduced[[row, col]],
            x: p.x,
            y: p.y,
        });
    }

    let mask = roi.mask(reduced.dim());
    let values: Vec<f64> = reduced
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &selected)| selected.then_some(v))
        .collect();
    if values.is_empty() {
        return Err(StatError::EmptyMask);
    }

    let mean = mean(&values);
    Ok(RoiStatistics::Region {
        mean,
        std: variance(&values, mean).sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        pixel_count: values.len(),
    })
}

/// Summary statistics of one channel of a multi-channel image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub entropy: f64,
}

/// Global statistics of an image.
///
/// Multi-channel images are summarised on their luminance (3 channels) or
/// channel mean, with per-channel figures in `per_channel`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub mode: f64,
    pub variance: f64,
    pub range: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub entropy: f64,
    pub dimensions: Vec<usize>,
    pub channel_count: usize,
    pub per_channel: Vec<ChannelStatistics>,
}

pub fn basic_statistics(image: &Frame) -> Result<ImageStatistics> {
    compute_basic_statistics(image).map_err(|e| {
        warn!("Image statistics failed: {}", e);
        e
    })
}

fn compute_basic_statistics(image: &Frame) -> Result<ImageStatistics> {
    let channel_count = image.channel_count()?;
    let reduced = image.reduced()?;
    if reduced.is_empty() {
        return Err(RoiscopeError::InvalidImage("image has no pixels".into()));
    }

    let values: Vec<f64> = reduced.iter().copied().collect();
    let mean = mean(&values);
    let variance = variance(&values, mean);
    let sorted = sorted(&values);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let per_channel = if channel_count > 1 {
        (0..channel_count)
            .map(|c| image.channel(c).map(|view| channel_statistics(&view)))
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(ImageStatistics {
        mean,
        std: variance.sqrt(),
        min,
        max,
        median: median_of_sorted(&sorted),
        mode: mode_of_sorted(&sorted),
        variance,
        range: max - min,
        skewness: skewness(&values, mean, variance),
        kurtosis: kurtosis(&values, mean, variance),
        entropy: entropy(reduced.iter()),
        dimensions: image.shape().to_vec(),
        channel_count,
        per_channel,
    })
}

fn channel_statistics(view: &ArrayView2<'_, f64>) -> ChannelStatistics {
    let values: Vec<f64> = view.iter().copied().collect();
    let mean = mean(&values);
    let sorted = sorted(&values);
    ChannelStatistics {
        mean,
        std: variance(&values, mean).sqrt(),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        max: sorted.last().copied().unwrap_or(f64::NAN),
        median: median_of_sorted(&sorted),
        entropy: entropy(view.iter()),
    }
}

/// Counts of `values` in `bins` equal-width bins over `[lo, hi]`.
///
/// The last bin is closed; values outside the range (and NaN) are ignored.
pub fn histogram<'a>(
    values: impl IntoIterator<Item = &'a f64>,
    bins: usize,
    (lo, hi): (f64, f64),
) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    if bins == 0 || hi < lo {
        return counts;
    }
    let scale = if hi > lo { bins as f64 / (hi - lo) } else { 0.0 };
    for &v in values {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let idx = (((v - lo) * scale) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Shannon entropy in bits of the 256-bin histogram over `[0, 255]`.
pub fn entropy<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let counts = histogram(values, ENTROPY_HISTOGRAM_BINS, ENTROPY_HISTOGRAM_RANGE);
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    // A single occupied bin gives -0.0.
    h.max(0.0)
}

/// Image quality figures; multi-channel values are the mean over channels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// RMS deviation from the mean.
    pub contrast: f64,
    /// Variance of the 3x3 Laplacian.
    pub sharpness: f64,
    pub brightness: f64,
    /// Robust Gaussian noise sigma from the Laplacian's median absolute deviation.
    pub noise_estimate: f64,
}

pub fn image_quality_metrics(image: &Frame) -> Result<QualityMetrics> {
    compute_quality_metrics(image).map_err(|e| {
        warn!("Quality metrics failed: {}", e);
        e
    })
}

fn compute_quality_metrics(image: &Frame) -> Result<QualityMetrics> {
    let channels = image.channel_count()?;
    if channels == 0 {
        return Err(RoiscopeError::InvalidImage("image has zero channels".into()));
    }

    let per_channel = (0..channels)
        .map(|c| image.channel(c).map(|view| channel_quality(&view)))
        .collect::<Result<Vec<_>>>()?;

    let n = per_channel.len() as f64;
    Ok(QualityMetrics {
        contrast: per_channel.iter().map(|m| m.contrast).sum::<f64>() / n,
        sharpness: per_channel.iter().map(|m| m.sharpness).sum::<f64>() / n,
        brightness: per_channel.iter().map(|m| m.brightness).sum::<f64>() / n,
        noise_estimate: per_channel.iter().map(|m| m.noise_estimate).sum::<f64>() / n,
    })
}

fn channel_quality(view: &ArrayView2<'_, f64>) -> QualityMetrics {
    let values: Vec<f64> = view.iter().copied().collect();
    let brightness = mean(&values);
    let contrast = variance(&values, brightness).sqrt();

    let lap = laplacian_response(view);
    let lap_mean = mean(&lap);
    let sharpness = variance(&lap, lap_mean);

    let lap_median = median_of_sorted(&sorted(&lap));
    let deviations: Vec<f64> = lap.iter().map(|v| (v - lap_median).abs()).collect();
    let noise_estimate = median_of_sorted(&sorted(&deviations)) / MAD_GAUSSIAN_SCALE;

    QualityMetrics {
        contrast,
        sharpness,
        brightness,
        noise_estimate,
    }
}

/// Interior response of the 3x3 Laplacian kernel:
///   0  1  0
///   1 -4  1
///   0  1  0
/// Empty for images smaller than 3x3.
pub fn laplacian_response(data: &ArrayView2<'_, f64>) -> Vec<f64> {
    let (h, w) = data.dim();
    if h < 3 || w < 3 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity((h - 2) * (w - 2));
    for row in 1..h - 1 {
        for col in 1..w - 1 {
            out.push(
                -4.0 * data[[row, col]]
                    + data[[row - 1, col]]
                    + data[[row + 1, col]]
                    + data[[row, col - 1]]
                    + data[[row, col + 1]],
            );
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Moments and order statistics
// ---------------------------------------------------------------------------

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (ddof = 0).
fn variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Biased sample skewness; 0 for constant data.
fn skewness(values: &[f64], mean: f64, variance: f64) -> f64 {
    if values.is_empty() || variance <= 0.0 {
        return 0.0;
    }
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / values.len() as f64;
    m3 / variance.powf(1.5)
}

/// Biased excess (Fisher) kurtosis; 0 for constant data.
fn kurtosis(values: &[f64], mean: f64, variance: f64) -> f64 {
    if values.is_empty() || variance <= 0.0 {
        return 0.0;
    }
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / values.len() as f64;
    m4 / (variance * variance) - 3.0
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Most frequent value; ties go to the smallest.
fn mode_of_sorted(sorted: &[f64]) -> f64 {
    let mut best = (f64::NAN, 0usize);
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best.1 {
            best = (sorted[i], j - i);
        }
        i = j;
    }
    best.0
}
