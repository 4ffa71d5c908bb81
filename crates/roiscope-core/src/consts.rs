/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f64 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f64 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f64 = 0.114;

/// Number of channels treated as RGB for luminance conversion.
pub const RGB_CHANNEL_COUNT: usize = 3;

/// Number of histogram bins used for entropy.
pub const ENTROPY_HISTOGRAM_BINS: usize = 256;

/// Value range `[lo, hi]` covered by the entropy histogram.
pub const ENTROPY_HISTOGRAM_RANGE: (f64, f64) = (0.0, 255.0);

/// Scale turning a median absolute deviation into a Gaussian sigma estimate.
pub const MAD_GAUSSIAN_SCALE: f64 = 0.6745;

/// Array file extensions in loading priority order.
pub const ITEM_EXTENSIONS: [&str; 4] = ["npy", "npz", "h5", "hdf5"];

/// Maximum number of variables a derived-trace expression may bind.
pub const MAX_EXPRESSION_VARIABLES: usize = 4;

/// Upper bound on the buffer reserved up front for one `.npz` member.
/// The declared size comes from the archive and is not trusted beyond this.
pub const NPZ_MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Deepest nesting of parentheses, calls, unary signs and operator chains
/// an expression may reach before parsing fails.
pub const MAX_EXPRESSION_DEPTH: usize = 128;
