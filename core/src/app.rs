//! Application related stuff

use crate::base::*;
use crate::paramset::*;
use crate::scene::DemoScene;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

/// Output image formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ImageFormat {
    /// OpenEXR, linear.
    Exr,

    /// 8-bit PNG, gamma corrected.
    Png,
}

/// System wide options.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Gradient-domain volumetric photon mapping", long_about = None)]
pub struct Options {
    /// Number of threads to use for rendering.
    #[arg(
        long = "nthreads",
        short = 't',
        value_name = "NUM",
        default_value_t = 0,
        help = "Use specified number of threads for rendering (0 uses all logical CPUs)."
    )]
    n_threads: usize,

    /// Suppress all text output other than error messages.
    #[arg(long, help = "Suppress all text output other than error messages.")]
    pub quiet: bool,

    /// Output destination prefix.
    #[arg(
        long = "outfile",
        short = 'o',
        value_name = "PREFIX",
        default_value = "gvpm",
        help = "Prefix of the exported images and timing file."
    )]
    pub destination: String,

    /// Output image format.
    #[arg(long, value_enum, default_value_t = ImageFormat::Exr, help = "Format of the exported images.")]
    pub format: ImageFormat,

    /// Demo scene.
    #[arg(long, value_enum, default_value_t = DemoScene::Cornell, help = "Built-in scene to render.")]
    pub scene: DemoScene,

    /// Image width.
    #[arg(long, value_name = "NUM", default_value_t = 128, help = "Image width in pixels.")]
    pub width: usize,

    /// Image height.
    #[arg(long, value_name = "NUM", default_value_t = 128, help = "Image height in pixels.")]
    pub height: usize,

    /// Number of passes.
    #[arg(
        long = "passes",
        short = 'n',
        value_name = "NUM",
        default_value_t = 10,
        allow_negative_numbers = true,
        help = "Number of passes (-1 renders until cancelled)."
    )]
    pub max_passes: Int,

    /// Reconstruction period.
    #[arg(long = "dump", value_name = "NUM", default_value_t = 1, help = "Reconstruct and export every NUM passes.")]
    pub dump_iteration: Int,

    /// Volume technique.
    #[arg(
        long = "technique",
        value_name = "NAME",
        default_value = "distance",
        help = "Volume technique: none, distance, bre, bre3d, beam, beam3d, beam3dacc, plane0d."
    )]
    pub vol_technique: String,

    /// Surface photons per pass.
    #[arg(long = "photons", value_name = "NUM", default_value_t = 250000, help = "Surface photons per pass.")]
    pub photon_count: Int,

    /// Volume photons per pass.
    #[arg(
        long = "volume-photons",
        value_name = "NUM",
        default_value_t = 250000,
        help = "Volume photons or beams per pass."
    )]
    pub volume_photon_count: Int,

    /// Maximum path depth.
    #[arg(
        long = "maxdepth",
        value_name = "NUM",
        default_value_t = 12,
        allow_negative_numbers = true,
        help = "Maximum path depth (-1 for infinite)."
    )]
    pub max_depth: Int,

    /// Minimum path depth.
    #[arg(long = "mindepth", value_name = "NUM", default_value_t = 0, help = "Minimum path depth.")]
    pub min_depth: Int,

    /// Radius reduction parameter.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.7, help = "Progressive radius reduction parameter.")]
    pub alpha: Float,

    /// Tile size.
    #[arg(
        long = "tilesize",
        short = 'p',
        value_name = "NUM",
        default_value_t = 32,
        help = "Size in pixels of square tiles processed per thread."
    )]
    pub tile_size: Int,

    /// Use next event estimation at gather points.
    #[arg(long = "direct", help = "Estimate direct lighting by next event estimation.")]
    pub direct_tracing: bool,

    /// Fix the work split per worker.
    #[arg(long, help = "Split photon shooting evenly across workers.")]
    pub deterministic: bool,

    /// Disable the L1 reconstruction.
    #[arg(long = "no-l1", help = "Skip the L1 reconstruction.")]
    pub no_l1: bool,
}

impl Options {
    /// Returns the number of threads to use.
    pub fn threads(&self) -> usize {
        let max_threads = num_cpus::get();
        match self.n_threads {
            0 => max_threads,
            n if n > max_threads => {
                warn!("Num threads > max logical CPUs {}", max_threads);
                max_threads
            }
            n => n,
        }
    }

    /// Returns the integrator parameters selected on the command line.
    pub fn to_param_set(&self) -> ParamSet {
        let mut ps = ParamSet::new();
        ps.add_int("maxPasses", &[self.max_passes]);
        ps.add_int("dumpIteration", &[self.dump_iteration]);
        ps.add_int("photonCount", &[self.photon_count]);
        ps.add_int("volumePhotonCount", &[self.volume_photon_count]);
        ps.add_int("maxDepth", &[self.max_depth]);
        ps.add_int("minDepth", &[self.min_depth]);
        ps.add_int("blockSize", &[self.tile_size]);
        ps.add_float("alpha", &[self.alpha]);
        ps.add_one_string("volTechnique", &self.vol_technique);
        ps.add_bool("directTracing", &[self.direct_tracing]);
        ps.add_bool("deterministic", &[self.deterministic]);
        ps.add_bool("reconstructL1", &[!self.no_l1]);
        ps
    }
}

/// Returns a progress bar used by long running loops.
///
/// * `len` - Number of steps.
pub fn create_progress_bar(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
    {
        progress.set_style(style.progress_chars("##-"));
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_maps_to_params() {
        let options = Options::parse_from([
            "gvpm",
            "--technique",
            "bre3d",
            "--passes",
            "3",
            "--maxdepth",
            "-1",
            "--no-l1",
        ]);
        let ps = options.to_param_set();
        assert_eq!(ps.find_one_string("volTechnique", String::new()), "bre3d");
        assert_eq!(ps.find_one_int("maxPasses", 0), 3);
        assert_eq!(ps.find_one_int("maxDepth", 0), -1);
        assert!(!ps.find_one_bool("reconstructL1", true));
        assert!(options.threads() >= 1);
    }
}
