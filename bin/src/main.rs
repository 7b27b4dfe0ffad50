#[macro_use]
extern crate log;

use clap::Parser;
use gvpm_core::app::*;
use gvpm_core::base::*;
use gvpm_core::error::*;
use gvpm_core::film::*;
use gvpm_core::geometry::*;
use gvpm_core::scene::*;
use integrators::GVPMIntegrator;
use std::sync::Arc;

fn main() {
    // Initialize `env_logger`.
    env_logger::init();

    let options = Options::parse();

    // In case of error report it.
    match render(&options) {
        Ok(true) => {}
        Ok(false) => warn!("Rendering was cancelled"),
        Err(e) => error!("{e}"),
    }
}

fn render(options: &Options) -> Result<bool, GVPMError> {
    let resolution = Point2i::new(options.width as Int, options.height as Int);
    let scene: Arc<dyn Scene> = Arc::new(cornell_box(resolution, options.scene));

    let film: Box<dyn Film> = match options.format {
        ImageFormat::Exr => Box::new(ExrFilm::new()),
        ImageFormat::Png => Box::new(PngFilm::new()),
    };

    let params = options.to_param_set();
    let mut integrator = GVPMIntegrator::from_params(&params, scene, film, &options.destination, options.threads())?;
    integrator.set_quiet(options.quiet);
    integrator.preprocess()?;
    integrator.render()
}
