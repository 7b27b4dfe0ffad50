//! Demo scenes

use super::*;
use crate::reflection::*;
use crate::shape::*;
use clap::ValueEnum;

/// Built-in scene variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DemoScene {
    /// Diffuse box lit by a ceiling quad.
    Cornell,

    /// Box with a mirror sphere and a glossy sphere.
    Mirror,

    /// Box filled with a homogeneous medium that also surrounds the camera.
    Smoke,

    /// Diffuse box lit by a point emitter.
    PointLight,
}

/// Builds a Cornell box scene with unit half extent centered at the origin,
/// seen from `(0, 0, -3.5)`.
///
/// * `resolution` - Image resolution.
/// * `variant`    - Scene variant.
pub fn cornell_box(resolution: Point2i, variant: DemoScene) -> SimpleScene {
    let camera = PinholeCamera::new(
        Point3f::new(0.0, 0.0, -3.5),
        Point3f::zero(),
        Vector3f::new(0.0, 1.0, 0.0),
        40.0,
        resolution,
    );
    let mut scene = SimpleScene::new(camera);

    let white = BSDF::Lambertian {
        reflectance: Spectrum::new(0.75),
    };
    let red = BSDF::Lambertian {
        reflectance: Spectrum::rgb(0.75, 0.2, 0.2),
    };
    let green = BSDF::Lambertian {
        reflectance: Spectrum::rgb(0.2, 0.75, 0.2),
    };

    // Floor, ceiling, back, left and right walls facing inwards.
    scene.add_object(
        Shape::quad(Point3f::new(-1.0, -1.0, -1.0), Vector3f::new(0.0, 0.0, 2.0), Vector3f::new(2.0, 0.0, 0.0)),
        white,
    );
    scene.add_object(
        Shape::quad(Point3f::new(-1.0, 1.0, -1.0), Vector3f::new(2.0, 0.0, 0.0), Vector3f::new(0.0, 0.0, 2.0)),
        white,
    );
    scene.add_object(
        Shape::quad(Point3f::new(-1.0, -1.0, 1.0), Vector3f::new(0.0, 2.0, 0.0), Vector3f::new(2.0, 0.0, 0.0)),
        white,
    );
    scene.add_object(
        Shape::quad(Point3f::new(-1.0, -1.0, -1.0), Vector3f::new(0.0, 2.0, 0.0), Vector3f::new(0.0, 0.0, 2.0)),
        red,
    );
    scene.add_object(
        Shape::quad(Point3f::new(1.0, -1.0, -1.0), Vector3f::new(0.0, 0.0, 2.0), Vector3f::new(0.0, 2.0, 0.0)),
        green,
    );

    match variant {
        DemoScene::PointLight => {
            scene.add_point_light(Point3f::new(0.0, 0.8, 0.0), Spectrum::new(4.0));
        }
        _ => {
            scene.add_area_light(
                Shape::quad(
                    Point3f::new(-0.25, 0.99, -0.25),
                    Vector3f::new(0.5, 0.0, 0.0),
                    Vector3f::new(0.0, 0.0, 0.5),
                ),
                BSDF::Lambertian {
                    reflectance: Spectrum::ZERO,
                },
                Spectrum::new(12.0),
            );
        }
    }

    match variant {
        DemoScene::Mirror => {
            scene.add_object(
                Shape::sphere(Point3f::new(-0.45, -0.6, 0.3), 0.4),
                BSDF::Mirror {
                    reflectance: Spectrum::new(0.95),
                },
            );
            scene.add_object(
                Shape::sphere(Point3f::new(0.45, -0.6, -0.2), 0.4),
                BSDF::Glossy {
                    reflectance: Spectrum::new(0.8),
                    exponent: 60.0,
                },
            );
        }
        DemoScene::Smoke => {
            scene.set_medium(HomogeneousMedium::new(
                Spectrum::new(0.02),
                Spectrum::new(0.25),
                PhaseFunction::HenyeyGreenstein { g: 0.3 },
                Bounds3f::new(Point3f::new(-1.0, -1.0, -4.0), Point3f::new(1.0, 1.0, 1.0)),
            ));
        }
        _ => {}
    }

    scene
}
