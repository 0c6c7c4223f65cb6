//! Simulates a dihedral retroreflector swept across a range of aspect
//! angles, appending one radar frame per angle to `dihedral.sim`.

use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::AtomicBool;

use tracing::info;

use wavetrace_core::prelude::*;
use wavetrace_radar::write_frame;

fn main() -> std::io::Result<()> {
    init_logging(&LogConfig::default());

    // FMCW ramp configuration
    let rf = RFConfig {
        start_freq: 77.0e9,
        freq_slope: 60.0e12, // 60 MHz/us
        adc_rate: 5.0e6,
        idle_time: 100.0e-6,
        ramp_time: 60.0e-6,
        antenna_delay: 0.43e-9,
    };

    let frame_config = FrameConfig {
        chirp_count: 128,
        samples_per_chirp: 256,
        channel_count: 4,
    };

    // higher sample counts produce less noise but take longer to compute
    let sample_count = 50_000;

    // two 50 mm plates meeting at the origin form the dihedral reflector
    let size = 0.05;
    let mut mesh = TriangleMesh::new();
    mesh.add_box(Vec3::new(-0.002, 0.0, 0.0), Vec3::new(0.0, size, size));
    mesh.add_box(Vec3::new(0.0, 0.0, -0.002), Vec3::new(size, size, 0.0));

    let mut integrator = PathIntegrator::new(PathSettings {
        produce_debug_image: true,
        ..PathSettings::default()
    });
    integrator.configure_frame(frame_config).unwrap();

    let runner = Runner::default();
    let cancel = AtomicBool::new(false);

    // all simulated frames end up concatenated in a single file
    let mut file = BufWriter::new(File::create("dihedral.sim")?);

    // the local coordinate system of the antennas; the z column is the
    // direction they are looking at
    let facing = Mat3::new(
        0.0, 0.0, -1.0, //
        0.0, -1.0, 0.0, //
        -1.0, 0.0, 0.0,
    );

    let mut angle = -55.0f32;
    while angle <= 55.0 {
        // rotate the antenna pair around the y axis
        let rotation =
            nalgebra::Rotation3::from_axis_angle(&Vec3::y_axis(), (angle - 45.0).to_radians());

        let scene = Scene {
            rf,
            rx: NearFieldAntenna::new(
                rotation * Vec3::new(0.896, 0.067, -0.005),
                rotation.matrix() * facing,
                AwrPattern,
            )
            .into(),
            tx: NearFieldAntenna::new(
                rotation * Vec3::new(0.896, 0.067, -0.007),
                rotation.matrix() * facing,
                AwrPattern,
            )
            .into(),
        };

        runner
            .run(&integrator, &mesh, &scene, sample_count, &cancel)
            .expect("simulation failed");

        info!(
            angle = angle as f64,
            total_weight = integrator.total_weight(),
            "frame done"
        );
        write_frame(&mut file, &integrator.fetch_frame())?;

        angle += 1.0;
    }

    Ok(())
}
