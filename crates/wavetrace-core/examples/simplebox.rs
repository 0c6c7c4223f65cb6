//! Simulates a single box in CW mode (no frequency modulation) swept across
//! aspect angles, appending one 1x1x1 frame per angle to `simplebox.sim`.

use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::AtomicBool;

use tracing::info;

use wavetrace_core::prelude::*;
use wavetrace_radar::write_frame;

fn main() -> std::io::Result<()> {
    init_logging(&LogConfig::default());

    // no frequency modulation: the slope of the ramps is zero, so the whole
    // response collapses into a single sample bin per frame
    let rf = RFConfig {
        start_freq: 78.0e9,
        freq_slope: 0.0,
        adc_rate: 5.0e6,
        idle_time: 100.0e-6,
        ramp_time: 60.0e-6,
        antenna_delay: 0.0,
    };

    let frame_config = FrameConfig {
        chirp_count: 1,
        samples_per_chirp: 1,
        channel_count: 1,
    };

    let sample_count = 50_000;

    let mut mesh = TriangleMesh::new();
    mesh.add_box(
        Vec3::new(-0.008, -0.028, -0.040),
        Vec3::new(0.008, 0.028, 0.040),
    );

    let mut integrator = PathIntegrator::new(PathSettings::default());
    integrator.configure_frame(frame_config).unwrap();

    let runner = Runner::default();
    let cancel = AtomicBool::new(false);

    let mut file = BufWriter::new(File::create("simplebox.sim")?);

    let facing = Mat3::new(
        0.0, 0.0, -1.0, //
        0.0, -1.0, 0.0, //
        -1.0, 0.0, 0.0,
    );

    let mut angle = -120.0f32;
    while angle <= 120.0 {
        let rotation = nalgebra::Rotation3::from_axis_angle(&Vec3::y_axis(), angle.to_radians());
        let antenna = NearFieldAntenna::new(
            rotation * Vec3::new(0.38, 0.0, 0.0),
            rotation.matrix() * facing,
            AwrPattern,
        );

        let scene = Scene {
            rf,
            tx: antenna.clone().into(),
            rx: antenna.into(),
        };

        runner
            .run(&integrator, &mesh, &scene, sample_count, &cancel)
            .expect("simulation failed");

        let frame = integrator.fetch_frame();
        info!(
            angle = angle as f64,
            magnitude = frame.get(0).norm() as f64,
            "frame done"
        );
        write_frame(&mut file, &frame)?;

        angle += 1.0;
    }

    Ok(())
}
