//! Worker scheduling and guiding checkpoints.
//!
//! The runner slices a sample budget into batches that worker threads claim
//! from a shared atomic counter. With guiding enabled the budget is spent in
//! iterations of doubling size; between iterations all workers are quiesced
//! (the dispatch scope joins them) and the guide takes a training step:
//!
//! ```text
//! dispatch(16384) ─ step ─ dispatch(32768) ─ step ─ ... ─ dispatch(rest)
//!     workers                 workers                       workers
//! ```
//!
//! Later iterations sample from a better-trained guide; either each
//! iteration starts over on a fresh frame (the default) or its samples are
//! weighted up tenfold.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::integrator::PathIntegrator;
use crate::raycaster::Raycaster;
use crate::scene::Scene;
use wavetrace_radar::RadarError;

/// Number of sample indices a worker claims at once.
const BATCH_SIZE: u64 = 256;

/// Schedules integrator samples across a pool of worker threads.
#[derive(Debug, Clone)]
pub struct Runner {
    /// Worker thread count; defaults to the available hardware concurrency.
    pub workers: usize,
    /// Sample count of the first guiding iteration.
    pub initial_milestone: u64,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            initial_milestone: 16384,
        }
    }
}

impl Runner {
    /// Simulates `samples` paths into the integrator's frame.
    ///
    /// The cancel flag is polled at batch boundaries; once set, workers
    /// finish their claimed batch and `run` returns promptly. Only one run
    /// may be active per integrator at a time.
    pub fn run<R: Raycaster>(
        &self,
        integrator: &PathIntegrator,
        raycaster: &R,
        scene: &Scene,
        samples: u64,
        cancel: &AtomicBool,
    ) -> SimResult<()> {
        scene.rf.validate()?;
        if !integrator.frame().is_configured() {
            return Err(SimError::Radar(RadarError::Unallocated));
        }
        if !integrator.begin_run() {
            return Err(SimError::AlreadyRunning);
        }

        let result = self.run_inner(integrator, raycaster, scene, samples, cancel);
        integrator.end_run();
        result
    }

    fn run_inner<R: Raycaster>(
        &self,
        integrator: &PathIntegrator,
        raycaster: &R,
        scene: &Scene,
        samples: u64,
        cancel: &AtomicBool,
    ) -> SimResult<()> {
        integrator.reset_for_run();

        if !integrator.settings.guiding {
            self.dispatch(integrator, raycaster, scene, samples, cancel);
            return Ok(());
        }

        integrator.reset_guide();

        let mut milestone = self.initial_milestone.max(1);
        let mut remaining = samples;

        loop {
            milestone = milestone.min(remaining);
            debug!(milestone, remaining, "guiding iteration");

            self.dispatch(integrator, raycaster, scene, milestone, cancel);
            if cancel.load(Ordering::Relaxed) {
                return Ok(());
            }

            integrator.advance_sample_offset(milestone);
            remaining -= milestone;
            if remaining == 0 {
                break;
            }

            milestone *= 2;
            if remaining < 2 * milestone {
                // no more guiding updates after this; spend the rest of the
                // budget in one final iteration
                integrator.set_final_iteration(true);
                milestone = remaining;
            }

            if integrator.settings.clear_before_iteration {
                integrator.clear_frame();
                integrator.clear_debug();
                integrator.reset_sample_offset();
            } else {
                // later samples have better-trained guiding and deserve
                // more weight in the accumulated frame
                integrator.escalate_sample_weight(10.0);
            }

            integrator.step_guide();
        }

        Ok(())
    }

    /// Runs `budget` samples across the worker pool and joins all workers.
    fn dispatch<R: Raycaster>(
        &self,
        integrator: &PathIntegrator,
        raycaster: &R,
        scene: &Scene,
        budget: u64,
        cancel: &AtomicBool,
    ) {
        if budget == 0 {
            return;
        }

        let claimed = AtomicU64::new(0);
        let workers = self.workers.max(1);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    while !cancel.load(Ordering::Relaxed) {
                        let start = claimed.fetch_add(BATCH_SIZE, Ordering::Relaxed);
                        if start >= budget {
                            break;
                        }
                        let end = (start + BATCH_SIZE).min(budget);
                        for index in start..end {
                            integrator.sample(scene, raycaster, index);
                        }
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex32;

    use wavetrace_radar::{CubeIndex, CubePoint, Frame, FrameConfig, RFConfig, SPEED_OF_LIGHT};

    use crate::emitter::{Antenna, AwrPattern, NearFieldAntenna};
    use crate::geometry::{Mat3, Vec3};
    use crate::integrator::{PathIntegrator, PathSettings};
    use crate::mesh::TriangleMesh;

    /// Antenna-local frame: the local z column is the looking direction.
    fn facing() -> Mat3 {
        Mat3::new(
            0.0, 0.0, -1.0, //
            0.0, -1.0, 0.0, //
            -1.0, 0.0, 0.0,
        )
    }

    fn fmcw_rf() -> RFConfig {
        RFConfig {
            start_freq: 77.0e9,
            freq_slope: 60.0e12,
            adc_rate: 5.0e6,
            idle_time: 100.0e-6,
            ramp_time: 60.0e-6,
            antenna_delay: 0.0,
        }
    }

    fn antenna_at(position: Vec3, rotation: Mat3) -> Antenna {
        NearFieldAntenna::new(position, rotation, AwrPattern).into()
    }

    /// Two orthogonal 100 mm plates meeting at the origin, with the
    /// TX/RX pair looking into the corner along the -x/-z bisector.
    fn dihedral() -> (Scene, TriangleMesh, Vec3) {
        let mut mesh = TriangleMesh::new();
        let size = 0.1;
        mesh.add_box(Vec3::new(-0.002, 0.0, 0.0), Vec3::new(0.0, size, size));
        mesh.add_box(Vec3::new(0.0, 0.0, -0.002), Vec3::new(size, size, 0.0));

        // rotate the antenna pair into the corner's field of view, the way
        // a turntable measurement would
        let rotation = nalgebra::Rotation3::from_axis_angle(
            &Vec3::y_axis(),
            -45.0f32.to_radians(),
        );
        let position = rotation * Vec3::new(0.896, 0.067, -0.005);
        let orientation = rotation.matrix() * facing();

        let scene = Scene {
            rf: fmcw_rf(),
            tx: antenna_at(position, orientation),
            rx: antenna_at(position, orientation),
        };
        (scene, mesh, position)
    }

    fn configured_integrator(settings: PathSettings, config: FrameConfig) -> PathIntegrator {
        let mut integrator = PathIntegrator::new(settings);
        integrator.configure_frame(config).unwrap();
        integrator
    }

    fn magnitudes(frame: &Frame) -> Vec<f32> {
        (0..frame.sample_count()).map(|i| frame.get(i).norm()).collect()
    }

    fn ring_distance(a: i32, b: i32, n: i32) -> i32 {
        let d = (a - b).rem_euclid(n);
        d.min(n - d)
    }

    #[test]
    fn test_empty_scene_stays_dark() {
        let integrator = configured_integrator(
            PathSettings::default(),
            FrameConfig {
                chirp_count: 2,
                samples_per_chirp: 16,
                channel_count: 1,
            },
        );
        let scene = dihedral().0;
        let mesh = TriangleMesh::new();

        let runner = Runner {
            workers: 2,
            ..Runner::default()
        };
        runner
            .run(&integrator, &mesh, &scene, 10_000, &AtomicBool::new(false))
            .unwrap();

        assert_relative_eq!(integrator.total_weight(), 10_000.0);
        for magnitude in magnitudes(integrator.frame()) {
            assert_eq!(magnitude, 0.0);
        }
    }

    #[test]
    fn test_rejects_invalid_rf_config() {
        let integrator = configured_integrator(
            PathSettings::default(),
            FrameConfig {
                chirp_count: 1,
                samples_per_chirp: 1,
                channel_count: 1,
            },
        );
        let (mut scene, mesh, _) = dihedral();
        scene.rf.ramp_time = 0.0;

        let result = Runner::default().run(
            &integrator,
            &mesh,
            &scene,
            100,
            &AtomicBool::new(false),
        );
        assert!(matches!(result, Err(SimError::Radar(_))));
    }

    #[test]
    fn test_rejects_unconfigured_frame() {
        let integrator = PathIntegrator::new(PathSettings::default());
        let (scene, mesh, _) = dihedral();
        let result = Runner::default().run(
            &integrator,
            &mesh,
            &scene,
            100,
            &AtomicBool::new(false),
        );
        assert_eq!(result, Err(SimError::Radar(RadarError::Unallocated)));
    }

    #[test]
    fn test_rejects_concurrent_runs() {
        let integrator = configured_integrator(
            PathSettings::default(),
            FrameConfig {
                chirp_count: 1,
                samples_per_chirp: 1,
                channel_count: 1,
            },
        );
        let (scene, mesh, _) = dihedral();

        assert!(integrator.begin_run());
        let result = Runner::default().run(
            &integrator,
            &mesh,
            &scene,
            100,
            &AtomicBool::new(false),
        );
        assert_eq!(result, Err(SimError::AlreadyRunning));
        integrator.end_run();
    }

    #[test]
    fn test_cancellation_returns_promptly() {
        let integrator = configured_integrator(
            PathSettings::default(),
            FrameConfig {
                chirp_count: 1,
                samples_per_chirp: 16,
                channel_count: 1,
            },
        );
        let (scene, mesh, _) = dihedral();

        let cancel = AtomicBool::new(true);
        Runner::default()
            .run(&integrator, &mesh, &scene, 1_000_000, &cancel)
            .unwrap();
        assert_eq!(integrator.total_weight(), 0.0);
    }

    #[test]
    fn test_dihedral_retroreflector_peak() {
        let (scene, mesh, position) = dihedral();
        let config = FrameConfig {
            chirp_count: 8,
            samples_per_chirp: 256,
            channel_count: 1,
        };
        let integrator = configured_integrator(PathSettings::default(), config);

        let runner = Runner {
            initial_milestone: 2048,
            ..Runner::default()
        };
        runner
            .run(&integrator, &mesh, &scene, 30_000, &AtomicBool::new(false))
            .unwrap();

        let frame = integrator.fetch_frame();
        let peak = frame.argmax();

        // the round trip through both plates measures twice the antenna
        // distance from the corner
        let mut expected = CubePoint::default();
        expected.set_distance(2.0 * position.norm(), &scene.rf, &config);
        assert_eq!(peak.chirp, 0);
        assert_eq!(peak.channel, 0);
        assert!(
            (peak.sample as f32 - expected.sample).abs() <= 2.0,
            "peak at sample {}, expected near {}",
            peak.sample,
            expected.sample
        );

        // the peak must dominate everything outside its leakage lobe
        let peak_magnitude = frame.at(&peak).norm();
        assert!(peak_magnitude > 0.0);
        for i in 0..frame.sample_count() {
            let index = frame.index_at(i);
            if ring_distance(index.sample, peak.sample, 256) > 8 {
                assert!(
                    frame.get(i).norm() <= peak_magnitude / 10.0,
                    "bin {:?} too strong",
                    index
                );
            }
        }
    }

    #[test]
    fn test_guiding_learns_the_reflector() {
        let (scene, mesh, _) = dihedral();
        let integrator = configured_integrator(
            PathSettings::default(),
            FrameConfig {
                chirp_count: 1,
                samples_per_chirp: 256,
                channel_count: 1,
            },
        );

        let runner = Runner {
            initial_milestone: 2048,
            ..Runner::default()
        };
        runner
            .run(&integrator, &mesh, &scene, 30_000, &AtomicBool::new(false))
            .unwrap();

        // after training, the primary-direction density concentrates: some
        // region exceeds the uniform density, others fall below it
        let mut max_pdf = 0.0f32;
        let mut min_pdf = f32::INFINITY;
        for i in 0..64 {
            for j in 0..64 {
                let pdf = integrator.guide_pdf([(i as f32 + 0.5) / 64.0, (j as f32 + 0.5) / 64.0]);
                max_pdf = max_pdf.max(pdf);
                min_pdf = min_pdf.min(pdf);
            }
        }
        assert!(max_pdf > 1.2, "density never concentrated: max {max_pdf}");
        assert!(min_pdf < 0.95, "density never thinned out: min {min_pdf}");
    }

    #[test]
    fn test_single_worker_runs_are_reproducible() {
        let (scene, mesh, _) = dihedral();
        let config = FrameConfig {
            chirp_count: 2,
            samples_per_chirp: 64,
            channel_count: 1,
        };
        let settings = PathSettings {
            guiding: false,
            ..PathSettings::default()
        };

        let run = || {
            let integrator = configured_integrator(settings, config);
            let runner = Runner {
                workers: 1,
                ..Runner::default()
            };
            runner
                .run(&integrator, &mesh, &scene, 4_096, &AtomicBool::new(false))
                .unwrap();
            integrator.fetch_frame()
        };

        let first = run();
        let second = run();
        for i in 0..first.sample_count() {
            assert_eq!(
                first.get(i).re.to_bits(),
                second.get(i).re.to_bits(),
                "bin {i} differs"
            );
            assert_eq!(first.get(i).im.to_bits(), second.get(i).im.to_bits());
        }
    }

    #[test]
    fn test_worker_count_does_not_change_the_estimate() {
        let (scene, mesh, _) = dihedral();
        let config = FrameConfig {
            chirp_count: 1,
            samples_per_chirp: 64,
            channel_count: 1,
        };
        let settings = PathSettings {
            guiding: false,
            ..PathSettings::default()
        };

        let run = |workers: usize| {
            let integrator = configured_integrator(settings, config);
            let runner = Runner {
                workers,
                ..Runner::default()
            };
            runner
                .run(&integrator, &mesh, &scene, 8_192, &AtomicBool::new(false))
                .unwrap();
            integrator.fetch_frame()
        };

        let serial = run(1);
        let parallel = run(4);

        // per-sample results are schedule-independent; only the atomic
        // accumulation order differs, which perturbs sums by rounding only
        let reference: f32 = magnitudes(&serial).into_iter().fold(0.0, f32::max);
        for i in 0..serial.sample_count() {
            let difference = (serial.get(i) - parallel.get(i)).norm();
            assert!(
                difference <= 1e-3 * reference.max(1e-20),
                "bin {i} differs by {difference}"
            );
        }
    }

    #[test]
    fn test_cw_plate_phase_coherence() {
        // a plate orthogonal to the boresight at distance d; in CW mode the
        // single bin accumulates with phase pi + 2*pi*f*(2d/c)
        let distance = 0.38f32;
        let mut mesh = TriangleMesh::new();
        mesh.add_quad(
            Vec3::new(0.0, -0.015, -0.015),
            Vec3::new(0.0, 0.03, 0.0),
            Vec3::new(0.0, 0.0, 0.03),
        );

        let rf = RFConfig {
            start_freq: 78.0e9,
            freq_slope: 0.0,
            adc_rate: 5.0e6,
            idle_time: 100.0e-6,
            ramp_time: 60.0e-6,
            antenna_delay: 0.0,
        };
        let scene = Scene {
            rf,
            tx: antenna_at(Vec3::new(distance, 0.0, 0.0), facing()),
            rx: antenna_at(Vec3::new(distance, 0.0, 0.0), facing()),
        };

        let settings = PathSettings {
            guiding: false,
            // a tight sphere keeps only near-axis echoes whose phases agree
            filtering_radius: 0.9,
            ..PathSettings::default()
        };
        let integrator = configured_integrator(
            settings,
            FrameConfig {
                chirp_count: 1,
                samples_per_chirp: 1,
                channel_count: 1,
            },
        );

        Runner::default()
            .run(&integrator, &mesh, &scene, 60_000, &AtomicBool::new(false))
            .unwrap();

        let value = integrator.fetch_frame().at(&CubeIndex::default());
        assert!(value.norm() > 0.0, "no echo reached the receiver");

        let tau = 2.0 * std::f64::consts::PI;
        let expected = (std::f64::consts::PI
            + tau * rf.start_freq as f64 * (2.0 * distance as f64) / SPEED_OF_LIGHT as f64)
            .rem_euclid(tau);
        let actual = (value.arg() as f64).rem_euclid(tau);
        let deviation = (actual - expected).abs();
        let deviation = deviation.min(tau - deviation);
        assert!(
            deviation < 0.25,
            "phase {actual:.3} rad, expected {expected:.3} rad"
        );
    }

    #[test]
    fn test_cw_energy_collapses_into_sample_zero() {
        // CW mode has no range separation: whatever the scene, only sample
        // bin zero may hold energy
        let distance = 0.38f32;
        let mut mesh = TriangleMesh::new();
        mesh.add_box(
            Vec3::new(-0.008, -0.028, -0.04),
            Vec3::new(0.008, 0.028, 0.04),
        );

        let rf = RFConfig {
            start_freq: 78.0e9,
            freq_slope: 0.0,
            adc_rate: 5.0e6,
            idle_time: 100.0e-6,
            ramp_time: 60.0e-6,
            antenna_delay: 0.0,
        };
        let scene = Scene {
            rf,
            tx: antenna_at(Vec3::new(distance, 0.0, 0.0), facing()),
            rx: antenna_at(Vec3::new(distance, 0.0, 0.0), facing()),
        };

        let settings = PathSettings {
            guiding: false,
            ..PathSettings::default()
        };
        let integrator = configured_integrator(
            settings,
            FrameConfig {
                chirp_count: 1,
                samples_per_chirp: 32,
                channel_count: 1,
            },
        );

        Runner::default()
            .run(&integrator, &mesh, &scene, 30_000, &AtomicBool::new(false))
            .unwrap();

        let frame = integrator.fetch_frame();
        let zero_bin = frame
            .at(&CubeIndex {
                chirp: 0,
                sample: 0,
                channel: 0,
            })
            .norm();
        assert!(zero_bin > 0.0);
        for sample in 1..32 {
            let value = frame.at(&CubeIndex {
                chirp: 0,
                sample,
                channel: 0,
            });
            assert_eq!(value, Complex32::new(0.0, 0.0), "bin {sample} not empty");
        }
    }
}
