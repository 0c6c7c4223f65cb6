//! The path-tracing integrator.
//!
//! One call to [`PathIntegrator::sample`] traces one complete wave path:
//! a frequency-jittered ray leaves the TX antenna in a (possibly guided)
//! primary direction, bounces specularly through the scene, and at every
//! vertex a next-event connection toward the RX antenna deposits a complex
//! contribution into the radar cube.
//!
//! ```text
//! [EMIT] ─► [BOUNCE 0] ─► [BOUNCE 1] ─► ... ─► [TERMINATE]
//!               │             │
//!              NEE           NEE            (occlusion-tested connection,
//!               ▼             ▼              phase filter, splat)
//!              RX            RX
//! ```
//!
//! Termination: maximum depth, path beyond the resolvable range, scene
//! miss, grazing incidence, vanished H field.
//!
//! All accumulators are interior-atomic, so `sample` takes `&self` and any
//! number of worker threads may drive the same integrator concurrently.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use wavetrace_radar::{
    AtomicF32, AtomicF64, CubePoint, Frame, FrameConfig, RFConfig, SPEED_OF_LIGHT,
};

use crate::emitter::SurfaceEmitter;
use crate::error::SimResult;
use crate::geometry::{dot_rc, field_is_negligible, Vec3c};
use crate::guiding::{Guide, GuideSettings};
use crate::image::{DebugElement, DebugImage};
use crate::intersection::Intersection;
use crate::raycaster::Raycaster;
use crate::sampler::{HaltonSampler, Sampler};
use crate::scene::Scene;

/// Below this cosine, incidence counts as grazing; the density correction
/// would divide by it and blow up.
const GRAZING_COS: f32 = 1e-3;

/// Integrator configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PathSettings {
    /// Skip the direct TX-RX connection; for FMCW the direct path carries no
    /// scene information.
    pub only_indirect: bool,
    /// Maximum number of geometrical-optics bounces.
    pub max_depth: u32,
    /// Ignore visibility for next-event estimation, approximating physical-
    /// optics diffraction.
    pub po_diffraction: bool,
    /// Train and sample an adaptive primary-direction distribution.
    pub guiding: bool,
    /// Start every guiding iteration with a fresh frame instead of
    /// escalating sample weights.
    pub clear_before_iteration: bool,
    /// Reconstruct phase from a virtual source behind the last bounce (SBR
    /// behavior); use together with sphere filtering.
    pub correct_phase: bool,
    /// Keep a softened tail of hard-filtered contributions visible to the
    /// guide.
    pub filter_guiding: bool,
    /// Enable phase filtering altogether.
    pub filtering: bool,
    /// Filter on the miss distance of the continued ray (sphere shape)
    /// instead of ray differentials.
    pub filtering_sphere: bool,
    /// Differential filter ramp start (in wavelengths).
    pub filtering_min: f32,
    /// Differential filter cutoff (in wavelengths).
    pub filtering_max: f32,
    /// Sphere filter radius (in wavelengths). Use around 0.5 when
    /// `correct_phase` is set.
    pub filtering_radius: f32,
    /// Accumulate the diagnostic hemisphere image.
    pub produce_debug_image: bool,
    /// Guiding distribution parameters.
    pub guide: GuideSettings,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            only_indirect: true,
            max_depth: 10,
            po_diffraction: false,
            guiding: true,
            clear_before_iteration: true,
            correct_phase: false,
            filter_guiding: true,
            filtering: true,
            filtering_sphere: true,
            filtering_min: 600.0,
            filtering_max: 900.0,
            filtering_radius: 160.0,
            produce_debug_image: false,
            guide: GuideSettings::default(),
        }
    }
}

/// The phase shift that down-mixing the delayed RF signal against the
/// locally generated chirp imprints on a contribution.
pub fn downmix_phase(delta_t: f32, rf: &RFConfig) -> Complex32 {
    Complex32::new(
        0.0,
        2.0 * PI * (rf.start_freq - delta_t * rf.freq_slope / 2.0) * delta_t,
    )
    .exp()
}

/// Monte Carlo wave-path integrator splatting into a radar cube.
#[derive(Debug)]
pub struct PathIntegrator {
    pub settings: PathSettings,
    frame: Frame,
    debug: DebugImage,
    guide: RwLock<Guide>,
    total_weight: AtomicF64,
    sample_offset: AtomicU64,
    current_sample_weight: AtomicF32,
    final_iteration: AtomicBool,
    running: AtomicBool,
}

impl PathIntegrator {
    pub fn new(settings: PathSettings) -> Self {
        Self {
            guide: RwLock::new(Guide::new(settings.guide)),
            settings,
            frame: Frame::new(),
            debug: DebugImage::default(),
            total_weight: AtomicF64::new(0.0),
            sample_offset: AtomicU64::new(0),
            current_sample_weight: AtomicF32::new(1.0),
            final_iteration: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    /// Allocates the radar cube. Erases previous contents.
    pub fn configure_frame(&mut self, config: FrameConfig) -> SimResult<()> {
        self.frame.configure(config)?;
        Ok(())
    }

    /// The raw (unnormalized) accumulator frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// The accumulated frame normalized by the total sample weight.
    pub fn fetch_frame(&self) -> Frame {
        let total = self.total_weight.load();
        if total > 0.0 {
            self.frame.scaled((1.0 / total) as f32)
        } else {
            self.frame.clone()
        }
    }

    pub fn debug_image(&self) -> &DebugImage {
        &self.debug
    }

    /// Sum of the weights of all samples taken so far.
    pub fn total_weight(&self) -> f64 {
        self.total_weight.load()
    }

    /// Evaluates the learned primary-direction density, for diagnostics and
    /// guiding visualizers.
    pub fn guide_pdf(&self, uv: [f32; 2]) -> f32 {
        self.guide
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .pdf(uv)
    }

    // ----------------------------------------------------------------
    // Runner hooks. All of these mutate checkpoint state and must only be
    // called while no worker is inside `sample`.
    // ----------------------------------------------------------------

    pub(crate) fn begin_run(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end_run(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn reset_for_run(&self) {
        self.debug.clear();
        self.clear_frame();
        self.sample_offset.store(0, Ordering::Relaxed);
        self.current_sample_weight.store(1.0);
        self.final_iteration.store(false, Ordering::Relaxed);
    }

    pub(crate) fn clear_frame(&self) {
        self.frame.clear();
        self.total_weight.store(0.0);
    }

    pub(crate) fn clear_debug(&self) {
        self.debug.clear();
    }

    pub(crate) fn reset_sample_offset(&self) {
        self.sample_offset.store(0, Ordering::Relaxed);
    }

    pub(crate) fn advance_sample_offset(&self, count: u64) {
        self.sample_offset.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn set_final_iteration(&self, value: bool) {
        self.final_iteration.store(value, Ordering::Relaxed);
    }

    pub(crate) fn escalate_sample_weight(&self, factor: f32) {
        self.current_sample_weight
            .store(self.current_sample_weight.load() * factor);
    }

    pub(crate) fn reset_guide(&self) {
        self.guide
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
            .reset();
    }

    pub(crate) fn step_guide(&self) {
        self.guide
            .write()
            .unwrap_or_else(|poison| poison.into_inner())
            .step();
    }

    // ----------------------------------------------------------------
    // Path sampling
    // ----------------------------------------------------------------

    /// Traces the path with the given index and deposits its contributions.
    ///
    /// Thread-safe; the result only depends on the current sample offset
    /// plus `index`, never on scheduling.
    pub fn sample<R: Raycaster + ?Sized>(&self, scene: &Scene, raycaster: &R, index: u64) {
        let settings = &self.settings;
        let rf = &scene.rf;

        let mut sampler = HaltonSampler::new();
        sampler.set_sample_index(self.sample_offset.load(Ordering::Relaxed) + index);

        // beyond this range the beat frequency leaves the ADC band and the
        // contribution cannot be resolved; CW mode has no such limit
        let max_range = if rf.freq_slope > 0.0 {
            rf.adc_rate / rf.freq_slope * SPEED_OF_LIGHT
        } else {
            f32::INFINITY
        };

        let sample_weight = self.current_sample_weight.load();
        let guide = self
            .guide
            .read()
            .unwrap_or_else(|poison| poison.into_inner());

        let mut primary = [0.0f32; 2];
        let mut primary_pdf = 1.0f32;
        let mut guiding_weight = Complex32::new(0.0, 0.0);

        let mut isect = Intersection::default();
        isect.ray.frequency = rf.start_freq + sampler.get_1d() * rf.bandwidth();

        let mut surface = SurfaceEmitter::default();
        let mut path_length = 0.0f32;
        let mut cos_theta = 1.0f32;

        loop {
            let previous_direction = isect.ray.d;

            if isect.ray.depth == 0 {
                primary = sampler.get_2d();
                if settings.guiding {
                    primary_pdf = guide.sample(&mut primary);
                }
                scene.tx.sample(primary, &mut isect.ray);
                isect.ray.weight_by(1.0 / primary_pdf);
            } else {
                reflect_ray(&mut isect);
            }

            // next event estimation toward the (single) RX channel
            'nee: {
                if isect.ray.depth == 0 && settings.only_indirect {
                    break 'nee;
                }

                let mut nee = isect.clone();
                nee.t = f32::INFINITY;
                nee.t_max = f32::INFINITY;

                let h_rx = scene.rx.connect_nee(&mut nee);
                if !settings.po_diffraction && raycaster.occluded(&nee.ray, nee.t_max) {
                    break 'nee;
                }
                nee.t = nee.t_max;

                if isect.ray.depth == 0 {
                    scene.tx.evaluate(&mut nee.ray);
                    scene.tx.connect(&mut nee);
                } else {
                    surface.evaluate(&mut nee.ray);
                    surface.connect(&mut nee);
                }
                let mut v = nee.ray.measure_h(&h_rx);
                let mut dphase = 0.0f32;

                if isect.ray.depth > 0 {
                    if settings.correct_phase {
                        // reconstruct phase from a virtual source behind the
                        // last bounce (SBR behavior)
                        let rx_pos = nee.ray.at(nee.t);
                        let virtual_tx = nee.ray.o - path_length * isect.ray.d;
                        let dist = (virtual_tx - rx_pos).norm();
                        nee.ray.set_distance(dist);

                        let denominator =
                            (PI * settings.filtering_radius * nee.ray.wavelength()).powi(2);
                        v = isect.ray.measure_h(&h_rx) * (PI * dist / denominator);
                        v /= 4.0 * PI;
                    } else {
                        if cos_theta < GRAZING_COS {
                            break 'nee;
                        }
                        // the last hit point was sampled with cos/r^2, the
                        // spherical wave wants 1/(4*pi*r)
                        v = v * (path_length / cos_theta) / (4.0 * PI);
                    }

                    if settings.filtering_sphere {
                        // miss distance of the continued ray at the receiver
                        let rx_pos = nee.ray.at(nee.t);
                        let along = isect.ray.d.dot(&(rx_pos - isect.ray.o)).max(0.0);
                        dphase = (isect.ray.at(along) - rx_pos).norm();
                    } else {
                        let half = (nee.ray.d - previous_direction).normalize();
                        let cos = half.dot(&isect.n);
                        dphase = path_length * (1.0 - cos * cos).max(0.0).sqrt() / cos;
                    }
                    dphase /= nee.ray.wavelength();

                    if settings.filtering {
                        if settings.filtering_sphere {
                            if dphase > settings.filtering_radius {
                                if settings.correct_phase {
                                    // phase correction wants a hard sphere
                                    if settings.filter_guiding {
                                        // but the guide still benefits from
                                        // a soft tail
                                        guiding_weight += v
                                            / ((dphase / settings.filtering_radius).powi(2) + 1.0);
                                    }
                                    v = Complex32::new(0.0, 0.0);
                                } else {
                                    v *= (1.0
                                        - 0.20 * (dphase / settings.filtering_radius - 1.0))
                                        .max(0.0);
                                }
                            }
                        } else {
                            if dphase > settings.filtering_max {
                                if settings.filter_guiding {
                                    guiding_weight +=
                                        v / ((dphase / settings.filtering_max).powi(2) + 1.0);
                                }
                                v = Complex32::new(0.0, 0.0);
                            }
                            if dphase > settings.filtering_min {
                                v *= (settings.filtering_max - dphase)
                                    / (settings.filtering_max - settings.filtering_min);
                            }
                        }
                    }

                    guiding_weight += v;
                }

                let tx_pdf = if isect.ray.depth > 0 { primary_pdf } else { 0.0 };
                self.splat_contribution(
                    scene,
                    primary,
                    tx_pdf,
                    0,
                    nee.ray.time,
                    dphase,
                    v,
                    sample_weight,
                );
            }

            // random walk termination
            if isect.ray.depth >= settings.max_depth || path_length >= max_range {
                break;
            }
            if field_is_negligible(isect.ray.h()) {
                break;
            }

            isect.reset();
            match raycaster.intersect(&isect.ray, isect.t_max) {
                Some(hit) => {
                    isect.t = hit.t;
                    isect.p = hit.p;
                    isect.n = hit.n;
                }
                None => break,
            }

            cos_theta = isect.cos_theta();
            if cos_theta < GRAZING_COS {
                // grazing angles divide by a low cosine and destabilize the
                // estimate; drop these outliers
                break;
            }

            path_length += isect.t;
            isect.ray.add_distance(isect.t);

            // prepare the next bounce
            surface.incoming = isect.clone();
            isect.ray.o = isect.p;
            isect.ray.depth += 1;
        }

        self.total_weight.fetch_add(sample_weight as f64);
        self.splat_debug(primary, primary_pdf, sample_weight);

        if settings.guiding
            && !self.final_iteration.load(Ordering::Relaxed)
            && primary_pdf > 0.0
        {
            guide.splat(primary, guiding_weight.norm() * primary_pdf, 1.0 / primary_pdf);
        }
    }

    /// Records one path contribution in the radar cube (and the debug
    /// image, when enabled).
    #[allow(clippy::too_many_arguments)]
    fn splat_contribution(
        &self,
        scene: &Scene,
        tx_dir: [f32; 2],
        tx_pdf: f32,
        channel: u32,
        delta_t: f32,
        dphase: f32,
        measurement: Complex32,
        weight: f32,
    ) {
        if !self.settings.produce_debug_image
            && (weight == 0.0 || (measurement.re == 0.0 && measurement.im == 0.0))
        {
            return;
        }

        let delta_t = delta_t + scene.rf.antenna_delay;

        let mut index = CubePoint::default();
        index.set_time(delta_t, &scene.rf, self.frame.config());
        index.set_velocity(0.0, &scene.rf, self.frame.config());
        index.channel = channel as f32;

        let contribution = measurement * downmix_phase(delta_t, &scene.rf);
        self.frame.splat(&index, contribution * weight);

        if self.settings.produce_debug_image && tx_pdf > 0.0 {
            self.debug.splat(
                tx_dir,
                &DebugElement {
                    distance: weight * SPEED_OF_LIGHT * delta_t / tx_pdf,
                    contribution: contribution * weight,
                    dphase: weight * dphase / tx_pdf,
                    inv_pdfs: 0.0,
                    weight: 0.0,
                },
            );
        }
    }

    /// Records per-sample normalization data in the debug image.
    fn splat_debug(&self, tx_dir: [f32; 2], tx_pdf: f32, weight: f32) {
        if self.settings.produce_debug_image {
            self.debug.splat(
                tx_dir,
                &DebugElement {
                    distance: 0.0,
                    contribution: Complex32::new(0.0, 0.0),
                    dphase: 0.0,
                    inv_pdfs: weight / tx_pdf,
                    weight,
                },
            );
        }
    }
}

/// Reflects a ray in a perfectly specular manner, mirroring both direction
/// and H field around the surface normal.
fn reflect_ray(isect: &mut Intersection) {
    let h = *isect.ray.h();
    let d = isect.reflect();
    isect.ray.d = d;

    let n = isect.n;
    let n_dot_h = dot_rc(&n, &h);
    isect.ray.set_h(Vec3c::new(
        2.0 * n.x * n_dot_h - h.x,
        2.0 * n.y * n_dot_h - h.y,
        2.0 * n.z * n_dot_h - h.z,
    ));
}
