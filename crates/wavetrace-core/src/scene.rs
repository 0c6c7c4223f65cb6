//! Scene description.

use wavetrace_radar::RFConfig;

use crate::emitter::Antenna;

/// Everything the integrator needs to know about the world: the RF sweep
/// configuration and the transmit/receive antenna pair. Scene geometry is
/// provided separately through a [`crate::raycaster::Raycaster`].
#[derive(Debug, Clone)]
pub struct Scene {
    pub rf: RFConfig,
    pub tx: Antenna,
    pub rx: Antenna,
}
