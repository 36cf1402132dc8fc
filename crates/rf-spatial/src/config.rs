//! Render configuration types.
//!
//! The panner/elevation/time-window knobs exposed by the CLI surface of both
//! render drivers, plus the defaults shared between them.

use serde::{Deserialize, Serialize};

/// Which panning algorithm renders non-LFE sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PannerKind {
    Dbap,
    Vbap,
    Lbap,
}

impl Default for PannerKind {
    fn default() -> Self {
        Self::Dbap
    }
}

/// How a sanitised elevation (in radians, before remap) is mapped into the
/// layout's declared elevation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationMode {
    Clamp,
    RescaleAtmosUp,
    RescaleFullSphere,
}

impl Default for ElevationMode {
    fn default() -> Self {
        Self::RescaleAtmosUp
    }
}

/// Per-block vs per-sample direction evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderResolution {
    Block,
    Sample,
}

impl Default for RenderResolution {
    fn default() -> Self {
        Self::Block
    }
}

/// Minimum/maximum DBAP focus.
pub const DBAP_FOCUS_RANGE: (f64, f64) = (0.2, 5.0);
/// Minimum/maximum configurable block size.
pub const BLOCK_SIZE_RANGE: (usize, usize) = (32, 256);
/// Default block size.
pub const DEFAULT_BLOCK_SIZE: usize = 64;
/// Default fraction of master gain an LFE source is routed at.
pub const LFE_COMPENSATION: f32 = 0.95;

/// Render-time parameters shared by both drivers.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub panner: PannerKind,
    pub dbap_focus: f64,
    pub lbap_dispersion: f64,
    pub master_gain: f32,
    pub elevation_mode: ElevationMode,
    pub render_resolution: RenderResolution,
    pub block_size: usize,
    pub solo_source: Option<String>,
    pub time_window: Option<(f64, f64)>,
    pub debug_dir: Option<std::path::PathBuf>,
    pub force_2d: bool,
    /// Defaults to [`LFE_COMPENSATION`] but is left configurable rather than
    /// hard-coded into the LFE router, since it is plausibly layout- or
    /// focus-dependent.
    pub lfe_compensation: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            panner: PannerKind::default(),
            dbap_focus: 1.0,
            lbap_dispersion: 0.5,
            master_gain: 0.5,
            elevation_mode: ElevationMode::default(),
            render_resolution: RenderResolution::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            solo_source: None,
            time_window: None,
            debug_dir: None,
            force_2d: false,
            lfe_compensation: LFE_COMPENSATION,
        }
    }
}

impl RenderConfig {
    /// Clamp user-supplied focus/block-size into their documented ranges
    /// rather than rejecting the config outright.
    pub fn normalized(mut self) -> Self {
        self.dbap_focus = self.dbap_focus.clamp(DBAP_FOCUS_RANGE.0, DBAP_FOCUS_RANGE.1);
        self.lbap_dispersion = self.lbap_dispersion.clamp(0.0, 1.0);
        self.block_size = self
            .block_size
            .clamp(BLOCK_SIZE_RANGE.0, BLOCK_SIZE_RANGE.1);
        self
    }
}
