//! End-to-end scenario tests for the spatial core, independent of either
//! render driver.

use rf_core::{WarnOnce, Vec3};
use rf_spatial::direction::{interpolate, slerp, DirectionState};
use rf_spatial::layout::{Layout, Speaker, Subwoofer};
use rf_spatial::lfe;
use rf_spatial::panners::{build, Panner};
use rf_spatial::robustness::{Robustness, RobustnessTally};
use rf_spatial::scene::Keyframe;
use rf_spatial::{PannerKind, RenderConfig};

fn quad_layout() -> Layout {
    Layout::from_parts(
        vec![
            Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.0, radius_m: 5.0, device_channel: 0 },
            Speaker { index: 1, azimuth_rad: std::f64::consts::FRAC_PI_2, elevation_rad: 0.0, radius_m: 5.0, device_channel: 1 },
            Speaker { index: 2, azimuth_rad: std::f64::consts::PI, elevation_rad: 0.0, radius_m: 5.0, device_channel: 2 },
            Speaker { index: 3, azimuth_rad: -std::f64::consts::FRAC_PI_2, elevation_rad: 0.0, radius_m: 5.0, device_channel: 3 },
        ],
        vec![],
    )
}

/// Scenario 1 — DBAP point source at front, constant 0.5 input for a full
/// 48 kHz second. Front channel must dominate, sides tie, rear quietest.
#[test]
fn scenario_1_dbap_point_source() {
    let layout = quad_layout();
    let panner = build(&RenderConfig { panner: PannerKind::Dbap, ..RenderConfig::default() }, &layout);

    let n = 48_000usize;
    let input = vec![0.5f32; n];
    let mut output = vec![0.0f32; layout.num_speakers() * n];

    let mut gains = vec![0.0f32; layout.num_speakers()];
    panner.gains_for(Vec3::front(), &mut gains);
    for (s, &g) in gains.iter().enumerate() {
        let base = s * n;
        for i in 0..n {
            output[base + i] += input[i] * g;
        }
    }

    let rms = |ch: usize| -> f64 {
        let block = &output[ch * n..(ch + 1) * n];
        (block.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / n as f64).sqrt()
    };

    let rms0 = rms(0);
    let rms1 = rms(1);
    let rms2 = rms(2);
    let rms3 = rms(3);

    assert!(rms0 > rms1 && rms0 > rms3);
    assert!((rms1 - rms3).abs() < 1e-9);
    assert!(rms2 < rms1);

    assert!(output.iter().all(|s| s.is_finite()));
    assert!(output.iter().all(|&s| s.abs() <= 1.0));
}

/// Scenario 2 — SLERP midpoint between +x and +y must land within 1e-6 of
/// (sin45, sin45, 0).
#[test]
fn scenario_2_slerp_midpoint() {
    let keyframes = [
        Keyframe { time_sec: 0.0, direction: Vec3::new(1.0, 0.0, 0.0) },
        Keyframe { time_sec: 1.0, direction: Vec3::new(0.0, 1.0, 0.0) },
    ];
    let mut state = DirectionState::default();
    let v = interpolate(&keyframes, 0.5, &mut state, || {});

    let expected = std::f64::consts::FRAC_1_SQRT_2;
    assert!((v.x - expected).abs() < 1e-6);
    assert!((v.y - expected).abs() < 1e-6);
    assert!(v.z.abs() < 1e-6);

    // Direct slerp() call should agree exactly.
    let direct = slerp(keyframes[0].direction, keyframes[1].direction, 0.5);
    assert!(direct.distance_to(v) < 1e-12);
}

/// SLERP endpoint invariant.
#[test]
fn slerp_endpoint_invariant() {
    let keyframes = [
        Keyframe { time_sec: 0.0, direction: Vec3::new(1.0, 0.0, 0.0) },
        Keyframe { time_sec: 2.0, direction: Vec3::new(0.0, 0.0, 1.0) },
    ];
    let mut state = DirectionState::default();
    let at_first = interpolate(&keyframes, 0.0, &mut state, || {});
    let mut state2 = DirectionState::default();
    let at_last = interpolate(&keyframes, 2.0, &mut state2, || {});

    assert!(at_first.distance_to(keyframes[0].direction) < 1e-9);
    assert!(at_last.distance_to(keyframes[1].direction) < 1e-9);
}

/// Scenario 3 — LFE routing to two subwoofers behind a 2-speaker layout.
#[test]
fn scenario_3_lfe_routing() {
    let layout = Layout::from_parts(
        vec![
            Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.0, radius_m: 1.0, device_channel: 0 },
            Speaker { index: 1, azimuth_rad: std::f64::consts::PI, elevation_rad: 0.0, radius_m: 1.0, device_channel: 1 },
        ],
        vec![
            Subwoofer { device_channel: 4 },
            Subwoofer { device_channel: 5 },
        ],
    );
    assert_eq!(layout.output_channel_count, 6);

    let n = 4usize;
    let mut impulse = vec![0.0f32; n];
    impulse[0] = 1.0;

    let mut device_output = vec![0.0f32; layout.output_channel_count * n];
    let mut warned = WarnOnce::new();
    let master_gain = 1.0f32;
    let routed = lfe::route_block(
        &impulse,
        &layout,
        master_gain,
        rf_spatial::config::LFE_COMPENSATION,
        &mut device_output,
        "LFE",
        &mut warned,
    );
    assert!(routed);

    let expected = master_gain * 0.95 / 2.0;
    assert!((device_output[4 * n] - expected).abs() < 1e-6);
    assert!((device_output[5 * n] - expected).abs() < 1e-6);

    for ch in 0..4 {
        for i in 0..n {
            assert_eq!(device_output[ch * n + i], 0.0);
        }
    }
}

/// Output-channel-count formula, including the
/// gapped-subwoofer case.
#[test]
fn output_channel_count_formula() {
    let layout = quad_layout();
    assert_eq!(layout.output_channel_count, 4);

    let gapped = Layout::from_parts(
        vec![
            Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.0, radius_m: 1.0, device_channel: 0 },
            Speaker { index: 1, azimuth_rad: 1.0, elevation_rad: 0.0, radius_m: 1.0, device_channel: 1 },
        ],
        vec![Subwoofer { device_channel: 4 }, Subwoofer { device_channel: 5 }],
    );
    assert_eq!(gapped.output_channel_count, 6);
}

/// VBAP coverage gap triggers a zero-block + retarget event via the
/// robustness layer rather than silently dropping the source.
#[test]
fn vbap_coverage_gap_is_recovered() {
    // A layout with only two closely-spaced speakers has no triangle
    // covering directions far away from them.
    let layout = Layout::from_parts(
        vec![
            Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.0, radius_m: 1.0, device_channel: 0 },
            Speaker { index: 1, azimuth_rad: 0.05, elevation_rad: 0.0, radius_m: 1.0, device_channel: 1 },
            Speaker { index: 2, azimuth_rad: 0.1, elevation_rad: 0.3, radius_m: 1.0, device_channel: 2 },
        ],
        vec![],
    );
    let panner = build(&RenderConfig { panner: PannerKind::Vbap, ..RenderConfig::default() }, &layout);
    let mut robustness = Robustness::new(layout.num_speakers());
    let mut tally = RobustnessTally::default();

    let n = 8usize;
    let input = vec![0.8f32; n];
    let mut output = vec![0.0f32; layout.num_speakers() * n];

    let far_direction = Vec3::new(0.0, -1.0, 0.0).normalized().unwrap();
    robustness.pan_with_recovery(
        &*panner,
        &layout,
        far_direction,
        &input,
        &mut output,
        &mut tally,
    );

    assert_eq!(tally.zero_blocks, 1);
    assert!(output.iter().any(|&s| s != 0.0));
}
