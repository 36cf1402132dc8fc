//! LFE routing: bypasses the panner entirely and fans a
//! mono block out to every subwoofer device channel.
//!
//! Compensated gain is split evenly across however many subwoofers the
//! layout declares, rather than assuming exactly one.

use rf_core::WarnOnce;

use crate::layout::Layout;

/// Route one LFE source's mono block into every subwoofer's device-channel
/// slot of `device_output` (sized `layout.output_channel_count * n`).
///
/// `compensation` is `kLFECompensation` (default
/// [`crate::config::LFE_COMPENSATION`]); it lives in [`crate::RenderConfig`]
/// rather than being hard-coded here since it is plausibly layout- or
/// focus-dependent, even though the default never changes.
///
/// Returns `false` (and warns once via `warned`) if the layout has no
/// subwoofers.
pub fn route_block(
    input: &[f32],
    layout: &Layout,
    master_gain: f32,
    compensation: f32,
    device_output: &mut [f32],
    source_id: &str,
    warned: &mut WarnOnce<String>,
) -> bool {
    if layout.subwoofers.is_empty() {
        if warned.should_warn(source_id.to_string()) {
            log::warn!("LFE source '{source_id}' has no subwoofer to route to; silenced");
        }
        return false;
    }

    let n = input.len();
    let per_channel_gain = master_gain * compensation / layout.subwoofers.len() as f32;

    for sub in &layout.subwoofers {
        let base = sub.device_channel * n;
        if base + n > device_output.len() {
            continue;
        }
        for i in 0..n {
            device_output[base + i] += input[i] * per_channel_gain;
        }
    }

    true
}
