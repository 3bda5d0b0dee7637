use crate::audio::buffer::AudioBuffer;
use crate::audio::mix::{apply_gain, mix_into};
use crate::eval::context::{AudioContext, Context};
use crate::foundation::error::GraphResult;
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::NodeBehavior;
use crate::node::scope::EvalCall;
use std::sync::Mutex;

pub(crate) const VOLUME: &str = "audio.volume";
pub(crate) const BALANCE: &str = "audio.balance";
pub(crate) const MUTE: &str = "audio.mute";
pub(crate) const OFFSET: &str = "audio.offset";

/// Tag carrying the peak of the last rendered audio window.
pub(crate) const PEAK_TAG: &str = "audio.peak";

/// Audio mixing stage: offset in seconds, volume, balance and mute. Images pass through.
#[derive(Debug, Default)]
pub(crate) struct SoundTrack {
    last_peak: Mutex<Option<f32>>,
}

impl SoundTrack {
    pub(crate) fn last_peak(&self) -> Option<f32> {
        *self.last_peak.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NodeBehavior for SoundTrack {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        if let Some(peak) = self.last_peak() {
            let img = call.arena_mut().get_mut(child);
            if !img.is_no_image() {
                img.tags.insert(PEAK_TAG.to_owned(), format!("{peak:.3}"));
            }
        }
        Ok(child)
    }

    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        let Some(&input) = node.inputs().first() else {
            return Ok(0);
        };
        let p = node.properties();
        if p.flag(MUTE, false) {
            return Ok(0);
        }
        let shift = (f64::from(p.float_or(OFFSET, 0.0)) * f64::from(actx.sample_rate)).round();
        let window = actx.shifted(-(shift as i64));

        let mut tmp = AudioBuffer::silent(actx);
        let n = graph.node_audio_fill(input, &window, &mut tmp)?;
        apply_gain(&mut tmp, p.float_or(VOLUME, 1.0), p.float_or(BALANCE, 0.0));
        *self.last_peak.lock().unwrap_or_else(|e| e.into_inner()) = Some(tmp.peak());
        mix_into(out, &tmp, 1.0);
        Ok(n)
    }
}
