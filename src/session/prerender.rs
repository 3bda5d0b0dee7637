use crate::config::PrerenderOpts;
use crate::eval::context::Context;
use crate::foundation::core::{Frame, FrameRange};
use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::Fingerprint;
use crate::graph::Graph;
use crate::shader::lower::{RenderPass, passes_fingerprint};
use rayon::prelude::*;
use std::collections::HashMap;

/// Lowered passes of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PrerenderedFrame {
    /// Frame number.
    pub frame: Frame,
    /// Digest of the frame's identifier tree.
    pub identifier: Fingerprint,
    /// Render passes, children first.
    pub passes: Vec<RenderPass>,
    /// Digest of `passes`.
    pub fingerprint: Fingerprint,
}

/// Counters of one pre-render run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrerenderStats {
    /// Frames requested.
    pub frames_total: u64,
    /// Frames actually evaluated.
    pub frames_evaluated: u64,
    /// Frames reused from an earlier frame with the same identifier.
    pub frames_elided: u64,
}

/// Result of [`prerender`].
#[derive(Clone, Debug, Default)]
pub struct PrerenderOutput {
    /// One entry per requested frame, in order.
    pub frames: Vec<PrerenderedFrame>,
    /// For each requested frame, the index of the evaluation it reuses.
    pub frame_to_unique: Vec<usize>,
    /// Counters.
    pub stats: PrerenderStats,
}

struct Unique {
    frame: Frame,
    identifier: Fingerprint,
}

/// Evaluate and lower every frame of `frames`, using `template` for everything but the frame.
///
/// Identifiers are computed first; with identifier elision on, a frame whose identifier equals
/// an earlier one is not evaluated again. Evaluation runs chunk by chunk, on a worker pool when
/// the options ask for it, with one forked graph per worker.
#[tracing::instrument(skip(graph, template), fields(start = frames.start, end = frames.end))]
pub fn prerender(
    graph: &Graph,
    frames: FrameRange,
    template: &Context,
) -> GraphResult<PrerenderOutput> {
    let opts = graph.opts().prerender;
    let pool = if opts.parallel {
        Some(build_thread_pool(opts.threads)?)
    } else {
        None
    };
    let chunk_size = normalized_chunk_size(opts.chunk_size);

    let mut out = PrerenderOutput::default();
    let mut first_by_identifier = HashMap::<Fingerprint, usize>::new();
    let mut rendered: Vec<PrerenderedFrame> = Vec::new();

    let mut chunk_start = frames.start;
    while chunk_start <= frames.end {
        let chunk_end = chunk_start.saturating_add(chunk_size - 1).min(frames.end);

        let mut todo = Vec::new();
        for f in chunk_start..=chunk_end {
            let identifier = graph
                .evaluate_identifier(&template.with_frame(f))?
                .fingerprint();
            let reuse = opts
                .identifier_elision
                .then(|| first_by_identifier.get(&identifier).copied())
                .flatten();
            match reuse {
                Some(u) => out.frame_to_unique.push(u),
                None => {
                    let u = rendered.len() + todo.len();
                    first_by_identifier.entry(identifier).or_insert(u);
                    todo.push(Unique { frame: f, identifier });
                    out.frame_to_unique.push(u);
                }
            }
            out.stats.frames_total += 1;
        }

        let chunk = match &pool {
            Some(pool) => evaluate_parallel(graph, template, &todo, pool)?,
            None => todo
                .iter()
                .map(|u| evaluate_one(graph, template, u))
                .collect::<GraphResult<Vec<_>>>()?,
        };
        out.stats.frames_evaluated += chunk.len() as u64;
        rendered.extend(chunk);
        tracing::debug!(chunk_start, chunk_end, evaluated = todo.len(), "prerendered chunk");

        if chunk_end == frames.end {
            break;
        }
        chunk_start = chunk_end + 1;
    }

    out.stats.frames_elided = out.stats.frames_total - out.stats.frames_evaluated;
    let requested = frames.start..=frames.end;
    out.frames = requested
        .zip(&out.frame_to_unique)
        .map(|(frame, &u)| PrerenderedFrame {
            frame,
            ..rendered[u].clone()
        })
        .collect();
    Ok(out)
}

fn evaluate_one(graph: &Graph, template: &Context, u: &Unique) -> GraphResult<PrerenderedFrame> {
    let evaluated = graph.evaluate(&template.with_frame(u.frame))?;
    let passes = evaluated.passes();
    Ok(PrerenderedFrame {
        frame: u.frame,
        identifier: u.identifier,
        fingerprint: passes_fingerprint(&passes),
        passes,
    })
}

fn evaluate_parallel(
    graph: &Graph,
    template: &Context,
    todo: &[Unique],
    pool: &rayon::ThreadPool,
) -> GraphResult<Vec<PrerenderedFrame>> {
    pool.install(|| {
        todo.par_iter()
            .map_init(
                || graph.fork(),
                |worker, u| match worker {
                    Ok(g) => evaluate_one(g, template, u),
                    Err(e) => Err(GraphError::evaluation(
                        "prerender",
                        format!("failed to fork graph for worker: {e}"),
                    )),
                },
            )
            .collect()
    })
}

fn build_thread_pool(threads: Option<usize>) -> GraphResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(GraphError::validation(
            "prerender 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| GraphError::validation(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> Frame {
    Frame::try_from(chunk_size.max(1)).unwrap_or(Frame::MAX)
}

impl PrerenderOpts {
    /// Sequential evaluation without elision; every frame is evaluated once.
    pub fn exhaustive() -> Self {
        Self {
            parallel: false,
            identifier_elision: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/prerender.rs"]
mod tests;
