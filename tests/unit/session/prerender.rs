use super::*;
use crate::config::GraphOpts;
use crate::definition::NodeRegistry;
use crate::media::DefaultMediaReader;

fn graph_with(prerender: PrerenderOpts, path: &str) -> Graph {
    let opts = GraphOpts {
        prerender,
        ..GraphOpts::default()
    };
    let mut g = Graph::new(
        opts,
        NodeRegistry::with_builtins().unwrap(),
        DefaultMediaReader::shared(),
    )
    .unwrap();
    let s = g.new_node("ImageSource", Some("s")).unwrap();
    g.set_string(s, "media.path", path).unwrap();
    let c = g.new_node("Color", Some("c")).unwrap();
    g.set_inputs(c, vec![s]).unwrap();
    g.set_float(c, "color.gamma", 2.0).unwrap();
    g.set_root(c).unwrap();
    g
}

fn frames(start: Frame, end: Frame) -> FrameRange {
    FrameRange::new(start, end).unwrap()
}

#[test]
fn static_frames_are_evaluated_once() {
    let g = graph_with(PrerenderOpts::default(), "solid:8x8@24:1-1");
    let out = prerender(&g, frames(1, 10), &Context::new(1)).unwrap();
    assert_eq!(out.stats.frames_total, 10);
    assert_eq!(out.stats.frames_evaluated, 1);
    assert_eq!(out.stats.frames_elided, 9);
    assert!(out.frame_to_unique.iter().all(|&u| u == 0));
    assert_eq!(out.frames.len(), 10);
    assert_eq!(out.frames[9].frame, 10);
    assert_eq!(out.frames[9].fingerprint, out.frames[0].fingerprint);
    assert_eq!(g.cache().outstanding_checkouts(), 0);
}

#[test]
fn changing_frames_are_all_evaluated() {
    let g = graph_with(PrerenderOpts::default(), "checker:8x8@24:1-10");
    let out = prerender(&g, frames(1, 10), &Context::new(1)).unwrap();
    assert_eq!(out.stats.frames_evaluated, 10);
    assert_eq!(out.frame_to_unique, (0..10).collect::<Vec<_>>());
    let ids: std::collections::BTreeSet<_> = out.frames.iter().map(|f| f.identifier).collect();
    assert_eq!(ids.len(), 10);
}

#[test]
fn elision_spans_chunks() {
    let opts = PrerenderOpts {
        chunk_size: 3,
        ..PrerenderOpts::default()
    };
    let g = graph_with(opts, "ramp:8x8@24:1-4");
    let out = prerender(&g, frames(1, 9), &Context::new(1)).unwrap();
    assert_eq!(out.stats.frames_evaluated, 4);
    assert_eq!(out.frame_to_unique, vec![0, 1, 2, 3, 3, 3, 3, 3, 3]);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let path = "checker:16x8@24:1-6";
    let seq = graph_with(PrerenderOpts::exhaustive(), path);
    let par = graph_with(
        PrerenderOpts {
            threads: Some(2),
            chunk_size: 4,
            ..PrerenderOpts::default()
        },
        path,
    );
    let a = prerender(&seq, frames(1, 8), &Context::new(1)).unwrap();
    let b = prerender(&par, frames(1, 8), &Context::new(1)).unwrap();
    assert_eq!(a.stats.frames_evaluated, 8);
    assert_eq!(b.stats.frames_evaluated, 6);
    let fa: Vec<_> = a.frames.iter().map(|f| f.fingerprint).collect();
    let fb: Vec<_> = b.frames.iter().map(|f| f.fingerprint).collect();
    assert_eq!(fa, fb);
}

#[test]
fn failures_are_reported_and_release_checkouts() {
    let mut g = graph_with(PrerenderOpts::exhaustive(), "checker:8x8@24:1-4");
    let c = g.find_node("c").unwrap();
    let bad = g.new_node("Format", Some("bad")).unwrap();
    g.set_inputs(bad, vec![c]).unwrap();
    g.set_int(bad, "crop.active", 1).unwrap();
    g.set_int(bad, "crop.xmin", 6).unwrap();
    g.set_int(bad, "crop.xmax", 2).unwrap();
    g.set_root(bad).unwrap();

    let err = prerender(&g, frames(1, 4), &Context::new(1)).unwrap_err();
    assert_eq!(err.node_name(), Some("bad"));
    assert_eq!(g.cache().outstanding_checkouts(), 0);
}

#[test]
fn pool_and_chunk_settings_are_checked() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert!(build_thread_pool(Some(1)).is_ok());
    assert_eq!(normalized_chunk_size(0), 1);
    assert_eq!(normalized_chunk_size(16), 16);
}
