use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ipgraph", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one frame and print its render tree as JSON.
    Eval(EvalArgs),
    /// Evaluate a frame range and print one pass fingerprint per frame.
    Prerender(PrerenderArgs),
    /// Fill an audio window from the root and print its peak level.
    Audio(AudioArgs),
    /// List the built-in node kinds.
    Nodes,
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Graph description JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Engine options JSON; defaults apply when omitted.
    #[arg(long)]
    opts: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct EvalArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Frame number.
    #[arg(long, default_value_t = 1)]
    frame: i32,

    /// Print the lowered render passes instead of the tree.
    #[arg(long)]
    passes: bool,
}

#[derive(Parser, Debug)]
struct PrerenderArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// First frame; defaults to the root's range start.
    #[arg(long)]
    start: Option<i32>,

    /// Last frame (inclusive); defaults to the root's range end.
    #[arg(long)]
    end: Option<i32>,
}

#[derive(Parser, Debug)]
struct AudioArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// First sample of the window.
    #[arg(long, default_value_t = 0)]
    start_sample: i64,

    /// Window length in samples.
    #[arg(long, default_value_t = 48_000)]
    samples: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Eval(args) => cmd_eval(args),
        Command::Prerender(args) => cmd_prerender(args),
        Command::Audio(args) => cmd_audio(args),
        Command::Nodes => cmd_nodes(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {what} JSON"))
}

fn load_graph(args: &GraphArgs) -> anyhow::Result<ipgraph::Graph> {
    let opts: ipgraph::GraphOpts = match &args.opts {
        Some(p) => read_json(p, "options")?,
        None => ipgraph::GraphOpts::default(),
    };
    let desc: ipgraph::GraphDescription = read_json(&args.in_path, "graph description")?;

    let mut graph = ipgraph::Graph::new(
        opts,
        ipgraph::NodeRegistry::with_builtins()?,
        ipgraph::DefaultMediaReader::shared(),
    )?;
    graph
        .load_description(&desc)
        .with_context(|| format!("load '{}'", args.in_path.display()))?;
    if graph.root().is_none() {
        anyhow::bail!("graph description names no root node");
    }
    Ok(graph)
}

fn root_context(graph: &ipgraph::Graph, frame: i32) -> ipgraph::Context {
    let view = graph.opts().default_view;
    let mut ctx = ipgraph::Context::new(frame).with_view(view.width, view.height);
    ctx.fps = view.fps;
    ctx
}

fn cmd_eval(args: EvalArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.graph)?;
    let evaluated = graph.evaluate(&root_context(&graph, args.frame))?;
    if let Some(err) = evaluated.error() {
        eprintln!(
            "frame {}: node '{}' failed: {}",
            args.frame, err.node, err.message
        );
    }

    let out = if args.passes {
        let passes = evaluated.passes();
        eprintln!(
            "{} passes, fingerprint {}",
            passes.len(),
            ipgraph::passes_fingerprint(&passes)
        );
        format!("{passes:#?}")
    } else {
        serde_json::to_string_pretty(&evaluated.dump()).context("serialize render tree")?
    };
    println!("{out}");
    Ok(())
}

fn cmd_prerender(args: PrerenderArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.graph)?;
    let root = graph
        .root()
        .context("graph description names no root node")?;
    let range = graph.image_range_info(root)?;
    let frames = ipgraph::FrameRange::new(
        args.start.unwrap_or(range.start),
        args.end.unwrap_or(range.end),
    )?;

    let out = ipgraph::prerender(&graph, frames, &root_context(&graph, frames.start))?;
    for f in &out.frames {
        println!("{}\t{}\t{}", f.frame, f.identifier, f.fingerprint);
    }
    eprintln!(
        "{} frames, {} evaluated, {} elided",
        out.stats.frames_total, out.stats.frames_evaluated, out.stats.frames_elided
    );
    Ok(())
}

fn cmd_audio(args: AudioArgs) -> anyhow::Result<()> {
    let graph = load_graph(&args.graph)?;
    let audio = graph.opts().audio;
    let actx = ipgraph::AudioContext::new(
        args.start_sample,
        args.samples,
        audio.sample_rate,
        audio.channels,
    );
    let buf = graph.audio_fill_buffer(&actx)?;
    println!(
        "{} samples x {} channels @ {} Hz, peak {:.4}",
        buf.num_samples(),
        buf.channels,
        buf.sample_rate,
        buf.peak()
    );
    Ok(())
}

fn cmd_nodes() -> anyhow::Result<()> {
    let registry = ipgraph::NodeRegistry::with_builtins()?;
    for name in registry.type_names() {
        let Some(def) = registry.definition(name) else {
            continue;
        };
        let max = def
            .max_inputs
            .map_or_else(|| "*".to_owned(), |m| m.to_string());
        println!(
            "{name}\tv{}\tinputs {}..{max}{}",
            def.version,
            def.min_inputs,
            if def.is_group { "\tgroup" } else { "" }
        );
    }
    Ok(())
}
