use crate::config::{Config, IterationLimit, load_config};
use crate::description::DescriptionGenerator;
use crate::diagram::{ModelDiagram, Selection};
use crate::engine::GraphvizCommand;
use crate::ir::RankDirection;
use crate::layout::{GraphLayoutAdapter, LayoutOutcome, build_network};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dotlay", version, about = "Lay out a node/link model with Graphviz dot")]
pub struct Args {
    /// Input model (.json with nodeDataArray/linkDataArray) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Also write the model, with committed geometry, to this file
    #[arg(long = "write-model")]
    pub write_model: Option<PathBuf>,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Rank direction: TB, BT, LR or RL
    #[arg(short = 'd', long = "direction")]
    pub direction: Option<RankDirection>,

    /// Spacing between layers, in pixels
    #[arg(long = "layer-spacing")]
    pub layer_spacing: Option<f64>,

    /// Spacing between nodes in a layer, in pixels
    #[arg(long = "node-spacing")]
    pub node_spacing: Option<f64>,

    /// Engine iteration cap, or "unbounded"
    #[arg(long = "iterations")]
    pub iterations: Option<IterationLimit>,

    /// Honor link fromSpot/toSpot as dot ports
    #[arg(long = "link-spots")]
    pub link_spots: bool,

    /// Only position nodes; leave link points alone
    #[arg(long = "no-routing")]
    pub no_routing: bool,

    /// Path to the dot executable
    #[arg(long = "dot")]
    pub dot: Option<PathBuf>,

    /// Print the generated dot description and exit without running the engine
    #[arg(long = "emit-dot")]
    pub emit_dot: bool,

    /// Log pass details to stderr (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let input = read_input(args.input.as_deref())?;
    let mut diagram = ModelDiagram::from_json(&input, config.model.clone())?;

    if args.emit_dot {
        let mut network = build_network(&diagram, &Selection::All)?;
        let dot = DescriptionGenerator::default().generate(&mut network, &config.layout)?;
        println!("{dot}");
        return Ok(());
    }

    let engine = GraphvizCommand::load(&config.engine.program)?;
    tracing::info!(
        program = %engine.program().display(),
        version = engine.version(),
        "graphviz loaded"
    );
    let mut adapter = GraphLayoutAdapter::new(engine, config.layout.clone())?;
    match adapter.compute_layout(&mut diagram, &Selection::All)? {
        LayoutOutcome::Empty => tracing::warn!("model has no nodes"),
        outcome => tracing::debug!(?outcome, "pass finished"),
    }

    if let Some(path) = args.write_model.as_deref() {
        std::fs::write(path, diagram.to_json()?)?;
    }
    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &diagram, adapter.options())?,
        None => {
            let dump = LayoutDump::from_diagram(&diagram, adapter.options());
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &dump)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "dotlayout=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(direction) = args.direction {
        config.layout.direction = direction;
    }
    if let Some(spacing) = args.layer_spacing {
        config.layout.layer_spacing = spacing;
    }
    if let Some(spacing) = args.node_spacing {
        config.layout.node_spacing = spacing;
    }
    if let Some(limit) = args.iterations {
        config.layout.iteration_limit = limit;
    }
    if args.link_spots {
        config.layout.uses_link_spots = true;
    }
    if args.no_routing {
        config.layout.routing = false;
    }
    if let Some(dot) = &args.dot {
        config.engine.program = dot.display().to_string();
    }
    config.layout.validate()?;
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "dotlay",
            "-d",
            "RL",
            "--node-spacing",
            "12",
            "--iterations",
            "40",
            "--link-spots",
            "--no-routing",
            "--dot",
            "/usr/local/bin/dot",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.layout.direction, RankDirection::RightToLeft);
        assert_eq!(config.layout.node_spacing, 12.0);
        assert_eq!(config.layout.iteration_limit, IterationLimit::Limited(40.0));
        assert!(config.layout.uses_link_spots);
        assert!(!config.layout.routing);
        assert_eq!(config.engine.program, "/usr/local/bin/dot");
    }

    #[test]
    fn invalid_flags_are_rejected() {
        assert!(Args::try_parse_from(["dotlay", "-d", "sideways"]).is_err());
        let err = Args::try_parse_from(["dotlay", "--iterations", "abc"]).unwrap_err();
        assert!(err.to_string().contains("got \"abc\""), "{err}");
        let args = Args::try_parse_from(["dotlay", "--layer-spacing", "1"]).unwrap();
        assert!(apply_overrides(&mut Config::default(), &args).is_err());
    }
}
