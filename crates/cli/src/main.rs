use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nodal_knot::api::{
    find_minor_in, project, simplify, AxisOrder, GraphReport, MinorOutcome, PipelineCache,
    PipelineCfg, PlanarDiagramCode, SimpleGraph, View, ViewChoice, YamadaEvaluator,
    YamadaPolynomial,
};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

mod config;
mod io;
mod provenance;

use config::CliConfig;
use io::{read_graph, read_json, read_views, write_json, GraphDoc, ViewDoc, VolumeDoc};
use provenance::{write_sidecar, Payload};

#[derive(Parser)]
#[command(name = "nodal-knot", version)]
#[command(about = "Skeletons, planar diagrams and Yamada polynomials of nodal knots")]
struct Cmd {
    /// JSON config file; individual flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads for parallel searches
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Skeletonize a volume document into a graph document
    Skeleton {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        min_branch_length: Option<f64>,
        /// Keep leaf chains instead of pruning them
        #[arg(long)]
        keep_leaves: bool,
    },
    /// Contract degree-2 nodes and smooth polylines
    Simplify {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        smooth_tolerance: Option<f64>,
        #[arg(long)]
        merge_radius: Option<f64>,
    },
    /// Project a graph under one view and print its planar diagram code
    Project {
        #[arg(long)]
        input: PathBuf,
        /// Three rotation angles in radians, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [0.0, 0.0, 0.0])]
        angles: Vec<f64>,
        #[arg(long, default_value = "xyz")]
        order: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Search for a good view and evaluate its Yamada polynomial
    Search {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Auto)]
        mode: Mode,
        /// JSON list of candidate views `{"angles": [a, b, c], "order": "xyz"}`
        #[arg(long)]
        views: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        restarts: Option<usize>,
        #[arg(long)]
        steps: Option<usize>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Evaluate the Yamada polynomial of a planar diagram code
    Yamada {
        /// Code text, e.g. "V[1,1];V[2,2]"
        #[arg(long, conflicts_with = "code_file")]
        code: Option<String>,
        #[arg(long)]
        code_file: Option<PathBuf>,
        #[arg(long)]
        normalize: bool,
        #[arg(long)]
        variable: Option<String>,
    },
    /// Look for a graph minor in the simplified graph
    Minor {
        #[arg(long)]
        input: PathBuf,
        /// `petersen`, `complete:N` or `cycle:N`
        #[arg(long, default_value = "petersen")]
        target: String,
        #[arg(long)]
        tries: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print node/edge counts, degrees and path statistics of a graph
    Report {
        #[arg(long)]
        input: PathBuf,
        /// Report on the simplified graph
        #[arg(long)]
        simplified: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Manual when `--views` is given, sampled otherwise
    Auto,
    /// Hemisphere sampling; trivalent graphs only
    Sampled,
    /// Best of the `--views` candidates
    Manual,
    /// Simulated annealing
    Anneal,
}

#[derive(Serialize)]
struct PolyDoc {
    text: String,
    terms: BTreeMap<i32, i64>,
}

impl From<&YamadaPolynomial> for PolyDoc {
    fn from(p: &YamadaPolynomial) -> Self {
        Self {
            text: p.to_string(),
            terms: p.terms().clone(),
        }
    }
}

#[derive(Serialize)]
struct CandidateDoc {
    view: ViewDoc,
    code: String,
    crossings: usize,
    polynomial: PolyDoc,
}

impl CandidateDoc {
    fn new(view: View, code: &PlanarDiagramCode, polynomial: &YamadaPolynomial) -> Self {
        Self {
            view: view.into(),
            code: code.to_string(),
            crossings: code.num_crossings(),
            polynomial: polynomial.into(),
        }
    }
}

#[derive(Serialize)]
struct SearchDoc {
    /// `agreed`, `ambiguous`, `manual` or `annealed`.
    status: &'static str,
    best: CandidateDoc,
    /// Every valid view when the sampled search stayed ambiguous, best first.
    candidates: Vec<CandidateDoc>,
}

fn main() -> Result<()> {
    SubscriberBuilder::default()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cmd = Cmd::parse();
    let text = execute(cmd)?;
    println!("{text}");
    Ok(())
}

/// Run one subcommand; the returned text goes to stdout.
fn execute(cmd: Cmd) -> Result<String> {
    let mut cfg = CliConfig::load(cmd.config.as_deref())?.to_pipeline()?;
    if cmd.workers.is_some() {
        cfg.workers = cmd.workers;
    }
    match cmd.action {
        Action::Skeleton {
            input,
            out,
            min_branch_length,
            keep_leaves,
        } => {
            if let Some(l) = min_branch_length {
                cfg.skeleton.min_branch_length = l;
            }
            cfg.skeleton.prune_leaves &= !keep_leaves;
            skeleton(&input, &out, cfg)
        }
        Action::Simplify {
            input,
            out,
            smooth_tolerance,
            merge_radius,
        } => {
            if let Some(t) = smooth_tolerance {
                cfg.simplify.smooth_tolerance = t;
            }
            if let Some(r) = merge_radius {
                cfg.simplify.merge_radius = r;
            }
            simplify_cmd(&input, &out, cfg)
        }
        Action::Project {
            input,
            angles,
            order,
            out,
        } => {
            let order = AxisOrder::parse(&order).with_context(|| format!("unknown axis order `{order}`"))?;
            let &[a, b, c] = angles.as_slice() else {
                bail!("expected three angles, got {}", angles.len());
            };
            project_cmd(&input, View::new([a, b, c], order), out.as_deref(), cfg)
        }
        Action::Search {
            input,
            mode,
            views,
            seed,
            samples,
            restarts,
            steps,
            out,
        } => {
            if let Some(s) = seed {
                cfg.anneal.seed = s;
                cfg.trivalent.jitter = Some(s);
            }
            if let Some(n) = samples {
                cfg.trivalent.samples = n;
            }
            if let Some(r) = restarts {
                cfg.anneal.restarts = r;
            }
            if let Some(s) = steps {
                cfg.anneal.steps = s;
            }
            search(&input, mode, views.as_deref(), out.as_deref(), cfg)
        }
        Action::Yamada {
            code,
            code_file,
            normalize,
            variable,
        } => {
            let text = match (code, code_file) {
                (Some(c), _) => c,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("pass --code or --code-file"),
            };
            cfg.yamada.normalize |= normalize;
            if let Some(v) = variable {
                cfg.yamada.variable = v;
            }
            yamada(text.trim(), cfg)
        }
        Action::Minor {
            input,
            target,
            tries,
            seed,
            out,
        } => {
            if let Some(t) = tries {
                cfg.minor.tries = t;
            }
            if let Some(s) = seed {
                cfg.minor.seed = s;
            }
            minor(&input, &parse_target(&target)?, &target, out.as_deref(), cfg)
        }
        Action::Report { input, simplified } => report(&input, simplified, cfg),
    }
}

fn skeleton(input: &Path, out: &Path, cfg: PipelineCfg) -> Result<String> {
    tracing::info!(input = %input.display(), out = %out.display(), "skeleton");
    let volume = read_json::<VolumeDoc>(input)?.to_volume()?;
    let params = json!({
        "min_branch_length": cfg.skeleton.min_branch_length,
        "prune_leaves": cfg.skeleton.prune_leaves,
        "max_passes": cfg.skeleton.max_passes,
    });
    let mut cache = PipelineCache::new(cfg)?;
    let graph = cache.skeleton(&volume)?;
    write_json(out, &GraphDoc::from_graph(graph))?;
    write_sidecar(out, Payload::new("skeleton", params).input(input))?;
    Ok(GraphReport::of(graph).to_string())
}

fn simplify_cmd(input: &Path, out: &Path, cfg: PipelineCfg) -> Result<String> {
    tracing::info!(input = %input.display(), out = %out.display(), "simplify");
    let graph = read_graph(input)?;
    let simple = simplify(&graph, cfg.simplify)?;
    write_json(out, &GraphDoc::from_graph(&simple))?;
    let params = json!({
        "smooth_tolerance": cfg.simplify.smooth_tolerance,
        "merge_radius": cfg.simplify.merge_radius,
    });
    write_sidecar(out, Payload::new("simplify", params).input(input))?;
    Ok(format!(
        "{} nodes, {} edges, trivalent: {}",
        simple.num_nodes(),
        simple.num_edges(),
        simple.is_trivalent()
    ))
}

fn project_cmd(input: &Path, view: View, out: Option<&Path>, cfg: PipelineCfg) -> Result<String> {
    let graph = read_graph(input)?;
    let p = project(&graph, &view, &cfg.projection)
        .with_context(|| format!("projecting {} under {view}", input.display()))?;
    tracing::info!(crossings = p.num_crossings(), arcs = p.arcs.len(), "projected");
    if let Some(out) = out {
        let doc = json!({
            "view": ViewDoc::from(view),
            "crossings": p.num_crossings(),
            "code": p.code.to_string(),
        });
        write_json(out, &doc)?;
        write_sidecar(out, Payload::new("project", json!({ "view": view.to_string() })).input(input))?;
    }
    Ok(p.code.to_string())
}

fn search(input: &Path, mode: Mode, views: Option<&Path>, out: Option<&Path>, cfg: PipelineCfg) -> Result<String> {
    let graph = read_graph(input)?;
    let views = views.map(read_views).transpose()?;
    let params = json!({
        "mode": format!("{mode:?}").to_lowercase(),
        "views": views.as_ref().map(|vs| vs.iter().map(|v| v.to_string()).collect::<Vec<_>>()),
        "anneal": {
            "seed": cfg.anneal.seed,
            "steps": cfg.anneal.steps,
            "restarts": cfg.anneal.restarts,
        },
        "trivalent": {
            "samples": cfg.trivalent.samples,
            "batch": cfg.trivalent.batch,
            "jitter": cfg.trivalent.jitter,
        },
    });
    let mut cache = PipelineCache::new(cfg)?;
    let k = match (mode, &views) {
        (Mode::Auto | Mode::Manual, Some(vs)) => cache.knot_with_views(&graph, vs)?,
        (Mode::Manual, None) => bail!("--mode manual needs --views"),
        (Mode::Auto | Mode::Sampled, _) => cache
            .knot(&graph)
            .with_context(|| format!("searching {}; pass --views or --mode anneal", input.display()))?,
        (Mode::Anneal, _) => cache.knot_annealed(&graph)?,
    };
    let (status, candidates) = match &k.choice {
        ViewChoice::Agreed => ("agreed", Vec::new()),
        ViewChoice::Ambiguous { candidates } => (
            "ambiguous",
            candidates.iter().map(|(v, c, p)| CandidateDoc::new(*v, c, p)).collect(),
        ),
        ViewChoice::Manual => ("manual", Vec::new()),
        ViewChoice::Annealed => ("annealed", Vec::new()),
    };
    let doc = SearchDoc {
        status,
        best: CandidateDoc::new(k.view, &k.code, &k.polynomial),
        candidates,
    };
    if let Some(out) = out {
        write_json(out, &doc)?;
        write_sidecar(out, Payload::new("search", params).input(input))?;
    }
    let mut text = format!(
        "{}: {} ({} crossings)\n{}",
        doc.status, doc.best.polynomial.text, doc.best.crossings, doc.best.code
    );
    for c in &doc.candidates {
        text.push_str(&format!("\n  {}: {}", c.code, c.polynomial.text));
    }
    Ok(text)
}

fn yamada(code: &str, cfg: PipelineCfg) -> Result<String> {
    let code: PlanarDiagramCode = code.parse().context("parsing planar diagram code")?;
    let eval = YamadaEvaluator::new(cfg.yamada);
    let p = eval.evaluate(&code)?;
    Ok(p.to_string())
}

fn parse_target(name: &str) -> Result<SimpleGraph> {
    let size = |s: &str| -> Result<usize> {
        s.parse::<usize>()
            .with_context(|| format!("bad size in target `{name}`"))
    };
    match name.split_once(':') {
        None if name.eq_ignore_ascii_case("petersen") => Ok(SimpleGraph::petersen()),
        Some(("complete", n)) => Ok(SimpleGraph::complete(size(n)?)),
        Some(("cycle", n)) => match size(n)? {
            n if n >= 3 => Ok(SimpleGraph::cycle(n)),
            n => bail!("a cycle needs at least 3 nodes, got {n}"),
        },
        _ => bail!("unknown target `{name}`; use petersen, complete:N or cycle:N"),
    }
}

fn minor(input: &Path, target: &SimpleGraph, name: &str, out: Option<&Path>, cfg: PipelineCfg) -> Result<String> {
    let graph = read_graph(input)?;
    let params = json!({
        "target": name,
        "tries": cfg.minor.tries,
        "rounds": cfg.minor.rounds,
        "seed": cfg.minor.seed,
    });
    let mut cache = PipelineCache::new(cfg)?;
    let minor_cfg = cache.cfg().minor;
    let simple = cache.simplified(&graph)?;
    let outcome = find_minor_in(simple, target, &minor_cfg)?;
    let (text, doc) = match &outcome {
        MinorOutcome::Found(e) => (
            format!("{name} minor found"),
            json!({ "found": true, "chains": e.chains() }),
        ),
        MinorOutcome::NotFound { tries } => (
            format!("no {name} minor found in {tries} tries"),
            json!({ "found": false, "tries": tries }),
        ),
    };
    if let Some(out) = out {
        write_json(out, &doc)?;
        write_sidecar(out, Payload::new("minor", params).input(input))?;
    }
    Ok(text)
}

fn report(input: &Path, simplified: bool, cfg: PipelineCfg) -> Result<String> {
    let graph = read_graph(input)?;
    let report = if simplified {
        GraphReport::of(simplify(&graph, cfg.simplify)?.graph())
    } else {
        GraphReport::of(&graph)
    };
    Ok(report.to_string())
}
