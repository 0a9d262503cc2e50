use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::{FacetConfig, ReportOverrides};
use facet_catalog::{CatalogStore, NewNode, Node, NodeKind, ProjectLayout, Status, StatusView};
use facet_graph::{MotivationResolver, NestedMotivation};
use facet_health::{CheckCategory, HealthChecker};
use facet_indexer::{ProjectIndexer, TraceIndex};
use flags::{FormatFlag, KindFlag};
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::io;
use std::ops::RangeInclusive;
use std::path::PathBuf;

mod config;
mod flags;
mod render;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "facet")]
#[command(about = "Requirements traceability: goals, expectations and the facets that verify them", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Project root (skips discovery of facets.json in parent directories)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty catalog in the project root
    Init(InitArgs),

    /// Add a goal, expectation or facet
    Add(AddArgs),

    /// Replace a node's text
    Edit(EditArgs),

    /// Set a facet's status (passing, failing, untested)
    Mark(MarkArgs),

    /// Link a facet to a test id
    Link(LinkArgs),

    /// Remove a node
    Remove(RemoveArgs),

    /// Show one node with its computed status and context
    Show(ShowArgs),

    /// Aggregate counts and facet coverage
    Status(JsonArgs),

    /// Highest-priority unsatisfied expectation
    Next(JsonArgs),

    /// Full hierarchy with status glyphs
    Tree(JsonArgs),

    /// Facets covering a file (or line range) and the goals behind them
    Related(RelatedArgs),

    /// Project a coverage report onto facets
    Coverage(CoverageArgs),

    /// Rebuild the index from test and coverage reports
    Test(TestArgs),

    /// Run health checks over the catalog and index
    Check(CheckArgs),

    /// Record that a file was modified, on every facet covering it
    Touch(TouchArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Overwrite an existing catalog
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct AddArgs {
    /// Node kind: goal, expectation or facet (g/e/f)
    #[arg(value_enum)]
    kind: KindFlag,

    /// Human-readable description
    text: String,

    /// Parent id (required for expectations and facets)
    #[arg(long)]
    parent: Option<String>,

    /// Priority, lower is more urgent (goals and expectations)
    #[arg(long, allow_negative_numbers = true)]
    priority: Option<i32>,

    /// Label (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EditArgs {
    id: String,
    text: String,
}

#[derive(Args)]
struct MarkArgs {
    /// Facet id
    id: String,
    /// passing, failing or untested
    status: String,
}

#[derive(Args)]
struct LinkArgs {
    /// Facet id
    id: String,
    /// Test id as it appears in reports (classname::name)
    test: String,
}

#[derive(Args)]
struct RemoveArgs {
    id: String,

    /// Remove even if the node has children (children keep their dangling parent)
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct ShowArgs {
    id: String,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct JsonArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct LineArgs {
    /// Inclusive line range
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    lines: Option<Vec<u32>>,
}

impl LineArgs {
    fn range(&self) -> Result<Option<RangeInclusive<u32>>> {
        match self.lines.as_deref() {
            None => Ok(None),
            Some(&[start, end]) if start <= end => Ok(Some(start..=end)),
            Some(&[start, end]) => bail!("Invalid line range {start}..{end}"),
            Some(other) => bail!("Expected two line numbers, got {}", other.len()),
        }
    }
}

#[derive(Args)]
struct RelatedArgs {
    /// File path, relative to the project root
    file: String,

    #[command(flatten)]
    lines: LineArgs,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CoverageArgs {
    /// Coverage report (defaults to the configured report)
    #[arg(long)]
    file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FormatFlag::Text)]
    format: FormatFlag,
}

#[derive(Args)]
struct TestArgs {
    /// JUnit XML report (overrides FACET_JUNIT_REPORT and facet.toml)
    #[arg(long)]
    junit: Option<PathBuf>,

    /// Coverage JSON report (overrides FACET_COVERAGE_REPORT and facet.toml)
    #[arg(long)]
    coverage: Option<PathBuf>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Categories to run: overload, structural, consistency, overlap (default: all)
    categories: Vec<String>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TouchArgs {
    /// Modified file, relative to the project root
    file: String,

    #[command(flatten)]
    lines: LineArgs,

    /// Name of the tool that made the change
    #[arg(long, default_value = "manual")]
    tool: String,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

pub fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Auto-enable quiet mode when --json is used (to keep stdout clean for JSON parsing)
    let json_output = match &cli.command {
        Commands::Add(args) => args.json,
        Commands::Show(args) => args.json,
        Commands::Status(args) | Commands::Next(args) | Commands::Tree(args) => args.json,
        Commands::Related(args) => args.json,
        Commands::Coverage(args) => args.format == FormatFlag::Json,
        Commands::Test(args) => args.json,
        Commands::Check(args) => args.json,
        Commands::Touch(args) => args.json,
        _ => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Commands::Init(args) = &cli.command {
        return run_init(cli.root.clone(), args);
    }

    let layout = resolve_layout(cli.root.clone())?;
    log::debug!("project root: {}", layout.root().display());

    match cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Add(args) => run_add(&layout, args),
        Commands::Edit(args) => {
            store(&layout).edit(&args.id, &args.text)?;
            print_stdout(&format!("updated {}\n", args.id))
        }
        Commands::Mark(args) => {
            let status: Status = args.status.parse()?;
            store(&layout).mark(&args.id, status)?;
            print_stdout(&format!("{} is {status}\n", args.id))
        }
        Commands::Link(args) => {
            store(&layout).link(&args.id, &args.test)?;
            print_stdout(&format!("linked {} to {}\n", args.id, args.test))
        }
        Commands::Remove(args) => {
            let removed = store(&layout).remove(&args.id, args.force)?;
            print_stdout(&format!("removed {}\n", removed.id))
        }
        Commands::Show(args) => run_show(&layout, args),
        Commands::Status(args) => run_status(&layout, args),
        Commands::Next(args) => run_next(&layout, args),
        Commands::Tree(args) => run_tree(&layout, args),
        Commands::Related(args) => run_related(&layout, args),
        Commands::Coverage(args) => run_coverage(&layout, args),
        Commands::Test(args) => run_test(&layout, args),
        Commands::Check(args) => run_check(&layout, args),
        Commands::Touch(args) => run_touch(&layout, args),
    }
}

/// `--root` wins; otherwise walk up to the nearest `facets.json`, falling back to the
/// working directory so a missing catalog is reported against it.
fn resolve_layout(root: Option<PathBuf>) -> Result<ProjectLayout> {
    if let Some(root) = root {
        return Ok(ProjectLayout::new(root));
    }
    let cwd = env::current_dir().context("Failed to resolve current directory")?;
    Ok(ProjectLayout::discover(&cwd).unwrap_or_else(|| ProjectLayout::new(cwd)))
}

fn store(layout: &ProjectLayout) -> CatalogStore {
    CatalogStore::for_layout(layout)
}

fn load_index(layout: &ProjectLayout) -> Result<Option<TraceIndex>> {
    ProjectIndexer::new(layout.clone())
        .load_index()
        .context("Failed to load index")
}

fn run_init(root: Option<PathBuf>, args: &InitArgs) -> Result<()> {
    let root = match root {
        Some(root) => root,
        None => env::current_dir().context("Failed to resolve current directory")?,
    };
    let layout = ProjectLayout::new(root);
    let store = store(&layout);
    store.init(args.force)?;
    print_stdout(&format!("initialized {}\n", store.path().display()))
}

fn run_add(layout: &ProjectLayout, args: AddArgs) -> Result<()> {
    let mut new = NewNode::new(args.kind.as_domain(), args.text);
    if let Some(parent) = args.parent {
        new = new.parent(parent);
    }
    if let Some(priority) = args.priority {
        new = new.priority(priority);
    }
    for label in args.labels {
        new = new.label(label);
    }
    let node = store(layout).add(new)?;
    if args.json {
        print_json(&node)
    } else {
        print_stdout(&format!("{}\n", node.id))
    }
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    node: &'a Node,
    status: Status,
    children: Vec<&'a str>,
    ancestors: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<&'a BTreeMap<String, Vec<u32>>>,
}

fn run_show(layout: &ProjectLayout, args: ShowArgs) -> Result<()> {
    let catalog = store(layout).load()?;
    let node = catalog.require(&args.id)?;
    let chain = catalog.ancestor_chain(&args.id)?;
    let index = load_index(layout)?;
    let view = StatusView::new(&catalog);

    if args.json {
        let output = ShowOutput {
            node,
            status: view.status(&node.id),
            children: catalog
                .children(&node.id)
                .into_iter()
                .map(|c| c.id.as_str())
                .collect(),
            ancestors: chain.iter().map(|n| n.id.as_str()).collect(),
            coverage: index.as_ref().and_then(|i| i.reverse.get(&node.id)),
        };
        print_json(&output)
    } else {
        print_stdout(&render::render_show(node, &view, &chain, index.as_ref()))
    }
}

fn run_status(layout: &ProjectLayout, args: JsonArgs) -> Result<()> {
    let catalog = store(layout).load()?;
    let summary = StatusView::new(&catalog).summary();
    if args.json {
        print_json(&summary)
    } else {
        print_stdout(&render::render_status(&summary))
    }
}

#[derive(Serialize)]
struct NextOutput<'a> {
    next: Option<&'a Node>,
    status: Option<Status>,
}

fn run_next(layout: &ProjectLayout, args: JsonArgs) -> Result<()> {
    let catalog = store(layout).load()?;
    let view = StatusView::new(&catalog);
    let next = view.next_unsatisfied();
    if args.json {
        return print_json(&NextOutput {
            next,
            status: next.map(|n| view.status(&n.id)),
        });
    }
    match next {
        Some(node) => print_stdout(&format!(
            "{} [{}] {}\n",
            node.id,
            view.status(&node.id),
            node.text
        )),
        None => print_stdout("all expectations satisfied\n"),
    }
}

#[derive(Serialize)]
struct TreeEntry<'a> {
    id: &'a str,
    kind: NodeKind,
    text: &'a str,
    parent: Option<&'a str>,
    status: Status,
}

fn run_tree(layout: &ProjectLayout, args: JsonArgs) -> Result<()> {
    let catalog = store(layout).load()?;
    let view = StatusView::new(&catalog);
    if args.json {
        let entries: Vec<TreeEntry<'_>> = catalog
            .nodes
            .iter()
            .map(|n| TreeEntry {
                id: &n.id,
                kind: n.kind(),
                text: &n.text,
                parent: n.parent.as_deref(),
                status: view.status(&n.id),
            })
            .collect();
        print_json(&entries)
    } else {
        print_stdout(&render::render_tree(&view))
    }
}

#[derive(Serialize)]
struct RelatedOutput {
    file: String,
    facets: Vec<String>,
    tree: Vec<NestedMotivation>,
}

fn run_related(layout: &ProjectLayout, args: RelatedArgs) -> Result<()> {
    let range = args.lines.range()?;
    let file = layout.relativize(&args.file);
    let catalog = store(layout).load()?;
    let index = load_index(layout)?.unwrap_or_else(|| {
        log::warn!("no index yet; run `facet test` to build one");
        TraceIndex::default()
    });
    let resolver = MotivationResolver::new(&catalog, &index);
    let facets = resolver.related_facets(&file, range);
    let tree = resolver.tree_for(&facets);

    if args.json {
        print_json(&RelatedOutput {
            file,
            facets,
            tree: tree.to_nested(),
        })
    } else if tree.is_empty() {
        print_stdout(&format!("no facets cover {file}\n"))
    } else {
        print_stdout(&tree.render())
    }
}

fn run_coverage(layout: &ProjectLayout, args: CoverageArgs) -> Result<()> {
    let report = match args.file {
        Some(file) => file,
        None => {
            let config = FacetConfig::load(layout)?;
            config
                .report_paths(layout, &ReportOverrides::default(), |k| env::var(k).ok())
                .coverage
        }
    };
    let projection = ProjectIndexer::new(layout.clone())
        .project(&report)
        .with_context(|| format!("Failed to project {}", report.display()))?;
    match args.format {
        FormatFlag::Json => print_json(&projection),
        FormatFlag::Text => print_stdout(&render::render_projection(&projection.summarize())),
    }
}

#[derive(Serialize)]
struct TestOutput {
    stats: facet_indexer::BuildStats,
    summary: facet_catalog::Summary,
}

fn run_test(layout: &ProjectLayout, args: TestArgs) -> Result<()> {
    let config = FacetConfig::load(layout)?;
    let overrides = ReportOverrides {
        junit: args.junit,
        coverage: args.coverage,
    };
    let reports = config.report_paths(layout, &overrides, |k| env::var(k).ok());
    log::debug!(
        "reports: junit={} coverage={}",
        reports.junit.display(),
        reports.coverage.display()
    );

    let outcome = ProjectIndexer::new(layout.clone()).index(&reports)?;
    let catalog = store(layout).load()?;
    let summary = StatusView::new(&catalog).summary();
    let satisfied = summary.unsatisfied == 0;

    if args.json {
        print_json(&TestOutput {
            stats: outcome.stats,
            summary,
        })?;
    } else {
        let stats = &outcome.stats;
        let mut out = format!(
            "{} tests ({} passed, {} failed, {} skipped), {} linked facets, {} lines in {} files\n",
            stats.tests,
            stats.passed,
            stats.failed,
            stats.skipped,
            stats.linked_facets,
            stats.covered_lines,
            stats.covered_files
        );
        for change in &stats.status_changes {
            out.push_str(&format!("  {}: {} -> {}\n", change.id, change.from, change.to));
        }
        out.push_str(&render::render_status(&summary));
        print_stdout(&out)?;
    }

    if !satisfied {
        std::process::exit(1);
    }
    Ok(())
}

fn run_check(layout: &ProjectLayout, args: CheckArgs) -> Result<()> {
    let categories = CheckCategory::parse_selection(&args.categories)?;
    let catalog = store(layout).load()?;
    let index = load_index(layout)?;
    let report = HealthChecker::new(&catalog, index.as_ref()).run(&categories);

    if args.json {
        print_json(&report)?;
    } else {
        print_stdout(&report.render())?;
    }
    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Serialize)]
struct TouchOutput {
    file: String,
    facets: Vec<String>,
}

fn run_touch(layout: &ProjectLayout, args: TouchArgs) -> Result<()> {
    let range = args.lines.range()?;
    let file = layout.relativize(&args.file);
    let store = store(layout);
    let catalog = store.load()?;
    let Some(index) = load_index(layout)? else {
        log::warn!("no index yet; nothing recorded for {file}");
        return finish_touch(file, Vec::new(), args.json);
    };

    let facets = MotivationResolver::new(&catalog, &index).related_facets(&file, range);
    store.record_modifications(&facets, &file, &args.tool)?;
    finish_touch(file, facets, args.json)
}

fn finish_touch(file: String, facets: Vec<String>, json: bool) -> Result<()> {
    if json {
        print_json(&TouchOutput { file, facets })
    } else if facets.is_empty() {
        print_stdout(&format!("no facets cover {file}\n"))
    } else {
        print_stdout(&format!("recorded {file} on {}\n", facets.join(", ")))
    }
}
