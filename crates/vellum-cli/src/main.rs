use anyhow::{Context, bail};
use clap::{Args, Parser as ClapParser, Subcommand};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use vellum::{
    Code, Components, Config, Document, DocumentRef, Engine, Event, MemoryDocument, NodeId, State,
    Template, Value, dispatch,
};

#[derive(ClapParser)]
#[command(name = "vellum")]
#[command(about = "Reactive templates over JSON state")]
struct Cli {
    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log render passes and reconciliation
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap a page and print the rendered root element
    Render {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Parse markup and every expression in it without evaluating anything
    Check {
        /// Markup file
        file: PathBuf,
    },
    /// Bootstrap a page, then replay a script of writes and events
    Run {
        #[command(flatten)]
        page: PageArgs,
        /// One command per line: `set <path> <json>`, `fire <id> <event> [json]`,
        /// `input <id> <text>`, `check <id>`, `print`, `state`
        script: PathBuf,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Markup file
    markup: PathBuf,
    /// Initial state (JSON object); empty when omitted
    #[arg(long)]
    state: Option<PathBuf>,
    /// Components (JSON object of `{"name": {"$html": "...", ...fields}}`)
    #[arg(long)]
    components: Option<PathBuf>,
    /// Id of the element to bootstrap
    #[arg(long, default_value = "app")]
    root: String,
}

struct Session {
    document: Rc<RefCell<MemoryDocument>>,
    root: NodeId,
    state: State,
}

fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        EnvFilter::new("vellum=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_json(&read(path)?)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Render { page } => {
            let session = bootstrap(&page, config)?;
            println!("{}", render(&session));
        }
        Commands::Check { file } => check(&file)?,
        Commands::Run { page, script } => {
            let session = bootstrap(&page, config)?;
            let script = read(&script)?;
            for (number, line) in script.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                replay(&session, line).with_context(|| format!("script line {}: `{line}`", number + 1))?;
            }
        }
    }
    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(&read(path)?).with_context(|| format!("parsing {}", path.display()))
}

fn bootstrap(page: &PageArgs, config: Config) -> anyhow::Result<Session> {
    let markup = read(&page.markup)?;
    let document = MemoryDocument::parse(&markup)
        .with_context(|| format!("parsing {}", page.markup.display()))?;
    let root = document
        .element_by_id(&page.root)
        .with_context(|| format!("no element with id `{}`", page.root))?;
    let state = match &page.state {
        Some(path) => read_json(path)?,
        None => serde_json::json!({}),
    };

    let document = document.into_shared();
    let mut engine = Engine::new(document.clone()).with_config(config);
    if let Some(path) = &page.components {
        let markup_key = format!("{}html", engine.config().meta_marker);
        let components = Components::from_json(&read_json(path)?, &markup_key)
            .with_context(|| format!("loading {}", path.display()))?;
        tracing::debug!(count = components.len(), "components loaded");
        engine = engine.components(components);
    }
    let state = engine.bootstrap(root, Value::from_json(&state))?;
    Ok(Session {
        document,
        root,
        state,
    })
}

fn render(session: &Session) -> String {
    session.document.borrow().markup(session.root)
}

fn replay(session: &Session, line: &str) -> anyhow::Result<()> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match command {
        "set" => {
            let (path, json) = rest.split_once(' ').context("expected `set <path> <json>`")?;
            let value: serde_json::Value = serde_json::from_str(json.trim())?;
            assign(&session.state, path, Value::from_json(&value))?;
        }
        "fire" => {
            let mut words = rest.splitn(3, ' ');
            let (Some(id), Some(name)) = (words.next(), words.next()) else {
                bail!("expected `fire <id> <event> [json]`");
            };
            let mut event = Event::new(name, element(session, id)?);
            if let Some(detail) = words.next() {
                let detail: serde_json::Value = serde_json::from_str(detail)?;
                event = event.with_detail(Value::from_json(&detail));
            }
            fire(session, event)?;
        }
        "input" => {
            let (id, text) = rest.split_once(' ').unwrap_or((rest, ""));
            let node = element(session, id)?;
            session
                .document
                .borrow_mut()
                .set_property(node, "value", Value::from(text));
            fire(session, Event::new("input", node))?;
        }
        "check" => {
            let node = element(session, rest)?;
            let checked = session.document.borrow().property(node, "checked").is_truthy();
            session
                .document
                .borrow_mut()
                .set_property(node, "checked", Value::Bool(!checked));
            fire(session, Event::new("input", node))?;
        }
        "print" => println!("{}", render(session)),
        "state" => println!("{}", serde_json::to_string_pretty(&session.state.snapshot().to_json())?),
        other => bail!("unknown command `{other}`"),
    }
    Ok(())
}

/// Write through a dotted path such as `todos.0.done`, so intermediate
/// scopes notify the root the same way expression writes do.
fn assign(state: &State, path: &str, value: Value) -> anyhow::Result<()> {
    let mut scope = state.clone();
    let mut keys = path.split('.').peekable();
    while let Some(key) = keys.next() {
        if keys.peek().is_none() {
            scope.set(key, value)?;
            return Ok(());
        }
        scope = match scope.get(key) {
            Value::State(nested) => nested,
            other => bail!("`{key}` is {}, not an object or array", other.type_of()),
        };
    }
    bail!("empty path")
}

fn fire(session: &Session, event: Event) -> vellum::Result<()> {
    let document: DocumentRef = session.document.clone();
    dispatch(&document, event)
}

fn element(session: &Session, id: &str) -> anyhow::Result<NodeId> {
    let found = session.document.borrow().element_by_id(id);
    found.with_context(|| format!("no element with id `{id}`"))
}

/// Parse every `${...}` template and every directive expression, reporting
/// each failure instead of stopping at the first.
fn check(file: &Path) -> anyhow::Result<()> {
    let markup = read(file)?;
    let document = MemoryDocument::parse(&markup)
        .with_context(|| format!("parsing {}", file.display()))?;
    let mut failures = 0;
    let mut checked = 0;
    let mut visit = |what: String, result: vellum::Result<()>| {
        checked += 1;
        if let Err(error) = result {
            failures += 1;
            eprintln!("{}: {what}\n{error}", file.display());
        }
    };
    check_node(&document, document.root(), &mut visit);
    eprintln!("{checked} expressions checked, {failures} failed");
    if failures > 0 {
        bail!("{failures} expression(s) failed to parse");
    }
    Ok(())
}

fn check_node(
    document: &MemoryDocument,
    node: NodeId,
    visit: &mut impl FnMut(String, vellum::Result<()>),
) {
    match document.tag_name(node) {
        None => {
            let text = document.text(node).unwrap_or_default();
            if text.contains("${") {
                visit(format!("text `{}`", text.trim()), Template::parse(&text).map(drop));
            }
        }
        Some(tag) => {
            for (name, value) in document.attributes(node) {
                let is_code = name.starts_with(':')
                    || name.starts_with('@')
                    || matches!(name.as_str(), "v-if" | "v-else-if" | "v-for");
                if is_code {
                    visit(format!("<{tag} {name}>"), Code::compile(&value).map(drop));
                } else if value.contains("${") {
                    visit(format!("<{tag} {name}>"), Template::parse(&value).map(drop));
                }
            }
            if tag != "script" {
                for child in document.children(node) {
                    check_node(document, child, visit);
                }
            }
        }
    }
}
