//! MockStar resolution debugger
//!
//! Loads a mocker tree and shows what a request path resolves to.
//!
//! Usage:
//!   mockstar-resolve --base-path ./mock_server/mockers --list
//!   mockstar-resolve --base-path ./mock_server/mockers --route /cgi-bin/a/b/demo_01
//!   mockstar-resolve --config mockstar.yaml --route /api/user --params '{"id": 1}'

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use futures::future::join_all;
use mockstar_engine::{MockQuery, Parser, ParserOptions, ResolveRequest};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Resolve request paths against a mocker directory tree
#[derive(ClapParser, Debug)]
#[command(name = "mockstar-resolve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding one subdirectory per mocker
    #[arg(short, long, env = "MOCKSTAR_BASE_PATH")]
    base_path: Option<PathBuf>,

    /// Options file (YAML or JSON); paths given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Build directory for the db.json snapshot
    #[arg(long)]
    build_path: Option<PathBuf>,

    /// Request path to resolve
    #[arg(short, long)]
    route: Option<String>,

    /// HTTP method of the request
    #[arg(short, long)]
    method: Option<String>,

    /// Request parameters as JSON
    #[arg(short, long)]
    params: Option<String>,

    /// Override list as JSON, e.g. '[{"mockerName":"demo","mockModuleName":"error"}]'
    #[arg(short, long)]
    query: Option<String>,

    /// List mockers and their modules
    #[arg(short, long)]
    list: bool,

    /// With --list, also evaluate every mocker's default module
    #[arg(long)]
    evaluate: bool,
}

fn load_options(args: &Args) -> Result<ParserOptions> {
    let mut options = match (&args.config, &args.base_path) {
        (Some(config), _) => ParserOptions::from_file(config)
            .with_context(|| format!("loading {}", config.display()))?,
        (None, Some(base)) => ParserOptions::new(base),
        (None, None) => bail!("either --base-path or --config is required"),
    };

    if let (Some(_), Some(base)) = (&args.config, &args.base_path) {
        options.base_path = base.clone();
    }
    if let Some(build) = &args.build_path {
        options.build_path = Some(build.clone());
    }
    // One-shot tool: never keep a watcher around.
    options.watch = false;
    Ok(options)
}

async fn list(parser: &Parser, evaluate: bool) -> Result<Value> {
    let mockers = parser.get_all_mocker();

    let results = if evaluate {
        join_all(mockers.iter().map(|mocker| async move {
            match mocker.default_module() {
                Some(module) => match module.get_result(None).await {
                    Ok(value) => value,
                    Err(e) => json!({ "error": e.to_string() }),
                },
                None => Value::Null,
            }
        }))
        .await
    } else {
        Vec::new()
    };

    let entries: Vec<Value> = mockers
        .iter()
        .enumerate()
        .map(|(i, mocker)| {
            let mut entry = json!({
                "name": mocker.name,
                "routes": mocker.routes,
                "method": mocker.method,
                "disabled": mocker.disabled,
                "defaultModule": mocker.default_module().map(|m| m.name().to_string()),
                "modules": mocker.mock_modules.iter().map(|m| json!({
                    "name": m.name(),
                    "kind": m.kind(),
                    "enabled": m.is_enabled(),
                })).collect::<Vec<_>>(),
            });
            if let Some(result) = results.get(i) {
                entry["result"] = result.clone();
            }
            entry
        })
        .collect();

    Ok(Value::Array(entries))
}

async fn resolve(parser: &Parser, args: &Args, route: &str) -> Result<Value> {
    let params: Option<Value> = args
        .params
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("--params is not valid JSON")?;

    let query = args
        .query
        .as_deref()
        .map(MockQuery::from_json)
        .transpose()
        .context("--query is not a valid override list")?
        .unwrap_or_default();

    let mut request = ResolveRequest::new(route).with_query(query);
    if let Some(method) = &args.method {
        request = request.with_method(method);
    }

    let Some(res) = parser.resolve(&request) else {
        bail!("no mocker matches {route}");
    };

    let result = match res.evaluate(params.as_ref()).await {
        Some(Ok(value)) => value,
        Some(Err(e)) => json!({ "error": e.to_string() }),
        None => Value::Null,
    };

    Ok(json!({
        "mocker": res.mocker.name,
        "mockModule": res.mock_module.as_ref().map(|m| m.name().to_string()),
        "moduleFullPath": res.module_full_path,
        "params": res.params,
        "bypass": res.bypass,
        "result": result,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = load_options(&args)?;
    let parser = Parser::new(options).context("failed to load mocker tree")?;

    let output = match (&args.route, args.list) {
        (Some(route), _) => resolve(&parser, &args, route).await?,
        (None, true) => list(&parser, args.evaluate).await?,
        (None, false) => bail!("nothing to do: pass --route or --list"),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    parser.dispose();
    Ok(())
}
