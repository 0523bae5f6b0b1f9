//! # CLI Layer
//!
//! This module is **one possible UI client** for ad layers. It is the only
//! place that reads arguments, touches stdout/stderr, reads stdin, and picks
//! the data directory.
//!
//! - `run()`: main dispatch (called by `main.rs`)
//! - `init_context()`: data directory, config, logging, API
//! - `handle_*()`: per-command handlers that call the API and print

use super::print::{
    eprint_messages, print_layer, print_layers, print_list, print_messages, print_priority,
    print_settings,
};
use super::setup::{
    print_grouped_help, print_subcommand_help, Cli, Commands, DataCommands, LayerCommands,
    LayerFields, RenderCommands, RequestArg, SettingsAction, SettingsCommands, VariablesAction,
};
use adlayers::api::{AdLayersApi, CmdResult};
use adlayers::commands::layers::LayerUpdate;
use adlayers::config::AdLayersConfig;
use adlayers::error::{AdLayersError, Result};
use adlayers::model::{LayerAdUnit, LayerMeta, PostId, PostStatus, TermId};
use adlayers::request::Request;
use adlayers::store::fs::FileStore;
use clap::Parser;
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const HOME_ENV: &str = "ADLAYERS_HOME";
const LOG_ENV: &str = "ADLAYERS_LOG";

struct AppContext {
    api: AdLayersApi<FileStore>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.help {
        if cli.command.is_none() {
            print_grouped_help();
        } else {
            print_subcommand_help(&cli.command);
        }
        return Ok(());
    }

    init_logging(cli.verbose);
    let mut ctx = init_context(&cli)?;

    match cli.command {
        Some(Commands::Layer(cmd)) => match cmd {
            LayerCommands::Add { title, fields } => handle_add(&mut ctx, title.join(" "), fields),
            LayerCommands::Update { id, title, fields } => {
                handle_update(&mut ctx, &id, title, fields)
            }
            LayerCommands::Delete { ids } => handle_delete(&mut ctx, &ids),
            LayerCommands::List => handle_list(&ctx),
            LayerCommands::Show { id } => handle_show(&ctx, &id),
            LayerCommands::Reorder { ids } => handle_reorder(&mut ctx, &ids),
        },
        Some(Commands::Settings(cmd)) => match cmd {
            SettingsCommands::Settings { action } => handle_settings(&mut ctx, action),
            SettingsCommands::Variables { action } => handle_variables(&mut ctx, action),
        },
        Some(Commands::Data(cmd)) => match cmd {
            DataCommands::Export { output } => handle_export(&ctx, output),
            DataCommands::Import { path, no_override } => {
                handle_import(&mut ctx, path, !no_override)
            }
        },
        Some(Commands::Render(cmd)) => match cmd {
            RenderCommands::Resolve { request } => {
                let request = parse_request(&request)?;
                print_output(ctx.api.resolve(request)?)
            }
            RenderCommands::Head { request } => {
                let request = parse_request(&request)?;
                print_output(ctx.api.render_head(request)?)
            }
            RenderCommands::Unit { code, request } => {
                let request = parse_request(&request)?;
                print_output(ctx.api.render_unit(request, &code)?)
            }
            RenderCommands::Content { content, request } => {
                let request = parse_request(&request)?;
                let content = read_arg(&content)?;
                print_output(ctx.api.render_content(request, &content)?)
            }
            RenderCommands::Widget {
                slot,
                before,
                after,
                request,
            } => handle_widget(&mut ctx, slot, &before, &after, &request),
            RenderCommands::PageTypes => print_output(ctx.api.page_types()?),
            RenderCommands::Tags => print_output(ctx.api.formatting_tags()?),
        },
        None => handle_list(&ctx),
    }
}

/// `ADLAYERS_LOG` takes an env filter; `-v` turns on debug output for the crate.
fn init_logging(verbose: bool) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if verbose => EnvFilter::new("adlayers=debug"),
        Err(_) => EnvFilter::new("warn"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "adlayers", "adlayers")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| AdLayersError::Store("Could not determine a data directory".into()))
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let dir = data_dir(cli)?;
    tracing::debug!(dir = %dir.display(), "using data directory");
    let config = AdLayersConfig::load(&dir)?;
    let store = FileStore::new(dir);
    Ok(AppContext {
        api: AdLayersApi::new(store, config),
    })
}

/// A JSON or text argument: inline, `@path` for a file, `-` for stdin.
fn read_arg(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(AdLayersError::Io)?;
        return Ok(buffer);
    }
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(AdLayersError::Io),
        None => Ok(arg.to_string()),
    }
}

fn read_json<T: DeserializeOwned>(arg: &str) -> Result<T> {
    Ok(serde_json::from_str(&read_arg(arg)?)?)
}

fn parse_request(arg: &RequestArg) -> Result<Request> {
    match &arg.request {
        Some(request) => read_json(request),
        None => Ok(Request::Home),
    }
}

fn parse_id(s: &str) -> Result<PostId> {
    s.trim_start_matches('#')
        .parse()
        .map_err(|_| AdLayersError::Api(format!("Invalid layer id: {}", s)))
}

fn parse_ids(strs: &[String]) -> Result<Vec<PostId>> {
    strs.iter().map(|s| parse_id(s)).collect()
}

fn parse_status(s: &str) -> Result<PostStatus> {
    s.parse().map_err(AdLayersError::Api)
}

fn parse_terms(terms: &[String]) -> Result<BTreeMap<String, Vec<TermId>>> {
    let mut parsed: BTreeMap<String, Vec<TermId>> = BTreeMap::new();
    for term in terms {
        let parsed_term = term
            .split_once('=')
            .and_then(|(taxonomy, id)| Some((taxonomy.trim(), id.trim().parse().ok()?)));
        let Some((taxonomy, id)) = parsed_term else {
            return Err(AdLayersError::Api(format!(
                "Invalid term `{}`, expected taxonomy=term_id",
                term
            )));
        };
        parsed.entry(taxonomy.to_string()).or_default().push(id);
    }
    Ok(parsed)
}

/// Meta from `--meta`, with the list flags appended.
fn build_meta(base: Option<LayerMeta>, fields: &LayerFields) -> Result<Option<LayerMeta>> {
    let has_flags = !fields.page_types.is_empty()
        || !fields.ad_units.is_empty()
        || !fields.taxonomy.is_empty()
        || !fields.post_types.is_empty();
    let explicit = match &fields.meta {
        Some(meta) => Some(read_json::<LayerMeta>(meta)?),
        None => None,
    };
    if explicit.is_none() && !has_flags {
        return Ok(None);
    }

    let mut meta = explicit.or(base).unwrap_or_default();
    meta.page_types.extend(fields.page_types.iter().cloned());
    meta.ad_units
        .extend(fields.ad_units.iter().map(LayerAdUnit::new));
    meta.taxonomies.extend(fields.taxonomy.iter().cloned());
    meta.post_types.extend(fields.post_types.iter().cloned());
    Ok(Some(meta))
}

fn handle_add(ctx: &mut AppContext, title: String, fields: LayerFields) -> Result<()> {
    let status = match &fields.status {
        Some(status) => parse_status(status)?,
        None => PostStatus::Publish,
    };
    let meta = build_meta(None, &fields)?.unwrap_or_default();
    let terms = parse_terms(&fields.term)?;
    let result = ctx.api.create_layer(title, status, meta, terms)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_update(
    ctx: &mut AppContext,
    id: &str,
    title: Option<String>,
    fields: LayerFields,
) -> Result<()> {
    let id = parse_id(id)?;
    let current = ctx
        .api
        .show_layer(id)?
        .listed_layers
        .into_iter()
        .next()
        .map(|listed| listed.layer.meta);
    let update = LayerUpdate {
        title,
        status: fields.status.as_deref().map(parse_status).transpose()?,
        meta: build_meta(current, &fields)?,
        terms: if fields.term.is_empty() {
            None
        } else {
            Some(parse_terms(&fields.term)?)
        },
    };
    let result = ctx.api.update_layer(id, update)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_delete(ctx: &mut AppContext, ids: &[String]) -> Result<()> {
    for id in parse_ids(ids)? {
        let result = ctx.api.delete_layer(id)?;
        print_messages(&result.messages);
    }
    Ok(())
}

fn handle_list(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.list_layers()?;
    print_layers(&result.listed_layers);
    print_messages(&result.messages);
    Ok(())
}

fn handle_show(ctx: &AppContext, id: &str) -> Result<()> {
    let result = ctx.api.show_layer(parse_id(id)?)?;
    for listed in &result.listed_layers {
        print_layer(listed)?;
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_reorder(ctx: &mut AppContext, ids: &[String]) -> Result<()> {
    let result = ctx.api.reorder_layers(&parse_ids(ids)?)?;
    print_priority(&result.priority);
    print_messages(&result.messages);
    Ok(())
}

fn handle_settings(ctx: &mut AppContext, action: Option<SettingsAction>) -> Result<()> {
    match action.unwrap_or(SettingsAction::Show) {
        SettingsAction::Set { json } => {
            let result = ctx.api.set_settings(read_json(&json)?)?;
            print_messages(&result.messages);
        }
        SettingsAction::Show => {
            let result = ctx.api.show_settings()?;
            if let Some(settings) = &result.settings {
                print_settings(settings, &result.compiled)?;
            }
            print_messages(&result.messages);
        }
        SettingsAction::Compile => {
            let result = ctx.api.compile_settings()?;
            print_messages(&result.messages);
        }
        SettingsAction::Fields { server } => {
            print_output(ctx.api.settings_fields(server.as_deref())?)?;
        }
    }
    Ok(())
}

fn handle_variables(ctx: &mut AppContext, action: Option<VariablesAction>) -> Result<()> {
    let result = match action.unwrap_or(VariablesAction::Show) {
        VariablesAction::Set { names } => ctx.api.set_custom_variables(names)?,
        VariablesAction::Show => ctx.api.custom_variables()?,
    };
    print_list(&result.custom_variables, "No custom variables.");
    print_messages(&result.messages);
    Ok(())
}

fn handle_export(ctx: &AppContext, output: Option<PathBuf>) -> Result<()> {
    let result = ctx.api.export(output)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_import(ctx: &mut AppContext, path: PathBuf, override_existing: bool) -> Result<()> {
    let content = std::fs::read_to_string(&path).map_err(AdLayersError::Io)?;
    let result = ctx.api.import(&content, override_existing)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_widget(
    ctx: &mut AppContext,
    slot: Option<String>,
    before: &str,
    after: &str,
    request: &RequestArg,
) -> Result<()> {
    let Some(slot) = slot else {
        return print_output(ctx.api.widget_slots()?);
    };
    let request = parse_request(request)?;
    let instance = serde_json::json!({ "ad_slot": slot });
    print_output(ctx.api.render_widget(request, instance, before, after)?)
}

/// Rendered output to stdout, messages to stderr.
fn print_output(result: CmdResult) -> Result<()> {
    if let Some(output) = result.output.as_deref().filter(|o| !o.is_empty()) {
        println!("{}", output);
    }
    eprint_messages(&result.messages);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_hash_prefix() {
        assert_eq!(parse_id("#12").unwrap(), PostId(12));
        assert_eq!(parse_id("7").unwrap(), PostId(7));
        assert!(parse_id("x").is_err());
    }

    #[test]
    fn parse_terms_groups_by_taxonomy() {
        let terms = parse_terms(&["category=3".into(), "category=4".into(), "post_tag=9".into()])
            .unwrap();
        assert_eq!(terms["category"], vec![3, 4]);
        assert_eq!(terms["post_tag"], vec![9]);
        assert!(parse_terms(&["category".into()]).is_err());
    }

    #[test]
    fn meta_flags_extend_current_meta() {
        let current = LayerMeta {
            page_types: vec!["home".into()],
            ..Default::default()
        };
        let fields = LayerFields {
            page_types: vec!["post".into()],
            ..Default::default()
        };
        let meta = build_meta(Some(current.clone()), &fields).unwrap().unwrap();
        assert_eq!(meta.page_types, vec!["home", "post"]);

        let untouched = build_meta(Some(current), &LayerFields::default()).unwrap();
        assert!(untouched.is_none());
    }

    #[test]
    fn inline_request_parses() {
        let arg = RequestArg {
            request: Some(r#"{"type":"singular","id":5,"post_type":"post"}"#.into()),
        };
        let request = parse_request(&arg).unwrap();
        assert_eq!(request.post_type(), Some("post"));
        assert_eq!(parse_request(&RequestArg::default()).unwrap(), Request::Home);
    }
}
