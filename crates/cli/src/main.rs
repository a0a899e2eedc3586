use std::path::{Path, PathBuf};

use actionkit_engine::{
    ExecuteField, ExecuteInput, Steps, compile, decompile, default_mapping, parse_fields_file, parse_value_file,
    step::{MapInput, Validate},
    transform, validate_mapping,
};
use actionkit_types::JsonSchema;
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();
    let output = run_command(&matches).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// `RUST_LOG` directives, or `info` when unset or unparsable.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .action(ArgAction::Set)
        .value_parser(clap::value_parser!(PathBuf))
        .required(true)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("actionkit")
        .about("Inspect action field schemas, payload validation and mappings")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("schema")
                .about("Compile field definitions into a schema, or decompile a schema")
                .arg(
                    Arg::new("fields")
                        .long("fields")
                        .action(ArgAction::Set)
                        .value_parser(clap::value_parser!(PathBuf))
                        .required_unless_present("decompile")
                        .help("Path to field definitions (YAML/JSON)"),
                )
                .arg(
                    Arg::new("decompile")
                        .long("decompile")
                        .action(ArgAction::Set)
                        .value_parser(clap::value_parser!(PathBuf))
                        .conflicts_with("fields")
                        .help("Path to a compiled schema to turn back into field definitions"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Map (optionally) and validate a payload against field definitions")
                .arg(file_arg("fields", "Path to field definitions (YAML/JSON)"))
                .arg(file_arg("payload", "Path to the payload or event (YAML/JSON)"))
                .arg(
                    Arg::new("mapping")
                        .long("mapping")
                        .action(ArgAction::Set)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Mapping applied to the payload before validation"),
                ),
        )
        .subcommand(
            Command::new("map")
                .about("Apply a mapping to an event")
                .arg(file_arg("mapping", "Path to the mapping (YAML/JSON)"))
                .arg(file_arg("event", "Path to the event (YAML/JSON)")),
        )
        .subcommand(
            Command::new("defaults")
                .about("Print the default mapping derived from field defaults")
                .arg(file_arg("fields", "Path to field definitions (YAML/JSON)")),
        )
}

async fn run_command(matches: &ArgMatches) -> Result<Value> {
    match matches.subcommand() {
        Some(("schema", sub)) => match sub.get_one::<PathBuf>("decompile") {
            Some(schema_path) => decompile_schema(schema_path),
            None => compile_fields(required_path(sub, "fields")?),
        },
        Some(("validate", sub)) => {
            let mapping = sub.get_one::<PathBuf>("mapping").map(PathBuf::as_path);
            validate_payload(required_path(sub, "fields")?, required_path(sub, "payload")?, mapping).await
        }
        Some(("map", sub)) => map_event(required_path(sub, "mapping")?, required_path(sub, "event")?),
        Some(("defaults", sub)) => {
            let fields = parse_fields_file(required_path(sub, "fields")?)?;
            Ok(default_mapping(&fields))
        }
        _ => anyhow::bail!("expected one of: schema, validate, map, defaults"),
    }
}

fn required_path<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    matches
        .get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing --{name}"))
}

fn compile_fields(fields_path: &Path) -> Result<Value> {
    let fields = parse_fields_file(fields_path)?;
    Ok(serde_json::to_value(compile(&fields))?)
}

fn decompile_schema(schema_path: &Path) -> Result<Value> {
    let schema: JsonSchema = serde_json::from_value(parse_value_file(schema_path)?)
        .with_context(|| format!("{} is not a compiled schema", schema_path.display()))?;
    Ok(serde_json::to_value(decompile(&schema))?)
}

async fn validate_payload(fields_path: &Path, payload_path: &Path, mapping_path: Option<&Path>) -> Result<Value> {
    let fields = parse_fields_file(fields_path)?;
    let mut input = ExecuteInput::new(Value::Null, parse_value_file(payload_path)?);
    if let Some(mapping_path) = mapping_path {
        let mapping = parse_value_file(mapping_path)?;
        validate_mapping(&mapping).with_context(|| format!("invalid mapping in {}", mapping_path.display()))?;
        input = input.with_mapping(mapping);
    }

    let mut steps = Steps::new();
    steps.push(MapInput);
    steps.push(Validate::new(ExecuteField::Payload, compile(&fields)));
    let run = steps.execute(&mut input).await;
    debug!(steps = run.results.len(), valid = run.is_success(), "validation finished");

    Ok(match run.error {
        None => json!({ "valid": true, "payload": input.payload }),
        Some(error) => {
            let errors: Vec<String> = match error.as_validation() {
                Some(errors) => errors.errors().iter().map(ToString::to_string).collect(),
                None => vec![error.to_string()],
            };
            json!({ "valid": false, "errors": errors })
        }
    })
}

fn map_event(mapping_path: &Path, event_path: &Path) -> Result<Value> {
    let mapping = parse_value_file(mapping_path)?;
    let event = parse_value_file(event_path)?;
    transform(&mapping, &event).with_context(|| format!("failed to apply {}", mapping_path.display()))
}
