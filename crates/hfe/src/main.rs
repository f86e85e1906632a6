//! Helios FHIR Endpoint inspector (hfe)
//!
//! Lists the endpoint API surface and checks endpoint URIs offline,
//! without contacting a server.

use anyhow::Context;
use clap::{Parser, Subcommand};
use helios_fhir_endpoint::config::Properties;
use helios_fhir_endpoint::{
    ApiMethod, ApiName, ExtraParameter, FhirComponent, FhirConfiguration, init_logging,
};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "hfe", version, about = "Inspect FHIR endpoint URIs")]
struct Cli {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "HFE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the APIs and their method overloads.
    Apis {
        /// Only show this API.
        api: Option<ApiName>,
    },

    /// List the extra parameters and the request kinds they apply to.
    Parameters,

    /// Check an endpoint URI and print the resulting endpoint plan.
    Inspect {
        /// Endpoint URI, e.g. fhir://read/resourceById?resourceType=Patient
        uri: String,

        /// Component option applied before the URI, as key=value.
        #[arg(short = 'o', long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },
}

fn parse_option(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", text)),
    }
}

fn list_apis(only: Option<ApiName>) {
    for api in ApiName::ALL
        .into_iter()
        .filter(|api| only.is_none_or(|only| only == *api))
    {
        println!("{}", api);
        for name in ApiMethod::names(api) {
            for method in ApiMethod::candidates(api, name) {
                println!("  {}", method.signature());
            }
        }
    }
}

fn list_parameters() {
    for parameter in ExtraParameter::ALL {
        let kinds: Vec<&str> = parameter
            .supported_kinds()
            .iter()
            .map(|kind| kind.as_str())
            .collect();
        println!("{:<22} {}", parameter.key(), kinds.join(", "));
    }
}

fn inspect(uri: &str, options: Vec<(String, String)>) -> anyhow::Result<()> {
    let properties: Properties = options
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let configuration = FhirConfiguration::from_properties(&properties)
        .context("invalid component option")?;
    debug!(options = properties.len(), "Built component configuration");

    let component = FhirComponent::new(configuration);
    let plan = component
        .plan(uri)
        .with_context(|| format!("invalid endpoint URI '{}'", uri))?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    match plan.resolve_with_uri_arguments() {
        Some(method) => println!("resolves to {}", method.signature()),
        None => println!("overload is chosen from the arguments of each call"),
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Apis { api } => list_apis(api),
        Command::Parameters => list_parameters(),
        Command::Inspect { uri, options } => inspect(&uri, options)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("serverUrl=http://localhost:8080/fhir").unwrap(),
            (
                "serverUrl".to_string(),
                "http://localhost:8080/fhir".to_string()
            )
        );
        assert!(parse_option("serverUrl").is_err());
        assert!(parse_option("=x").is_err());
    }

    #[test]
    fn test_cli_parses_inspect() {
        let cli = Cli::try_parse_from([
            "hfe",
            "inspect",
            "fhir://search/searchByUrl?url=Patient",
            "-o",
            "fhirVersion=R5",
        ])
        .unwrap();

        match cli.command {
            Command::Inspect { uri, options } => {
                assert_eq!(uri, "fhir://search/searchByUrl?url=Patient");
                assert_eq!(options, vec![("fhirVersion".to_string(), "R5".to_string())]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_api_filter() {
        let cli = Cli::try_parse_from(["hfe", "apis", "load-page"]).unwrap();

        assert!(matches!(
            cli.command,
            Command::Apis {
                api: Some(ApiName::LoadPage)
            }
        ));
    }

    #[test]
    fn test_inspect_rejects_unknown_api() {
        assert!(inspect("fhir://fetch/resourceById", Vec::new()).is_err());
    }
}
