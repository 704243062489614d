//! showparse command line.
//!
//! Classifies captured command output against a template directory and
//! prints the result as JSON.
//!
//! ```bash
//! showparse --platform cisco_ios --command "show vlan" --file r1_show_vlan.txt
//! showparse --platform cisco_ios --command "show vlan" \
//!     --device r1=r1_show_vlan.txt --device r2=r2_show_vlan.txt --pretty
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, ArgGroup, Parser};
use log::info;
use serde::Serialize;
use serde_json::Value;

use showparse::classify::{DEFAULT_INDEX_FILE, DEFAULT_TEMPLATE_DIR};
use showparse::{ClassifierBuilder, OfflineSession, ParseResult, Session, fan_out};

/// Device name used for a single `--file` capture.
const LOCAL_DEVICE: &str = "localhost";

#[derive(Debug, Parser)]
#[command(name = "showparse", version)]
#[command(about = "Turn captured network device command output into structured records")]
#[command(group(ArgGroup::new("input").required(true).args(["file", "devices"])))]
struct Cli {
    /// Device platform as named in the index (e.g. cisco_ios).
    #[arg(long)]
    platform: String,

    /// Command whose output is being classified.
    #[arg(long)]
    command: String,

    /// Directory holding the index and template files.
    #[arg(long, default_value = DEFAULT_TEMPLATE_DIR)]
    template_dir: PathBuf,

    /// Name of the index file inside the template directory.
    #[arg(long, default_value = DEFAULT_INDEX_FILE)]
    index_file: String,

    /// Parse output with templates; `false` always returns raw text.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    use_templates: bool,

    /// Captured output of a single device.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Captured output of one of several devices.
    #[arg(long = "device", value_name = "NAME=FILE", value_parser = parse_device)]
    devices: Vec<(String, PathBuf)>,

    /// Also write the raw output of the single device here.
    #[arg(long, requires = "file")]
    local_file: Option<PathBuf>,

    /// Pretty-print the JSON.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Default, Serialize)]
struct Output {
    response: Vec<Value>,
    response_list: Vec<DeviceOutput>,
}

#[derive(Debug, Serialize)]
struct DeviceOutput {
    device: String,
    response: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_device(arg: &str) -> Result<(String, PathBuf), String> {
    let (name, file) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=FILE, got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() || file.is_empty() {
        return Err(format!("expected NAME=FILE, got '{arg}'"));
    }
    Ok((name.to_string(), PathBuf::from(file)))
}

/// Records as JSON objects, or the raw text as a single string.
fn response_values(result: &ParseResult) -> Result<Vec<Value>, serde_json::Error> {
    match result {
        ParseResult::Structured(records) => records.iter().map(serde_json::to_value).collect(),
        ParseResult::Raw(text) => Ok(vec![Value::String(text.clone())]),
    }
}

async fn run(cli: &Cli) -> Result<Output, Box<dyn Error>> {
    let classifier = ClassifierBuilder::new(&cli.template_dir)
        .index_file(&cli.index_file)
        .use_templates(cli.use_templates)
        .build()?;

    let mut output = Output::default();

    if let Some(file) = &cli.file {
        let mut session = OfflineSession::new(LOCAL_DEVICE, file);
        session.open().await?;
        let captured = session.send_command(&cli.command).await?;
        session.close().await?;

        if let Some(local) = &cli.local_file {
            tokio::fs::write(local, &captured.result).await?;
            info!("raw output written to {}", local.display());
        }

        let result = classifier.classify_output(&cli.platform, &captured)?;
        output.response = response_values(&result)?;
    } else {
        let sessions: Vec<_> = cli
            .devices
            .iter()
            .map(|(name, file)| OfflineSession::new(name, file))
            .collect();
        let responses = fan_out(sessions, Arc::new(classifier), &cli.platform, &cli.command).await;
        for r in responses {
            let (response, error) = match &r.response {
                Ok(result) => (response_values(result)?, None),
                Err(err) => (Vec::new(), Some(err.to_string())),
            };
            output.response_list.push(DeviceOutput {
                device: r.device,
                response,
                error,
            });
        }
    }

    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let rendered = match run(&cli).await {
        Ok(output) if cli.pretty => serde_json::to_string_pretty(&output),
        Ok(output) => serde_json::to_string(&output),
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
