//! Command-line interface.

use crate::config::{Config, ConfigManager, Settings};
use crate::error::{ExportError, Result};
use crate::export::{project_jql, BatchReport, ExportOptions, Exporter, IssueFetcher};
use crate::render::ExportFormat;
use clap::{ArgAction, Args, Parser, Subcommand};
use jira_api::verify_credentials;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "jira-export", version)]
#[command(about = "Export Jira issues to PDF, Word, Markdown and PNG")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Jira site, e.g. https://acme.atlassian.net
    #[arg(long, env = "JIRA_URL", global = true)]
    pub jira_url: Option<String>,

    #[arg(long, env = "JIRA_EMAIL", global = true)]
    pub email: Option<String>,

    #[arg(long, env = "JIRA_API_TOKEN", global = true, hide_env_values = true)]
    pub api_token: Option<String>,

    /// Increase verbosity (-v debug, -vv trace). Default is info.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export issues by key, by project or by JQL
    Export(ExportArgs),
    /// Run the HTTP export service
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Defaults to PORT, then 5000
        #[arg(long)]
        port: Option<u16>,
    },
    /// Check the configured credentials against Jira
    TestConnection,
    /// Show or change the saved export defaults
    Config(ConfigArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    #[arg(long)]
    pub format: Option<String>,

    #[arg(long)]
    pub output: Option<String>,

    #[arg(long)]
    pub max_results: Option<usize>,

    /// Download attachments by default (true or false)
    #[arg(long)]
    pub attachments: Option<bool>,
}

impl ConfigArgs {
    pub fn is_empty(&self) -> bool {
        self.format.is_none()
            && self.output.is_none()
            && self.max_results.is_none()
            && self.attachments.is_none()
    }

    /// Applies the given changes to `config`.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(value) = self.format.as_deref() {
            let format = ExportFormat::parse(value)
                .ok_or_else(|| ExportError::UnsupportedFormat(value.to_string()))?;
            config.default_format = format.id().to_string();
        }
        if let Some(output) = &self.output {
            config.output_dir = Some(output.clone()).filter(|o| !o.trim().is_empty());
        }
        if let Some(max_results) = self.max_results {
            config.max_results = max_results;
        }
        if let Some(attachments) = self.attachments {
            config.download_attachments = attachments;
        }
        Ok(())
    }
}

#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Issue keys, e.g. PROJ-1 PROJ-2
    pub keys: Vec<String>,

    /// Export every issue of a project (falls back to JIRA_PROJECT_KEY)
    #[arg(long, short, conflicts_with = "keys")]
    pub project: Option<String>,

    /// Restrict a project export to one issue type
    #[arg(long = "type")]
    pub issue_type: Option<String>,

    /// Export the issues matching a JQL query
    #[arg(long, conflicts_with_all = ["keys", "project"])]
    pub jql: Option<String>,

    #[arg(long)]
    pub max_results: Option<usize>,

    /// pdf, docx, md or png
    #[arg(long, short)]
    pub format: Option<String>,

    /// Skip downloading attachments
    #[arg(long)]
    pub no_attachments: bool,

    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Write INDEX.md next to the exported files
    #[arg(long)]
    pub index: bool,
}

/// What an `export` invocation resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportTarget {
    Keys(Vec<String>),
    Query { jql: String, cap: usize },
}

impl ExportArgs {
    pub fn target(&self, settings: &Settings, defaults: &Config) -> Result<ExportTarget> {
        let cap = self.max_results.unwrap_or(defaults.max_results);
        if let Some(jql) = self.jql.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            return Ok(ExportTarget::Query {
                jql: jql.to_string(),
                cap,
            });
        }
        let keys: Vec<String> = self
            .keys
            .iter()
            .flat_map(|k| k.split(','))
            .map(|k| k.trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        if !keys.is_empty() {
            return Ok(ExportTarget::Keys(keys));
        }
        let project = self
            .project
            .as_deref()
            .or(settings.project_key.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty());
        match project {
            Some(project) => Ok(ExportTarget::Query {
                jql: project_jql(project, self.issue_type.as_deref()),
                cap,
            }),
            None => Err(ExportError::Config(
                "nothing to export: pass issue keys, --project or --jql".to_string(),
            )),
        }
    }

    pub fn format(&self, defaults: &Config) -> Result<ExportFormat> {
        match self.format.as_deref() {
            Some(value) => ExportFormat::parse(value)
                .ok_or_else(|| ExportError::UnsupportedFormat(value.to_string())),
            None => Ok(defaults.format()),
        }
    }

    /// `--output`, then the saved default, then `OUTPUT_DIR`.
    pub fn output_dir(&self, settings: &Settings, defaults: &Config) -> PathBuf {
        self.output
            .clone()
            .or_else(|| defaults.output_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| settings.output_dir.clone())
    }
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings::from_env().with_overrides(
            self.jira_url.as_deref(),
            self.email.as_deref(),
            self.api_token.as_deref(),
        )
    }
}

fn saved_defaults() -> Config {
    ConfigManager::new()
        .map(|manager| manager.load())
        .unwrap_or_default()
}

pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let settings = cli.settings();
    match cli.command {
        Commands::Export(args) => export(args, settings).await,
        Commands::Serve { host, port } => {
            let port = port.unwrap_or(settings.port);
            crate::server::serve(settings, &host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::TestConnection => {
            let config = settings.jira_config()?;
            let site = config.site_name();
            let profile = verify_credentials(config)
                .await
                .map_err(|err| ExportError::fetch("connection test", err))?;
            println!(
                "Connected to {} as {}",
                site,
                profile.display_name.unwrap_or(settings.email)
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config(args) => {
            let manager = ConfigManager::new().ok_or_else(|| {
                ExportError::Config("no configuration directory on this platform".to_string())
            })?;
            let mut config = manager.load();
            if !args.is_empty() {
                args.apply(&mut config)?;
                manager.save(&config)?;
                log::info!("saved defaults to {}", manager.path().display());
            }
            println!("{}", serde_json::to_string_pretty(&config).unwrap_or_default());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn export(args: ExportArgs, settings: Settings) -> Result<ExitCode> {
    let defaults = saved_defaults();
    let target = args.target(&settings, &defaults)?;
    let format = args.format(&defaults)?;
    let out_dir = args.output_dir(&settings, &defaults);

    let mut options = ExportOptions::new(format, &out_dir);
    options.download_attachments = defaults.download_attachments && !args.no_attachments;
    options.write_index = args.index;

    let exporter = Exporter::new(IssueFetcher::from_settings(&settings)?, options);
    log::info!("exporting to {} as {}", out_dir.display(), format.display_name());
    let report = match target {
        ExportTarget::Keys(keys) => exporter.export_batch(&keys).await,
        ExportTarget::Query { jql, cap } => exporter.export_query(&jql, cap).await?,
    };
    print_report(&report);

    Ok(if report.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &BatchReport) {
    for file in &report.files {
        println!("{}  {}", file.issue_key, file.path.display());
    }
    for failure in &report.errors {
        eprintln!("{}  failed: {}", failure.issue_key, failure.error);
    }
    if let Some(index) = &report.index {
        println!("index  {}", index.display());
    }
    println!(
        "{} of {} exported, {} failed",
        report.exported, report.total, report.failed
    );
}
