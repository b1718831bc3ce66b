/// Version injected at compile time via VCMAC_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("VCMAC_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Instrument, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vcmac::config::Config;
use vcmac::inventory::{collect_inventory, PipelineOptions};
use vcmac::report::{HtmlRenderer, JsonRenderer, OutputFormat, Renderer, YamlRenderer};
use vcmac::vsphere::http::DEFAULT_REQUEST_TIMEOUT;
use vcmac::vsphere::{format_vsphere_error, Credentials, HttpTransport, TransportConfig, VsphereError};

/// Env var holding the vCenter password
const PASSWORD_ENV: &str = "VCMAC_PASSWORD";

/// vCenter VM network adapter and MAC address report
#[derive(Parser, Debug)]
#[command(name = "vcmac", version, about, long_about = None)]
struct Args {
    /// vCenter hostname or IP (scheme and path are stripped)
    #[arg(long, env = "VCMAC_HOST")]
    host: Option<String>,

    /// vCenter username
    #[arg(short, long, env = "VCMAC_USERNAME")]
    username: Option<String>,

    /// Read the password from the first line of stdin instead of VCMAC_PASSWORD
    /// or an interactive prompt
    #[arg(long)]
    password_stdin: bool,

    /// Maximum number of requests in flight (1 = sequential)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Overall deadline for the run in seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Verify the vCenter TLS certificate against the system roots
    #[arg(long)]
    verify_tls: bool,

    /// PEM CA certificate to verify vCenter against (implies --verify-tls)
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Accept any vCenter certificate, overriding a saved verification setting
    #[arg(long, conflicts_with_all = ["verify_tls", "ca_cert"])]
    insecure: bool,

    /// Report file to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// HTML template containing a `{% for vm in vms %}...{% endfor %}` block
    #[arg(long)]
    template: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Persist the effective settings (never the password) to the config file
    #[arg(long)]
    save_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, err);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_env("VCMAC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("vcmac {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("vcmac").join("vcmac.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".vcmac").join("vcmac.log");
    }
    PathBuf::from("vcmac.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let span = tracing::info_span!("run", run_id = %Uuid::new_v4());
    match run(args).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", describe_error(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    // stdin belongs to the password when --password-stdin is given
    let mut terminal = TerminalPrompter {
        interactive: !args.password_stdin && std::io::stdin().is_terminal(),
    };

    let host = resolve_setting(
        args.host.clone(),
        config.host.clone(),
        &mut terminal,
        "vCenter host",
        "No vCenter host configured. Use --host or set VCMAC_HOST",
    )?;
    let username = resolve_setting(
        args.username.clone(),
        config.username.clone(),
        &mut terminal,
        "Username",
        "No username configured. Use --username or set VCMAC_USERNAME",
    )?;
    let password = if args.password_stdin {
        let mut lock = std::io::stdin().lock();
        let reader: &mut dyn BufRead = &mut lock;
        resolve_password(Some(reader), None, &mut terminal)?
    } else {
        resolve_password(None, std::env::var(PASSWORD_ENV).ok(), &mut terminal)?
    };

    let credentials = Credentials::new(&host, &username, &password);
    if credentials.host().is_empty() {
        anyhow::bail!("Host '{}' contains no hostname", host);
    }
    tracing::info!("Using vCenter host: {}", credentials.host());

    let ca_cert = if args.insecure {
        None
    } else {
        args.ca_cert.clone().or_else(|| config.ca_cert.clone())
    };
    let verify = args.verify_tls || ca_cert.is_some();
    let transport_config = TransportConfig {
        timeout: args
            .timeout
            .or(config.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        accept_invalid_certs: accept_invalid_certs(args.insecure, verify, config.insecure),
        ca_cert,
        allow_plain_http: false,
    };
    let options = PipelineOptions {
        concurrency: args.concurrency.or(config.concurrency).unwrap_or(1),
        deadline: args.deadline.or(config.deadline_secs).map(Duration::from_secs),
    };

    let format = config.effective_format(args.format);
    let output = config.effective_output(args.output.clone(), format);
    let template = args.template.clone().or_else(|| config.template.clone());

    let transport = HttpTransport::new(&transport_config)?;
    let dataset = collect_inventory(transport, &credentials.base_url(), &credentials, &options).await?;

    let renderer: Box<dyn Renderer> = match format {
        OutputFormat::Html => match &template {
            Some(path) => Box::new(HtmlRenderer::from_file(path)?),
            None => Box::new(HtmlRenderer::default()),
        },
        OutputFormat::Json => Box::new(JsonRenderer),
        OutputFormat::Yaml => Box::new(YamlRenderer),
    };
    let rendered = renderer.render(&dataset)?;
    std::fs::write(&output, rendered)
        .with_context(|| format!("Failed to write report {}", output.display()))?;

    let summary = dataset.summary();
    tracing::info!("Inventory complete: {}", summary);
    println!("Report generated: {}", output.display());
    println!("{}", summary);

    if args.save_config {
        config.host = Some(credentials.host().to_string());
        config.username = Some(credentials.username().to_string());
        config.concurrency = Some(options.concurrency);
        config.timeout_secs = Some(transport_config.timeout.as_secs());
        config.deadline_secs = options.deadline.map(|d| d.as_secs());
        config.insecure = Some(transport_config.accept_invalid_certs);
        config.ca_cert = transport_config.ca_cert.clone();
        config.output = Some(output);
        config.template = template;
        config.format = Some(format);
        config.save().context("Failed to save configuration")?;
    }

    Ok(())
}

/// Source of answers for settings nobody supplied
trait Prompter {
    /// `None` when there is no one to ask
    fn ask(&mut self, label: &str, secret: bool) -> Result<Option<String>>;
}

/// Prompts on the controlling terminal; secrets are read without echo
struct TerminalPrompter {
    interactive: bool,
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, label: &str, secret: bool) -> Result<Option<String>> {
        if !self.interactive {
            return Ok(None);
        }

        let answer = if secret {
            rpassword::prompt_password(format!("{}: ", label))
                .with_context(|| format!("Failed to read {}", label.to_lowercase()))?
        } else {
            eprint!("{}: ", label);
            std::io::stderr().flush().ok();
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .with_context(|| format!("Failed to read {}", label.to_lowercase()))?;
            line
        };

        Ok(Some(answer.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Flag or env var, then the config file, then an interactive prompt
fn resolve_setting(
    explicit: Option<String>,
    saved: Option<String>,
    prompter: &mut dyn Prompter,
    label: &str,
    missing: &str,
) -> Result<String> {
    let present = |value: &String| !value.trim().is_empty();
    if let Some(value) = explicit.filter(present).or_else(|| saved.filter(present)) {
        return Ok(value);
    }

    prompter
        .ask(label, false)?
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .with_context(|| missing.to_string())
}

/// Password from stdin, the environment or a no-echo prompt; never from argv
fn resolve_password(
    stdin: Option<&mut dyn BufRead>,
    env_value: Option<String>,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    if let Some(reader) = stdin {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .context("Failed to read password from stdin")?;
        let password = line.trim_end_matches(['\r', '\n']).to_string();
        if password.is_empty() {
            anyhow::bail!("Empty password on stdin");
        }
        return Ok(password);
    }

    if let Some(password) = env_value.filter(|p| !p.is_empty()) {
        return Ok(password);
    }

    prompter
        .ask("Password", true)?
        .filter(|p| !p.is_empty())
        .with_context(|| format!("No password provided. Set {} or use --password-stdin", PASSWORD_ENV))
}

/// Explicit flags win over the saved choice; lab default is to accept any certificate
fn accept_invalid_certs(insecure: bool, verify: bool, saved: Option<bool>) -> bool {
    if insecure {
        true
    } else if verify {
        false
    } else {
        saved.unwrap_or(true)
    }
}

fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<VsphereError>() {
        Some(vsphere) => format_vsphere_error(vsphere),
        None => format!("{:#}", err),
    }
}
