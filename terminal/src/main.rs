//! Kiosk terminal: cashier-side entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use kiosk_client::{
    ApiClient, EmployeeDirectory, HttpPaymentAuthority, HttpVerifier, PaymentVerdict,
};
use kiosk_liveness::{DirectoryFrameSource, SessionDriver};
use kiosk_payment::PaymentGate;
use kiosk_terminal::{
    checkout, run_challenge, ChallengeOutcome, CheckoutOutcome, ShutdownController, TerminalConfig,
};
use kiosk_types::{AmountCents, Hint, SubjectId};
use kiosk_utils::{format_cents, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "kiosk-terminal", about = "Canteen kiosk payment terminal")]
struct Cli {
    /// Base URL of the kiosk backend.
    #[arg(long, env = "KIOSK_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Shared terminal credential sent with every request.
    #[arg(long, env = "KIOSK_TERMINAL_TOKEN", hide_env_values = true)]
    terminal_token: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "KIOSK_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: Option<u64>,

    /// Directory the camera drops JPEG stills into.
    #[arg(long, env = "KIOSK_FRAMES_DIR")]
    frames_dir: Option<PathBuf>,

    /// Log output: "human" or "json".
    #[arg(long, env = "KIOSK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "KIOSK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "KIOSK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show the cashier view of a card holder.
    Employee {
        /// Card UID.
        card: String,
    },
    /// Run a liveness challenge and print the result.
    Liveness { card: String },
    /// Authorize a payment with an explicit token, or none.
    Pay {
        card: String,
        /// Amount in major units, e.g. "150" or "99.50".
        amount: String,
        /// Liveness token from an earlier challenge.
        #[arg(long)]
        token: Option<String>,
    },
    /// Lookup, liveness challenge and payment in one go.
    Checkout { card: String, amount: String },
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<TerminalConfig> {
        let mut config = match &self.config {
            Some(path) => TerminalConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => TerminalConfig::default(),
        };
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        if let Some(token) = &self.terminal_token {
            config.terminal_token = token.clone();
        }
        if let Some(ms) = self.request_timeout_ms {
            config.request_timeout_ms = ms;
        }
        if let Some(dir) = &self.frames_dir {
            config.frames_dir = dir.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level);

    if config.terminal_token.is_empty() {
        tracing::warn!("terminal token is empty; the backend will reject requests");
    }
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    let api = ApiClient::new(&config.api_config())?;
    tracing::info!(api = %api.base_url(), "kiosk terminal ready");

    let shutdown = Arc::new(ShutdownController::new());
    let signals = Arc::clone(&shutdown);
    tokio::spawn(async move { signals.wait_for_signal().await });

    match cli.command {
        Command::Employee { card } => {
            let subject = SubjectId::new(&card)?;
            let info = EmployeeDirectory::new(api).employee_info(&subject).await?;
            println!("{}", info.full_name);
            println!("  employee id:        {}", info.employee_id);
            println!("  subsidy left today: {}", format_cents(info.subsidy_today_left_cents));
            println!("  monthly left:       {}", format_cents(info.monthly_left_cents));
            if info.needs_face_enrollment {
                println!("  face enrollment required");
            }
        }
        Command::Liveness { card } => {
            let subject = SubjectId::new(&card)?;
            let (driver, task) = SessionDriver::spawn(
                Arc::new(HttpVerifier::new(api)),
                DirectoryFrameSource::new(&config.frames_dir),
            );
            let outcome =
                run_challenge(&driver, &subject, shutdown.signalled(), print_hint).await;
            driver.shutdown().await;
            task.await?;

            match outcome? {
                ChallengeOutcome::Passed(token) => {
                    println!("PASSED");
                    println!("token: {}", token.expose());
                }
                ChallengeOutcome::NotPassed { phase, reason, .. } => {
                    println!("{phase}: {reason}");
                }
                ChallengeOutcome::Interrupted => println!("interrupted"),
            }
        }
        Command::Pay {
            card,
            amount,
            token,
        } => {
            let subject = SubjectId::new(&card)?;
            let amount = AmountCents::from_major_str(&amount)?;
            let gate = PaymentGate::new(HttpPaymentAuthority::new(api));
            let verdict = match token {
                Some(token) => gate.authorize_operator_token(&subject, amount, token).await?,
                None => gate.authorize(&subject, amount, None).await?,
            };
            print_verdict(&verdict)?;
        }
        Command::Checkout { card, amount } => {
            let subject = SubjectId::new(&card)?;
            let amount = AmountCents::from_major_str(&amount)?;

            let info = EmployeeDirectory::new(api.clone())
                .employee_info(&subject)
                .await?;
            println!(
                "{} (subsidy left today {}, monthly left {})",
                info.full_name,
                format_cents(info.subsidy_today_left_cents),
                format_cents(info.monthly_left_cents)
            );

            let (driver, task) = SessionDriver::spawn(
                Arc::new(HttpVerifier::new(api.clone())),
                DirectoryFrameSource::new(&config.frames_dir),
            );
            let gate = PaymentGate::new(HttpPaymentAuthority::new(api));
            let outcome = checkout(
                &driver,
                &gate,
                &subject,
                amount,
                shutdown.signalled(),
                print_hint,
            )
            .await;
            driver.shutdown().await;
            task.await?;

            match outcome? {
                CheckoutOutcome::Completed { challenge, verdict } => {
                    if let ChallengeOutcome::NotPassed { phase, reason, .. } = &challenge {
                        println!("liveness {phase}: {reason}");
                    }
                    print_verdict(&verdict)?;
                }
                CheckoutOutcome::Interrupted => println!("interrupted"),
            }
        }
    }

    Ok(())
}

fn print_hint(hint: &Hint) {
    println!("> {hint}");
}

fn print_verdict(verdict: &PaymentVerdict) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(verdict)?);
    Ok(())
}
