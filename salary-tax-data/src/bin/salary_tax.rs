use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use salary_tax_core::calculations::resolve;
use salary_tax_core::{NewUser, TaxService};
use salary_tax_data::logging::init_logging;
use salary_tax_data::{AppConfig, SalaryLoader, build_registry};
use tracing::debug;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Cumulative monthly salary tax calculator.
///
/// Stores each user's monthly salaries and the tax withheld for every month
/// of the year, recomputing the whole year on each submission.
#[derive(Debug, Parser)]
#[command(name = "salary-tax", version)]
struct Cli {
    /// TOML config file. Defaults to $SALARY_TAX_CONFIG when set.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend (`sqlite` or `memory`).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string, e.g. `sqlite:salary_tax.db?mode=rwc`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a user and print the assigned id.
    AddUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        job: Option<String>,
    },

    /// Submit a `month,salary` CSV file for a user.
    Submit {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        file: PathBuf,
    },

    /// Print the tax attributed to one month.
    Month {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        month: u32,
    },

    /// Print the year-to-date summary for a user.
    Summary {
        #[arg(long)]
        user: i64,
    },

    /// Print the bracket that applies to a cumulative taxable amount.
    Resolve {
        #[arg(long, allow_hyphen_values = true)]
        amount: Decimal,
    },
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(cli.backend, cli.db, cli.log_level);
    init_logging(&config.log_level);

    if let Command::Resolve { amount } = cli.command {
        let bracket = resolve(amount);
        match bracket.upper_bound {
            Some(bound) => println!(
                "up to {bound}: rate {}, quick deduction {}",
                bracket.rate, bracket.deduction
            ),
            None => println!(
                "unbounded: rate {}, quick deduction {}",
                bracket.rate, bracket.deduction
            ),
        }
        return Ok(());
    }

    debug!("connecting to {} backend", config.database.backend);
    let repo = build_registry()
        .create(&config.database)
        .await
        .with_context(|| format!("Failed to open {} backend", config.database.backend))?;
    let service = TaxService::new(repo);

    match cli.command {
        Command::AddUser {
            email,
            phone,
            address,
            job,
        } => {
            let user = service
                .repository()
                .create_user(NewUser {
                    email,
                    phone,
                    address,
                    job,
                })
                .await
                .context("Failed to create user")?;
            println!("{}", user.id);
        }
        Command::Submit { user, file } => {
            let reader = File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let entries = SalaryLoader::parse(reader)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let records = SalaryLoader::load(&service, user, &entries)
                .await
                .with_context(|| format!("Failed to submit salaries for user {user}"))?;
            for record in records {
                println!("{:>2}  {:>12}  {:>12}", record.month, record.salary, record.tax);
            }
        }
        Command::Month { user, month } => {
            let tax = service.tax_for_month(user, month).await?;
            println!("{tax}");
        }
        Command::Summary { user } => {
            let summary = service.annual_summary(user).await?;
            println!("user {} <{}>", summary.user_id, summary.email);
            for record in &summary.per_month {
                println!("{:>2}  {:>12}  {:>12}", record.month, record.salary, record.tax);
            }
            println!("total salary {}", summary.total_salary);
            println!("total tax    {}", summary.total_tax);
        }
        Command::Resolve { .. } => {}
    }

    Ok(())
}
