use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use voucherbook_infra::{
    InfraConfig, JsonFileVoucherStore, PostgresVoucherStore, QueryFailure, QueryOutcome,
    VoucherStore, VoucherTransactionsQuery,
};
use voucherbook_vouchers::DisplayOffset;

#[derive(Parser, Debug)]
#[command(name = "voucherbook", version, about = "Voucher transaction history reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Date-filtered, sorted transaction history and gross profit for every voucher of a sign
    Transactions(TransactionsArgs),
}

#[derive(Args, Debug)]
struct TransactionsArgs {
    /// Grouping key of the vouchers to report on
    #[arg(long)]
    sign: String,

    /// Date ordering: asc or desc (default desc)
    #[arg(long)]
    sort: Option<String>,

    /// Keep only transactions in this calendar year (UTC)
    #[arg(long)]
    year: Option<String>,

    /// Keep only transactions in this calendar month, 1-12 (UTC)
    #[arg(long)]
    month: Option<String>,

    /// Read vouchers from a JSON export instead of Postgres
    #[arg(long, env = "VOUCHERBOOK_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Display offset for formatted dates, overrides VOUCHERBOOK_DISPLAY_OFFSET_HOURS
    #[arg(long, allow_hyphen_values = true)]
    offset_hours: Option<i32>,

    /// Exit non-zero instead of printing an empty listing when the query fails
    #[arg(long)]
    strict: bool,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    voucherbook_observability::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Transactions(args) => run_transactions(args).await,
    }
}

async fn run_transactions(args: TransactionsArgs) -> anyhow::Result<ExitCode> {
    let mut config = InfraConfig::from_env().context("loading configuration")?;
    if let Some(hours) = args.offset_hours {
        config.display_offset_hours = hours;
    }
    let display_offset = config.display_offset()?;

    let outcome = match &args.snapshot {
        Some(path) => run_query(JsonFileVoucherStore::new(path), display_offset, &args).await,
        None => match PostgresVoucherStore::connect(&config).await {
            Ok(store) => run_query(store, display_offset, &args).await,
            Err(err) => {
                tracing::error!(error = %err, "could not connect to voucher database");
                QueryOutcome::Degraded {
                    reason: QueryFailure::Store(err),
                }
            }
        },
    };

    let result = if args.strict {
        match outcome.into_strict() {
            Ok(result) => result,
            Err(reason) => {
                eprintln!("voucherbook: {reason}");
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        outcome.into_result()
    };

    let rendered = if args.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{rendered}");

    Ok(ExitCode::SUCCESS)
}

async fn run_query<S>(
    store: S,
    display_offset: DisplayOffset,
    args: &TransactionsArgs,
) -> QueryOutcome
where
    S: VoucherStore,
{
    VoucherTransactionsQuery::new(store)
        .with_display_offset(display_offset)
        .execute_raw(
            &args.sign,
            args.sort.as_deref(),
            args.year.as_deref(),
            args.month.as_deref(),
        )
        .await
}
