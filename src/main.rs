//! `octro` - command-line front end for the Octro table-extraction service

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use octro_client::account::{self, DashboardSnapshot};
use octro_client::api::types::PlanType;
use octro_client::session::AuthState;
use octro_client::{ApiClient, Config, ResultsView, SessionStore, Workflow};

#[derive(Parser)]
#[command(name = "octro")]
#[command(about = "Extract tables from PDFs with the Octro service", version)]
struct Cli {
    /// Backend origin (overrides OCTRO_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a PDF, confirm the quota summary, and extract its tables
    Extract {
        /// PDF file to process
        file: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Directory to save table artifacts into
        #[arg(long, default_value = "tables")]
        output: PathBuf,
        /// Also write all table JSON merged into one file
        #[arg(long)]
        combined: Option<PathBuf>,
        /// Ask a question about one extracted table
        #[arg(long)]
        question: Option<String>,
        /// Table index the question refers to
        #[arg(long, default_value_t = 0)]
        table: usize,
    },
    /// Show the signed-in account
    Whoami,
    /// Print the sign-in URL
    Login,
    /// End the current session
    Logout,
    /// Show account usage, subscription and API keys
    Dashboard,
    /// Manage API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },
    /// Redeem a promo code
    Promo { code: String },
    /// Subscription management
    Billing {
        #[command(subcommand)]
        command: BillingCommand,
    },
}

#[derive(Subcommand)]
enum KeysCommand {
    /// List API keys
    List,
    /// Create a named API key
    Create { name: String },
    /// Revoke an API key by id
    Revoke { id: i64 },
}

#[derive(Subcommand)]
enum BillingCommand {
    /// Show subscription status
    Status,
    /// Start a checkout session for a paid plan
    Checkout {
        #[arg(value_enum)]
        plan: Plan,
    },
    /// Open the customer portal
    Portal,
    /// Cancel the subscription at period end
    Cancel,
}

#[derive(Clone, Copy, ValueEnum)]
enum Plan {
    Standard,
    Pro,
}

impl From<Plan> for PlanType {
    fn from(plan: Plan) -> Self {
        match plan {
            Plan::Standard => PlanType::Standard,
            Plan::Pro => PlanType::Pro,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("octro_client=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    let client = ApiClient::new(&config.api)?;

    match cli.command {
        Command::Extract {
            file,
            yes,
            output,
            combined,
            question,
            table,
        } => run_extract(client, config, file, yes, output, combined, question, table).await,
        Command::Whoami => run_whoami(client).await,
        Command::Login => {
            println!("Open this URL in your browser to sign in:");
            println!("  {}", client.login_url());
            Ok(())
        }
        Command::Logout => {
            SessionStore::new(client).logout().await;
            println!("Signed out.");
            Ok(())
        }
        Command::Dashboard => run_dashboard(client).await,
        Command::Keys { command } => run_keys(client, command).await,
        Command::Promo { code } => {
            let outcome = account::redeem_promo(&client, &code).await?;
            if !outcome.success {
                bail!(outcome.message);
            }
            println!("{}", outcome.message);
            Ok(())
        }
        Command::Billing { command } => run_billing(client, command).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_extract(
    client: ApiClient,
    config: Config,
    file: PathBuf,
    yes: bool,
    output: PathBuf,
    combined: Option<PathBuf>,
    question: Option<String>,
    table_index: usize,
) -> anyhow::Result<()> {
    let mut workflow = Workflow::new(client.clone(), config.workflow);

    let descriptor = workflow.submit_upload(&file).await?;
    println!("Pages in document: {}", fmt_count(descriptor.pages_total));
    println!(
        "Pages to process:  {}",
        workflow.pending_pages_limit().unwrap_or_default()
    );
    println!("Quota left after:  {}", fmt_count(descriptor.limit_left));
    if descriptor.has_active_promo {
        println!("Promo active: the full document will be processed.");
    }

    if !yes && !prompt_confirm("Process this file?")? {
        workflow.cancel();
        println!("Cancelled.");
        return Ok(());
    }

    // Surface advisory status polls while the extraction call runs.
    let mut updates = workflow.status_updates();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            if let Some(status) = status {
                eprintln!("  job status: {}", status.status);
            }
        }
    });
    let confirmed = workflow.confirm().await;
    progress.abort();
    confirmed?;

    let result = workflow
        .take_output()
        .context("processing finished with no results")?;
    let mut view = ResultsView::new(result);
    println!("Extracted {} table(s).", view.total_tables());

    let artifacts: Vec<String> = view
        .tables()
        .iter()
        .flat_map(|table| {
            [
                Some(table.image_file.clone()),
                table.json_file.clone(),
                table.csv_file.clone(),
                table.data_file.clone(),
            ]
        })
        .flatten()
        .collect();
    for filename in artifacts {
        match view.save_artifact(&client, &filename, &output).await {
            Ok(path) => println!("  saved {}", path.display()),
            // Non-fatal: keep saving the rest.
            Err(err) => eprintln!("  failed to save {filename}: {}", err.user_message()),
        }
    }

    if let Some(path) = combined {
        view.save_combined_json(&path).await?;
        println!("Combined JSON written to {}", path.display());
    }

    if let Some(question) = question {
        if !view.can_ask(table_index) {
            bail!("table {table_index} has no JSON content to query");
        }
        view.set_question(table_index, &question);
        let answer = view.ask_question(&client, table_index).await?;
        println!("Q: {question}");
        println!("A: {answer}");
    }

    Ok(())
}

async fn run_whoami(client: ApiClient) -> anyhow::Result<()> {
    let session = SessionStore::new(client);
    match session.refresh().await {
        AuthState::SignedIn(user) => {
            println!(
                "{} <{}>",
                user.name.as_deref().unwrap_or("(no name)"),
                user.email
            );
            if let (Some(used), Some(limit)) =
                (user.pages_processed_this_month, user.monthly_page_limit)
            {
                println!("Pages this month: {used}/{limit}");
            }
        }
        _ => println!("Not signed in. Run `octro login`."),
    }
    Ok(())
}

async fn run_dashboard(client: ApiClient) -> anyhow::Result<()> {
    let snapshot = DashboardSnapshot::fetch(&client).await?;
    let Some(user) = &snapshot.user else {
        println!("Not signed in. Run `octro login`.");
        return Ok(());
    };

    println!("Account: {}", user.email);
    if let Some(ratio) = snapshot.usage_ratio() {
        println!("Monthly usage: {:.0}%", ratio * 100.0);
    }
    match &snapshot.subscription {
        Some(sub) => println!(
            "Plan: {} ({}), {} pages/month",
            sub.plan_type, sub.status, sub.monthly_page_limit
        ),
        None => println!("Plan: unavailable"),
    }
    println!("API keys: {}", snapshot.api_keys.len());
    for key in &snapshot.api_keys {
        let state = if key.is_active { "active" } else { "inactive" };
        println!("  [{}] {} ({state})", key.id, key.name);
    }
    Ok(())
}

async fn run_keys(client: ApiClient, command: KeysCommand) -> anyhow::Result<()> {
    match command {
        KeysCommand::List => {
            let keys = client.list_api_keys().await?;
            if keys.is_empty() {
                println!("No API keys.");
            }
            for key in keys {
                let state = if key.is_active { "active" } else { "inactive" };
                println!("[{}] {} ({state})", key.id, key.name);
            }
        }
        KeysCommand::Create { name } => {
            let key = account::create_api_key(&client, &name).await?;
            println!("Created key [{}] {}", key.id, key.name);
            println!("Secret (shown once): {}", key.api_key);
        }
        KeysCommand::Revoke { id } => {
            account::revoke_api_key(&client, id).await?;
            println!("Key {id} revoked.");
        }
    }
    Ok(())
}

async fn run_billing(client: ApiClient, command: BillingCommand) -> anyhow::Result<()> {
    match command {
        BillingCommand::Status => {
            let status = client.subscription_status().await?;
            if !status.has_subscription {
                println!(
                    "No subscription ({} plan, {} pages/month).",
                    status.plan_type, status.monthly_page_limit
                );
                return Ok(());
            }
            println!(
                "Plan: {} ({}), {} pages/month",
                status.plan_type, status.status, status.monthly_page_limit
            );
            if let Some(end) = &status.current_period_end {
                println!("Current period ends: {end}");
            }
            if status.cancel_at_period_end == Some(true) {
                println!("Cancels at period end.");
            }
        }
        BillingCommand::Checkout { plan } => {
            let session = account::start_checkout(&client, plan.into()).await?;
            println!("Open this URL to complete checkout:");
            println!("  {}", session.checkout_url);
        }
        BillingCommand::Portal => {
            let session = account::open_portal(&client).await?;
            println!("Open this URL to manage your subscription:");
            println!("  {}", session.portal_url);
        }
        BillingCommand::Cancel => {
            account::cancel_subscription(&client).await?;
            println!("Subscription will be cancelled at the end of the current period.");
        }
    }
    Ok(())
}

fn prompt_confirm(message: &str) -> anyhow::Result<bool> {
    print!("{message} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

fn fmt_count(value: Option<u32>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}
