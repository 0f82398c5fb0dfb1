use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod auth;
mod output;
mod scenarios;
mod sse_client;

use api_client::ApiClient;
use auth::{login, UserCredentials};
use output::print_test_summary;
use sse_client::Connection;

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "SSE Integration Testing Tool")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:4000)
    #[arg(long)]
    base_url: String,

    /// User 1 credentials (format: username:password)
    #[arg(long)]
    user1: String,

    /// User 2 credentials (format: username:password)
    #[arg(long)]
    user2: String,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Test that both connections receive the connect ping
    ConnectionTest,
    /// Test that a message reaches only the sender's own channel
    SendMessage,
    /// Test that a broadcast reaches both users
    Broadcast,
    /// Test that an empty message is rejected
    EmptyMessage,
    /// Run all tests
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    // Parse credentials
    let user1_creds = UserCredentials::parse(&cli.user1)?;
    let user2_creds = UserCredentials::parse(&cli.user2)?;

    // Authenticate users
    println!("{} Authenticating users...", "→".blue());
    let client = reqwest::Client::new();
    let user1 = login(&client, &cli.base_url, &user1_creds).await?;
    let user2 = login(&client, &cli.base_url, &user2_creds).await?;

    println!(
        "{} User 1 authenticated (ID: {})",
        "✓".green(),
        user1.user_id
    );
    println!(
        "{} User 2 authenticated (ID: {})",
        "✓".green(),
        user2.user_id
    );

    let api_client = ApiClient::new(client.clone(), cli.base_url.clone());

    // Establish SSE connections
    println!("\n{} Establishing SSE connections...", "→".blue());
    let mut sse1 =
        Connection::establish(&cli.base_url, &user1.session_cookie, "User 1".to_string()).await?;
    let mut sse2 =
        Connection::establish(&cli.base_url, &user2.session_cookie, "User 2".to_string()).await?;

    println!("{} User 1 SSE connection established", "✓".green());
    println!("{} User 2 SSE connection established", "✓".green());

    // Run test scenarios
    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    // The connect ping is consumed first so later scenarios only see their own events
    results.push(scenarios::test_connection(&mut sse1, &mut sse2).await?);

    if matches!(cli.scenario, ScenarioChoice::SendMessage | ScenarioChoice::All) {
        results.push(
            scenarios::test_send_message(&user1, &api_client, &mut sse1, &mut sse2).await?,
        );
    }
    if matches!(cli.scenario, ScenarioChoice::Broadcast | ScenarioChoice::All) {
        results.push(
            scenarios::test_broadcast(&user1, &user2, &api_client, &mut sse1, &mut sse2).await?,
        );
    }
    if matches!(cli.scenario, ScenarioChoice::EmptyMessage | ScenarioChoice::All) {
        results.push(scenarios::test_empty_message_rejected(&user1, &api_client, &mut sse1).await?);
    }

    // Print summary
    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
