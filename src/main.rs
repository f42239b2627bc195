use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use viabilityhub::api::HttpBackend;
use viabilityhub::catalog::FormOptions;
use viabilityhub::config::Config;
use viabilityhub::controller::Controller;
use viabilityhub::logging::{log, obj, v_str, Domain, Level};
use viabilityhub::model::RiskAppetite;
use viabilityhub::orchestrator::DraftEdit;
use viabilityhub::view::ViewState;

#[derive(Parser, Debug)]
#[command(name = "viabilityhub", about = "Score a business idea against the viability backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the business types and locations the form offers
    Catalog,
    /// Run one analysis and print the resulting dashboard as JSON
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Business type id, e.g. "cafe"
    #[arg(long)]
    business_type: String,
    /// Location id, e.g. "nyc_manhattan"
    #[arg(long)]
    location: String,
    /// Investment budget in dollars; "$80,000" is accepted
    #[arg(long)]
    budget: String,
    /// Floor area in square feet
    #[arg(long)]
    size: Option<u32>,
    /// low, medium or high
    #[arg(long, default_value = "medium")]
    risk: RiskAppetite,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("api_base", v_str(&cfg.api_base)),
            ("api_prefix", v_str(&cfg.api_prefix)),
            ("request_timeout_ms", json!(cfg.request_timeout_ms)),
        ]),
    );

    let backend = Arc::new(HttpBackend::new(&cfg)?);
    let mut controller = Controller::new(backend, &cfg);
    controller.on_render(|view, state| {
        let name = match view {
            ViewState::Empty => "empty",
            ViewState::Loading => "loading",
            ViewState::Result { .. } => "result",
        };
        log(
            Level::Debug,
            Domain::View,
            "render",
            obj(&[("view", v_str(name)), ("generation", json!(state.generation()))]),
        );
    });
    controller.on_notice(|err| {
        if let Some(message) = err.user_message() {
            eprintln!("{}", message);
        }
    });

    match cli.command {
        Command::Catalog => {
            controller.load_catalog().await?;
            let options = FormOptions::from_catalog(controller.state().catalog());
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
        Command::Analyze(args) => {
            // The form still works without choice lists; ids are taken as given.
            let _ = controller.load_catalog().await;
            controller.edit(DraftEdit::BusinessType(args.business_type));
            controller.edit(DraftEdit::Location(args.location));
            controller.edit(DraftEdit::InvestmentBudget(args.budget));
            if let Some(size) = args.size {
                controller.edit(DraftEdit::BusinessSize(size));
            }
            controller.edit(DraftEdit::RiskAppetite(args.risk));

            controller.submit()?;
            controller.settle().await;

            let dashboard = controller.dashboard();
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
            if dashboard.score.is_none() {
                bail!("analysis produced no result");
            }
        }
    }
    Ok(())
}
