use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{FormSessionController, HttpPatientApi};
use shared::domain::{FormField, PatientId};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod view;

#[derive(Parser, Debug)]
#[command(about = "Health risk form client")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server_url: String,
    /// Logs in before running the action when given together with --password.
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Save a patient and reload the list.
    Submit(FormArgs),
    /// Ask for a risk prediction without saving.
    Predict(FormArgs),
    /// Reload the patient list.
    List,
    /// Delete a patient by id.
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct FormArgs {
    #[arg(long, default_value = "")]
    age: String,
    #[arg(long, default_value = "")]
    smoking_history: String,
    #[arg(long, default_value = "")]
    pollution_level: String,
    #[arg(long, default_value = "")]
    genetic_risk: String,
}

impl FormArgs {
    fn fill(self, controller: &mut FormSessionController) {
        controller.update_field(FormField::Age, self.age);
        controller.update_field(FormField::SmokingHistory, self.smoking_history);
        controller.update_field(FormField::PollutionLevel, self.pollution_level);
        controller.update_field(FormField::GeneticRisk, self.genetic_risk);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let api = HttpPatientApi::new(&cli.server_url)
        .with_context(|| format!("invalid server url '{}'", cli.server_url))?;
    let mut controller = FormSessionController::connect(Arc::new(api)).await;
    debug!(
        server_url = %cli.server_url,
        api_status = ?controller.state().api_status,
        "controller connected"
    );

    if let (Some(username), Some(password)) = (&cli.username, &cli.password) {
        controller.login(username, password).await;
    }

    match cli.action {
        Some(Action::Submit(form)) => {
            form.fill(&mut controller);
            controller.submit_patient().await;
        }
        Some(Action::Predict(form)) => {
            form.fill(&mut controller);
            controller.predict_risk().await;
        }
        Some(Action::List) => controller.refresh_patients().await,
        Some(Action::Delete { id }) => controller.delete_patient(PatientId(id)).await,
        None => {}
    }

    print!("{}", view::render(controller.state()));
    Ok(())
}
