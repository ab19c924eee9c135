//! Service status and health CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, format_probability, print_json, print_table, print_warning, OutputFormat};

/// Row for component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show prediction service status
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("{}", "Prediction Service".bold());
            println!("{}", "=".repeat(50));
            println!("State:       {}", color_status(&status.state));
            if let Some(failure) = &status.failure {
                println!("Failure:     {}", failure.red());
            }

            println!("\n{}", "Model".bold());
            println!("Status:      {}", color_status(&status.model.status));
            if let Some(metadata) = &status.model.metadata {
                println!(
                    "Type:        {}",
                    metadata.model_type.as_deref().unwrap_or("-")
                );
                println!("Version:     {}", metadata.version);
                if let Some(accuracy) = metadata.accuracy {
                    println!("Accuracy:    {}", format_probability(accuracy));
                }
                if let Some(samples) = metadata.training_samples {
                    println!("Samples:     {}", samples);
                }
                if !metadata.features.is_empty() {
                    println!("Features:    {}", metadata.features.join(", "));
                }
            }

            println!("\n{}", "Airports".bold());
            println!("Status:      {}", color_status(&status.airports.status));
            if let (Some(total), Some(mapped)) =
                (status.airports.total_airports, status.airports.mapped_airports)
            {
                println!("Total:       {}", total);
                println!("Mapped:      {}", mapped);
                if mapped < total {
                    print_warning(&format!(
                        "{} airports have no model mapping and cannot be predicted",
                        total - mapped
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Show component health; fails when the service reports unavailable
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (code, health) = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("Overall: {}", color_status(&health.status));
            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&component.status),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            print_table(rows);
        }
    }

    if code >= 500 {
        anyhow::bail!("Service unavailable ({})", code);
    }
    Ok(())
}
