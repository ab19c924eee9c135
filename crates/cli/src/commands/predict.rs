//! Delay prediction CLI command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{
    color_probability, day_name, format_probability, or_dash, print_json, print_success,
    print_warning, OutputFormat,
};

/// Request a delay prediction and print the result
pub async fn predict(
    client: &ApiClient,
    day_of_week: u8,
    airport_id: i64,
    format: OutputFormat,
) -> Result<()> {
    let response = client.predict(day_of_week, airport_id).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let airport = &response.input.airport;
            let prediction = &response.prediction;

            println!("{}", "Delay Prediction".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Airport:     {} ({})",
                airport.name.cyan(),
                or_dash(airport.code.as_deref())
            );
            println!(
                "Day:         {} ({})",
                day_name(response.input.day_of_week),
                response.input.day_of_week
            );
            println!();
            println!(
                "Delay (>15 min): {}",
                color_probability(prediction.delay_probability)
            );
            println!(
                "On time:         {}",
                format_probability(prediction.no_delay_probability)
            );
            println!(
                "Confidence:      {}",
                format_probability(response.confidence)
            );
            println!();

            if prediction.is_delayed {
                print_warning("A delay is likely");
            } else {
                print_success("A delay is unlikely");
            }

            let model = &response.model_info;
            println!(
                "\nModel: {} v{}{}",
                or_dash(model.model_type.as_deref()),
                model.version,
                model
                    .accuracy
                    .map(|a| format!(" (accuracy {})", format_probability(a)))
                    .unwrap_or_default()
            );
        }
    }

    Ok(())
}
