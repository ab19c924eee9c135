//! Airport directory CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{Airport, ApiClient};
use crate::output::{or_dash, print_info, print_json, print_table, OutputFormat};

/// Row for airports table
#[derive(Tabled)]
struct AirportRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&Airport> for AirportRow {
    fn from(airport: &Airport) -> Self {
        Self {
            id: airport.id,
            name: airport.name.clone(),
            code: or_dash(airport.code.as_deref()),
            city: or_dash(airport.city.as_deref()),
            state: or_dash(airport.state.as_deref()),
        }
    }
}

/// Keep airports whose name, code or city contains `filter` (case-insensitive)
fn matches(airport: &Airport, filter: &str) -> bool {
    let filter = filter.to_lowercase();
    [Some(&airport.name), airport.code.as_ref(), airport.city.as_ref()]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&filter))
}

/// List all airports, optionally filtered
pub async fn list_airports(
    client: &ApiClient,
    filter: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let list = client.list_airports().await?;

    let airports: Vec<&Airport> = match &filter {
        Some(f) => list.airports.iter().filter(|a| matches(a, f)).collect(),
        None => list.airports.iter().collect(),
    };

    match format {
        OutputFormat::Json => print_json(&airports)?,
        OutputFormat::Table => {
            let rows: Vec<AirportRow> = airports.iter().map(|a| AirportRow::from(*a)).collect();
            let shown = rows.len();
            print_table(rows);
            if filter.is_some() {
                print_info(&format!("{} of {} airports match", shown, list.total));
            } else {
                println!("\nTotal: {} airports", list.total);
            }
        }
    }

    Ok(())
}

/// Show a single airport
pub async fn get_airport(client: &ApiClient, airport_id: i64, format: OutputFormat) -> Result<()> {
    let airport = client.get_airport(airport_id).await?;

    match format {
        OutputFormat::Json => print_json(&airport)?,
        OutputFormat::Table => {
            println!("{}", airport.name.bold());
            println!("{}", "=".repeat(40));
            println!("ID:    {}", airport.id.to_string().cyan());
            println!("Code:  {}", or_dash(airport.code.as_deref()));
            println!("City:  {}", or_dash(airport.city.as_deref()));
            println!("State: {}", or_dash(airport.state.as_deref()));
        }
    }

    Ok(())
}
