use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("flowise_api_key") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set your Flowise API key:");
        eprintln!("  {} export FLOWISE_API_KEY=<value>", "$".dimmed());
    }

    if msg.contains("mutually exclusive") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Unset either FLOWISE_CHATFLOW_ID or FLOWISE_ASSISTANT_ID.");
    }

    if msg.contains("connection refused") || msg.contains("error sending request") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check FLOWISE_API_ENDPOINT and that the Flowise server is reachable.");
    }

    std::process::exit(1);
}
