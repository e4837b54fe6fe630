use crate::core::models::{Outcome, RunReport};
use crate::wordlists::SourceDescriptor;
use colored::*;
use std::path::Path;

pub fn print_summary(report: &RunReport, report_dir: Option<&Path>) {
    let rule = "═══════════════════════════════════════";
    let headline = match report.outcome {
        Outcome::Found => "Credential Recovered".green().bold(),
        Outcome::Exhausted => "Wordlists Exhausted".yellow().bold(),
        Outcome::Cancelled => "Run Cancelled".yellow().bold(),
        Outcome::NoWordlists => "No Wordlists Available".red().bold(),
        Outcome::StructuralFailure => "Target Unusable".red().bold(),
    };
    let rule = if report.found() { rule.green().bold() } else { rule.normal() };

    println!("\n{}", rule);
    println!("{}", headline);
    println!("{}", rule);

    println!("\n{}: {}", "Target".cyan().bold(), report.target);
    if let Some(identity) = &report.identity {
        println!("{}: {}", "Identity".cyan().bold(), identity);
    }
    println!("{}: {}", "Run ID".cyan().bold(), report.run_id);

    if let Some(candidate) = &report.candidate {
        println!("\n{}: {}", "Password".green().bold(), candidate.green().bold());
        if let Some(rule) = &report.rule {
            println!("  Matched rule: {}", rule);
        }
        if let Some(location) = &report.final_location {
            println!("  Landed on: {}", location);
        }
    }

    println!("\n{}", "Execution:".yellow().bold());
    println!("  Attempts: {}", report.attempts_count.to_string().green().bold());
    println!("  Time: {:.1}s", report.elapsed().as_secs_f64());
    println!("  Speed: {:.2} pwd/s", report.throughput);

    if let Some(profile) = &report.profile {
        println!(
            "  Form: {} {} ({} / {}, {})",
            profile.method,
            profile.submission_url,
            profile.identity_field,
            profile.secret_field,
            format!("{:?}", profile.origin).to_lowercase()
        );
    }
    if let Some(note) = &report.discovery_note {
        println!("  Discovery: {}", note.yellow());
    }
    if let Some(error) = &report.structural_error {
        println!("  Error: {}", error.red());
    }

    if !report.sources.is_empty() {
        println!("\n{}", "Sources:".yellow().bold());
        for source in &report.sources {
            match &source.unavailable {
                Some(reason) => println!("  • {} [{}]: {}", source.name, source.origin, reason.red()),
                None => println!(
                    "  • {} [{}]: {} tried",
                    source.name,
                    source.origin,
                    source.candidates_tried.to_string().cyan()
                ),
            }
        }
    }

    if let Some(dir) = &report.extracted_to {
        println!("\n{}: {}", "Extracted to".green().bold(), dir.display());
    }

    if let Some(dir) = report_dir {
        println!("\n{}", format!("Reports written to {}", dir.display()).green().dimmed());
    }
}

pub fn print_wordlists(listing: &[(SourceDescriptor, Option<u64>)]) {
    if listing.is_empty() {
        println!("{}", "No wordlist sources available".yellow());
        return;
    }
    println!("{}", "Wordlist sources (in search order):".cyan().bold());
    for (position, (descriptor, count)) in listing.iter().enumerate() {
        let count = match (count, descriptor.size_bytes) {
            (Some(c), Some(bytes)) => format!("{} entries, {} KiB", c, bytes.div_ceil(1024)),
            (Some(c), None) => format!("{} entries", c),
            (None, _) => "unknown size".to_string(),
        };
        println!(
            "  {:>3}. {} {} ({})",
            position + 1,
            descriptor.label(),
            descriptor.location.dimmed(),
            count
        );
    }
}
