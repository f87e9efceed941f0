//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::adaptive::{RoundPhase, RoundReport};
use crate::constants::ACCEPTANCE_WARN_BAND;

/// Format a round report for human-readable terminal output.
pub fn format_round(report: &RoundReport) -> String {
    let mut output = String::new();

    let header = format!(
        "Round {} {}",
        report.round,
        format_phase(report.phase)
    );
    output.push_str(&format_box_top());
    output.push_str(&format_box_line(&header.bold().to_string()));
    output.push_str(&format_box_separator());

    if let Some(ref target) = report.target {
        output.push_str(&format_box_line(&format!("Target: {}", target.condition)));
        output.push_str(&format_box_line(&format!(
            "  95% band: [{:.3}, {:.3}]  width {:.3}",
            target.score.lower,
            target.score.upper,
            target.score.width()
        )));
    }
    output.push_str(&format_box_line(&format!(
        "Sequence: #{} of pool, {} trials",
        report.pool_index,
        report.sequence.len()
    )));
    let mean_rt = mean_reaction_time(report);
    output.push_str(&format_box_line(&format!("Mean RT: {:.1} ms", mean_rt)));

    output.push_str(&format_box_separator());

    let posterior = &report.posterior;
    output.push_str(&format_box_line(&"Coefficients:".bold().to_string()));
    for (j, name) in posterior.columns.iter().enumerate() {
        output.push_str(&format_box_line(&format!(
            "  {:<28} {:>9.2} \u{00B1} {:<8.2}",
            name,
            posterior.posterior_mean[j],
            posterior.posterior_var[j].sqrt()
        )));
    }
    output.push_str(&format_box_line(&format!(
        "  {:<28} {:>9.2}",
        "sigma^2 (mean)",
        posterior.sigma2_mean()
    )));

    output.push_str(&format_box_separator());

    let acc = format!("Acceptance: {:.1}%", posterior.acceptance_rate * 100.0);
    let (lo, hi) = ACCEPTANCE_WARN_BAND;
    let acc = if lo < posterior.acceptance_rate && posterior.acceptance_rate < hi {
        acc.green()
    } else {
        acc.yellow()
    };
    output.push_str(&format_box_line(&acc.to_string()));

    let min_ess = posterior.ess.iter().copied().fold(f64::INFINITY, f64::min);
    output.push_str(&format_box_line(&format!(
        "Min ESS: {:.0} of {} draws ({} chain{})",
        min_ess,
        posterior.n_samples(),
        posterior.chains,
        if posterior.chains == 1 { "" } else { "s" }
    )));

    if let Some(kl) = report.kl_divergence {
        output.push_str(&format_box_line(&format!("KL from previous: {:.4}", kl)));
    }

    output.push_str(&format_box_bottom());
    output
}

/// Format every round, one box each.
pub fn format_rounds(reports: &[RoundReport]) -> String {
    reports.iter().map(format_round).collect::<Vec<_>>().join("\n")
}

fn format_phase(phase: RoundPhase) -> String {
    match phase {
        RoundPhase::Bootstrap => phase.to_string().cyan().to_string(),
        RoundPhase::Confirm => phase.to_string().blue().to_string(),
        RoundPhase::Explore => phase.to_string().magenta().to_string(),
    }
}

fn mean_reaction_time(report: &RoundReport) -> f64 {
    let rts: Vec<f64> = report
        .sequence
        .trials()
        .iter()
        .filter_map(|t| t.outcome.as_ref().map(|o| o.reaction_time))
        .collect();
    if rts.is_empty() {
        return f64::NAN;
    }
    rts.iter().sum::<f64>() / rts.len() as f64
}

// Box drawing helpers

const BOX_WIDTH: usize = 60;

fn format_box_top() -> String {
    format!("\u{250C}{}\u{2510}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_bottom() -> String {
    format!("\u{2514}{}\u{2518}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_separator() -> String {
    format!("\u{251C}{}\u{2524}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_line(content: &str) -> String {
    // Strip ANSI codes for length calculation
    let visible_len = strip_ansi_codes(content).chars().count();
    let padding = (BOX_WIDTH - 2).saturating_sub(visible_len);
    format!("\u{2502} {}{} \u{2502}\n", content, " ".repeat(padding))
}

/// Strip ANSI escape codes for accurate length calculation.
fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until 'm' (end of ANSI sequence)
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
