use anyhow::Result;

use ticketdesk::models::{Priority, Status};
use ticketdesk::stats::Stats;
use ticketdesk::HelpDesk;

use super::{print_json, ticket_line, Output};

fn print_stats(stats: &Stats) {
    println!("Total tickets: {}", stats.total);
    println!();
    println!("By status:");
    for status in Status::ALL {
        println!("  {:<12} {}", status, stats.status_breakdown.get(&status).unwrap_or(&0));
    }
    println!();
    println!("By priority:");
    for priority in Priority::ALL.into_iter().rev() {
        let count = stats.priority_breakdown.get(&priority).copied().unwrap_or(0);
        println!("  {:<12} {:>4} {}", priority, count, bar(count, stats.total, 30));
    }
}

/// Proportional bar of at most `width` cells.
fn bar(count: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return String::new();
    }
    "#".repeat(count * width / total)
}

pub fn run(desk: &HelpDesk, actor: i64, out: Output) -> Result<()> {
    let stats = desk.stats(actor)?;
    match out {
        Output::Json => print_json(&stats)?,
        Output::Text => print_stats(&stats),
    }
    Ok(())
}

pub fn dashboard(desk: &HelpDesk, actor: i64, out: Output) -> Result<()> {
    let board = desk.dashboard(actor)?;
    if out == Output::Json {
        return print_json(&board);
    }

    print_stats(&board.stats);
    println!();
    if board.recent.is_empty() {
        println!("No recent tickets.");
    } else {
        println!("Recent tickets:");
        for ticket in &board.recent {
            println!("  {}", ticket_line(ticket));
        }
    }
    Ok(())
}
