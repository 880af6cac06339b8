//! Batch progress reporting.

use console::style;

use crate::download::BatchState;

/// Print the running progress of a batch.
pub fn print_progress(state: &BatchState) {
    println!(
        "{} {}/{}",
        style("Completed").green(),
        state.completed,
        state.total
    );
}

/// Print the final summary of a batch, whether it finished or aborted.
pub fn print_batch_summary(state: &BatchState) {
    println!();
    if state.is_finished() {
        println!("{}", style("Batch finished:").bold());
    } else {
        println!("{}", style("Batch stopped:").bold().yellow());
    }
    println!("  Progress:   {}/{}", state.completed, state.total);
    println!("  Downloaded: {}", style(state.downloaded).green());
    println!("  Skipped:    {} (already complete)", style(state.skipped).yellow());
}
