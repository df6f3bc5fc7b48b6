//! Terminal output: colored replay summaries and transition tables.
//!
//! Uses `console` for styling. Machine-readable output (audit records, JSON
//! tables) goes to stdout unstyled; summaries go to stderr.

use console::Style;
use serde::Serialize;

use encounter_flow::gating::GateDecision;
use encounter_flow::graph::TransitionGraph;
use encounter_flow::replay::Replay;

pub struct Printer {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl Default for Printer {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

impl Printer {
    /// Print the audit record as pretty JSON, then a one-line summary.
    pub fn replay(&self, replay: &Replay) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(replay)?);

        let rejections = replay.rejections();
        for (index, message) in &rejections {
            eprintln!("  {} step {index}: {message}", self.yellow.apply_to("↯"));
        }
        if rejections.is_empty() {
            eprintln!(
                "  {} {} steps accepted, final state {}",
                self.green.apply_to("✓"),
                replay.steps(),
                replay.final_state()
            );
        } else {
            eprintln!(
                "  {} {} of {} steps rejected, final state {}",
                self.red.apply_to("✗"),
                rejections.len(),
                replay.steps(),
                replay.final_state()
            );
        }
        Ok(())
    }

    pub fn table<S, K>(&self, graph: &TransitionGraph<S, K>)
    where
        S: std::fmt::Display,
        K: std::fmt::Display,
    {
        println!("{}", self.green.apply_to(graph.machine));
        for edge in &graph.transitions {
            let guard = if edge.guarded { "guarded" } else { "" };
            println!(
                "  {:<16} {:<22} {:<16} {}",
                edge.start.to_string(),
                edge.event.to_string(),
                edge.goal.to_string(),
                self.dim.apply_to(guard)
            );
        }
        let terminal: Vec<String> = graph.terminal.iter().map(ToString::to_string).collect();
        println!("  {} {}", self.dim.apply_to("terminal:"), terminal.join(", "));
    }

    pub fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn decision(&self, decision: &GateDecision) {
        match &decision.reason {
            None => println!("{} allowed", self.green.apply_to("✓")),
            Some(reason) => println!("{} {reason}", self.red.apply_to("✗")),
        }
    }
}
