use domino_engine::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const SPINNER_TICK_MS: u64 = 80;

/// What the finished merge-tree nodes of the current phase add up to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct NodeTally {
    nodes: u64,
    widest: usize,
    largest_table: usize,
}

impl NodeTally {
    fn record(&mut self, variables: usize, states: usize) {
        self.nodes += 1;
        self.widest = self.widest.max(variables);
        self.largest_table = self.largest_table.max(states);
    }

    fn summary(&self) -> String {
        format!(
            "{} var(s) merged, largest table {}",
            self.widest, self.largest_table
        )
    }
}

struct SearchDisplay {
    pb: ProgressBar,
    tally: NodeTally,
}

impl SearchDisplay {
    fn apply(&mut self, progress: Progress) {
        let pb = &self.pb;
        match progress {
            Progress::PhaseStart { name } => {
                self.tally = NodeTally::default();
                pb.reset();
                pb.set_length(0);
                pb.set_style(spinner_style());
                pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                pb.set_message(name.to_string());
            }
            Progress::PhaseFinish => {
                pb.disable_steady_tick();
                if self.tally.nodes == 0 {
                    pb.finish_with_message("✓ Done");
                } else {
                    pb.finish_with_message(format!("✓ {}", self.tally.summary()));
                }
            }
            Progress::TaskStart { total_steps } => {
                pb.disable_steady_tick();
                pb.reset();
                pb.set_length(total_steps);
                pb.set_position(0);
                pb.set_style(bar_style());
                pb.set_message("Merging");
            }
            Progress::TaskIncrement => pb.inc(1),
            Progress::TaskFinish => {
                let length = pb.length().unwrap_or(0);
                if pb.position() < length {
                    pb.set_position(length);
                }
                pb.finish();
            }
            Progress::NodeComplete { variables, states } => {
                debug!(variables, states, "Node finished");
                self.tally.record(variables, states);
                pb.set_message(self.tally.summary());
            }
            Progress::Message(msg) => {
                if !pb.is_finished() {
                    pb.println(format!("  {}", msg));
                } else {
                    pb.set_message(msg);
                }
            }
        }
    }
}

/// Renders engine progress on stderr: a spinner per phase, and a bar over the merge-tree
/// nodes whose message follows the widest node and the largest table seen so far.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<SearchDisplay>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            display: Arc::new(Mutex::new(SearchDisplay {
                pb,
                tally: NodeTally::default(),
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let display = self.display.clone();
        Box::new(move |progress: Progress| match display.lock() {
            Ok(mut display) => display.apply(progress),
            Err(_) => warn!("Progress display mutex was poisoned. Cannot update progress."),
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} nodes ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("##-")
}
