use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Spinner shown while following listing pages.
pub struct DiscoveryProgress {
    pb: ProgressBar,
}

impl DiscoveryProgress {
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {msg} {spinner}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(style("Discovering identifiers").bright().yellow().to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { pb }
    }

    pub fn page_fetched(&self, page: usize, total: usize) {
        self.pb.set_message(
            style(format!("Discovering identifiers: page {page}, {total} so far"))
                .bright()
                .yellow()
                .to_string(),
        );
    }

    pub fn finish(self, total: usize, pages: usize) {
        self.pb.finish_with_message(
            style(format!("Discovered {total} identifiers across {pages} pages ✓"))
                .bright()
                .green()
                .to_string(),
        );
    }
}

/// Bar tracking written batch artifacts.
pub struct BatchProgress {
    pb: ProgressBar,
}

impl BatchProgress {
    pub fn start(batches: usize) -> Self {
        let pb = ProgressBar::new(batches as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_message(style("Fetching batches").bright().yellow().to_string());

        Self { pb }
    }

    pub fn batch_written(&self, start: usize, end: usize) {
        self.pb.set_message(
            style(format!("Fetched batch {start}..={end}"))
                .bright()
                .yellow()
                .to_string(),
        );
        self.pb.inc(1);
    }

    pub fn finish(self, written: usize, failed: usize) {
        let message = if failed == 0 {
            style(format!("Wrote {written} batches ✓")).bright().green()
        } else {
            style(format!(
                "Wrote {written} batches, {failed} with error responses ✗"
            ))
            .bright()
            .red()
        };
        self.pb.finish_with_message(message.to_string());
    }
}
