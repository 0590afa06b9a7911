mod progress;
mod summary;

use console::style;

pub use progress::{BatchProgress, DiscoveryProgress};
pub use summary::print_flatten_summary;

/// Prints the banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        style("🧪 assign-collector").magenta().bold(),
        style(env!("CARGO_PKG_VERSION")).dim(),
        style("TeamCity investigation dataset collector").dim()
    );
}
