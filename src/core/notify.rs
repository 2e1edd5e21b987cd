//! User-facing notifications, kept separate from store state.

use console::style;

/// Transient success/failure notices emitted by the store when a refresh is
/// asked to report its outcome.
pub trait Notifier: Send + Sync {
    fn success(&self, title: &str, detail: &str);
    fn failure(&self, title: &str, detail: &str);
}

/// Prints notices to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, title: &str, detail: &str) {
        println!("{} {}", style(title).green().bold(), style(detail).dim());
    }

    fn failure(&self, title: &str, detail: &str) {
        println!("{} {}", style(title).red().bold(), style(detail).dim());
    }
}

/// Discards every notice. Used where no terminal output is wanted.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn success(&self, _title: &str, _detail: &str) {}
    fn failure(&self, _title: &str, _detail: &str) {}
}
