//! Verbosity-gated console reporting
//!
//! The pipeline narrates each step as a header followed by the pretty-printed
//! result. What reaches the console depends on the configured [`Verbosity`];
//! structured diagnostics go through `tracing` instead.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use clap::ValueEnum;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Console verbosity, ordered from quietest to loudest.
///
/// A message is printed when its level is less than or equal to the
/// configured verbosity; `Silent` prints nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum Verbosity {
    Silent,
    Errors,
    Summaries,
    Results,
    #[default]
    Debug,
}

impl Verbosity {
    /// Default `tracing` filter directive for this verbosity.
    pub fn tracing_directive(self) -> &'static str {
        match self {
            Verbosity::Silent => "off",
            Verbosity::Errors => "error",
            Verbosity::Summaries | Verbosity::Results => "warn",
            Verbosity::Debug => "warn,zcash_protect_coins=debug,protect_coins=debug",
        }
    }
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Console reporter shared by the pipeline and the node transports.
#[derive(Clone)]
pub struct Reporter {
    verbosity: Verbosity,
    sink: Sink,
}

impl Reporter {
    /// Report to standard output.
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self::with_writer(verbosity, io::stdout())
    }

    /// Report to an arbitrary writer.
    pub fn with_writer<W: Write + Send + 'static>(verbosity: Verbosity, writer: W) -> Self {
        Self {
            verbosity,
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Reporter that discards everything.
    pub fn silent() -> Self {
        Self::with_writer(Verbosity::Silent, io::sink())
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Silent && level <= self.verbosity
    }

    /// Print a free-form message at `level`.
    pub fn note(&self, level: Verbosity, text: &str) {
        if self.enabled(level) {
            self.write(text);
        }
    }

    /// Announce the start of a pipeline step.
    pub fn header(&self, title: &str) {
        self.note(Verbosity::Summaries, &format!("\n\n-- {} --\n", title));
    }

    /// Pretty-print the outcome of a step.
    pub fn result<T: Serialize + ?Sized>(&self, data: &T) {
        if !self.enabled(Verbosity::Results) {
            return;
        }
        let pretty =
            to_pretty_json(data).unwrap_or_else(|e| format!("<unprintable result: {}>", e));
        self.write(&format!("\nResult:\n{}\n\n", pretty));
    }

    /// Echo the literal invocation about to be sent to the node.
    pub fn command(&self, line: &str) {
        self.note(Verbosity::Debug, &format!("\nexecuting: {}\n\n", line));
    }

    fn write(&self, text: &str) {
        // A poisoned sink only means another writer panicked mid-line
        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = sink.write_all(text.as_bytes());
        let _ = sink.flush();
    }
}

/// Pretty-print with four-space indentation and object keys sorted.
pub fn to_pretty_json<T: Serialize + ?Sized>(data: &T) -> serde_json::Result<String> {
    // Going through `Value` sorts keys, its maps are ordered
    let value = serde_json::to_value(data)?;
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

/// In-memory writer whose contents stay readable after being handed to a
/// [`Reporter`].
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buf = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reporter(verbosity: Verbosity) -> (Reporter, SharedBuffer) {
        let buf = SharedBuffer::new();
        (Reporter::with_writer(verbosity, buf.clone()), buf)
    }

    fn exercise(reporter: &Reporter) {
        reporter.note(Verbosity::Errors, "notice\n");
        reporter.header("Step");
        reporter.result(&json!({"hex": "00"}));
        reporter.command("zcash-cli listunspent");
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(Verbosity::Silent < Verbosity::Errors);
        assert!(Verbosity::Errors < Verbosity::Summaries);
        assert!(Verbosity::Summaries < Verbosity::Results);
        assert!(Verbosity::Results < Verbosity::Debug);
        assert_eq!(Verbosity::default(), Verbosity::Debug);
    }

    #[test]
    fn test_silent_prints_nothing() {
        let (reporter, buf) = reporter(Verbosity::Silent);
        exercise(&reporter);
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn test_summaries_show_headers_but_not_results() {
        let (reporter, buf) = reporter(Verbosity::Summaries);
        exercise(&reporter);
        let out = buf.contents();
        assert!(out.contains("notice"));
        assert!(out.contains("-- Step --"));
        assert!(!out.contains("Result:"));
        assert!(!out.contains("executing:"));
    }

    #[test]
    fn test_debug_shows_everything() {
        let (reporter, buf) = reporter(Verbosity::Debug);
        exercise(&reporter);
        let out = buf.contents();
        assert!(out.contains("notice"));
        assert!(out.contains("-- Step --"));
        assert!(out.contains("Result:\n{\n    \"hex\": \"00\"\n}"));
        assert!(out.contains("executing: zcash-cli listunspent"));
    }

    #[test]
    fn test_pretty_json_sorts_keys_with_four_space_indent() {
        let mut utxo = crate::rpc::UnspentOutput::new("t1", 5.0);
        utxo.extra.insert("address".to_string(), json!("tmAddr"));
        assert_eq!(
            to_pretty_json(&[utxo]).unwrap(),
            "[\n    {\n        \"address\": \"tmAddr\",\n        \"amount\": 5.0,\n        \"txid\": \"t1\",\n        \"vout\": 0\n    }\n]"
        );
        assert_eq!(to_pretty_json("feedface").unwrap(), "\"feedface\"");
    }

    #[test]
    fn test_tracing_directive_follows_verbosity() {
        assert_eq!(Verbosity::Silent.tracing_directive(), "off");
        // debug output stays limited to this project's crates
        assert_eq!(
            Verbosity::Debug.tracing_directive(),
            "warn,zcash_protect_coins=debug,protect_coins=debug"
        );
    }
}
