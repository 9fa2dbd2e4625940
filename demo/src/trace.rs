use crate::term::{style, ColorMode, OutputOptions, OwoColorize, Stream, Style};
use std::fmt::{self, Write as _};
use tracing::{field::Field, Event, Level, Subscriber};
use tracing_subscriber::{
    field::Visit,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
};

impl OutputOptions {
    pub fn trace_init(&self) -> color_eyre::Result<()> {
        use tracing_subscriber::prelude::*;
        let fmt = tracing_subscriber::fmt::layer()
            .event_format(StatusFormat::new(self.color))
            .with_ansi(self.color.enabled(Stream::Stderr))
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(fmt)
            .with(tracing_error::ErrorLayer::default())
            .with(self.log.clone())
            .try_init()?;
        Ok(())
    }
}

/// An event format in the style of cargo's output.
///
/// `INFO` events whose message starts with a capitalized word, like
/// `"Finished 5! = 120"`, become right-aligned status lines. Everything else
/// gets a level prefix, and is followed by the spans it happened in.
#[derive(Debug)]
struct StatusFormat {
    status: Style,
    levels: [Style; 5],
    bold: Style,
    pipes: Style,
}

/// Collects an event's message and other fields.
#[derive(Default)]
struct Fields {
    message: String,
    rest: String,
}

const STATUS_WIDTH: usize = 12;

impl StatusFormat {
    fn new(color: ColorMode) -> Self {
        let pick = |s: Style| color.style_for(Stream::Stderr, s);
        Self {
            status: pick(style().green().bold()),
            levels: [
                pick(style().red().bold()),
                pick(style().yellow().bold()),
                pick(style().cyan().bold()),
                pick(style().blue().bold()),
                pick(style().purple().bold()),
            ],
            bold: pick(style().bold()),
            pipes: pick(style().blue().bold()),
        }
    }

    fn level(&self, level: &Level) -> (&'static str, Style) {
        match *level {
            Level::ERROR => ("error", self.levels[0]),
            Level::WARN => ("warning", self.levels[1]),
            Level::INFO => ("info", self.levels[2]),
            Level::DEBUG => ("debug", self.levels[3]),
            Level::TRACE => ("trace", self.levels[4]),
        }
    }
}

/// Splits a status word off the front of `message`, if it has one.
fn status_word(message: &str) -> Option<(&str, &str)> {
    let (word, rest) = message.split_once(' ')?;
    let is_status = word.len() <= STATUS_WIDTH
        && word.starts_with(|c: char| c.is_ascii_uppercase())
        && word.chars().all(|c| c.is_ascii_alphabetic());
    is_status.then_some((word, rest))
}

impl<S, N> FormatEvent<S, N> for StatusFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut fields = Fields::default();
        event.record(&mut fields);

        if *metadata.level() == Level::INFO {
            if let Some((word, rest)) = status_word(&fields.message) {
                write!(
                    writer,
                    "{:>width$} {rest}",
                    word.style(self.status),
                    width = STATUS_WIDTH
                )?;
                return writeln!(writer, "{}", fields.rest);
            }
        }

        let (name, level_style) = self.level(metadata.level());
        let rest = if fields.message.is_empty() {
            fields.rest.trim_start_matches(", ")
        } else {
            fields.rest.as_str()
        };
        writeln!(
            writer,
            "{}{} {}{rest}",
            name.style(level_style),
            ":".style(self.bold),
            fields.message.style(self.bold),
        )?;

        if ctx.lookup_current().is_none() {
            return Ok(());
        }
        write!(
            writer,
            "   {} {}",
            "-->".style(self.pipes),
            metadata.file().unwrap_or_else(|| metadata.target()),
        )?;
        if let Some(line) = metadata.line() {
            write!(writer, ":{line}")?;
        }
        writeln!(writer)?;

        ctx.visit_spans(|span| {
            let exts = span.extensions();
            let span_fields = exts
                .get::<FormattedFields<N>>()
                .map(|f| f.fields.as_str())
                .unwrap_or_default();
            write!(
                writer,
                "    {} {}",
                "|".style(self.pipes),
                span.name().style(self.bold)
            )?;
            if !span_fields.is_empty() {
                write!(writer, ": {span_fields}")?;
            }
            writeln!(writer)
        })
    }
}

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.rest, ", {}: {value:?}", field.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::{fmt::MakeWriter, prelude::*};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let out = Captured::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(StatusFormat::new(ColorMode::Never))
                .with_ansi(false)
                .with_writer(out.clone()),
        );
        tracing::subscriber::with_default(subscriber, f);
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn status_words() {
        assert_eq!(status_word("Finished 5! = 120"), Some(("Finished", "5! = 120")));
        assert_eq!(status_word("child failed"), None);
        assert_eq!(status_word("Started"), None);
        assert_eq!(status_word("Extraordinarily long"), None);
    }

    #[test]
    fn status_lines() {
        let output = capture(|| tracing::info!("Finished 5! = 120"));
        assert_eq!(output, "    Finished 5! = 120\n");
    }

    #[test]
    fn other_events_get_a_level() {
        let output = capture(|| tracing::warn!(n = 4, "child failed"));
        assert_eq!(output, "warning: child failed, n: 4\n");
    }

    #[test]
    fn spans_are_listed() {
        let output = capture(|| {
            let _span = tracing::info_span!("countdown", secs = 5).entered();
            tracing::error!("oh no");
        });
        assert!(output.starts_with("error: oh no\n"), "{output}");
        assert!(output.contains("| countdown: secs=5"), "{output}");
        assert!(!output.contains('\x1b'), "uncolored output has escapes: {output:?}");
    }
}
