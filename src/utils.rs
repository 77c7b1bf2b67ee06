/// Quotes `text` as a double-quoted Python string literal.
pub(crate) fn python_string(text: &str) -> String {
    let mut acc = String::with_capacity(text.len() + 2);

    acc.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => acc.push_str("\\\\"),
            '"' => acc.push_str("\\\""),
            '\n' => acc.push_str("\\n"),
            '\r' => acc.push_str("\\r"),
            '\t' => acc.push_str("\\t"),
            ch => acc.push(ch),
        }
    }
    acc.push('"');

    acc
}

/// Text safe to place after `#`. Control characters, line breaks included,
/// are written as escapes so the comment stays on one line.
pub(crate) fn comment_text(text: &str) -> String {
    let mut acc = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch.is_control() || matches!(ch, '\u{2028}' | '\u{2029}') {
            true => acc.extend(ch.escape_default()),
            false => acc.push(ch),
        }
    }

    acc
}

pub(crate) fn python_bool(value: bool) -> &'static str {
    match value {
        true => "True",
        false => "False",
    }
}

/// Installs a global `tracing` subscriber printing to stderr.
///
/// The filter is read from `RUST_LOG` and defaults to `info`. Calling this
/// more than once is an error.
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with_default("info")
}

/// Like [`init_logging`], falling back to `directive` when `RUST_LOG` is unset.
#[cfg(feature = "logging")]
pub fn init_logging_with_default(directive: &str) -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
