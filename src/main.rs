//! # Spectra
//!
//! Command-line harness for the highlighting engine: opens a file, runs one
//! highlight session until the first styled snapshot, and prints the result.
//!
//! ## Quick Start
//!
//! ```bash
//! # Colored rows 0..40 of a file
//! cargo run -- path/to/build.gradle
//!
//! # Every token, then exit
//! cargo run -- --tokens path/to/Main.java
//!
//! # Scroll to line 120, show 20 rows with the groovy palette
//! cargo run -- --top 120 --rows 20 --theme groovy path/to/Jenkinsfile.groovy
//! ```

use anyhow::{Context, bail};
use clap::Parser;
use std::fmt::Write as _;
use std::io::Write as _;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spectra_core::{
    BufferLayout, BufferSource, Config, Document, HighlightController, HighlightSession, Rect,
    ScrollView, SessionOptions, StyleSnapshot, Theme, tokenizer_for,
};
use spectra_syntax::Token;

/// Spectra - syntax highlighting from the command line
#[derive(Parser, Debug)]
#[command(name = "spectra")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to highlight
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Language (detected from the extension by default)
    #[arg(short, long)]
    language: Option<String>,

    /// Print the token list instead of colored rows
    #[arg(short, long)]
    tokens: bool,

    /// First visible line
    #[arg(long, default_value_t = 0)]
    top: usize,

    /// Number of visible lines
    #[arg(long, default_value_t = 40)]
    rows: usize,

    /// Builtin theme name or theme file
    #[arg(long)]
    theme: Option<String>,

    /// Config file (defaults to the user config)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Spectra v{}", env!("CARGO_PKG_VERSION"));

    // Renderers and the session share one thread, like a UI loop
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let output = runtime.block_on(highlight(&args))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Runs one session over `args.file` and renders the requested output.
async fn highlight(args: &Args) -> anyhow::Result<String> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load(),
    };

    let mut doc = Document::from_file(&args.file, &config)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    if let Some(language) = &args.language {
        doc.set_language(language.clone());
    }

    let theme = match args.theme.as_ref().or(config.highlight.theme.as_ref()) {
        Some(name) => Theme::resolve(name)?,
        None => Theme::for_language(doc.language()),
    };
    let tokenizer = tokenizer_for(doc.language(), &config)
        .with_context(|| format!("cannot highlight language '{}'", doc.language()))?;
    tracing::info!(
        file = %args.file.display(),
        language = doc.language(),
        tokenizer = tokenizer.name(),
        theme = theme.name(),
        "highlighting"
    );

    let line_height = config.highlight.line_height;
    let view = ScrollView::new(Rect::new(
        0.0,
        args.top as f32 * line_height,
        800.0,
        args.rows as f32 * line_height,
    ));
    let source = doc.source();
    let session = HighlightSession::spawn(
        &doc,
        HighlightController::new(tokenizer, Arc::new(theme)),
        view.subscribe(),
        Arc::new(BufferLayout::new(source.clone(), line_height)),
        SessionOptions::from_config(&config),
    );

    let wait = Duration::from_millis(config.analyzer.timeout_ms) + Duration::from_secs(1);
    let mut styles = session.view();
    let snapshot = match tokio::time::timeout(wait, styles.wait_for(StyleSnapshot::is_styled)).await {
        Ok(snapshot) => snapshot?,
        Err(_) => bail!("no tokens within {wait:?}; run with -v for details"),
    };

    doc.close();
    let controller = session.join().await?;

    if args.tokens {
        Ok(format_tokens(&source, controller.tokens()))
    } else {
        let lines = args.top..args.top.saturating_add(args.rows);
        Ok(render_rows(&source, &snapshot, lines))
    }
}

/// One line per token: `start..end kind "text"`.
fn format_tokens(source: &BufferSource, tokens: &[Token]) -> String {
    source.with(|buffer| {
        let mut out = String::new();
        for token in tokens {
            let text = buffer
                .slice_utf16(token.range.clone())
                .map(|s| s.into_owned())
                .unwrap_or_default();
            let _ = writeln!(out, "{:?} {} {:?}", token.range, token.kind, text);
        }
        out
    })
}

/// Renders `lines` with 24-bit ANSI foreground colors.
fn render_rows(source: &BufferSource, snapshot: &StyleSnapshot, lines: Range<usize>) -> String {
    source.with(|buffer| {
        let mut out = String::new();
        let end = lines.end.min(buffer.len_lines());
        for line in lines.start.min(end)..end {
            let (Ok(start), Ok(next)) = (
                buffer.line_start_utf16(line),
                buffer.line_start_utf16(line + 1),
            ) else {
                break;
            };
            let Ok(text) = buffer.slice_utf16(start..next) else {
                break;
            };

            let mut offset = start;
            let mut current = None;
            for ch in text.trim_end_matches(['\n', '\r']).chars() {
                let color = snapshot.color_at(offset);
                if current != Some(color) {
                    let _ = write!(out, "\x1b[38;2;{};{};{}m", color.r, color.g, color.b);
                    current = Some(color);
                }
                out.push(ch);
                offset += ch.len_utf16();
            }
            out.push_str("\x1b[0m\n");
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_core::{Color, StyledSpan};
    use spectra_syntax::TokenKind;
    use std::ffi::OsString;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["spectra", "build.gradle"]);
        assert_eq!(args.file, PathBuf::from("build.gradle"));
        assert!(!args.tokens);
        assert_eq!(args.top, 0);
        assert_eq!(args.rows, 40);
        assert!(args.language.is_none());
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "spectra", "--tokens", "--top", "10", "--rows", "5", "--theme", "groovy", "-l",
            "java", "-vv", "Main.java",
        ]);
        assert!(args.tokens);
        assert_eq!(args.top, 10);
        assert_eq!(args.rows, 5);
        assert_eq!(args.theme.as_deref(), Some("groovy"));
        assert_eq!(args.language.as_deref(), Some("java"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_format_tokens() {
        let doc = Document::new("x = 42", "groovy");
        let tokens = vec![Token::new(TokenKind::Number, 4..6)];
        assert_eq!(format_tokens(&doc.source(), &tokens), "4..6 number \"42\"\n");
    }

    #[test]
    fn test_render_rows() {
        let doc = Document::new("ab\ncd\n", "text");
        let red = Color::rgb(255, 0, 0);
        let snapshot = StyleSnapshot {
            revision: 1,
            generation: 1,
            visible: 0..6,
            spans: Arc::from(vec![StyledSpan {
                range: 1..4,
                kind: TokenKind::Keyword,
                color: red,
            }]),
            default_color: Color::BLACK,
        };

        let out = render_rows(&doc.source(), &snapshot, 0..10);
        assert_eq!(
            out,
            "\x1b[38;2;0;0;0ma\x1b[38;2;255;0;0mb\x1b[0m\n\
             \x1b[38;2;255;0;0mc\x1b[38;2;0;0;0md\x1b[0m\n\
             \x1b[0m\n"
        );
    }

    #[tokio::test]
    async fn test_highlight_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.gradle");
        std::fs::write(&path, "// deps\ndef v = 3\n").unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let args = Args::parse_from([
            OsString::from("spectra"),
            OsString::from("--tokens"),
            OsString::from("--config"),
            config.into_os_string(),
            path.into_os_string(),
        ]);
        let out = highlight(&args).await.unwrap();
        assert_eq!(
            out,
            "0..7 comment \"// deps\"\n8..11 keyword \"def\"\n16..17 number \"3\"\n"
        );
    }

    #[tokio::test]
    async fn test_groovy_files_default_to_groovy_palette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.gradle");
        std::fs::write(&path, "def run()\n").unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let args = Args::parse_from([
            OsString::from("spectra"),
            OsString::from("--config"),
            config.into_os_string(),
            path.into_os_string(),
        ]);
        let out = highlight(&args).await.unwrap();
        // keyword blue, call purple
        assert!(out.starts_with("\x1b[38;2;0;0;255mdef\x1b[38;2;0;0;0m \x1b[38;2;128;0;128mrun"));
    }
}
