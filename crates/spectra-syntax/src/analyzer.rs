//! Tokenizer that delegates to an external structural analyzer.
//!
//! ## Protocol
//!
//! The analyzer receives the source text (on stdin, as a trailing
//! argument, or as the path of a temp file) and prints a JSON array on
//! stdout:
//!
//! ```json
//! [{"offset": 0, "length": 6, "type": "source.lang.swift.syntaxtype.keyword"}]
//! ```
//!
//! `offset` and `length` are UTF-16 code units. The tag may be spelled
//! `type` or `kind`.
//!
//! ## Learning: Untrusted Subprocesses
//!
//! The analyzer may be missing, slow, or buggy. Every failure becomes a
//! `SyntaxError` and records that point outside the text are dropped.
//! The whole exchange (spawn, stdin, stdout, exit) runs under one
//! deadline on a small current-thread runtime. When the deadline passes
//! the exchange is dropped, which kills the analyzer, so a child that
//! keeps its stdout open cannot stall the pass either.
//!
//! `tokenize` blocks, so call it from a blocking worker
//! (`tokio::task::spawn_blocking`) or a plain thread, never from inside
//! an async task.

use serde::{Deserialize, Serialize};
use std::io;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::offsets::utf16_len;
use crate::{SyntaxError, SyntaxResult, Token, TokenKind, Tokenizer};

/// How the source text reaches the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalyzerInput {
    /// Piped to the analyzer's stdin
    #[default]
    Stdin,
    /// Appended as the last command-line argument
    Argument,
    /// Written to a temp file whose path is appended as the last argument
    TempFile,
}

/// Command line and limits for an external analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub input: AnalyzerInput,
    pub timeout: Duration,
}

impl AnalyzerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: AnalyzerInput::default(),
            timeout: Duration::from_secs(5),
        }
    }

    /// SourceKitten's syntax map: `sourcekitten syntax --text <source>`.
    pub fn sourcekitten() -> Self {
        Self::new("sourcekitten")
            .args(["syntax", "--text"])
            .input(AnalyzerInput::Argument)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, input: AnalyzerInput) -> Self {
        self.input = input;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Tokenizer backed by an external analyzer process.
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    name: String,
    command: AnalyzerCommand,
}

impl ExternalAnalyzer {
    pub fn new(name: impl Into<String>, command: AnalyzerCommand) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }

    pub fn command(&self) -> &AnalyzerCommand {
        &self.command
    }

    /// Runs the analyzer to completion and returns its stdout.
    fn run(&self, text: &str) -> SyntaxResult<Vec<u8>> {
        let timeout = self.command.timeout;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let exchange = async { tokio::time::timeout(timeout, self.exchange(text)).await };
        let output = match runtime.block_on(exchange) {
            Ok(output) => output?,
            Err(_) => {
                tracing::debug!(program = %self.command.program, ?timeout, "analyzer timed out");
                return Err(SyntaxError::AnalyzerTimeout(timeout));
            }
        };

        if !output.status.success() {
            return Err(SyntaxError::AnalyzerExit {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Spawns the analyzer, feeds it `text` and collects its output.
    /// Dropping the future kills the process.
    async fn exchange(&self, text: &str) -> SyntaxResult<Output> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Keeps the handoff file alive until the analyzer has exited.
        let mut _handoff = None;
        match self.command.input {
            AnalyzerInput::Stdin => {
                cmd.stdin(Stdio::piped());
            }
            AnalyzerInput::Argument => {
                cmd.arg(text).stdin(Stdio::null());
            }
            AnalyzerInput::TempFile => {
                use std::io::Write;

                let mut file = tempfile::Builder::new().prefix("spectra-").tempfile()?;
                file.write_all(text.as_bytes())?;
                file.flush()?;
                cmd.arg(file.path()).stdin(Stdio::null());
                _handoff = Some(file);
            }
        }

        let mut child = cmd.spawn().map_err(|source| SyntaxError::AnalyzerSpawn {
            program: self.command.program.clone(),
            source,
        })?;

        // Feed stdin while reading stdout so neither side fills a pipe
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(text.as_bytes()).await {
                    // The analyzer may exit without reading its input.
                    Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok::<_, io::Error>(())
        };
        let ((), output) = tokio::try_join!(feed, child.wait_with_output())?;
        Ok(output)
    }
}

impl Tokenizer for ExternalAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn tokenize(&self, text: &str) -> SyntaxResult<Vec<Token>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let output = self.run(text)?;
        parse_records(&output, utf16_len(text))
    }

    fn runs_off_thread(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct Record {
    offset: usize,
    length: usize,
    #[serde(alias = "type")]
    kind: String,
}

/// Parses analyzer output into tokens sorted by start offset.
///
/// Records that are empty or extend past `text_len` (UTF-16 units) are
/// dropped, as are records overlapping an earlier one; anything that is
/// not a JSON array of records is an error.
pub fn parse_records(output: &[u8], text_len: usize) -> SyntaxResult<Vec<Token>> {
    let records: Vec<Record> = serde_json::from_slice(output)?;

    let mut tokens: Vec<Token> = records
        .into_iter()
        .filter_map(|record| {
            let end = record.offset.checked_add(record.length)?;
            if record.length == 0 || end > text_len {
                tracing::debug!(
                    offset = record.offset,
                    length = record.length,
                    text_len,
                    "dropping out-of-range analyzer record"
                );
                return None;
            }
            Some(Token::at(
                TokenKind::from_tag(&record.kind),
                record.offset,
                record.length,
            ))
        })
        .collect();
    tokens.sort_by_key(|token| token.range.start);

    // One token per position: the earliest-starting record wins
    let mut covered = 0;
    tokens.retain(|token| {
        if token.range.start < covered {
            tracing::debug!(range = ?token.range, covered, "dropping overlapping analyzer record");
            return false;
        }
        covered = token.range.end;
        true
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sourcekit_records() {
        let output = br#"[
            {"offset": 0, "length": 6, "type": "source.lang.swift.syntaxtype.keyword"},
            {"offset": 7, "length": 3, "type": "source.lang.swift.syntaxtype.identifier"}
        ]"#;
        let tokens = parse_records(output, 20).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Keyword, 0..6),
                Token::new(TokenKind::Identifier, 7..10),
            ]
        );
    }

    #[test]
    fn test_parse_sorts_and_drops_bad_records() {
        let output = br#"[
            {"offset": 8, "length": 2, "kind": "number"},
            {"offset": 0, "length": 0, "kind": "keyword"},
            {"offset": 9, "length": 50, "kind": "string"},
            {"offset": 1, "length": 2, "kind": "mystery"}
        ]"#;
        let tokens = parse_records(output, 10).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Unknown, 1..3),
                Token::new(TokenKind::Number, 8..10),
            ]
        );
    }

    #[test]
    fn test_parse_drops_overlapping_records() {
        let output = br#"[
            {"offset": 4, "length": 3, "kind": "string"},
            {"offset": 0, "length": 6, "kind": "comment"},
            {"offset": 6, "length": 2, "kind": "number"},
            {"offset": 0, "length": 2, "kind": "keyword"}
        ]"#;
        let tokens = parse_records(output, 10).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Comment, 0..6),
                Token::new(TokenKind::Number, 6..8),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_output() {
        assert!(matches!(
            parse_records(b"not json", 10),
            Err(SyntaxError::MalformedOutput(_))
        ));
        assert!(parse_records(br#"{"offset": 1}"#, 10).is_err());
    }

    #[test]
    fn test_empty_text_short_circuits_without_spawning() {
        let analyzer = ExternalAnalyzer::new(
            "missing",
            AnalyzerCommand::new("/nonexistent/spectra-analyzer"),
        );
        assert_eq!(analyzer.tokenize("").unwrap(), Vec::new());
        assert!(analyzer.runs_off_thread());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let analyzer = ExternalAnalyzer::new(
            "missing",
            AnalyzerCommand::new("/nonexistent/spectra-analyzer"),
        );
        assert!(matches!(
            analyzer.tokenize("let x = 1"),
            Err(SyntaxError::AnalyzerSpawn { .. })
        ));
    }

    #[test]
    fn test_sourcekitten_command_line() {
        let command = AnalyzerCommand::sourcekitten();
        assert_eq!(command.program, "sourcekitten");
        assert_eq!(command.args, vec!["syntax", "--text"]);
        assert_eq!(command.input, AnalyzerInput::Argument);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::time::Instant;

        fn shell(script: &str) -> AnalyzerCommand {
            AnalyzerCommand::new("sh").args(["-c", script, "analyzer"])
        }

        #[test]
        fn test_stdin_handoff() {
            let script = r#"n=$(wc -c | tr -d ' '); printf '[{"offset":0,"length":%s,"type":"comment"}]' "$n""#;
            let analyzer = ExternalAnalyzer::new("stdin", shell(script));
            let tokens = analyzer.tokenize("// hi").unwrap();
            assert_eq!(tokens, vec![Token::new(TokenKind::Comment, 0..5)]);
        }

        #[test]
        fn test_argument_handoff() {
            let script = r#"printf '[{"offset":0,"length":%s,"type":"string"}]' "${#1}""#;
            let analyzer =
                ExternalAnalyzer::new("arg", shell(script).input(AnalyzerInput::Argument));
            let tokens = analyzer.tokenize("\"abc\"").unwrap();
            assert_eq!(tokens, vec![Token::new(TokenKind::String, 0..5)]);
        }

        #[test]
        fn test_temp_file_handoff() {
            let script = r#"n=$(wc -c < "$1" | tr -d ' '); printf '[{"offset":0,"length":%s,"type":"number"}]' "$n""#;
            let analyzer =
                ExternalAnalyzer::new("file", shell(script).input(AnalyzerInput::TempFile));
            let tokens = analyzer.tokenize("12345").unwrap();
            assert_eq!(tokens, vec![Token::new(TokenKind::Number, 0..5)]);
        }

        #[test]
        fn test_nonzero_exit_is_error() {
            let analyzer = ExternalAnalyzer::new("fails", shell("echo boom >&2; exit 3"));
            match analyzer.tokenize("x") {
                Err(SyntaxError::AnalyzerExit { status, stderr }) => {
                    assert_eq!(status, Some(3));
                    assert_eq!(stderr, "boom");
                }
                other => panic!("expected exit error, got {other:?}"),
            }
        }

        #[test]
        fn test_hung_analyzer_times_out() {
            let command = shell("sleep 5").timeout(Duration::from_millis(100));
            let analyzer = ExternalAnalyzer::new("slow", command);
            let started = Instant::now();
            assert!(matches!(
                analyzer.tokenize("x"),
                Err(SyntaxError::AnalyzerTimeout(_))
            ));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_deadline_covers_lingering_children() {
            // Exits at once, but a background child keeps stdout open
            let command = shell("sleep 3 & echo '[]'").timeout(Duration::from_millis(200));
            let analyzer = ExternalAnalyzer::new("lingering", command);
            let started = Instant::now();
            assert!(matches!(
                analyzer.tokenize("x"),
                Err(SyntaxError::AnalyzerTimeout(_))
            ));
            assert!(started.elapsed() < Duration::from_secs(2));
        }

        #[test]
        fn test_large_output_does_not_deadlock() {
            // Writes more than a pipe buffer before reading stdin
            let script = r#"printf '['; i=0; while [ $i -lt 5000 ]; do printf '{"offset":0,"length":1,"kind":"keyword"},'; i=$((i+1)); done; printf '{"offset":0,"length":1,"kind":"keyword"}]'; cat >/dev/null"#;
            let analyzer = ExternalAnalyzer::new("chatty", shell(script));
            let text = "x".repeat(200_000);
            let tokens = analyzer.tokenize(&text).unwrap();
            assert_eq!(tokens, vec![Token::new(TokenKind::Keyword, 0..1)]);
        }

        #[test]
        fn test_garbage_output_is_error() {
            let analyzer = ExternalAnalyzer::new("garbage", shell("echo nope"));
            assert!(matches!(
                analyzer.tokenize("x"),
                Err(SyntaxError::MalformedOutput(_))
            ));
        }
    }
}
