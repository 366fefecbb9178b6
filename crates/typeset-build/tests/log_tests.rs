//! Log classification tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use typeset_build::log::{parse_log, Message, MessageKind};

const PDFLATEX_LOG: &str = "\
This is pdfTeX, Version 3.141592653-2.6-1.40.25 (TeX Live 2023) (preloaded format=pdflatex)
 restricted \\write18 enabled.
entering extended mode
(./main.tex
LaTeX2e <2022-11-01> patch level 1
(/usr/share/texlive/texmf-dist/tex/latex/base/article.cls
Document Class: article 2022/07/02 v1.4n Standard LaTeX document class
)
LaTeX Warning: Citation `knuth84' on page 1 undefined on input line 7.

! Undefined control sequence.
l.9 \\foo

LaTeX Warning: There were undefined references.

 )
(see the transcript file for additional information)
Output written on main.pdf (1 page, 12345 bytes).
Transcript written on main.log.
";

#[test]
fn test_realistic_log() {
    let messages = parse_log(PDFLATEX_LOG);

    assert_eq!(
        messages,
        vec![
            Message::warning("Citation `knuth84' on page 1 undefined on input line 7."),
            Message::error("Undefined control sequence. l.9 \\foo"),
            Message::warning("There were undefined references."),
        ]
    );
}

/// Log lines that reproduce `messages` when parsed
fn render_log(messages: &[Message]) -> String {
    let mut lines = Vec::new();
    for message in messages {
        match message.kind {
            MessageKind::Warning => lines.push(format!("LaTeX Warning: {}", message.text)),
            // the parser joins an error with its continuation line by one space
            MessageKind::Error => match message.text.rsplit_once(' ') {
                Some((head, continuation)) => {
                    lines.push(format!("! {}", head));
                    lines.push(continuation.to_string());
                }
                None => lines.push(format!("! {}", message.text)),
            },
        }
    }
    lines.join("\n")
}

#[test]
fn test_reparsing_rendered_messages_is_stable() {
    let messages = parse_log(PDFLATEX_LOG);
    let rendered = render_log(&messages);

    assert_eq!(parse_log(&rendered), messages);
    assert_eq!(parse_log(&format!("{}\n", rendered)), messages);
}

#[test]
fn test_crlf_and_lf_logs_agree() {
    let crlf = PDFLATEX_LOG.replace('\n', "\r\n");
    assert_eq!(parse_log(&crlf), parse_log(PDFLATEX_LOG));
}

#[rstest]
#[case("", 0)]
#[case("no diagnostics here\nat all", 0)]
#[case("LaTeX Warning: a\nLaTeX Warning: b", 2)]
#[case("! a\nb\n! c\nd", 2)]
#[case("! a\n! b", 1)]
fn test_message_counts(#[case] log: &str, #[case] expected: usize) {
    assert_eq!(parse_log(log).len(), expected);
}

#[test]
fn test_messages_preserve_log_order() {
    let messages = parse_log("LaTeX Warning: first\n! second\ncontext\nLaTeX Warning: third");
    let kinds: Vec<MessageKind> = messages.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MessageKind::Warning, MessageKind::Error, MessageKind::Warning]
    );
}

#[test]
fn test_rendering() {
    let messages = parse_log("! Missing $ inserted.\n<inserted text>");
    assert_eq!(
        messages[0].to_string(),
        "Error: Missing $ inserted. <inserted text>"
    );
}
