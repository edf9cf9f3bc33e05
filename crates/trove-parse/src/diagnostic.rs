//! Diagnostic rendering for parse errors.

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};

use crate::{ErrorCategory, ParseError, ParseErrorKind};

fn ariadne_config() -> Config {
    // Spans are byte offsets.
    let config = Config::default().with_index_type(IndexType::Byte);
    if std::env::var("NO_COLOR").is_ok() {
        config.with_color(false)
    } else {
        config
    }
}

impl ParseError {
    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source context.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let report = self.build_report(filename, source.len());
        let _ = report
            .with_config(ariadne_config())
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
        source_len: usize,
    ) -> ariadne::ReportBuilder<'static, (&'a str, std::ops::Range<usize>)> {
        let start = (self.span.start as usize).min(source_len);
        // Empty spans get one byte so the label has something to underline.
        let end = (self.span.end as usize)
            .max(start + 1)
            .min(source_len)
            .max(start);
        let range = start..end;

        let (label, help) = match &self.kind {
            ParseErrorKind::Lex(_) => ("here", None),
            ParseErrorKind::InvalidEscape(_) => (
                "invalid escape",
                Some("valid escapes are: \\n \\r \\t \\a \\b \\v \\' \\\" \\\\ \\xHH and \\DDD"),
            ),
            ParseErrorKind::UnexpectedToken { .. } => ("unexpected", None),
            ParseErrorKind::MismatchedBracket => (
                "does not match the opening bracket",
                Some("close '{' with '}' and '[' with ']'"),
            ),
            ParseErrorKind::UnclosedBracket => ("bracket opened here", Some("add the closing bracket")),
            ParseErrorKind::BadIndentation => (
                "unexpected indentation",
                Some("entries of a section must line up with the first entry"),
            ),
            ParseErrorKind::TooDeep(_) => ("too deep", None),
            ParseErrorKind::InvalidKey => (
                "cannot be used as a key",
                Some("keys must be bare atoms; quoted strings, tags and references are values only"),
            ),
            ParseErrorKind::ExpectedConverterName => ("expected a name here", Some("write `$name value`")),
            ParseErrorKind::IdOutOfRange | ParseErrorKind::AnonymousReference => ("this id", None),
            ParseErrorKind::DuplicateTag(_) => ("tagged again here", Some("each id can be tagged only once")),
            ParseErrorKind::Unresolved(id) => (
                "referenced here",
                Some(if id.is_anonymous() {
                    "the anonymous id cannot be referenced"
                } else {
                    "tag a table with the same id somewhere in the document"
                }),
            ),
            ParseErrorKind::Transform(_) => ("while transforming this table", None),
        };

        let color = match self.kind.category() {
            ErrorCategory::Hook => Color::Yellow,
            _ => Color::Red,
        };

        let report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_message(self.kind.to_string())
            .with_label(
                Label::new((filename, range))
                    .with_message(label)
                    .with_color(color),
            );
        match help {
            Some(help) => report.with_help(help),
            None => report,
        }
    }
}
