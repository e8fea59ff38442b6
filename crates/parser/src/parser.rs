use lincheck_core::history::types::ThreadId;
use lincheck_core::{Call, History, Operation};
/// Winnow-based parser for the `.hist` text format.
///
/// Grammar:
/// ```text
/// history   = thread (separator thread)*
/// separator = DASH+ NEWLINE
/// thread    = (comment | blank | call_line)*
/// comment   = "//" REST_OF_LINE NEWLINE
/// call_line = operation "@" time ".." time NEWLINE
/// operation = "write(" value ")"  | "read(" value ")"
///           | "enq(" value ")"    | "deq(" value ")"
///           | "cas(" value "," value ")"    -- comparison held
///           | "cas!(" value "," value ")"   -- comparison failed
/// time      = DIGITS ("." DIGITS)?
/// value     = INTEGER
/// ```
///
/// Threads are numbered `1..=n` in the order they appear. The output of
/// `format_history` parses back to an equal history up to thread ids.
use winnow::ascii::{dec_uint, digit1, newline, till_line_ending};
use winnow::combinator::{alt, cut_err, eof, opt, repeat, separated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{literal, take_while};
use winnow::ModalResult;

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// A parse error with human-readable location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse a `.hist` string into a history of integer-valued calls.
///
/// # Errors
///
/// Returns a [`ParseError`] with line/column information when the input does
/// not conform to the grammar or a call responds before it is invoked.
pub fn parse_history(input: &str) -> Result<History<u64>, ParseError> {
    let original = input;
    let mut stream: &str = input;
    match history_parser.parse_next(&mut stream) {
        Ok(history) => Ok(history),
        Err(e) => {
            let consumed = original.len().saturating_sub(stream.len());
            let (line, column) = offset_to_line_col(original, consumed);
            Err(ParseError {
                message: e.to_string(),
                line,
                column,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Line/column helper
// ---------------------------------------------------------------------------

/// Convert a byte offset into the original input to 1-based (line, column).
fn offset_to_line_col(input: &str, offset: usize) -> (usize, usize) {
    let prefix = &input[..offset.min(input.len())];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = prefix
        .rfind('\n')
        .map_or_else(|| prefix.len() + 1, |pos| prefix.len() - pos);
    (line, column)
}

// ---------------------------------------------------------------------------
// Whitespace helpers
// ---------------------------------------------------------------------------

fn opt_inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

/// A newline, or the end of input for a final line without one.
fn line_end(input: &mut &str) -> ModalResult<()> {
    opt_inline_ws.parse_next(input)?;
    alt((newline.void(), eof.void())).parse_next(input)
}

// ---------------------------------------------------------------------------
// Leaf parsers
// ---------------------------------------------------------------------------

fn value(input: &mut &str) -> ModalResult<u64> {
    dec_uint.parse_next(input)
}

/// A non-negative decimal timestamp. The fraction needs a digit after the
/// dot, so `0..2` splits into `0`, `..` and `2`.
fn time(input: &mut &str) -> ModalResult<f64> {
    (digit1, opt(('.', digit1)))
        .take()
        .try_map(str::parse::<f64>)
        .context(StrContext::Label("time"))
        .parse_next(input)
}

/// `start..end` with `start <= end`.
fn span(input: &mut &str) -> ModalResult<(f64, f64)> {
    (time, literal(".."), time)
        .map(|(start, _, end)| (start, end))
        .verify(|&(start, end): &(f64, f64)| start <= end)
        .context(StrContext::Expected(StrContextValue::Description(
            "a response no earlier than the invocation",
        )))
        .parse_next(input)
}

// ---------------------------------------------------------------------------
// Operation parser
// ---------------------------------------------------------------------------

/// `"(" value ("," value)? ")"`
fn arguments(input: &mut &str) -> ModalResult<Vec<u64>> {
    '('.parse_next(input)?;
    opt_inline_ws.parse_next(input)?;
    let values = separated(1..=2, value, (opt_inline_ws, ',', opt_inline_ws)).parse_next(input)?;
    opt_inline_ws.parse_next(input)?;
    ')'.parse_next(input)?;
    Ok(values)
}

fn operation(input: &mut &str) -> ModalResult<Operation<u64>> {
    // `cas!` must be tried before its prefix `cas`.
    let name = alt((
        literal("cas!"),
        literal("cas"),
        literal("write"),
        literal("read"),
        literal("enq"),
        literal("deq"),
    ))
    .context(StrContext::Label("operation"))
    .parse_next(input)?;
    let args = cut_err(arguments)
        .context(StrContext::Label("arguments"))
        .parse_next(input)?;

    let op = match (name, args.as_slice()) {
        ("write", &[v]) => Operation::Write(v),
        ("read", &[v]) => Operation::Read(v),
        ("enq", &[v]) => Operation::Enqueue(v),
        ("deq", &[v]) => Operation::Dequeue(v),
        ("cas", &[compare, swap]) => Operation::Cas {
            compare,
            swap,
            cond: true,
        },
        ("cas!", &[compare, swap]) => Operation::Cas {
            compare,
            swap,
            cond: false,
        },
        _ => return Err(ErrMode::Cut(ContextError::new())),
    };
    Ok(op)
}

// ---------------------------------------------------------------------------
// Line parsers
// ---------------------------------------------------------------------------

/// A comment line: `"//" <rest-of-line> NEWLINE`. Produces nothing.
fn comment_line(input: &mut &str) -> ModalResult<Option<(Operation<u64>, f64, f64)>> {
    opt_inline_ws.parse_next(input)?;
    literal("//").parse_next(input)?;
    till_line_ending.parse_next(input)?;
    line_end.parse_next(input)?;
    Ok(None)
}

/// A blank line. Produces nothing.
fn blank_line(input: &mut &str) -> ModalResult<Option<(Operation<u64>, f64, f64)>> {
    opt_inline_ws.parse_next(input)?;
    newline.parse_next(input)?;
    Ok(None)
}

/// `operation "@" start ".." end`
fn call_line(input: &mut &str) -> ModalResult<Option<(Operation<u64>, f64, f64)>> {
    opt_inline_ws.parse_next(input)?;
    let op = operation.parse_next(input)?;
    opt_inline_ws.parse_next(input)?;
    cut_err('@').parse_next(input)?;
    opt_inline_ws.parse_next(input)?;
    let (start, end) = cut_err(span).parse_next(input)?;
    cut_err(line_end).parse_next(input)?;
    Ok(Some((op, start, end)))
}

// ---------------------------------------------------------------------------
// Separator parser
// ---------------------------------------------------------------------------

/// A line of one or more `-` characters, possibly padded with inline
/// whitespace.
fn separator(input: &mut &str) -> ModalResult<()> {
    opt_inline_ws.parse_next(input)?;
    take_while(1.., '-').parse_next(input)?;
    line_end.parse_next(input)
}

// ---------------------------------------------------------------------------
// Thread and history parsers
// ---------------------------------------------------------------------------

/// The calls of one thread, up to the next separator or end of input.
fn thread(input: &mut &str) -> ModalResult<Vec<(Operation<u64>, f64, f64)>> {
    let mut calls = Vec::new();

    loop {
        let trimmed = input.trim_start_matches([' ', '\t']);
        if trimmed.starts_with('-') || trimmed.is_empty() {
            break;
        }
        if let Some(call) = alt((comment_line, blank_line, call_line)).parse_next(input)? {
            calls.push(call);
        }
    }

    Ok(calls)
}

fn history_parser(input: &mut &str) -> ModalResult<History<u64>> {
    let mut threads = vec![thread.parse_next(input)?];
    while separator.parse_next(input).is_ok() {
        threads.push(thread.parse_next(input)?);
    }

    repeat::<_, _, (), _, _>(0.., blank_line).parse_next(input)?;
    opt_inline_ws.parse_next(input)?;

    if !input.is_empty() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }

    Ok(threads
        .into_iter()
        .zip(1..)
        .flat_map(|(calls, id): (_, ThreadId)| {
            calls
                .into_iter()
                .map(move |(op, start, end)| Call::new(id, op, start, end))
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use lincheck_core::history::display::format_history;

    use super::*;

    #[test]
    fn test_single_thread() {
        let history = parse_history("write(1) @ 0..2\nread(1) @ 3..4\n").expect("parse");
        assert_eq!(
            history.calls,
            vec![Call::write(1, 1, 0.0, 2.0), Call::read(1, 1, 3.0, 4.0)]
        );
    }

    #[test]
    fn test_threads_are_numbered_from_one() {
        let input = "write(1) @ 0..2\n---\nread(1) @ 1..3\n---\nread(0) @ 0..1\n";
        let history = parse_history(input).expect("parse");
        let threads: Vec<ThreadId> = history.iter().map(|call| call.thread).collect();
        assert_eq!(threads, vec![1, 2, 3]);
    }

    #[test]
    fn test_compare_and_swap_outcomes() {
        let history = parse_history("cas(1, 2) @ 0..1\ncas!(5,6) @ 1.5..2.25\n").expect("parse");
        assert_eq!(
            history.calls,
            vec![
                Call::cas(1, 1, 2, 0.0, 1.0),
                Call::failed_cas(1, 5, 6, 1.5, 2.25),
            ]
        );
    }

    #[test]
    fn test_queue_operations() {
        let history = parse_history("enq(7) @ 0..1\ndeq(7) @ 2..3").expect("parse");
        assert_eq!(
            history.calls,
            vec![Call::enqueue(1, 7, 0.0, 1.0), Call::dequeue(1, 7, 2.0, 3.0)]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let input = "// writer\nwrite(1) @ 0..2\n\n   \n// reader follows\n---\n\nread(1) @ 3..4\n\n";
        let history = parse_history(input).expect("parse");
        assert_eq!(history.len(), 2);
        assert_eq!(history.calls[1], Call::read(2, 1, 3.0, 4.0));
    }

    #[test]
    fn test_empty_thread_between_separators_keeps_numbering() {
        let input = "write(1) @ 0..1\n---\n---\nread(1) @ 2..3\n";
        let history = parse_history(input).expect("parse");
        assert_eq!(history.calls[1].thread, 3);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_history("").expect("parse").is_empty());
        assert!(parse_history("\n\n").expect("parse").is_empty());
    }

    #[test]
    fn test_round_trip_with_formatter() {
        let history = History::new(vec![
            Call::write(1, 1u64, 0.0, 1.0),
            Call::cas(1, 1, 2, 1.5, 3.0),
            Call::read(2, 2, 3.25, 4.0),
            Call::failed_cas(2, 1, 9, 5.0, 6.0),
        ]);
        let text = format_history(&history);
        let parsed = parse_history(&text).expect("parse");
        assert_eq!(parsed, history);
        assert_eq!(format_history(&parsed), text);
    }

    // -----------------------------------------------------------------------
    // Error tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_error_has_line_column() {
        let input = "write(1) @ 0..1\n@bad\n";
        let err = parse_history(input).expect_err("should fail");
        assert_eq!(err.line, 2, "expected error on line 2, got: {err}");
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_response_before_invocation_is_rejected() {
        let err = parse_history("read(1) @ 0..1\nwrite(1) @ 3..2\n").expect_err("should fail");
        assert_eq!(err.line, 2, "got: {err}");
    }

    #[test]
    fn test_wrong_argument_count_is_rejected() {
        assert!(parse_history("write(1, 2) @ 0..1\n").is_err());
        assert!(parse_history("cas(1) @ 0..1\n").is_err());
    }

    #[test]
    fn test_parse_error_display() {
        let err = parse_history("write(1) 0..1\n").expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("parse error"), "display should contain 'parse error': {msg}");
        assert!(msg.contains("line 1"), "display should contain the line: {msg}");
    }

    #[test]
    fn test_offset_to_line_col() {
        let input = "abc\ndef\n";
        assert_eq!(offset_to_line_col(input, 0), (1, 1));
        assert_eq!(offset_to_line_col(input, 2), (1, 3));
        assert_eq!(offset_to_line_col(input, 4), (2, 1));
        assert_eq!(offset_to_line_col(input, 6), (2, 3));
    }
}
