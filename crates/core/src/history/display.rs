use alloc::string::String;
use core::fmt::{Display, Write};

use crate::history::types::History;

/// Format a history as the compact `.hist` text format.
///
/// Threads are emitted in ascending id order and separated by `---`; each
/// call sits on its own line as `op @ start..end`, sorted by invocation
/// time. Thread ids are implicit in the format, so parsing the output
/// numbers the threads `1..=n`. The output always ends with a trailing
/// newline.
#[must_use]
pub fn format_history<Value>(history: &History<Value>) -> String
where
    Value: Display,
{
    let mut output = String::new();
    for (i, calls) in history.threads().values().enumerate() {
        if i > 0 {
            output.push_str("---\n");
        }
        for call in calls {
            let _ = writeln!(output, "{} @ {}..{}", call.op, call.start, call.end);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::types::Call;

    #[test]
    fn test_format_history_single_thread() {
        let history = History::new(vec![
            Call::read(1, 1u64, 2.0, 3.5),
            Call::write(1, 1u64, 0.0, 1.0),
        ]);
        assert_eq!(
            format_history(&history),
            "write(1) @ 0..1\nread(1) @ 2..3.5\n"
        );
    }

    #[test]
    fn test_format_history_two_threads() {
        let history = History::new(vec![
            Call::enqueue(4, 1u64, 0.0, 2.0),
            Call::dequeue(2, 1u64, 2.0, 3.0),
            Call::cas(4, 1u64, 2, 3.0, 4.0),
            Call::failed_cas(2, 5u64, 6, 4.0, 5.0),
        ]);
        assert_eq!(
            format_history(&history),
            "deq(1) @ 2..3\ncas!(5, 6) @ 4..5\n---\nenq(1) @ 0..2\ncas(1, 2) @ 3..4\n"
        );
    }

    #[test]
    fn test_format_history_empty() {
        let history: History<u64> = History::default();
        assert_eq!(format_history(&history), "");
    }
}
