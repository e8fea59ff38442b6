/// DSL macro for building test histories.
///
/// Produces `History<u64>`. Each `[ ... ]` block is one thread, numbered
/// from 1 in order of appearance.
///
/// # Syntax
///
/// ```ignore
/// history! {
///     [ w(1) @ [0, 2], cas(1, 2) @ [3, 4] ],      // thread 1
///     [ r(1) @ [0, 2], fcas(1, 3) @ [5, 6] ],     // thread 2
/// }
/// ```
///
/// - `w(v)`         → `Call::write`
/// - `r(v)`         → `Call::read`
/// - `cas(c, s)`    → `Call::cas` (comparison held)
/// - `fcas(c, s)`   → `Call::failed_cas`
/// - `enq(v)`       → `Call::enqueue`
/// - `deq(v)`       → `Call::dequeue`
///
/// Build a single Call.
#[macro_export]
macro_rules! call {
    ($thread:expr; w($v:expr) @ [$s:expr, $e:expr]) => {
        lincheck_core::history::types::Call::write($thread, $v as u64, $s as f64, $e as f64)
    };
    ($thread:expr; r($v:expr) @ [$s:expr, $e:expr]) => {
        lincheck_core::history::types::Call::read($thread, $v as u64, $s as f64, $e as f64)
    };
    ($thread:expr; cas($c:expr, $w:expr) @ [$s:expr, $e:expr]) => {
        lincheck_core::history::types::Call::cas($thread, $c as u64, $w as u64, $s as f64, $e as f64)
    };
    ($thread:expr; fcas($c:expr, $w:expr) @ [$s:expr, $e:expr]) => {
        lincheck_core::history::types::Call::failed_cas(
            $thread, $c as u64, $w as u64, $s as f64, $e as f64,
        )
    };
    ($thread:expr; enq($v:expr) @ [$s:expr, $e:expr]) => {
        lincheck_core::history::types::Call::enqueue($thread, $v as u64, $s as f64, $e as f64)
    };
    ($thread:expr; deq($v:expr) @ [$s:expr, $e:expr]) => {
        lincheck_core::history::types::Call::dequeue($thread, $v as u64, $s as f64, $e as f64)
    };
}

/// Build a full history: threads are `[ ... ]` blocks.
#[macro_export]
macro_rules! history {
    ($( [ $( $op:ident ( $($arg:expr),* ) @ [$s:expr, $e:expr] ),* $(,)? ] ),* $(,)?) => {{
        let mut calls = Vec::new();
        let mut thread: u64 = 0;
        $(
            thread += 1;
            $( calls.push($crate::call!(thread; $op($($arg),*) @ [$s, $e])); )*
        )*
        let _ = thread;
        lincheck_core::history::types::History::new(calls)
    }};
}

/// Replay every returned order and check it against the history it came from.
#[allow(dead_code)]
pub fn assert_sound(
    history: &lincheck_core::History<u64>,
    witness: &lincheck_core::Witness<u64>,
) {
    use lincheck_core::consistency::verify_order;
    use lincheck_core::model::{QueueState, RegisterState};
    use lincheck_core::Witness;

    let orders: Vec<&lincheck_core::History<u64>> = match witness {
        Witness::RegisterOrder(order) => vec![order],
        Witness::Linearizations(orders) => orders.iter().collect(),
    };
    for order in orders {
        assert_eq!(order.len(), history.len());
        for call in history {
            assert!(
                order
                    .iter()
                    .any(|ordered| ordered.order.is_some() && ordered.op == call.op
                        && ordered.start == call.start && ordered.thread == call.thread),
                "{call} missing from the order"
            );
        }
        let queue = history
            .iter()
            .any(|call| call.op.kind() == lincheck_core::history::types::ObjectKind::Queue);
        let replay = if queue {
            verify_order(order, QueueState::default())
        } else {
            verify_order(order, RegisterState::default())
        };
        assert_eq!(replay, Ok(()), "order failed replay: {order:?}");
    }
}
