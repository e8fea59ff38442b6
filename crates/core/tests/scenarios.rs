/// Reference scenarios for both engines.
/// Uses the `history!` DSL macro defined in tests/common/mod.rs.
mod common;

use common::assert_sound;
use lincheck_core::consistency::error::{Error, Violation};
use lincheck_core::consistency::generic::linearize_generic;
use lincheck_core::consistency::register::linearize_register;
use lincheck_core::history::types::Operation;
use lincheck_core::model::{QueueState, RegisterState};
use lincheck_core::{check, Engine, Witness};

#[test]
fn overlapping_write_and_read() {
    let h = history! {
        [ w(1) @ [0, 2] ],
        [ r(1) @ [0, 2] ],
    };

    let ordered = linearize_register(&h).expect("linearizable");
    assert_eq!(ordered.calls[0].order, Some(1));
    assert_eq!(ordered.calls[1].order, Some(2));

    let orders = linearize_generic(&h, &RegisterState::default()).expect("linearizable");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].calls[0].op, Operation::Write(1));
}

#[test]
fn read_of_overwritten_value_is_rejected() {
    // read(1) responds before read(0) starts, but write(0) finished before
    // write(1) began: 0 can no longer be current
    let h = history! {
        [ w(0) @ [0, 1], r(0) @ [3, 4] ],
        [ w(1) @ [1.2, 5] ],
        [ r(1) @ [1.5, 2.5] ],
    };

    assert_eq!(
        linearize_register(&h),
        Err(Error::Infeasible(Violation::Straddle {
            first: 0,
            second: 1
        }))
    );
    assert_eq!(
        linearize_generic(&h, &RegisterState::default()),
        Err(Error::Infeasible(Violation::NoLinearization))
    );
}

#[test]
fn read_overlapping_the_next_write_is_accepted() {
    // read(0) may take effect before write(1) does
    let h = history! {
        [ w(0) @ [0, 1], r(0) @ [2, 4] ],
        [ w(1) @ [1, 5] ],
        [ r(1) @ [1.5, 2.5] ],
    };

    let witness = check(&h, Engine::Register).expect("linearizable");
    assert_sound(&h, &witness);
    assert!(check(&h, Engine::Generic).is_ok());
}

#[test]
fn queue_fifo_order() {
    let h = history! {
        [ enq(1) @ [0, 2], deq(1) @ [2, 3], deq(2) @ [3, 4], deq(1) @ [4, 5] ],
        [ enq(1) @ [0, 1], enq(2) @ [1, 2] ],
    };

    let witness = check(&h, Engine::Auto).expect("linearizable");
    assert_sound(&h, &witness);

    let Witness::Linearizations(orders) = witness else {
        panic!("queues are checked by the generic engine");
    };
    assert!(!orders.is_empty());
    for order in &orders {
        let position = |op: Operation<u64>| order.iter().position(|call| call.op == op);
        let enqueue_two = position(Operation::Enqueue(2)).expect("enqueued");
        let dequeue_two = position(Operation::Dequeue(2)).expect("dequeued");
        assert!(enqueue_two < dequeue_two);
        let first_dequeue = position(Operation::Dequeue(1)).expect("dequeued");
        let first_enqueue = position(Operation::Enqueue(1)).expect("enqueued");
        assert!(first_enqueue < first_dequeue);
    }
}

#[test]
fn queue_dequeue_out_of_order_is_rejected() {
    let h = history! {
        [ enq(1) @ [0, 1], enq(2) @ [2, 3] ],
        [ deq(2) @ [4, 5], deq(1) @ [6, 7] ],
    };
    assert_eq!(
        linearize_generic(&h, &QueueState::default()),
        Err(Error::Infeasible(Violation::NoLinearization))
    );
}

#[test]
fn failed_cas_calls_without_common_value_are_rejected() {
    // after both writes the register holds 1 or 2, and no write follows;
    // one failed compare-and-swap rules out each value
    let h = history! {
        [ w(1) @ [0, 2] ],
        [ w(2) @ [0, 2] ],
        [ fcas(1, 9) @ [3, 4] ],
        [ fcas(2, 9) @ [3, 4] ],
    };

    assert!(matches!(
        linearize_register(&h),
        Err(Error::Infeasible(Violation::DisjointCandidates { .. }))
    ));
    assert_eq!(
        linearize_generic(&h, &RegisterState::default()),
        Err(Error::Infeasible(Violation::NoLinearization))
    );
}

#[test]
fn failed_cas_calls_with_common_value_are_accepted() {
    let h = history! {
        [ w(1) @ [0, 2] ],
        [ w(2) @ [0, 2] ],
        [ fcas(1, 9) @ [3, 4] ],
        [ fcas(3, 9) @ [3, 4] ],
    };

    let witness = check(&h, Engine::Register).expect("linearizable");
    assert_sound(&h, &witness);
}
