use crate::consistency::error::Error;
use crate::history::types::{Call, ObjectKind, Operation};
use crate::model::{SequentialObject, Step};

/// Single-slot register model with compare-and-swap.
///
/// The register starts empty. `write` always applies. `read(v)` applies if
/// the register holds `v`. A compare-and-swap applies only to a non-empty
/// register: with `cond = true` the register must hold `compare` and then
/// holds `swap`; with `cond = false` it must hold anything but `compare`
/// and is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterState<Value> {
    pub value: Option<Value>,
}

impl<Value> Default for RegisterState<Value> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<Value> SequentialObject<Value> for RegisterState<Value>
where
    Value: Clone + Eq + core::fmt::Debug,
{
    const KIND: ObjectKind = ObjectKind::Register;

    fn apply(&mut self, call: &Call<Value>) -> Result<Step<Value>, Error<Value>> {
        match &call.op {
            Operation::Write(value) => {
                self.value = Some(value.clone());
                Ok(Step::Applied(None))
            }
            Operation::Read(value) => Ok(if self.value.as_ref() == Some(value) {
                Step::Applied(Some(value.clone()))
            } else {
                Step::Inapplicable
            }),
            Operation::Cas {
                compare,
                swap,
                cond,
            } => {
                let Some(current) = &self.value else {
                    return Ok(Step::Inapplicable);
                };
                match (*cond, current == compare) {
                    (true, true) => {
                        self.value = Some(swap.clone());
                        Ok(Step::Applied(None))
                    }
                    (false, false) => Ok(Step::Applied(None)),
                    _ => Ok(Step::Inapplicable),
                }
            }
            Operation::Enqueue(_) | Operation::Dequeue(_) => Err(Self::mismatch(call)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(state: &mut RegisterState<u64>, call: &Call<u64>) -> bool {
        state.apply(call).expect("register call").is_applied()
    }

    #[test]
    fn test_read_requires_written_value() {
        let mut state = RegisterState::default();
        assert!(!apply(&mut state, &Call::read(1, 1, 0.0, 1.0)));
        assert!(apply(&mut state, &Call::write(1, 1, 0.0, 1.0)));
        assert!(apply(&mut state, &Call::read(2, 1, 1.0, 2.0)));
        assert!(!apply(&mut state, &Call::read(2, 2, 1.0, 2.0)));
    }

    #[test]
    fn test_successful_cas_swaps() {
        let mut state = RegisterState::default();
        assert!(!apply(&mut state, &Call::cas(1, 1, 2, 0.0, 1.0)));
        apply(&mut state, &Call::write(1, 1, 0.0, 1.0));
        assert!(!apply(&mut state, &Call::cas(1, 3, 4, 0.0, 1.0)));
        assert!(apply(&mut state, &Call::cas(1, 1, 2, 0.0, 1.0)));
        assert_eq!(state.value, Some(2));
    }

    #[test]
    fn test_failed_cas_observes_inequality() {
        let mut state = RegisterState::default();
        assert!(
            !apply(&mut state, &Call::failed_cas(1, 1, 2, 0.0, 1.0)),
            "an empty register admits no compare-and-swap"
        );
        apply(&mut state, &Call::write(1, 5, 0.0, 1.0));
        assert!(!apply(&mut state, &Call::failed_cas(1, 5, 2, 0.0, 1.0)));
        assert!(apply(&mut state, &Call::failed_cas(1, 1, 2, 0.0, 1.0)));
        assert_eq!(state.value, Some(5), "a failed compare-and-swap never writes");
    }

    #[test]
    fn test_queue_call_is_a_mismatch() {
        let mut state: RegisterState<u64> = RegisterState::default();
        assert!(matches!(
            state.apply(&Call::enqueue(1, 1, 0.0, 1.0)),
            Err(Error::ModelMismatch {
                expected: ObjectKind::Register,
                ..
            })
        ));
    }
}
