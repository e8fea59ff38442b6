use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::{Debug, Display, Formatter, Result as FmtResult};
use core::hash::{Hash, Hasher};

use crate::consistency::error::Error;
use crate::history::interval::Interval;

/// Identifier of the logical thread (client) that issued a call.
pub type ThreadId = u64;

/// A point in time of a recorded history.
///
/// Wraps an `f64` and orders it with [`f64::total_cmp`], so calls can be
/// compared, hashed and used as map keys.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Default, Clone, Copy)]
pub struct Time(pub f64);

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Time {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// The sequential object a history is recorded against.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// FIFO queue with `enqueue`/`dequeue`.
    Queue,
    /// Single-slot register with `write`/`read`/compare-and-swap.
    Register,
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Queue => write!(f, "queue"),
            Self::Register => write!(f, "register"),
        }
    }
}

/// An operation together with its arguments.
///
/// The recorded result of a call is encoded in its arguments: a `Read`
/// names the value it returned, a `Dequeue` the element it removed, and a
/// `Cas` whether its comparison held (`cond`).
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation<Value> {
    Enqueue(Value),
    Dequeue(Value),
    Write(Value),
    Read(Value),
    Cas {
        compare: Value,
        swap: Value,
        /// `true` if the comparison held and `swap` was stored.
        cond: bool,
    },
}

impl<Value> Operation<Value> {
    /// The object kind this operation applies to.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Enqueue(_) | Self::Dequeue(_) => ObjectKind::Queue,
            Self::Write(_) | Self::Read(_) | Self::Cas { .. } => ObjectKind::Register,
        }
    }

    /// The value a register operation stores, if any.
    ///
    /// Plain writes and successful compare-and-swaps store a value.
    #[must_use]
    pub const fn written_value(&self) -> Option<&Value> {
        match self {
            Self::Write(value) | Self::Cas { swap: value, cond: true, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_true_cas(&self) -> bool {
        matches!(self, Self::Cas { cond: true, .. })
    }

    #[must_use]
    pub const fn is_false_cas(&self) -> bool {
        matches!(self, Self::Cas { cond: false, .. })
    }
}

impl<Value: Display> Display for Operation<Value> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Enqueue(value) => write!(f, "enq({value})"),
            Self::Dequeue(value) => write!(f, "deq({value})"),
            Self::Write(value) => write!(f, "write({value})"),
            Self::Read(value) => write!(f, "read({value})"),
            Self::Cas {
                compare,
                swap,
                cond: true,
            } => write!(f, "cas({compare}, {swap})"),
            Self::Cas {
                compare,
                swap,
                cond: false,
            } => write!(f, "cas!({compare}, {swap})"),
        }
    }
}

/// One recorded invocation/response pair.
///
/// Equality and hashing cover every field including `order`, so the same
/// call before and after ordering are distinct keys.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Call<Value> {
    pub thread: ThreadId,
    pub op: Operation<Value>,
    /// Invocation time.
    pub start: Time,
    /// Response time, never earlier than `start`.
    pub end: Time,
    /// Position in a linearization, 1-based. `None` until assigned.
    #[cfg_attr(feature = "serde", serde(default))]
    pub order: Option<u64>,
}

impl<Value> Call<Value> {
    #[must_use]
    pub const fn new(thread: ThreadId, op: Operation<Value>, start: f64, end: f64) -> Self {
        Self {
            thread,
            op,
            start: Time(start),
            end: Time(end),
            order: None,
        }
    }

    #[must_use]
    pub const fn write(thread: ThreadId, value: Value, start: f64, end: f64) -> Self {
        Self::new(thread, Operation::Write(value), start, end)
    }

    #[must_use]
    pub const fn read(thread: ThreadId, value: Value, start: f64, end: f64) -> Self {
        Self::new(thread, Operation::Read(value), start, end)
    }

    /// A compare-and-swap whose comparison held.
    #[must_use]
    pub const fn cas(thread: ThreadId, compare: Value, swap: Value, start: f64, end: f64) -> Self {
        Self::new(
            thread,
            Operation::Cas {
                compare,
                swap,
                cond: true,
            },
            start,
            end,
        )
    }

    /// A compare-and-swap whose comparison failed.
    #[must_use]
    pub const fn failed_cas(
        thread: ThreadId,
        compare: Value,
        swap: Value,
        start: f64,
        end: f64,
    ) -> Self {
        Self::new(
            thread,
            Operation::Cas {
                compare,
                swap,
                cond: false,
            },
            start,
            end,
        )
    }

    #[must_use]
    pub const fn enqueue(thread: ThreadId, value: Value, start: f64, end: f64) -> Self {
        Self::new(thread, Operation::Enqueue(value), start, end)
    }

    #[must_use]
    pub const fn dequeue(thread: ThreadId, value: Value, start: f64, end: f64) -> Self {
        Self::new(thread, Operation::Dequeue(value), start, end)
    }

    /// `true` if `self` responded strictly before `other` was invoked, so
    /// every linearization must place `self` first.
    #[must_use]
    pub fn precedes(&self, other: &Self) -> bool {
        self.end < other.start
    }

    /// The invocation-to-response window of this call.
    #[must_use]
    pub fn span(&self) -> Interval {
        Interval::ordered(self.start, self.end, false)
    }
}

impl<Value: Display> Display for Call<Value> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{} @ {}..{}", self.op, self.start, self.end)?;
        if let Some(order) = self.order {
            write!(f, " #{order}")?;
        }
        Ok(())
    }
}

/// An ordered sequence of calls recorded across threads.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct History<Value> {
    pub calls: Vec<Call<Value>>,
}

impl<Value> History<Value> {
    #[must_use]
    pub const fn new(calls: Vec<Call<Value>>) -> Self {
        Self { calls }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Call<Value>> {
        self.calls.iter()
    }

    /// Calls grouped by thread, each thread's calls sorted by invocation time.
    #[must_use]
    pub fn threads(&self) -> BTreeMap<ThreadId, Vec<&Call<Value>>> {
        let mut threads: BTreeMap<ThreadId, Vec<&Call<Value>>> = BTreeMap::new();
        for call in &self.calls {
            threads.entry(call.thread).or_default().push(call);
        }
        for calls in threads.values_mut() {
            calls.sort_by_key(|call| call.start);
        }
        threads
    }

    /// `true` if every call carries an order number.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.calls.iter().all(|call| call.order.is_some())
    }

    /// Calls sorted by their assigned order; unordered calls come last.
    #[must_use]
    pub fn by_order(&self) -> Vec<&Call<Value>> {
        let mut calls: Vec<&Call<Value>> = self.calls.iter().collect();
        calls.sort_by_key(|call| call.order.unwrap_or(u64::MAX));
        calls
    }
}

impl<Value: Clone> History<Value> {
    /// The object kind every call of the history applies to.
    ///
    /// Returns `Ok(None)` for an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelMismatch`] naming the first call whose kind
    /// differs from the kind of the first call.
    pub fn object_kind(&self) -> Result<Option<ObjectKind>, Error<Value>> {
        let Some(first) = self.calls.first() else {
            return Ok(None);
        };
        let expected = first.op.kind();
        match self.calls.iter().find(|call| call.op.kind() != expected) {
            Some(call) => Err(Error::ModelMismatch {
                expected,
                call: call.clone(),
            }),
            None => Ok(Some(expected)),
        }
    }
}

impl<Value> From<Vec<Call<Value>>> for History<Value> {
    fn from(calls: Vec<Call<Value>>) -> Self {
        Self { calls }
    }
}

impl<Value> FromIterator<Call<Value>> for History<Value> {
    fn from_iter<I: IntoIterator<Item = Call<Value>>>(iter: I) -> Self {
        Self {
            calls: iter.into_iter().collect(),
        }
    }
}

impl<Value> IntoIterator for History<Value> {
    type Item = Call<Value>;
    type IntoIter = alloc::vec::IntoIter<Call<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.into_iter()
    }
}

impl<'a, Value> IntoIterator for &'a History<Value> {
    type Item = &'a Call<Value>;
    type IntoIter = core::slice::Iter<'a, Call<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_total_order() {
        assert!(Time(1.0) < Time(1.5));
        assert_eq!(Time(2.0), Time(2.0));
        assert_eq!(Time(0.5).max(Time(0.25)), Time(0.5));
    }

    #[test]
    fn test_call_equality_includes_order() {
        let call = Call::write(1, 7u64, 0.0, 2.0);
        let mut ordered = call.clone();
        ordered.order = Some(1);
        assert_ne!(call, ordered);

        let set: hashbrown::HashSet<Call<u64>> = [call.clone(), ordered].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&call));
    }

    #[test]
    fn test_precedes() {
        let a = Call::write(1, 1u64, 0.0, 1.0);
        let b = Call::read(2, 1u64, 1.5, 2.0);
        let c = Call::read(3, 1u64, 1.0, 2.0);
        assert!(a.precedes(&b));
        assert!(!b.precedes(&a));
        // touching endpoints are not ordered by real time
        assert!(!a.precedes(&c));
    }

    #[test]
    fn test_operation_helpers() {
        let write: Operation<u64> = Operation::Write(3);
        let cas = Operation::Cas {
            compare: 1u64,
            swap: 2,
            cond: true,
        };
        let failed = Operation::Cas {
            compare: 1u64,
            swap: 2,
            cond: false,
        };
        assert_eq!(write.written_value(), Some(&3));
        assert_eq!(cas.written_value(), Some(&2));
        assert_eq!(failed.written_value(), None);
        assert!(cas.is_true_cas());
        assert!(failed.is_false_cas());
        assert_eq!(Operation::Enqueue(1u64).kind(), ObjectKind::Queue);
        assert_eq!(failed.kind(), ObjectKind::Register);
    }

    #[test]
    fn test_display() {
        let mut call = Call::failed_cas(1, 1u64, 2, 0.5, 3.0);
        assert_eq!(format!("{call}"), "cas!(1, 2) @ 0.5..3");
        call.order = Some(4);
        assert_eq!(format!("{call}"), "cas!(1, 2) @ 0.5..3 #4");
    }

    #[test]
    fn test_threads_are_sorted_by_start() {
        let history = History::new(vec![
            Call::read(2, 1u64, 3.0, 4.0),
            Call::write(1, 1u64, 0.0, 1.0),
            Call::read(2, 1u64, 1.0, 2.0),
        ]);
        let threads = history.threads();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[&2][0].start, Time(1.0));
        assert_eq!(threads[&2][1].start, Time(3.0));
    }

    #[test]
    fn test_object_kind() {
        let empty: History<u64> = History::default();
        assert_eq!(empty.object_kind().ok(), Some(None));

        let register = History::new(vec![Call::write(1, 1u64, 0.0, 1.0)]);
        assert_eq!(
            register.object_kind().ok(),
            Some(Some(ObjectKind::Register))
        );

        let mixed = History::new(vec![
            Call::write(1, 1u64, 0.0, 1.0),
            Call::enqueue(2, 1u64, 0.0, 1.0),
        ]);
        assert!(matches!(
            mixed.object_kind(),
            Err(Error::ModelMismatch {
                expected: ObjectKind::Register,
                ..
            })
        ));
    }
}
