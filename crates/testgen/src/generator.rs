use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Duration, Local};
use lincheck_core::history::types::ThreadId;
use lincheck_core::{check, Call, Engine, History};
use rand::distr::{Distribution, Uniform};
use rand::RngExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Kinds of calls a generated history may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpMix {
    /// Register writes and reads.
    Io,
    /// Register compare-and-swaps.
    Cas,
    /// Queue enqueues and dequeues. Cannot be mixed with register calls.
    Queue,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, TypedBuilder)]
pub struct HistParams {
    #[builder(default)]
    pub id: u64,
    #[builder(default = 3)]
    pub n_thread: u64,
    #[builder(default = 8)]
    pub n_call: u64,
    /// Register values are drawn from `0..=n_value`.
    #[builder(default = 4)]
    pub n_value: u64,
    #[builder(default = vec![OpMix::Io, OpMix::Cas])]
    pub ops: Vec<OpMix>,
    /// Whole-unit gap between a call and the previous call of its thread.
    #[builder(default = 1)]
    pub min_offset: u32,
    #[builder(default = 5)]
    pub max_offset: u32,
    /// Whole-unit length of a call.
    #[builder(default = 1)]
    pub min_duration: u32,
    #[builder(default = 10)]
    pub max_duration: u32,
}

impl Default for HistParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parameters no history can be generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    NoOperations,
    /// Queue calls requested together with register calls.
    MixedObjects,
    /// An empty range, named by its parameter.
    InvalidRange(&'static str),
    /// Labelled generation gave up before reaching the requested mix.
    Exhausted { attempts: u64 },
}

impl Display for GenError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::NoOperations => write!(f, "no operation kinds requested"),
            Self::MixedObjects => write!(f, "queue calls cannot be mixed with register calls"),
            Self::InvalidRange(name) => write!(f, "empty range for {name}"),
            Self::Exhausted { attempts } => {
                write!(f, "gave up after {attempts} attempts without the requested verdict mix")
            }
        }
    }
}

impl std::error::Error for GenError {}

/// A generated history with its provenance.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GeneratedHistory {
    params: HistParams,
    info: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    /// Verdict of the generic engine, for labelled corpora.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    linearizable: Option<bool>,
    data: History<u64>,
}

impl GeneratedHistory {
    #[must_use]
    pub const fn new(
        params: HistParams,
        info: String,
        start: DateTime<Local>,
        end: DateTime<Local>,
        data: History<u64>,
    ) -> Self {
        Self {
            params,
            info,
            start,
            end,
            linearizable: None,
            data,
        }
    }

    #[must_use]
    pub const fn with_verdict(mut self, linearizable: bool) -> Self {
        self.linearizable = Some(linearizable);
        self
    }

    #[must_use]
    pub const fn get_id(&self) -> u64 {
        self.params.id
    }

    #[must_use]
    pub const fn get_data(&self) -> &History<u64> {
        &self.data
    }

    #[must_use]
    pub const fn get_params(&self) -> &HistParams {
        &self.params
    }

    #[must_use]
    pub const fn get_verdict(&self) -> Option<bool> {
        self.linearizable
    }

    #[must_use]
    pub fn get_duration(&self) -> Duration {
        self.end - self.start
    }
}

fn range(name: &'static str, low: u64, high: u64) -> Result<Uniform<u64>, GenError> {
    Uniform::new_inclusive(low, high).map_err(|_| GenError::InvalidRange(name))
}

fn validate(params: &HistParams) -> Result<(), GenError> {
    if params.ops.is_empty() {
        return Err(GenError::NoOperations);
    }
    let queue = params.ops.contains(&OpMix::Queue);
    if queue && params.ops.iter().any(|op| *op != OpMix::Queue) {
        return Err(GenError::MixedObjects);
    }
    // a compare-and-swap needs two distinct values
    if params.ops.contains(&OpMix::Cas) && params.n_value == 0 {
        return Err(GenError::InvalidRange("n_value"));
    }
    if params.min_offset > params.max_offset {
        return Err(GenError::InvalidRange("offset"));
    }
    if params.min_duration > params.max_duration {
        return Err(GenError::InvalidRange("duration"));
    }
    Ok(())
}

/// Generate a single history of `n_call` calls spread over `n_thread`
/// threads.
///
/// # Timing
///
/// Each call is placed on a random thread, starting a random offset after
/// the previous call of that thread ended (or after time zero), and lasts a
/// random duration. Both are a whole number from the configured range plus
/// a random fraction, so calls of one thread never overlap while calls of
/// different threads interleave freely.
///
/// # Register calls
///
/// The first call touching a value stores it: a write for [`OpMix::Io`], a
/// successful compare-and-swap from another random value for
/// [`OpMix::Cas`]. Later calls on an already stored value observe it: a
/// read, or a failed compare-and-swap against it. Values are never written
/// twice, but nothing forces the reads to respect real time, so the result
/// may or may not be linearizable.
///
/// # Queue calls
///
/// Every enqueue uses a fresh element. A dequeue removes a random pending
/// element, not necessarily the oldest one.
///
/// # Errors
///
/// Returns a [`GenError`] if the parameters describe an empty range or mix
/// queue calls with register calls.
pub fn generate_single_history(params: &HistParams) -> Result<History<u64>, GenError> {
    validate(params)?;

    let mut random_generator = rand::rng();
    let thread_range = range("n_thread", 1, params.n_thread)?;
    let value_range = range("n_value", 0, params.n_value)?;
    let offset_range = range("offset", params.min_offset.into(), params.max_offset.into())?;
    let duration_range = range("duration", params.min_duration.into(), params.max_duration.into())?;

    let mut threads: BTreeMap<ThreadId, Vec<Call<u64>>> = BTreeMap::new();
    let mut stored: HashSet<u64> = HashSet::new();
    let mut pending: Vec<u64> = Vec::new();
    let mut next_element = 0u64;

    for _ in 0..params.n_call {
        let thread = thread_range.sample(&mut random_generator);
        let op = params.ops[random_generator.random_range(0..params.ops.len())];

        let calls = threads.entry(thread).or_default();
        let previous_end = calls.last().map_or(0.0, |call| call.end.0);
        let start = previous_end
            + whole(offset_range.sample(&mut random_generator))
            + random_generator.random::<f64>();
        let end = start
            + whole(duration_range.sample(&mut random_generator))
            + random_generator.random::<f64>();

        let call = match op {
            OpMix::Queue => match pending.len() {
                0 => enqueue_fresh(thread, &mut next_element, &mut pending, start, end),
                n if random_generator.random::<bool>() => {
                    let element = pending.swap_remove(random_generator.random_range(0..n));
                    Call::dequeue(thread, element, start, end)
                }
                _ => enqueue_fresh(thread, &mut next_element, &mut pending, start, end),
            },
            OpMix::Io | OpMix::Cas => {
                let value = value_range.sample(&mut random_generator);
                match (op, stored.contains(&value)) {
                    (OpMix::Io, true) => Call::read(thread, value, start, end),
                    (OpMix::Io, false) => {
                        stored.insert(value);
                        Call::write(thread, value, start, end)
                    }
                    (_, observed) => {
                        let other = loop {
                            let other = value_range.sample(&mut random_generator);
                            if other != value {
                                break other;
                            }
                        };
                        if observed {
                            Call::failed_cas(thread, value, other, start, end)
                        } else {
                            stored.insert(value);
                            stored.insert(other);
                            Call::cas(thread, other, value, start, end)
                        }
                    }
                }
            }
        };
        calls.push(call);
    }

    Ok(threads.into_values().flatten().collect())
}

fn whole(units: u64) -> f64 {
    u32::try_from(units).map_or(f64::from(u32::MAX), f64::from)
}

fn enqueue_fresh(
    thread: ThreadId,
    next_element: &mut u64,
    pending: &mut Vec<u64>,
    start: f64,
    end: f64,
) -> Call<u64> {
    let element = *next_element;
    *next_element += 1;
    pending.push(element);
    Call::enqueue(thread, element, start, end)
}

/// Generate `n_hist` histories in parallel, numbered from `params.id`.
///
/// # Errors
///
/// Returns a [`GenError`] if the parameters are invalid.
pub fn generate_mult_histories(
    n_hist: u64,
    params: &HistParams,
) -> Result<Vec<GeneratedHistory>, GenError> {
    validate(params)?;
    (0..n_hist)
        .into_par_iter()
        .map(|offset| {
            let params = HistParams {
                id: params.id + offset,
                ..params.clone()
            };
            let start_time = Local::now();
            let hist = generate_single_history(&params)?;
            let end_time = Local::now();
            Ok(GeneratedHistory::new(
                params,
                "generated".to_string(),
                start_time,
                end_time,
                hist,
            ))
        })
        .collect()
}

/// Generate `n_hist` histories of which `n_linearizable` are linearizable,
/// each labelled with the verdict of the generic engine.
///
/// Histories are drawn until both quotas are filled; surplus histories of
/// an already filled verdict are discarded.
///
/// # Errors
///
/// Returns a [`GenError`] if the parameters are invalid, or
/// [`GenError::Exhausted`] if a quota is still open after `max_attempts`
/// draws.
pub fn generate_labelled_histories(
    n_hist: u64,
    n_linearizable: u64,
    max_attempts: u64,
    params: &HistParams,
) -> Result<Vec<GeneratedHistory>, GenError> {
    validate(params)?;
    let n_linearizable = n_linearizable.min(n_hist);
    let n_violating = n_hist - n_linearizable;

    let mut labelled = Vec::new();
    let (mut passed, mut failed) = (0, 0);

    for attempt in 0..max_attempts {
        if passed == n_linearizable && failed == n_violating {
            return Ok(labelled);
        }
        let params = HistParams {
            id: params.id + passed + failed,
            ..params.clone()
        };
        let start_time = Local::now();
        let hist = generate_single_history(&params)?;
        let verdict = check(&hist, Engine::Generic).is_ok();
        let end_time = Local::now();

        let quota_open = if verdict {
            passed < n_linearizable
        } else {
            failed < n_violating
        };
        if !quota_open {
            continue;
        }
        if verdict {
            passed += 1;
        } else {
            failed += 1;
        }
        tracing::debug!(attempt, verdict, passed, failed, "labelled history");
        labelled.push(
            GeneratedHistory::new(params, "labelled".to_string(), start_time, end_time, hist)
                .with_verdict(verdict),
        );
    }

    if passed == n_linearizable && failed == n_violating {
        Ok(labelled)
    } else {
        Err(GenError::Exhausted {
            attempts: max_attempts,
        })
    }
}
