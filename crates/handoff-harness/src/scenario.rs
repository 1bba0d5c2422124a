//! The scenario catalog.
//!
//! Each scenario drives the host API, renders what it saw into a short
//! deterministic text, and pairs it with the text the contract requires.
//! Scenarios whose point is a fault catch that fault and render its contract
//! name; any other fault escapes as an error and fails the scenario.
//!
//! Several scenarios read deltas of the process-wide boundary metrics, so
//! scenarios never run concurrently with each other.

use parking_lot::Mutex;
use serde_json::json;

use handoff::guard::{GuardedCounter, observe_race, run_guarded_increment};
use handoff::marshal::{
    describe_by_reference, describe_by_value, describe_message, double_value, nudge_by_reference,
    nudge_by_value,
};
use handoff::{
    BoundaryError, CopyProbe, HandleState, OwnedObject, Record, counter_of, invoke_with_callback,
    invoke_without_callback, print_by_value, print_by_view, state_of,
};
use handoff_core::object::hello_line;
use handoff_membrane::global_metrics;

use crate::config::CorpusConfig;

/// What a scenario saw, next to what it should have seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub expected: String,
    pub actual: String,
    pub details: serde_json::Value,
}

impl Observation {
    fn new(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
            details: serde_json::Value::Null,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

type ScenarioFn = fn(&CorpusConfig) -> Result<Observation, BoundaryError>;

/// One entry of the corpus.
#[derive(Clone, Copy)]
pub struct Scenario {
    pub id: &'static str,
    /// Boundary component the scenario exercises.
    pub component: &'static str,
    pub summary: &'static str,
    run: ScenarioFn,
}

static SCENARIO_LOCK: Mutex<()> = Mutex::new(());

impl Scenario {
    pub fn run(&self, config: &CorpusConfig) -> Result<Observation, BoundaryError> {
        let _serial = SCENARIO_LOCK.lock();
        (self.run)(config)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("id", &self.id)
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

const MARSHAL: &str = "aggregate-marshal";
const CALLBACK: &str = "callback-dispatch";
const OWNERSHIP: &str = "ownership-transfer";
const GUARD: &str = "shared-state-guard";

static CATALOG: [Scenario; 15] = [
    Scenario {
        id: "double-value",
        component: MARSHAL,
        summary: "scalar doubled across the boundary, wrapping at i32 bounds",
        run: double_value_scenario,
    },
    Scenario {
        id: "record-by-value",
        component: MARSHAL,
        summary: "callee gets its own copy; its mutation is invisible to the caller",
        run: record_by_value,
    },
    Scenario {
        id: "record-by-reference",
        component: MARSHAL,
        summary: "callee reads and mutates the caller's storage",
        run: record_by_reference,
    },
    Scenario {
        id: "string-marshal",
        component: MARSHAL,
        summary: "text crosses as a C string; interior NUL is rejected",
        run: string_marshal,
    },
    Scenario {
        id: "callback-once",
        component: CALLBACK,
        summary: "native code calls the host closure exactly once with 42",
        run: callback_once,
    },
    Scenario {
        id: "callback-missing",
        component: CALLBACK,
        summary: "a null callback is a contract violation, never a silent no-op",
        run: callback_missing,
    },
    Scenario {
        id: "owned-lifecycle",
        component: OWNERSHIP,
        summary: "create, mutate, greet, release; destroyed exactly once",
        run: owned_lifecycle,
    },
    Scenario {
        id: "construction-callback",
        component: OWNERSHIP,
        summary: "construction hook runs once before the token exists",
        run: construction_callback,
    },
    Scenario {
        id: "construction-rollback",
        component: OWNERSHIP,
        summary: "a failing construction hook destroys the object and mints nothing",
        run: construction_rollback,
    },
    Scenario {
        id: "dangling-reference",
        component: OWNERSHIP,
        summary: "a handle copied before release faults instead of reading freed state",
        run: dangling_reference,
    },
    Scenario {
        id: "ownership-handoff",
        component: OWNERSHIP,
        summary: "ownership moves to native code and back exactly once",
        run: ownership_handoff,
    },
    Scenario {
        id: "guarded-counter",
        component: GUARD,
        summary: "locked increments from every worker sum exactly",
        run: guarded_counter,
    },
    Scenario {
        id: "unguarded-race",
        component: GUARD,
        summary: "unlocked increments lose updates but stay within (0, N*M]",
        run: unguarded_race,
    },
    Scenario {
        id: "partial-guard",
        component: GUARD,
        summary: "an unlocked path to guarded state cannot be written; the locked path is exact",
        run: partial_guard,
    },
    Scenario {
        id: "unwanted-copy",
        component: MARSHAL,
        summary: "views never copy; copies appear only where `.clone()` is written",
        run: unwanted_copy,
    },
];

/// Every scenario, in catalog order.
#[must_use]
pub fn catalog() -> &'static [Scenario] {
    &CATALOG
}

#[must_use]
pub fn find(id: &str) -> Option<&'static Scenario> {
    CATALOG.iter().find(|s| s.id == id)
}

fn fault_name(result: Result<impl Sized, BoundaryError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(err) => err.contract(),
    }
}

fn double_value_scenario(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let inputs = [0, 21, -21, i32::MAX, i32::MIN];
    let render = |f: &dyn Fn(i32) -> i32| {
        inputs
            .iter()
            .map(|&x| format!("{x}->{}", f(x)))
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Observation::new(
        render(&|x: i32| x.wrapping_mul(2)),
        render(&double_value),
    ))
}

fn record_by_value(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let original = Record::new(1, 2);
    let text = describe_by_value(original)?;
    let copy = nudge_by_value(original);
    Ok(Observation::new(
        "record by value: x=1, y=2\ncaller x=1\ncallee x=2",
        format!("{text}\ncaller x={}\ncallee x={}", original.x, copy.x),
    ))
}

fn record_by_reference(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let mut record = Record::new(1, 2);
    let text = describe_by_reference(&record)?;
    nudge_by_reference(&mut record)?;
    Ok(Observation::new(
        "record by reference: x=1, y=2\ncaller x=2",
        format!("{text}\ncaller x={}", record.x),
    ))
}

fn string_marshal(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let text = describe_message("Hello World")?;
    let nul = fault_name(describe_message("Hello\0World"));
    Ok(Observation::new(
        "message from native: Hello World\ninterior NUL: contract-violation",
        format!("{text}\ninterior NUL: {nul}"),
    ))
}

fn callback_once(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let mut seen = Vec::new();
    invoke_with_callback(|value| seen.push(value))?;
    Ok(Observation::new("calls=1 value=42", {
        let value = seen.first().map_or_else(|| "none".into(), i32::to_string);
        format!("calls={} value={value}", seen.len())
    }))
}

fn callback_missing(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let before = global_metrics().snapshot();
    let outcome = fault_name(invoke_without_callback());
    let delta = global_metrics().snapshot().since(&before);
    Ok(Observation::new(
        "contract-violation dispatched=0",
        format!("{outcome} dispatched={}", delta.callbacks_dispatched),
    ))
}

fn owned_lifecycle(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let before = global_metrics().snapshot();

    let mut obj = OwnedObject::create()?;
    let initial = obj.counter()?;
    obj.set_counter(5)?;
    let lines = obj.say_hello()?;
    obj.release()?;

    let delta = global_metrics().snapshot().since(&before);
    let expected_lines: Vec<String> = (0..5).map(hello_line).collect();
    Ok(Observation::new(
        format!("counter=1\n{}\ncreated=1 destroyed=1", expected_lines.join("\n")),
        format!(
            "counter={initial}\n{}\ncreated={} destroyed={}",
            lines.join("\n"),
            delta.objects_created,
            delta.objects_destroyed
        ),
    ))
}

fn construction_callback(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let mut seen = Vec::new();
    let obj = OwnedObject::create_with(|value| seen.push(value))?;
    let counter = obj.counter()?;
    obj.release()?;
    Ok(Observation::new(
        "hook calls=[42] counter=1",
        format!("hook calls={seen:?} counter={counter}"),
    ))
}

fn construction_rollback(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let before = global_metrics().snapshot();
    let mut calls = 0;
    let outcome = fault_name(OwnedObject::try_create_with(|_| {
        calls += 1;
        false
    }));
    let delta = global_metrics().snapshot().since(&before);
    Ok(Observation::new(
        "callback-failed calls=1 created=1 destroyed=1",
        format!(
            "{outcome} calls={calls} created={} destroyed={}",
            delta.objects_created, delta.objects_destroyed
        ),
    )
    .with_details(json!({ "live_delta": delta.live_objects() })))
}

fn dangling_reference(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let obj = OwnedObject::create()?;
    let copied = obj.handle();
    obj.release()?;

    // The token is gone; only the copied handle remains, and it is stale.
    let state = match state_of(copied) {
        HandleState::Released => "released",
        HandleState::Live { .. } => "live",
        HandleState::Unknown => "unknown",
    };
    let read = fault_name(counter_of(copied));
    Ok(Observation::new(
        "state=released read=use-after-release",
        format!("state={state} read={read}"),
    )
    .with_details(json!({ "handle": copied.to_string() })))
}

fn ownership_handoff(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let mut obj = OwnedObject::create()?;
    obj.set_counter(3)?;
    let handle = obj.into_raw()?;
    let native_counter = counter_of(handle)?;

    let back = OwnedObject::from_raw(handle)?;
    let second = fault_name(OwnedObject::from_raw(handle));
    let counter = back.counter()?;
    drop(back);
    let after_drop = fault_name(counter_of(handle));

    Ok(Observation::new(
        "native counter=3\nreclaimed counter=3\nsecond reclaim=ownership-conflict\n\
         after drop=use-after-release",
        format!(
            "native counter={native_counter}\nreclaimed counter={counter}\n\
             second reclaim={second}\nafter drop={after_drop}"
        ),
    ))
}

fn guarded_counter(config: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let total = run_guarded_increment(config.threads, config.per_thread)?;
    Ok(Observation::new(
        config.expected_total().to_string(),
        total.to_string(),
    ))
}

fn unguarded_race(config: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let mut observations = Vec::new();
    for _ in 0..config.race_trials.max(1) {
        observations.push(observe_race(config.threads, config.per_thread)?);
    }
    let out_of_bounds = observations.iter().filter(|o| !o.within_bounds()).count();
    let trials: Vec<_> = observations
        .iter()
        .map(|o| json!({ "observed": o.observed, "lost_updates": o.lost_updates() }))
        .collect();
    Ok(Observation::new(
        "out of bounds trials=0",
        format!("out of bounds trials={out_of_bounds}"),
    )
    .with_details(json!({
        "expected_upper_bound": config.expected_total(),
        "trials": trials,
    })))
}

fn partial_guard(config: &CorpusConfig) -> Result<Observation, BoundaryError> {
    // A path that bumps the value without the lock cannot be written against
    // `GuardedCounter`, so only the locked path runs.
    let counter = GuardedCounter::new();
    std::thread::scope(|scope| {
        for _ in 0..config.threads {
            scope.spawn(|| {
                for _ in 0..config.per_thread {
                    counter.update(|v| *v += 1);
                }
            });
        }
    });
    Ok(Observation::new(
        config.expected_total().to_string(),
        counter.get().to_string(),
    ))
}

fn unwanted_copy(_: &CorpusConfig) -> Result<Observation, BoundaryError> {
    let probe = CopyProbe::new("Hello World");
    let viewed = print_by_view(&probe);
    let after_view = probe.copies();
    let cloned = print_by_value(probe.clone());
    Ok(Observation::new(
        "Hello World copies=0\nHello World copies=1",
        format!(
            "{viewed} copies={after_view}\n{cloned} copies={}",
            probe.copies()
        ),
    ))
}
