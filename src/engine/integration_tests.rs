// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end engine scenarios: phases, caching, halts, fault handling,
//! cancellation, and the concurrency modes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

use crate::context::{EngineContext, HaltScope};
use crate::engine::{Engine, EngineOptions};
use crate::errors::{DependencyError, EngineError};
use crate::handler::{Disposition, FaultContext, HaltItemOnFault, Ignore};
use crate::rules::{CachePolicy, PostRule, PostRuleFn, Rule, RuleFault, RuleFn};

fn rule<I, O>(rule: RuleFn<I, O>) -> Arc<dyn Rule<I, O>>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    Arc::new(rule)
}

fn post<O>(rule: PostRuleFn<O>) -> Arc<dyn PostRule<O>>
where
    O: Send + Sync + 'static,
{
    Arc::new(rule)
}

fn items(n: u32) -> Vec<Arc<u32>> {
    (0..n).map(Arc::new).collect()
}

// RUST_LOG=rulewright=debug cargo test -- --nocapture
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Buffer-backed writer for asserting on emitted log lines.
#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl LogSink {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_subscriber(sink: &LogSink) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish()
}

#[tokio::test]
async fn rules_execute_in_dependency_order_regardless_of_declaration() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let record = |name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>| {
        let log = log.clone();
        move |_: &EngineContext, _: &u32, _: &()| {
            log.lock().unwrap().push(name);
            Ok(())
        }
    };

    // Declared c, a, b; dependencies force a, b, c.
    let engine: Engine<u32> = Engine::new(vec![
        rule(RuleFn::new("c", record("c", &order)).with_dependencies(["b"])),
        rule(RuleFn::new("a", record("a", &order))),
        rule(RuleFn::new("b", record("b", &order)).with_dependencies(["a"])),
    ])
    .unwrap();

    engine
        .apply(Arc::new(1), Arc::new(()), None, None)
        .await
        .unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn three_phases_flow_into_a_shared_output() {
    struct Order {
        amount: u32,
    }
    struct Totals {
        sum: Mutex<u32>,
        published: AtomicBool,
    }

    let pre = vec![rule(RuleFn::new(
        "validate",
        |_: &EngineContext, order: &Order, _: &Totals| {
            if order.amount == 0 {
                return Err(RuleFault::halt_item("zero-amount order"));
            }
            Ok(())
        },
    ))];
    let main = vec![rule(RuleFn::new(
        "accumulate",
        |_: &EngineContext, order: &Order, totals: &Totals| {
            *totals.sum.lock().unwrap() += order.amount;
            Ok(())
        },
    ))];
    let post_rules = vec![post(PostRuleFn::new(
        "publish",
        |_: &EngineContext, totals: &Totals| {
            totals.published.store(true, Ordering::SeqCst);
            Ok(())
        },
    ))];

    let engine = Engine::with_phases(pre, main, post_rules, EngineOptions::serial()).unwrap();
    let totals = Arc::new(Totals {
        sum: Mutex::new(0),
        published: AtomicBool::new(false),
    });
    let orders = [5u32, 0, 7]
        .into_iter()
        .map(|amount| Arc::new(Order { amount }))
        .collect();

    let ctx = engine.apply_many(orders, totals.clone(), None, None).await.unwrap();

    // The zero-amount order was halted before the main phase touched it.
    assert_eq!(*totals.sum.lock().unwrap(), 12);
    assert!(totals.published.load(Ordering::SeqCst));
    assert_eq!(ctx.last_halt().unwrap().scope, HaltScope::Item);
}

#[tokio::test]
async fn per_execution_cache_evaluates_the_predicate_once_per_run() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let applications = Arc::new(AtomicUsize::new(0));

    let counter = evaluations.clone();
    let hits = applications.clone();
    let engine: Engine<u32> = Engine::new(vec![rule(
        RuleFn::new("gated", move |_: &EngineContext, _: &u32, _: &()| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .with_predicate(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        })
        .with_cache(CachePolicy::per_execution()),
    )])
    .unwrap();

    engine.apply_many(items(4), Arc::new(()), None, None).await.unwrap();

    assert_eq!(evaluations.load(Ordering::SeqCst), 1);
    assert_eq!(applications.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn per_input_cache_is_shared_across_rules_with_one_key() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let applications = Arc::new(AtomicUsize::new(0));

    let gate = |evals: &Arc<AtomicUsize>| {
        let evals = evals.clone();
        move |_: &EngineContext, _: &u32, _: &()| {
            evals.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    };
    let act = |apps: &Arc<AtomicUsize>| {
        let apps = apps.clone();
        move |_: &EngineContext, _: &u32, _: &()| {
            apps.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    };

    let engine: Engine<u32> = Engine::new(vec![
        rule(
            RuleFn::new("first", act(&applications))
                .with_predicate(gate(&evaluations))
                .with_cache(CachePolicy::per_input().with_key("eligible")),
        ),
        rule(
            RuleFn::new("second", act(&applications))
                .with_predicate(gate(&evaluations))
                .with_cache(CachePolicy::per_input().with_key("eligible"))
                .with_dependencies(["first"]),
        ),
    ])
    .unwrap();

    engine.apply_many(items(3), Arc::new(()), None, None).await.unwrap();

    // One evaluation per item, no matter how many rules share the key.
    assert_eq!(evaluations.load(Ordering::SeqCst), 3);
    assert_eq!(applications.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn item_halt_skips_the_item_but_not_the_run() {
    let processed = Arc::new(AtomicUsize::new(0));
    let published = Arc::new(AtomicBool::new(false));

    let counter = processed.clone();
    let flag = published.clone();
    let engine: Engine<u32> = Engine::with_phases(
        Vec::new(),
        vec![
            rule(RuleFn::new("screen", |_: &EngineContext, input: &u32, _: &()| {
                if input % 2 == 1 {
                    return Err(RuleFault::halt_item("odd item"));
                }
                Ok(())
            })),
            rule(
                RuleFn::new("work", move |_: &EngineContext, _: &u32, _: &()| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .with_dependencies(["screen"]),
            ),
        ],
        vec![post(PostRuleFn::new("publish", move |_: &EngineContext, _: &()| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }))],
        EngineOptions::serial(),
    )
    .unwrap();

    let ctx = engine.apply_many(items(6), Arc::new(()), None, None).await.unwrap();

    assert_eq!(processed.load(Ordering::SeqCst), 3);
    assert!(published.load(Ordering::SeqCst));
    let halt = ctx.last_halt().unwrap();
    assert_eq!(halt.scope, HaltScope::Item);
    assert_eq!(halt.rule, "screen");
    assert_eq!(halt.item, Some(5));
}

#[tokio::test]
async fn engine_halt_abandons_remaining_items_and_post() {
    let processed = Arc::new(AtomicUsize::new(0));
    let published = Arc::new(AtomicBool::new(false));

    let counter = processed.clone();
    let flag = published.clone();
    let engine: Engine<u32> = Engine::with_phases(
        Vec::new(),
        vec![
            rule(RuleFn::new("gate", |_: &EngineContext, input: &u32, _: &()| {
                if *input == 2 {
                    return Err(RuleFault::halt_engine("budget exhausted"));
                }
                Ok(())
            })),
            rule(
                RuleFn::new("work", move |_: &EngineContext, _: &u32, _: &()| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .with_dependencies(["gate"]),
            ),
        ],
        vec![post(PostRuleFn::new("publish", move |_: &EngineContext, _: &()| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }))],
        EngineOptions::serial(),
    )
    .unwrap();

    let ctx = engine.apply_many(items(6), Arc::new(()), None, None).await.unwrap();

    assert_eq!(processed.load(Ordering::SeqCst), 2);
    assert!(!published.load(Ordering::SeqCst));
    let halt = ctx.last_halt().unwrap();
    assert_eq!(halt.scope, HaltScope::Engine);
    assert_eq!(halt.rule, "gate");
    assert_eq!(halt.item, Some(2));
}

#[tokio::test]
async fn default_handler_propagates_rule_failures() {
    let engine: Engine<u32> = Engine::new(vec![rule(RuleFn::new(
        "flaky",
        |_: &EngineContext, _: &u32, _: &()| Err(anyhow::anyhow!("downstream offline").into()),
    ))])
    .unwrap();

    let outcome = engine.apply(Arc::new(1), Arc::new(()), None, None).await;

    match outcome {
        Err(EngineError::RuleFailed { rule, .. }) => assert_eq!(rule, "flaky"),
        other => panic!("expected a rule failure, got {other:?}"),
    }
}

#[tokio::test]
async fn ignore_handler_treats_faults_as_skips() {
    let reached = Arc::new(AtomicUsize::new(0));

    let counter = reached.clone();
    let engine: Engine<u32> = Engine::new(vec![
        rule(RuleFn::new("flaky", |_: &EngineContext, _: &u32, _: &()| {
            Err(anyhow::anyhow!("downstream offline").into())
        })),
        rule(
            RuleFn::new("after", move |_: &EngineContext, _: &u32, _: &()| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with_dependencies(["flaky"]),
        ),
    ])
    .unwrap()
    .with_handler(Arc::new(Ignore));

    let ctx = engine.apply(Arc::new(1), Arc::new(()), None, None).await.unwrap();

    assert_eq!(reached.load(Ordering::SeqCst), 1);
    assert!(ctx.last_halt().is_none());
}

#[tokio::test]
async fn escalating_handler_turns_a_fault_into_an_item_halt() {
    let processed = Arc::new(AtomicUsize::new(0));

    let counter = processed.clone();
    let engine: Engine<u32> = Engine::new(vec![
        rule(RuleFn::new("flaky", |_: &EngineContext, input: &u32, _: &()| {
            if *input == 1 {
                return Err(anyhow::anyhow!("record corrupted").into());
            }
            Ok(())
        })),
        rule(
            RuleFn::new("work", move |_: &EngineContext, _: &u32, _: &()| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with_dependencies(["flaky"]),
        ),
    ])
    .unwrap()
    .with_handler(Arc::new(HaltItemOnFault));

    let ctx = engine.apply_many(items(3), Arc::new(()), None, None).await.unwrap();

    assert_eq!(processed.load(Ordering::SeqCst), 2);
    let halt = ctx.last_halt().unwrap();
    assert_eq!(halt.scope, HaltScope::Item);
    assert_eq!(halt.item, Some(1));
    assert!(halt.source.is_some());
}

#[tokio::test]
async fn closure_handlers_can_classify_by_error_content() {
    let engine: Engine<u32> = Engine::new(vec![rule(RuleFn::new(
        "meter",
        |_: &EngineContext, _: &u32, _: &()| Err(anyhow::anyhow!("fatal overload").into()),
    ))])
    .unwrap()
    .with_handler(Arc::new(|fault: FaultContext<'_>| {
        if fault.error.to_string().contains("fatal") {
            Disposition::HaltEngine
        } else {
            Disposition::Handled
        }
    }));

    let ctx = engine.apply_many(items(4), Arc::new(()), None, None).await.unwrap();

    let halt = ctx.last_halt().unwrap();
    assert_eq!(halt.scope, HaltScope::Engine);
    assert!(halt.source.is_some());
}

#[tokio::test]
async fn external_cancellation_surfaces_as_an_error() {
    init_tracing();
    let engine: Engine<u32> = Engine::new(vec![rule(RuleFn::new_async(
        "patient",
        |ctx: &EngineContext, _: &u32, _: &()| {
            let stop = ctx.cancellation();
            Box::pin(async move {
                tokio::select! {
                    _ = stop.cancelled() => {}
                    _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                }
                Ok(())
            })
        },
    ))])
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = engine
        .apply_many(items(3), Arc::new(()), None, Some(cancel))
        .await;

    assert!(matches!(outcome, Err(EngineError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn parallel_engine_halt_interrupts_sibling_rules_promptly() {
    init_tracing();
    let ground_out = Arc::new(AtomicBool::new(false));

    let flag = ground_out.clone();
    let main: Vec<Arc<dyn Rule<u32>>> = vec![
        rule(RuleFn::new_async(
            "tripwire",
            |_: &EngineContext, _: &u32, _: &()| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Err(RuleFault::halt_engine("limit reached"))
                })
            },
        )),
        rule(RuleFn::new_async(
            "grinder",
            move |ctx: &EngineContext, _: &u32, _: &()| {
                let stop = ctx.cancellation();
                let flag = flag.clone();
                Box::pin(async move {
                    tokio::select! {
                        _ = stop.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_millis(1000)) => {
                            flag.store(true, Ordering::SeqCst);
                        }
                    }
                    Ok(())
                })
            },
        )),
    ];

    let mut options = EngineOptions::parallel_rules();
    options.max_concurrency = 4;
    let engine = Engine::with_phases(Vec::new(), main, Vec::new(), options).unwrap();

    let started = Instant::now();
    let ctx = engine.apply(Arc::new(1), Arc::new(()), None, None).await.unwrap();

    // The halt at 100ms must not wait out the sibling's full 1000ms sleep.
    assert!(started.elapsed() < Duration::from_millis(600));
    assert!(!ground_out.load(Ordering::SeqCst));
    assert_eq!(ctx.last_halt().unwrap().scope, HaltScope::Engine);
}

#[tokio::test]
async fn fully_parallel_engine_halt_abandons_the_batch_and_post() {
    init_tracing();
    let slow_done = Arc::new(AtomicBool::new(false));
    let published = Arc::new(AtomicBool::new(false));
    let pulled = Arc::new(AtomicUsize::new(0));

    let done = slow_done.clone();
    let main: Vec<Arc<dyn Rule<u32>>> = vec![
        rule(RuleFn::new_async(
            "gate",
            move |ctx: &EngineContext, input: &u32, _: &()| {
                let stop = ctx.cancellation();
                let done = done.clone();
                let value = *input;
                Box::pin(async move {
                    if value == 0 {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        return Err(RuleFault::halt_engine("batch rejected"));
                    }
                    tokio::select! {
                        _ = stop.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_secs(5)) => {
                            done.store(true, Ordering::SeqCst);
                        }
                    }
                    Ok(())
                })
            },
        )),
        rule(RuleFn::new("tally", |_: &EngineContext, _: &u32, _: &()| Ok(()))),
    ];
    let flag = published.clone();
    let post_rules = vec![post(PostRuleFn::new("publish", move |_: &EngineContext, _: &()| {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    }))];

    let counter = pulled.clone();
    let source = futures::stream::iter((0..16u32).map(move |i| {
        counter.fetch_add(1, Ordering::SeqCst);
        Arc::new(i)
    }));

    let mut options = EngineOptions::fully_parallel();
    options.max_concurrency = 4;
    let engine = Engine::with_phases(Vec::new(), main, post_rules, options).unwrap();

    let started = Instant::now();
    let ctx = engine
        .apply_stream(source, Arc::new(()), None, None)
        .await
        .unwrap();

    let halt = ctx.last_halt().unwrap();
    assert_eq!(halt.scope, HaltScope::Engine);
    assert_eq!(halt.rule, "gate");
    assert_eq!(halt.item, Some(0));
    // Post skipped, in-flight siblings interrupted, unseen items never pulled.
    assert!(!published.load(Ordering::SeqCst));
    assert!(!slow_done.load(Ordering::SeqCst));
    assert!(pulled.load(Ordering::SeqCst) < 16);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn sibling_engine_halt_marks_in_flight_items_abandoned() {
    let sink = LogSink::default();

    let main: Vec<Arc<dyn Rule<u32>>> = vec![rule(RuleFn::new_async(
        "gate",
        |ctx: &EngineContext, input: &u32, _: &()| {
            let stop = ctx.cancellation();
            let value = *input;
            Box::pin(async move {
                if value == 0 {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    return Err(RuleFault::halt_engine("first item decides"));
                }
                stop.cancelled().await;
                Ok(())
            })
        },
    ))];
    let mut options = EngineOptions::parallel_items();
    options.max_concurrency = 2;
    let engine = Engine::with_phases(Vec::new(), main, Vec::new(), options).unwrap();

    let ctx = engine
        .apply_many(items(2), Arc::new(()), None, None)
        .with_subscriber(capture_subscriber(&sink))
        .await
        .unwrap();

    assert_eq!(ctx.last_halt().unwrap().scope, HaltScope::Engine);
    let output = sink.contents();
    assert!(output.contains("item 1 entered state abandoned"));
    assert!(!output.contains("item 1 entered state completed"));
}

#[tokio::test]
async fn engine_halted_runs_log_the_halt_and_no_completion() {
    let sink = LogSink::default();

    let engine: Engine<u32> = Engine::new(vec![rule(RuleFn::new(
        "gate",
        |_: &EngineContext, _: &u32, _: &()| Err(RuleFault::halt_engine("shut it down")),
    ))])
    .unwrap();

    engine
        .apply(Arc::new(1), Arc::new(()), None, None)
        .with_subscriber(capture_subscriber(&sink))
        .await
        .unwrap();

    let output = sink.contents();
    assert!(output.contains("engine halt from rule 'gate'"));
    assert!(!output.contains("completed"));
}

#[tokio::test]
async fn streamed_items_stop_being_pulled_after_an_engine_halt() {
    let pulled = Arc::new(AtomicUsize::new(0));

    let counter = pulled.clone();
    let source = futures::stream::iter((0..100u32).map(move |i| {
        counter.fetch_add(1, Ordering::SeqCst);
        Arc::new(i)
    }));

    let engine: Engine<u32> = Engine::new(vec![rule(RuleFn::new(
        "gate",
        |_: &EngineContext, input: &u32, _: &()| {
            if *input == 1 {
                return Err(RuleFault::halt_engine("second item is enough"));
            }
            Ok(())
        },
    ))])
    .unwrap();

    let ctx = engine
        .apply_stream(source, Arc::new(()), None, None)
        .await
        .unwrap();

    assert_eq!(pulled.load(Ordering::SeqCst), 2);
    assert_eq!(ctx.last_halt().unwrap().scope, HaltScope::Engine);
}

#[tokio::test]
async fn parallel_items_process_the_whole_batch() {
    let processed = Arc::new(AtomicUsize::new(0));

    let counter = processed.clone();
    let main = vec![rule(RuleFn::new_async(
        "tally",
        move |_: &EngineContext, _: &u32, _: &()| {
            let counter = counter.clone();
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        },
    ))];
    let engine =
        Engine::with_phases(Vec::new(), main, Vec::new(), EngineOptions::parallel_items())
            .unwrap();

    let ctx = engine.apply_many(items(32), Arc::new(()), None, None).await.unwrap();

    assert_eq!(processed.load(Ordering::SeqCst), 32);
    assert!(ctx.last_halt().is_none());
}

#[tokio::test]
async fn an_engine_is_reusable_across_runs() {
    let applied = Arc::new(AtomicUsize::new(0));

    let counter = applied.clone();
    let engine: Engine<u32> = Engine::new(vec![rule(RuleFn::new(
        "tally",
        move |_: &EngineContext, _: &u32, _: &()| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    ))])
    .unwrap();

    let first = engine.apply_many(items(3), Arc::new(()), None, None).await.unwrap();
    let second = engine.apply_many(items(3), Arc::new(()), None, None).await.unwrap();

    assert_eq!(applied.load(Ordering::SeqCst), 6);
    assert_ne!(first.trace_id(), second.trace_id());
}

#[test]
fn cyclic_dependencies_prevent_construction() {
    let outcome: Result<Engine<u32>, _> = Engine::new(vec![
        rule(RuleFn::new("a", |_: &EngineContext, _: &u32, _: &()| Ok(())).with_dependencies(["b"])),
        rule(RuleFn::new("b", |_: &EngineContext, _: &u32, _: &()| Ok(())).with_dependencies(["a"])),
    ]);

    assert!(matches!(
        outcome,
        Err(DependencyError::CyclicDependency { .. })
    ));
}

#[test]
fn unresolved_dependencies_prevent_construction() {
    let outcome: Result<Engine<u32>, _> = Engine::new(vec![rule(
        RuleFn::new("a", |_: &EngineContext, _: &u32, _: &()| Ok(())).with_dependencies(["ghost"]),
    )]);

    match outcome.err() {
        Some(DependencyError::UnresolvedDependency { rule, token }) => {
            assert_eq!(rule, "a");
            assert_eq!(token, "ghost");
        }
        other => panic!("expected an unresolved dependency, got {other:?}"),
    }
}

#[tokio::test]
async fn post_halt_still_concludes_the_run_cleanly() {
    let engine: Engine<u32> = Engine::with_phases(
        Vec::new(),
        vec![rule(RuleFn::new("noop", |_: &EngineContext, _: &u32, _: &()| Ok(())))],
        vec![post(PostRuleFn::new("audit", |_: &EngineContext, _: &()| {
            Err(RuleFault::halt_engine("audit rejected the batch"))
        }))],
        EngineOptions::serial(),
    )
    .unwrap();

    let ctx = engine.apply_many(items(2), Arc::new(()), None, None).await.unwrap();

    let halt = ctx.last_halt().unwrap();
    assert_eq!(halt.scope, HaltScope::Engine);
    assert_eq!(halt.rule, "audit");
    assert_eq!(halt.item, None);
}
