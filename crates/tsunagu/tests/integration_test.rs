use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tsunagu::prelude::*;
use tsunagu::{ErrorCode, PipelineOptions};

async fn prefix(input: String) -> Result<String, BoxError> {
    Ok(format!("a:{input}"))
}

async fn suffix(input: String) -> Result<String, BoxError> {
    Ok(format!("{input}:b"))
}

async fn boom(_input: String) -> Result<String, BoxError> {
    Err(std::io::Error::new(std::io::ErrorKind::Other, "boom").into())
}

async fn identity(input: String) -> Result<String, BoxError> {
    Ok(input)
}

/// Records every input it receives and counts invocations.
#[derive(Debug)]
struct Recorder {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Step<String> for Recorder {
    async fn execute(&self, input: String, ctx: &mut Context<String>) -> Result<String, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.insert("seen_input", input.clone());
        Ok(input)
    }

    fn name(&self) -> StepName {
        StepName::new("recorder")
    }
}

/// Runs a nested task on the same context and forwards its error.
#[derive(Debug)]
struct Nested {
    inner: Task<String>,
}

#[async_trait]
impl Step<String> for Nested {
    async fn execute(&self, input: String, ctx: &mut Context<String>) -> Result<String, BoxError> {
        let output = self.inner.run(input, ctx).await?;
        Ok(output.output)
    }

    fn name(&self) -> StepName {
        StepName::new("nested")
    }
}

/// Appends the statuses of the step log, as seen mid-run, to "observed".
#[derive(Debug)]
struct Observe;

#[async_trait]
impl Step<String> for Observe {
    async fn execute(&self, input: String, ctx: &mut Context<String>) -> Result<String, BoxError> {
        let statuses: Vec<StepStatus> = ctx.steps().iter().map(|r| r.status()).collect();
        match ctx.get_mut::<Vec<Vec<StepStatus>>>("observed") {
            Some(observed) => observed.push(statuses),
            None => ctx.insert("observed", vec![statuses]),
        }
        Ok(input)
    }

    fn name(&self) -> StepName {
        StepName::new("observe")
    }
}

#[tokio::test]
async fn test_task_threads_outputs() {
    let task = Task::new("wrap")
        .with_step(FnStep::new("prefix", prefix))
        .with_step(FnStep::new("suffix", suffix));

    let mut ctx = Context::new();
    let result = task
        .run("1".to_string(), &mut ctx)
        .await
        .expect("task succeeds");

    assert_eq!(result.output, "a:1:b");
    assert_eq!(ctx.steps().len(), 2);
    assert!(ctx
        .steps()
        .iter()
        .all(|r| r.status() == StepStatus::Success));
    assert_eq!(ctx.steps()[1].output(), Some(&result.output));
    assert_eq!(task.id(), "prefix.suffix");
}

#[tokio::test]
async fn test_records_open_up_front_and_finish_in_order() {
    let task = Task::new("watch").with_step(Observe).with_step(Observe);

    let mut ctx = Context::new();
    task.run("x".to_string(), &mut ctx)
        .await
        .expect("task succeeds");

    use StepStatus::{Pending, Success};
    assert_eq!(
        ctx.get::<Vec<Vec<StepStatus>>>("observed"),
        Some(&vec![vec![Pending, Pending], vec![Success, Pending]])
    );
    assert!(ctx.steps().iter().all(|r| r.status() == Success));
}

#[tokio::test]
async fn test_failing_step_aborts_task() {
    let task = Task::new("fragile")
        .with_step(FnStep::new("first", identity))
        .with_step(FnStep::new("boom", boom))
        .with_step(FnStep::new("last", identity));

    let mut ctx = Context::new();
    let error = task
        .run("x".to_string(), &mut ctx)
        .await
        .expect_err("task fails");

    assert_eq!(error.code(), ErrorCode::FallThrough);
    assert_eq!(error.errors().len(), 1);
    assert_eq!(error.errors()[0].to_string(), "boom");
    assert!(error.errors()[0].downcast_ref::<std::io::Error>().is_some());

    let steps = ctx.steps();
    assert_eq!(steps[0].status(), StepStatus::Success);
    assert_eq!(steps[1].status(), StepStatus::Failure);
    assert_eq!(
        steps.iter().filter(|r| r.status() == StepStatus::Failure).count(),
        1
    );
    assert_eq!(steps[2].status(), StepStatus::Pending);
    assert!(steps[2].input().is_none());

    let recorded = steps[1].error().expect("failure is recorded");
    assert!(Arc::ptr_eq(&recorded.errors()[0], &error.errors()[0]));
}

#[tokio::test]
async fn test_nested_task_error_passes_through() {
    let inner = Task::new("inner")
        .with_step(FnStep::new("ok", identity))
        .with_step(FnStep::new("boom", boom));
    let outer = Task::new("outer").with_step(Nested { inner });

    let mut ctx = Context::new();
    let error = outer
        .run("x".to_string(), &mut ctx)
        .await
        .expect_err("outer task fails");

    // The inner error is returned as is, not wrapped again.
    assert_eq!(error.task(), "inner");
    assert_eq!(error.step().as_str(), "boom");

    // Outer record first, then the inner task's records.
    let steps = ctx.steps();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].name().as_str(), "nested");
    assert_eq!(steps[0].status(), StepStatus::Failure);
    assert_eq!(steps[1].status(), StepStatus::Success);
    assert_eq!(steps[2].status(), StepStatus::Failure);

    // The handle still names the inner record, not the forwarding step's.
    assert_eq!(error.record().index(), 2);
    assert_eq!(steps.get(error.record()).map(|r| r.name().as_str()), Some("boom"));

    let outer_error = steps[0].error().expect("outer failure is recorded");
    assert!(Arc::ptr_eq(&outer_error.errors()[0], &error.errors()[0]));
}

#[tokio::test]
async fn test_pipeline_concatenates_step_logs() {
    let pipeline = Pipeline::builder("concat")
        .task(Task::new("first").with_step(FnStep::new("prefix", prefix)))
        .task(
            Task::new("second")
                .with_step(FnStep::new("suffix", suffix))
                .with_step(FnStep::new("same", identity)),
        )
        .build()
        .expect("valid pipeline");

    let result = pipeline
        .run("1".to_string(), ContextData::new().with("user", "ada".to_string()))
        .await
        .expect("pipeline succeeds");

    assert_eq!(result.output, "a:1:b");
    let names: Vec<String> = result
        .context
        .steps()
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    assert_eq!(names, vec!["prefix", "suffix", "same"]);
    assert_eq!(
        result.context.get::<String>("user").map(String::as_str),
        Some("ada")
    );
}

#[tokio::test]
async fn test_selector_shapes_task_input() {
    let calls = Arc::new(AtomicU32::new(0));
    let pipeline = Pipeline::builder("shout")
        .task(Task::new("hi").with_step(FnStep::new("hi", |_: String| async {
            Ok::<_, BoxError>("hi".to_string())
        })))
        .select(
            |out: String, _ctx: &Context<String>| out.to_uppercase(),
            Task::new("recorder").with_step(Recorder {
                calls: Arc::clone(&calls),
            }),
        )
        .build()
        .expect("valid pipeline");

    let result = pipeline
        .run("ignored".to_string(), ContextData::new())
        .await
        .expect("pipeline succeeds");

    assert_eq!(result.output, "HI");
    assert_eq!(
        result.context.get::<String>("seen_input").map(String::as_str),
        Some("HI")
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_task_stops_pipeline() {
    let calls = Arc::new(AtomicU32::new(0));
    let pipeline = Pipeline::builder("stops")
        .task(Task::new("ok").with_step(FnStep::new("same", identity)))
        .task(Task::new("bad").with_step(FnStep::new("boom", boom)))
        .task(Task::new("later").with_step(Recorder {
            calls: Arc::clone(&calls),
        }))
        .build()
        .expect("valid pipeline");

    let error = pipeline
        .run("x".to_string(), ContextData::new())
        .await
        .expect_err("pipeline fails");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(error.context().steps().len(), 2);
    assert_eq!(error.errors().len(), 1);
    assert_eq!(error.errors()[0].task(), "bad");

    let from_log: Vec<_> = error.context().steps().failures().collect();
    assert_eq!(from_log.len(), error.errors().len());
}

#[tokio::test]
async fn test_pipeline_error_collects_every_failed_record() {
    let inner = Task::new("inner").with_step(FnStep::new("boom", boom));
    let pipeline = Pipeline::builder("nested")
        .task(Task::new("outer").with_step(Nested { inner }))
        .build()
        .expect("valid pipeline");

    let error = pipeline
        .run("x".to_string(), ContextData::new())
        .await
        .expect_err("pipeline fails");

    // Both the outer and the inner record failed with the same error.
    assert_eq!(error.errors().len(), 2);
    assert!(error.errors().iter().all(|e| e.task() == "inner"));
}

#[tokio::test]
async fn test_pipeline_reused_across_runs() {
    let pipeline = Arc::new(
        Pipeline::builder("reused")
            .task(Task::new("wrap").with_step(FnStep::new("prefix", prefix)))
            .build()
            .expect("valid pipeline"),
    );

    let handles: Vec<_> = ["1", "2", "3"]
        .into_iter()
        .map(|input| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.run(input.to_string(), ContextData::new()).await })
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(["a:1", "a:2", "a:3"]) {
        let result = handle
            .await
            .expect("run completes")
            .expect("pipeline succeeds");
        assert_eq!(result.output, expected);
        assert_eq!(result.context.steps().len(), 1);
    }
}

#[test]
fn test_construction_guards() {
    let empty = Pipeline::<String>::try_from(PipelineOptions {
        name: "empty".to_string(),
        tasks: Vec::new(),
    });
    assert!(empty.err().is_some_and(|e| e.is_invalid_argument()));

    let mut task: Task<String> = Task::new("task");
    let pushed = task.push(std::iter::empty());
    assert!(pushed.err().is_some_and(|e| e.is_invalid_argument()));
}
