//! Two-task text pipeline with a tool step and a selector.
//!
//! Demonstrates:
//! - Closure and struct steps reading application data from the context
//! - Plugging a described tool into a task
//! - Reshaping the value between tasks with a selector
//! - Inspecting the step log after success and after failure

use async_trait::async_trait;
use tsunagu::prelude::*;

#[derive(Debug)]
struct Normalize;

#[async_trait]
impl Step<String> for Normalize {
    async fn execute(&self, input: String, _ctx: &mut Context<String>) -> Result<String, BoxError> {
        Ok(input.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn name(&self) -> StepName {
        StepName::new("normalize")
    }
}

#[derive(Debug)]
struct Sign;

#[async_trait]
impl Step<String> for Sign {
    async fn execute(&self, input: String, ctx: &mut Context<String>) -> Result<String, BoxError> {
        let author = ctx
            .get::<String>("author")
            .ok_or("author missing from context")?;
        Ok(format!("{input} -- {author}"))
    }

    fn name(&self) -> StepName {
        StepName::new("sign")
    }
}

#[derive(Debug)]
struct WordLimit {
    metadata: ToolMetadata,
    limit: usize,
}

#[async_trait]
impl Tool<String> for WordLimit {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, input: String, _ctx: &mut Context<String>) -> Result<String, BoxError> {
        let words = input.split_whitespace().count();
        if words > self.limit {
            return Err(format!("{words} words, limit is {}", self.limit).into());
        }
        Ok(input)
    }
}

fn word_limit(limit: usize) -> ToolStep<WordLimit> {
    ToolStep::new(WordLimit {
        metadata: ToolMetadata::new("text.word-limit", "word-limit")
            .with_keywords(["text", "validation"])
            .with_spec("String -> String, fails above the word limit"),
        limit,
    })
}

fn print_log(ctx: &Context<String>) {
    for (i, record) in ctx.steps().iter().enumerate() {
        println!(
            "  #{i} {:<12} {:?} input={:?} output={:?}",
            record.name().as_str(),
            record.status(),
            record.input(),
            record.output()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let clean = Task::new("clean")
        .with_step(Normalize)
        .with_step(word_limit(8));
    let publish = Task::new("publish").with_step(Sign);

    let pipeline = Pipeline::builder("publish-note")
        .task(clean)
        .select(
            |text: String, _ctx: &Context<String>| text.to_uppercase(),
            publish,
        )
        .build()?;

    let data = ContextData::new().with("author", "ada".to_string());
    let result = pipeline
        .run("  spin   the   thread ".to_string(), data)
        .await?;
    println!("Pipeline output: {}", result.output);
    print_log(&result.context);

    let data = ContextData::new().with("author", "ada".to_string());
    match pipeline
        .run("one two three four five six seven eight nine".to_string(), data)
        .await
    {
        Ok(result) => println!("Unexpected success: {}", result.output),
        Err(error) => {
            eprintln!("Pipeline failed: {}", error);
            for task_error in error.errors() {
                eprintln!("  {}", task_error);
            }
            print_log(error.context());
        }
    }

    Ok(())
}
