//! Scripted walk through the demo workflow, printing each screen.
//!
//! Configure with `ARBOR_CONFIG=path/to/arbor.toml` or the `ARBOR_*`
//! environment overrides; `RUST_LOG` controls log output.

use anyhow::Context;
use arbor::core::telemetry::init_tracing;
use arbor::prelude::*;
use hello_arbor::{DemoWorkflow, Punctuation};

type Host = WorkflowHost<DemoWorkflow>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RuntimeConfig::load().context("loading runtime configuration")?;
    init_tracing(&config.log)?;

    let mut host = WorkflowHost::with_config(
        DemoWorkflow {
            name: "Arbor".to_string(),
        },
        Hints::new(),
        &config,
    );
    println!("{}", host.rendering());

    println!("-- tap title");
    host.rendering().tap_title()?;
    step(&mut host).await?;

    println!("-- subscribe to the timer");
    host.rendering().tap_subscribe()?;
    step(&mut host).await?;
    step(&mut host).await?;
    step(&mut host).await?;

    println!("-- stop the timer");
    host.rendering().tap_subscribe()?;
    step(&mut host).await?;

    println!("-- refresh");
    host.rendering().tap_refresh()?;
    step(&mut host).await?;
    step(&mut host).await?;

    println!("-- ask politely");
    host.update_hints(Hints::new().with::<Punctuation>("?".to_string()));
    println!("{}", host.rendering());

    println!("{}", serde_json::to_string_pretty(&host.snapshot())?);
    if let Some(timeline) = host.timeline() {
        tracing::info!(events = timeline.len(), "timeline recorded");
    }

    host.shutdown();
    Ok(())
}

async fn step(host: &mut Host) -> anyhow::Result<()> {
    let update = host
        .next_update()
        .await
        .context("workflow host stopped unexpectedly")?;
    if update.applied {
        println!("{}", host.rendering());
    }
    Ok(())
}
