//! Demo data for local development.
//!
//! Everything goes through [`ConsoleClient`], so seeded threads carry
//! correct external references and recency markers.

use crate::client::ConsoleClient;
use crate::error::Result;
use crate::models::{NewMessage, NewProject, NewThread};

/// Slug whose presence marks the demo data as already loaded
pub const DEMO_PROJECT_SLUG: &str = "ai-console";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub projects: usize,
    pub threads: usize,
    pub messages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded(SeedReport),
    AlreadySeeded,
}

pub async fn seed_demo_data(client: &ConsoleClient) -> Result<SeedOutcome> {
    if client
        .store()
        .get_project_by_slug(DEMO_PROJECT_SLUG)
        .await?
        .is_some()
    {
        tracing::info!("Demo data already present, skipping seed");
        return Ok(SeedOutcome::AlreadySeeded);
    }

    let mut report = SeedReport::default();

    let console = client
        .create_project(
            NewProject::new("AI Console", DEMO_PROJECT_SLUG, "ai-console")
                .description("Main AI Console project for development")
                .icon("robot")
                .color("#3b82f6"),
        )
        .await?;
    let memarch = client
        .create_project(
            NewProject::new("MemArch", "memarch", "memarch")
                .description("Memory architecture service")
                .color("#10b981"),
        )
        .await?;
    report.projects = 2;

    let getting_started = client
        .create_thread(
            NewThread::new(&console.id)
                .title("Getting Started with AI")
                .mode_hint("chat"),
        )
        .await?;
    let code_review = client
        .create_thread(
            NewThread::new(&console.id)
                .title("Code Review Session")
                .mode_hint("code"),
        )
        .await?;
    client
        .create_thread(NewThread::new(&memarch.id).title("Architecture Discussion"))
        .await?;
    report.threads = 3;

    let conversation = [
        NewMessage::new(
            &getting_started.id,
            "user",
            "Hello! Can you explain what the AI Console does?",
        ),
        NewMessage::new(
            &getting_started.id,
            "assistant",
            "The AI Console is a chat interface with project organization and \
             chat history. It integrates with the MemArch memory service for \
             persistent context across conversations.",
        )
        .with_model_profile("default-chat"),
        NewMessage::new(
            &getting_started.id,
            "user",
            "How does it integrate with MemArch?",
        ),
        NewMessage::new(
            &getting_started.id,
            "assistant",
            "Each thread has an external reference of the form \
             \"<project_ref>:thread:<thread_id>\". MemArch uses it to associate \
             memories and facts with a specific conversation thread.",
        )
        .with_model_profile("default-chat"),
        NewMessage::new(
            &code_review.id,
            "user",
            "Can you review this TypeScript code for me?",
        ),
        NewMessage::new(
            &code_review.id,
            "assistant",
            "I'd be happy to review your code! Please share the code you'd like me to review.",
        )
        .with_model_profile("deepseek-code"),
    ];
    for message in conversation {
        client.create_message(message).await?;
        report.messages += 1;
    }

    tracing::info!(
        projects = report.projects,
        threads = report.threads,
        messages = report.messages,
        "Database seeded"
    );
    Ok(SeedOutcome::Seeded(report))
}
