use anyhow::Result;
use console_persist::{seed_demo_data, ConsoleClientBuilder, SeedOutcome, StorageBackend};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    println!("Console - Demo Seed");
    println!("===================\n");

    // Without a connection string the seed runs against a throwaway memory store
    let builder = match std::env::var("MONGODB_URI") {
        Ok(uri) => {
            let database =
                std::env::var("MONGODB_DATABASE").unwrap_or_else(|_| "console".to_string());
            println!("Target: MongoDB database '{}'", database);
            ConsoleClientBuilder::new()
                .backend(StorageBackend::MongoDb)
                .mongodb_uri(uri)
                .database(database)
                .transactions(env_flag("MONGODB_TRANSACTIONS"))
        }
        Err(_) => {
            println!("Target: in-memory store (set MONGODB_URI to seed a real database)");
            ConsoleClientBuilder::new()
        }
    };
    let client = builder.build().await?;

    match seed_demo_data(&client).await? {
        SeedOutcome::Seeded(report) => {
            println!("✓ Created {} projects", report.projects);
            println!("✓ Created {} threads", report.threads);
            println!("✓ Created {} messages", report.messages);
        }
        SeedOutcome::AlreadySeeded => {
            println!("Demo data already present, nothing to do");
            return Ok(());
        }
    }
    println!();

    for project in client.list_projects().await? {
        println!("{} ({})", project.name, project.slug);
        for thread in client.list_threads(&project.id).await? {
            let last = thread
                .last_message_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "no messages".to_string());
            println!("  - {} [{}] last: {}", thread.title, thread.external_ref, last);
        }
    }

    Ok(())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
