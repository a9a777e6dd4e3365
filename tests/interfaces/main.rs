//! Interface tests for the event client using Cucumber.
//!
//! These scenarios tell the story of a shared todo list built on keyfan and
//! must hold for every storage backend. Select a backend via environment
//! variable:
//!
//! ```bash
//! # In-memory table (default)
//! cargo test --test interfaces
//!
//! # DynamoDB Local (uses testcontainers, or DYNAMO_ENDPOINT if set)
//! STORAGE_BACKEND=dynamo cargo test --test interfaces --features dynamo
//! ```

mod steps;
mod todo;

use cucumber::World;
use steps::todo_story::TodoStoryWorld;

#[tokio::main]
async fn main() {
    keyfan::utils::bootstrap::init_tracing();

    println!("\n=== Running Todo Story Interface Tests ===\n");
    TodoStoryWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/todo_story.feature")
        .await;
}
