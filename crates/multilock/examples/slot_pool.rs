//! Example: limiting a job to three concurrent instances
//!
//! Run with: `cargo run --example slot_pool` (run it from several terminals
//! at once to watch the slots fill up)

use multilock::prelude::*;
use multilock::{FileLockProvider, LockOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = FileLockProvider::builder()
        .directory("/tmp/multilock-example")
        .build()?;

    // Up to three holders of the "job" family may coexist on this host.
    let pool = provider.create_slot_pool_with(
        "job",
        3,
        LockOptions::new().delete_on_release(true),
    )?;

    let mut held = Vec::new();
    loop {
        match pool.try_acquire().await? {
            Some(slot) => {
                if let Some(path) = slot.path() {
                    println!("claimed slot {}", path.display());
                }
                held.push(slot);
            }
            None => {
                println!("all {} slots are taken", pool.capacity());
                break;
            }
        }
    }

    for slot in held {
        slot.release().await?;
    }
    println!("slots released");

    Ok(())
}
