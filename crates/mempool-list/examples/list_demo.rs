//! Build a small list in a pool sized for five nodes and watch inserts
//! get skipped once the pool is full.
//!
//! Run with:
//!   cargo run -p mempool-list --example list_demo

use mempool_arena::MemoryPool;
use mempool_list::{node_pool_config, LinkedList};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let pool = MemoryPool::init(node_pool_config(5))?;
    let mut list = LinkedList::new(&pool);

    let ten = list.push_back(10).ok_or("pool exhausted")?;
    let thirty = list.push_back(30).ok_or("pool exhausted")?;
    list.insert_after(ten, 20);
    list.insert_before(ten, 5);
    list.push_back(40);
    println!("list:   {list} ({} nodes)", list.len());

    // Pool holds five nodes; this one is skipped.
    if list.push_back(50).is_none() {
        println!("push_back(50) skipped: pool full");
    }

    println!("range:  {}", list.display_range(Some(ten), Some(thirty)));
    list.remove(20);
    println!("after remove(20): {list}");

    if let Some(usage) = pool.usage() {
        println!(
            "pool:   {} blocks, {} used bytes, {} free bytes",
            usage.block_count, usage.used_bytes, usage.free_bytes
        );
    }
    list.clear();
    pool.check_invariants()?;
    Ok(())
}
