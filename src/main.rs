use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use intmap::workload::{self, OpMix, WorkloadConfig};
use intmap::{IntMap, Key, Strategy};

#[derive(Debug, Parser)]
#[command(name = "intmap", about = "Drive a concurrent i64 -> i64 map from several threads")]
struct Cli {
    /// Map implementation: locked, sharded or sync
    #[arg(short, long, default_value_t = Strategy::Locked)]
    strategy: Strategy,

    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Operations issued by each worker
    #[arg(long, default_value_t = 10_000)]
    ops: usize,

    /// Keys are drawn from 0..KEY_SPACE
    #[arg(long, default_value_t = 40_000)]
    key_space: Key,

    /// Relative weight of loads
    #[arg(long, default_value_t = 0)]
    load: u32,

    /// Relative weight of stores
    #[arg(long, default_value_t = 1)]
    store: u32,

    /// Relative weight of deletes
    #[arg(long, default_value_t = 0)]
    delete: u32,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Do not print the load/store walkthrough
    #[arg(long)]
    skip_showcase: bool,
}

impl Cli {
    fn workload(&self) -> WorkloadConfig {
        WorkloadConfig {
            workers: self.workers,
            ops_per_worker: self.ops,
            key_space: self.key_space,
            mix: OpMix {
                load: self.load,
                store: self.store,
                delete: self.delete,
            },
            seed: self.seed,
        }
    }
}

fn showcase(map: &dyn IntMap) {
    const KEY: Key = 5;

    match map.load(KEY) {
        (value, true) => println!("result: `{}` found for key: `{}`", value, KEY),
        (_, false) => println!("value not found for key: `{}`", KEY),
    }

    map.store(KEY, 42);
    println!("added value: `42` for key: `{}`", KEY);

    if let (value, true) = map.load(KEY) {
        println!("result: `{}` found for key: `{}`", value, KEY);
    }

    map.delete(KEY);
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let cli = Cli::parse();

    let map = cli.strategy.build();
    if !cli.skip_showcase {
        println!("{} map", cli.strategy);
        println!("----------------------------");
        showcase(&*map);
        println!("----------------------------");
    }

    let config = cli.workload();
    info!(strategy = %cli.strategy, ?config, "starting workload");
    let report = workload::run(Arc::clone(&map), &config).context("workload failed")?;
    let live = workload::verify(&*map, config.key_space, config.workers)
        .context("final state check failed")?;

    println!("{}", report);
    println!("{} live keys, all consistent", live);
    Ok(())
}
