mod cli;

use std::error::Error;

use clap::Parser;
use cli::Cli;
use coroutine::{Cid, CoroutineStatus, DEFAULT_STACK_SIZE, Scheduler};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let stack_size = cli.stack_size.unwrap_or(DEFAULT_STACK_SIZE);

    println!("Coroutine test started");
    let scheduler = Scheduler::new();

    let cids = (1..=cli.coroutines)
        .map(|n| {
            let cid = scheduler.spawn_with_stack_size(move |s| body(s, n), stack_size)?;
            println!("Created coroutine {n} with id: {cid}");
            Ok(cid)
        })
        .collect::<Result<Vec<Cid>, coroutine::Error>>()?;

    // 驱动方轮流恢复各协程
    for round in 0..cli.rounds {
        log::info!("round={round}");
        for &cid in &cids {
            match scheduler.status(cid) {
                Some(CoroutineStatus::Ready | CoroutineStatus::Blocked) => {
                    scheduler.resume(cid)?;
                }
                _ => {}
            }
        }
    }

    // 余下的交给调度循环
    scheduler.run()?;

    for cid in cids {
        println!("coroutine {cid} exited with code {:?}", scheduler.reap(cid));
    }
    println!("Coroutine test finished");

    Ok(())
}

/// 第 n 个协程打印 2n+1 次，每次之后让出
fn body(scheduler: &Scheduler, n: usize) -> i32 {
    println!("Coroutine {n} started with arg: {n}");
    for i in 0..2 * n + 1 {
        println!("Coroutine {n}: {i}");
        if scheduler.yield_now().is_err() {
            return -1;
        }
    }
    println!("Coroutine {n} finished");
    0
}
