use clap::Parser;

#[derive(Parser)]
pub struct Cli {
    /// Number of coroutines to spawn
    #[arg(long, short, default_value_t = 2)]
    pub coroutines: usize,

    /// Rounds in which every live coroutine is resumed once
    #[arg(long, short, default_value_t = 10)]
    pub rounds: usize,

    /// Stack size of each coroutine in bytes
    #[arg(long, short)]
    pub stack_size: Option<usize>,
}
