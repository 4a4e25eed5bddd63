#![doc = include_str!("../README.md")]

use anyhow::{Context, bail};
use chatflake::{Fragment, SnowflakeGeneratorAsyncTokioExt, SnowflakeId, StreamSplitter};
use chatflake_chat::{
    ChatConfig, ChatId, CliArgs, Clock, EPOCH, Generator,
    telemetry::{increment_ids_issued, init_telemetry},
};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Bytes read from stdin per `split` chunk. Small enough that multi-byte
/// characters and the separator regularly straddle chunk boundaries.
const READ_CHUNK: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "chatflake", version, about = "Chat ID and title-split tooling")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue chat IDs, one per line.
    Ids {
        #[arg(long, short = 'n', default_value_t = 1)]
        count: usize,
    },
    /// Break a chat ID into its fields.
    Decode { id: u64 },
    /// Split a titled model response read from stdin into JSON fragments.
    Split,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = ChatConfig::try_from(cli.args)?;

    let providers = init_telemetry()?;
    let res = run(cli.command, &config).await;
    providers.shutdown();
    res
}

async fn run(command: Command, config: &ChatConfig) -> anyhow::Result<()> {
    match command {
        Command::Ids { count } => ids(config, count).await,
        Command::Decode { id } => decode(id),
        Command::Split => split(config).await,
    }
}

async fn ids(config: &ChatConfig, count: usize) -> anyhow::Result<()> {
    let generator = match config.node_id {
        Some(node_id) => Generator::<Clock>::new(node_id, Clock::default()),
        None => Generator::<Clock>::with_random_node(Clock::default()),
    };
    tracing::debug!(node_id = generator.node_id(), count, "issuing ids");

    let mut out = String::with_capacity(count * 20);
    for _ in 0..count {
        let id = generator.next_id_async().await?;
        out.push_str(&id.to_raw().to_string());
        out.push('\n');
    }
    increment_ids_issued(count as u64);

    let mut stdout = tokio::io::stdout();
    stdout.write_all(out.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

fn decode(raw: u64) -> anyhow::Result<()> {
    let id = ChatId::from_raw(raw);
    if !id.is_valid() {
        bail!("{raw} is not a chat ID: reserved bits are set");
    }

    let unix_ms = id.unix_millis(EPOCH);
    let wall = i64::try_from(unix_ms)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .context("timestamp is out of range for a calendar date")?;

    println!("id:        {raw}");
    println!("timestamp: {}", id.timestamp());
    println!("node_id:   {}", id.node_id());
    println!("sequence:  {}", id.sequence());
    println!("unix_ms:   {unix_ms}");
    println!("time:      {}", wall.to_rfc3339());
    Ok(())
}

async fn split(config: &ChatConfig) -> anyhow::Result<()> {
    let mut splitter =
        StreamSplitter::new(config.title_separator).with_max_title_len(config.max_title_len);
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let n = stdin.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for fragment in splitter.feed_bytes(&buf[..n])? {
            emit(&mut stdout, &fragment).await?;
        }
    }

    splitter.finish()?;
    stdout.flush().await?;
    Ok(())
}

async fn emit(stdout: &mut tokio::io::Stdout, fragment: &Fragment) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(fragment)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    Ok(())
}
