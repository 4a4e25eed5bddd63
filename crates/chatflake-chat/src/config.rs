use anyhow::bail;
use chatflake::DEFAULT_SEPARATOR;
use clap::Args;

use crate::common::types::ChatId;

/// Runtime configuration for the chat service.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is honored), with defaults suitable for a single node.
#[derive(Args, Debug, Clone)]
pub struct CliArgs {
    /// Node ID embedded into every issued ID.
    ///
    /// Must be unique among processes sharing an ID namespace and fit in the
    /// 10-bit node field. When unset a random node ID is drawn at startup,
    /// which keeps collisions unlikely but not impossible.
    ///
    /// Environment variable: `NODE_ID`
    #[arg(long, env = "NODE_ID")]
    pub node_id: Option<u64>,

    /// Character the model is told to emit between the title and the
    /// answer.
    ///
    /// Environment variable: `TITLE_SEPARATOR`
    #[arg(long, env = "TITLE_SEPARATOR", default_value_t = DEFAULT_SEPARATOR)]
    pub title_separator: char,

    /// Maximum title size in bytes. A response that goes on longer without
    /// a separator is rejected instead of buffered.
    ///
    /// Environment variable: `MAX_TITLE_LEN`
    #[arg(long, env = "MAX_TITLE_LEN", default_value_t = 256)]
    pub max_title_len: usize,

    /// Capacity of the packet buffer between a turn and its client.
    ///
    /// Lower values apply backpressure to the model sooner; higher values
    /// let a slow client fall further behind.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 16)]
    pub stream_buffer_size: usize,

    /// Largest page of rooms or messages a client may request.
    ///
    /// Environment variable: `MAX_PAGE_SIZE`
    #[arg(long, env = "MAX_PAGE_SIZE", default_value_t = 100)]
    pub max_page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub node_id: Option<u64>,
    pub title_separator: char,
    pub max_title_len: usize,
    pub stream_buffer_size: usize,
    pub max_page_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            title_separator: DEFAULT_SEPARATOR,
            max_title_len: 256,
            stream_buffer_size: 16,
            max_page_size: 100,
        }
    }
}

impl TryFrom<CliArgs> for ChatConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if let Some(node_id) = args.node_id {
            if node_id > ChatId::max_node_id() {
                bail!(
                    "NODE_ID ({}) exceeds available node ID space (max = {})",
                    node_id,
                    ChatId::max_node_id()
                );
            }
        }

        if args.title_separator.is_whitespace() {
            bail!("TITLE_SEPARATOR must not be whitespace");
        }

        if args.max_title_len == 0 {
            bail!("MAX_TITLE_LEN must be greater than 0");
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.max_page_size == 0 {
            bail!("MAX_PAGE_SIZE must be greater than 0");
        }

        Ok(Self {
            node_id: args.node_id,
            title_separator: args.title_separator,
            max_title_len: args.max_title_len,
            stream_buffer_size: args.stream_buffer_size,
            max_page_size: args.max_page_size,
        })
    }
}
