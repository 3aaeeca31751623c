//! RustStack S3 Select - decode a `SelectObjectContent` response body.
//!
//! Reads an event-stream encoded response body from a file (or stdin), writes
//! the `Records` payloads to stdout, and logs everything else to stderr. The
//! exit status is non-zero if the stream ends with an error.
//!
//! # Usage
//!
//! ```text
//! ruststack-s3-select response.bin > records.csv
//! curl ... | ruststack-s3-select -
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EVENTSTREAM_MAX_FRAME_SIZE` | `16777216` | Largest accepted frame |
//! | `EVENTSTREAM_MAX_HEADER_SIZE` | `131072` | Largest accepted header block |
//! | `EVENTSTREAM_READ_CHUNK_SIZE` | `8192` | Bytes requested per read |
//! | `EVENTSTREAM_READ_TIMEOUT_MS` | *(unset)* | Per-read timeout |
//! | `EVENTSTREAM_REQUIRE_END_EVENT` | `false` | Fail if the body ends without `End` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use ruststack_s3_eventstream::{
    ByteSource, EventStreamConfig, SelectEventStream, open_select_stream_with_config,
};
use ruststack_s3_model::SelectObjectContentEventStream;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Tool version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber on stderr.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// What a completed run produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Summary {
    records_bytes: u64,
    saw_end: bool,
}

/// Drain `session`, writing record payloads to `out`.
async fn drain<S, W>(session: &mut SelectEventStream<S>, out: &mut W) -> Result<Summary>
where
    S: ByteSource,
    W: AsyncWrite + Unpin,
{
    let mut summary = Summary::default();

    while let Some(event) = session
        .next_event()
        .await
        .context("event stream terminated with an error")?
    {
        match event {
            SelectObjectContentEventStream::Records(records) => {
                out.write_all(&records.payload)
                    .await
                    .context("failed to write records")?;
                summary.records_bytes += records.payload.len() as u64;
            }
            SelectObjectContentEventStream::Stats(stats) => {
                info!(
                    bytes_scanned = ?stats.details.bytes_scanned,
                    bytes_processed = ?stats.details.bytes_processed,
                    bytes_returned = ?stats.details.bytes_returned,
                    "query stats"
                );
            }
            SelectObjectContentEventStream::Progress(progress) => {
                debug!(
                    bytes_scanned = ?progress.details.bytes_scanned,
                    bytes_processed = ?progress.details.bytes_processed,
                    bytes_returned = ?progress.details.bytes_returned,
                    "query progress"
                );
            }
            SelectObjectContentEventStream::Cont(_) => debug!("keep-alive"),
            SelectObjectContentEventStream::End(_) => summary.saw_end = true,
            SelectObjectContentEventStream::Unknown {
                event_type,
                payload,
            } => {
                warn!(event_type = %event_type, payload_len = payload.len(), "skipping unknown event");
            }
        }
    }

    out.flush().await.context("failed to flush records")?;
    Ok(summary)
}

/// Decode `source` to stdout, cancelling on Ctrl-C.
async fn run<S: ByteSource>(source: S, config: &EventStreamConfig) -> Result<()> {
    let mut session = open_select_stream_with_config(source, config);

    let cancel = session.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, cancelling stream");
            cancel.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    let summary = drain(&mut session, &mut stdout).await?;
    let metrics = session.metrics();

    info!(
        state = ?session.state(),
        frames = metrics.frames_decoded,
        bytes = metrics.bytes_consumed,
        unknown_events = metrics.unknown_events,
        records_bytes = summary.records_bytes,
        saw_end = summary.saw_end,
        "event stream finished",
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = EventStreamConfig::from_env();

    init_tracing(&config.log_level)?;

    let input = std::env::args().nth(1).unwrap_or_else(|| "-".to_owned());

    info!(
        input = %input,
        max_frame_size = config.max_frame_size,
        require_end_event = config.require_end_event,
        version = VERSION,
        "starting RustStack S3 Select decoder",
    );

    if input == "-" {
        run(tokio::io::stdin(), &config).await
    } else {
        let file = tokio::fs::File::open(&input)
            .await
            .with_context(|| format!("failed to open {input}"))?;
        run(file, &config).await
    }
}
