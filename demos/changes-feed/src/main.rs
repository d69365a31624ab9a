//! Change Feed Follower
//!
//! Follows a continuous, newline-delimited change feed (for example CouchDB's
//! `_changes?feed=continuous`) and prints every change as it arrives.
//!
//! ## Behavior
//!
//! - Each change is decoded from the byte stream as soon as it is complete
//! - The last seen sequence is remembered and sent as `since` on reconnect
//! - Refused connections and transient server errors are retried after a
//!   randomized 2.5 to 10 second delay
//! - Any other error ends the program
//! - Ctrl-C cancels the feed
//!
//! ## Running
//!
//! ```bash
//! CHANGES_URL="http://localhost:5984/db/_changes?feed=continuous&heartbeat=10000" \
//! CHANGES_AUTH="Basic YWRtaW46cGFzcw==" \
//!     RUST_LOG=changes_feed=debug,rxhttp_client=debug cargo run -p changes-feed
//! ```

use std::sync::Arc;

use rxhttp::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

const DEFAULT_URL: &str = "http://localhost:5984/db/_changes?feed=continuous&heartbeat=10000";

/// One row of a change feed.
#[derive(Debug, Deserialize)]
struct Change {
    seq: Value,
    id: String,
    #[serde(default)]
    deleted: bool,
}

/// How one connection ended.
enum Ended {
    Completed,
    Failed(RxHttpError),
    Interrupted,
}

fn feed_url(base: &str, since: Option<&Value>) -> String {
    let Some(since) = since else {
        return base.to_string();
    };
    let since = match since {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}since={since}")
}

/// Print changes until the observable terminates or Ctrl-C is pressed.
async fn follow(observable: &Observable<Change>, last_seq: &mut Option<Value>) -> Ended {
    loop {
        tokio::select! {
            item = observable.next() => match item {
                Some(Ok(change)) => {
                    let marker = if change.deleted { "deleted" } else { "updated" };
                    println!("{:>8}  {marker}  {}", change.seq.to_string(), change.id);
                    *last_seq = Some(change.seq);
                }
                Some(Err(error)) => return Ended::Failed(error),
                None => return Ended::Completed,
            },
            _ = tokio::signal::ctrl_c() => return Ended::Interrupted,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("changes_feed=info".parse()?),
        )
        .init();

    let base = std::env::var("CHANGES_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let mut options = RequestOptions::new();
    if let Ok(auth) = std::env::var("CHANGES_AUTH") {
        options = options.with_header("Authorization", auth);
    }

    let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
    let mut feed = HttpRequestBuilder::new(base.as_str())
        .options(options.clone())
        .mode(DeliveryMode::Stream)
        .build::<Change, _>(transport)?;

    info!(url = %base, "following change feed");
    let mut last_seq = None;

    loop {
        let observable = feed.dispatch();
        match follow(&observable, &mut last_seq).await {
            Ended::Completed => {
                info!("feed ended, reconnecting");
            }
            Ended::Failed(error) if error.is_retryable() => {
                let delay = feed.retry_delay();
                warn!(%error, delay_ms = delay.as_millis() as u64, "feed unavailable, retrying");
                tokio::time::sleep(delay).await;
            }
            Ended::Failed(error) => {
                feed.cancel();
                return Err(error.into());
            }
            Ended::Interrupted => {
                feed.cancel();
                info!("interrupted");
                return Ok(());
            }
        }
        feed.configure(
            feed_url(&base, last_seq.as_ref()),
            options.clone(),
            DeliveryMode::Stream,
        );
    }
}
