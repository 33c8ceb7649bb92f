//! Authorize one channel from a channel file
//!
//! Restores the saved token when it is still valid, otherwise runs the
//! interactive OAuth2 flow and saves the new token.
//!
//! Run with:
//! ```bash
//! cargo run --example authorize -- conf/channel.json my_weibo \
//!     https://api.weibo.com/oauth2/ http://snsapi.sinaapp.com/
//!
//! # JSON logs, verbose auth module
//! SNS_LOG_FORMAT=json cargo run --example authorize -- conf/channel.json my_weibo \
//!     https://api.weibo.com/oauth2/ http://snsapi.sinaapp.com/ "core_auth=debug"
//! ```

use bridge_traits::time::LogLevel;
use core_auth::SnsChannel;
use core_runtime::config::{load_channels, PlatformBridges};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::env;
use std::error::Error;
use tracing::{info, warn};

const USAGE: &str = "usage: authorize <channel.json> <channel_name> <auth_url> <callback_url> [filter]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let [channel_file, channel_name, auth_url, callback_url, rest @ ..] = args.as_slice() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let format = match env::var("SNS_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        Ok("compact") => LogFormat::Compact,
        Ok("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };
    let mut logging = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Info);
    if let Some(filter) = rest.first() {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging)?;

    let channels = load_channels(channel_file)?;
    let Some(config) = channels.iter().find(|c| &c.channel_name == channel_name) else {
        return Err(format!("channel '{}' not found in {}", channel_name, channel_file).into());
    };
    if !config.is_open() {
        warn!(channel = %channel_name, "Channel is not open, authorizing anyway");
    }

    let mut channel = SnsChannel::new(PlatformBridges::builder().build()?);
    channel.read_channel(config);

    if channel.get_saved_token().await {
        info!(channel = %channel_name, "Using saved token");
        return Ok(());
    }

    let cancel = channel.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    channel.oauth2(auth_url, callback_url).await?;
    channel.save_token().await?;

    info!(
        channel = %channel_name,
        expires_in = ?channel.token().expires_in(),
        "Authorization complete"
    );
    Ok(())
}
