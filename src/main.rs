mod cache;
mod config;
mod http;
mod net;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cache::{CacheStore, MemoryStore, SqliteStore};
use crate::http::{Destination, Method, Request};
use crate::net::HttpClient;
use crate::worker::{ClickOutcome, Controller, EventOutcome, Message, WorkerEvent};

#[derive(Parser, Debug)]
#[command(name = "liferaft")]
#[command(about = "Offline-first asset cache controller with service-worker semantics")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/liferaft/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Use an in-memory cache instead of the on-disk database
  #[arg(long)]
  memory: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Populate the static partition with the asset manifest
  Install,
  /// Drop stale cache partitions and claim clients
  Activate,
  /// Intercept a GET for a URL and print the resulting response
  Fetch {
    url: String,
    /// Request destination: document, image, script, style, font, other
    #[arg(short, long, default_value = "other")]
    destination: Destination,
  },
  /// Replay queued offline submissions
  Sync {
    /// Sync tag to fire (defaults to the configured tag)
    #[arg(long)]
    tag: Option<String>,
  },
  /// Queue an offline form submission for the next sync
  Queue {
    /// Submission body
    body: String,
    /// Submission URL (defaults to a fresh URL under the queue prefix)
    #[arg(long)]
    url: Option<String>,
  },
  /// Simulate a push message and print the resulting notification
  Push { payload: Option<String> },
  /// Simulate activating a waiting controller from a page message
  SkipWaiting,
  /// List cache partitions and their entries
  Status,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing();

  let config = config::Config::load(args.config.as_deref())?;
  let net = HttpClient::new(&config.origin)?;

  if args.memory {
    run(Controller::new(MemoryStore::new(), net, config), args.command).await
  } else {
    run(Controller::new(SqliteStore::open()?, net, config), args.command).await
  }
}

/// Log to stderr, plus a daily rolling file under the data directory
/// when one is available.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let stderr_layer = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false);

  let log_dir = dirs::data_dir().map(|d| d.join("liferaft").join("logs"));
  let file_writer = match log_dir {
    Some(dir) if std::fs::create_dir_all(&dir).is_ok() => {
      let appender = tracing_appender::rolling::daily(dir, "liferaft.log");
      Some(tracing_appender::non_blocking(appender))
    }
    _ => None,
  };

  match file_writer {
    Some((writer, guard)) => {
      let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
      Some(guard)
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
      None
    }
  }
}

async fn run<S: CacheStore>(controller: Controller<S, HttpClient>, command: Command) -> Result<()> {
  let event = match command {
    Command::Install => WorkerEvent::Install,
    Command::Activate => WorkerEvent::Activate,
    Command::Fetch { url, destination } => {
      WorkerEvent::Fetch(Request::get(url).with_destination(destination))
    }
    Command::Sync { tag } => WorkerEvent::Sync {
      tag: tag.unwrap_or_else(|| controller.config().sync_tag.clone()),
    },
    Command::Queue { body, url } => {
      let url = url.unwrap_or_else(|| {
        format!(
          "{}?queued={}",
          controller.config().offline_queue_prefix,
          chrono::Utc::now().timestamp_millis()
        )
      });
      controller.queue_submission(&Request {
        method: Method::Post,
        url: url.clone(),
        destination: Destination::Other,
        body: body.into_bytes(),
      })?;
      println!("queued {}", url);
      return Ok(());
    }
    Command::Push { payload } => WorkerEvent::Push { payload },
    Command::SkipWaiting => WorkerEvent::Message(Message::SkipWaiting),
    Command::Status => return print_status(&controller),
  };

  let outcome = controller.dispatch(event).await?;
  print_outcome(outcome);
  Ok(())
}

fn print_outcome(outcome: EventOutcome) {
  match outcome {
    EventOutcome::Installed => println!("static shell installed"),
    EventOutcome::Activated { removed } => {
      if removed.is_empty() {
        println!("activated; no stale partitions");
      } else {
        println!("activated; dropped {}", removed.join(", "));
      }
    }
    EventOutcome::Response(response) => {
      println!(
        "{} {} ({} bytes)",
        response.status,
        response.content_type.as_deref().unwrap_or("-"),
        response.body.len()
      );
      if response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("text/") || ct.contains("json") || ct.contains("svg"))
      {
        println!("{}", response.body_text());
      }
    }
    EventOutcome::Drained(report) => {
      println!("replayed {}, pending {}", report.replayed, report.pending)
    }
    EventOutcome::Notification(notification) => {
      println!("{}: {}", notification.title, notification.body);
      for action in &notification.actions {
        println!("  [{}] {}", action.action, action.title);
      }
    }
    EventOutcome::Click(ClickOutcome::OpenWindow(url)) => println!("open {}", url),
    EventOutcome::Click(ClickOutcome::Dismissed) => println!("dismissed"),
    EventOutcome::Ignored => println!("ignored"),
  }
}

fn print_status<S: CacheStore>(controller: &Controller<S, HttpClient>) -> Result<()> {
  let partitions = controller.store().partitions()?;
  if partitions.is_empty() {
    println!("cache is empty");
    return Ok(());
  }

  for partition in partitions {
    let entries = controller.store().list(&partition)?;
    let marker = if controller.names().is_current(&partition) {
      ""
    } else {
      " (stale)"
    };
    println!("{}{}: {} entries", partition, marker, entries.len());
    for entry in entries {
      println!("  {} {}", entry.method.as_str(), entry.url);
    }
  }
  Ok(())
}
