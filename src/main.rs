/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: main.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-02-12 15:38:23
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-05 11:02:19
 */

use clap::Parser;
use log::{error, info};
use mail_fetcher::config::DEFAULT_ENVIRONMENT;
use mail_fetcher::{AppConfig, ConsumerRegistry, FetchOptions, MailFetcher};
use std::io::Write;

struct MultiWriter {
    writers: Vec<Box<dyn Write + Send + 'static>>,
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for w in &mut self.writers {
            let _ = w.write(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for w in &mut self.writers {
            let _ = w.flush();
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<String>,

    /// Environment section of the config file to use
    #[arg(short, long, env = "MAIL_FETCHER_ENV")]
    env: Option<String>,

    /// Consumer to hand messages to, overrides the config file
    #[arg(long)]
    consumer: Option<String>,

    /// Consumer operation to invoke, may be repeated (default: receive)
    #[arg(short, long = "operation")]
    operations: Vec<String>,

    /// Keep messages on the server
    #[arg(short, long)]
    keep: bool,

    /// Delete only messages whose subject contains this text
    #[arg(long)]
    delete_subject: Option<String>,

    /// POP3: explicitly terminate the session after fetching
    #[arg(long)]
    finish: bool,

    /// IMAP: hand the open session to the consumer
    #[arg(long)]
    live: bool,
}

impl Args {
    fn fetch_options(&self) -> FetchOptions {
        let mut options = FetchOptions::default()
            .keep(self.keep)
            .finish(self.finish)
            .use_live_session(self.live);

        if !self.operations.is_empty() {
            options = options.operations(self.operations.clone());
        }

        if let Some(pattern) = self.delete_subject.clone() {
            options = options.delete_if(move |message| {
                message
                    .subject()
                    .is_some_and(|subject| subject.contains(&pattern))
            });
        }

        options
    }
}

fn initialize_logger(config: &AppConfig) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();

    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    } else if let Ok(env_level) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_level);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    if let Some(log_file) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file, e))?;

        if config.quiet {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        } else {
            let multi_writer = MultiWriter {
                writers: vec![Box::new(file), Box::new(std::io::stderr())],
            };
            builder.target(env_logger::Target::Pipe(Box::new(multi_writer)));
        }
    } else if config.quiet {
        builder.target(env_logger::Target::Pipe(Box::new(std::io::sink())));
    }

    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::new_from_file(path),
        None => AppConfig::new(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Failed to load config: {:?}", e);
        if let Ok(path) = std::env::current_dir() {
            eprintln!("Current search path: {:?}", path);
        }
        eprintln!("Please create a `config.toml` or set MAIL_FETCHER_... environment variables, or specify a config file with --config.");
        std::process::exit(1);
    });

    initialize_logger(&config)?;

    let environment = args.env.as_deref().unwrap_or(DEFAULT_ENVIRONMENT);
    let account = config.account(environment)?.clone();

    let registry = ConsumerRegistry::with_builtins(config.save_dir.as_deref());
    let consumer_name = args.consumer.as_deref().or(config.consumer.as_deref());
    let consumer = consumer_name.and_then(|name| registry.resolve(name));
    if let (Some(name), None) = (consumer_name, &consumer) {
        error!("Unknown consumer `{}`", name);
    }

    info!("Starting Mail Fetcher ({} environment)...", environment);

    let fetcher = MailFetcher::new(account, consumer);
    match fetcher.fetch(args.fetch_options()).await {
        Ok(report) => {
            info!(
                "Done: {} messages dispatched, {} deleted",
                report.dispatched, report.deleted
            );
            Ok(())
        }
        Err(e) => {
            error!("Fetch failed: {}", e);
            Err(e.into())
        }
    }
}
