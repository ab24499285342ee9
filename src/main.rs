//! llmchat inspector
//!
//! Loads a saved chat session, prints its transcript and what it would cost
//! as a prompt for the configured model.
//!
//! Usage: `llmchat <session> [model]`. A bare session name is looked up in
//! `LLMCHAT_CHATS_DIR`.

use llmchat::{session, ChatConfig, ChatSession};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llmchat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(target) = args.next() else {
        eprintln!("usage: llmchat <session> [model]");
        std::process::exit(2);
    };

    let mut config = ChatConfig::from_env();
    if let Some(model) = args.next() {
        config.model = Some(model);
    }

    let path = PathBuf::from(&target);
    let path = if path.exists() {
        path
    } else {
        session::session_path(&config.chats_dir, &target)
    };

    let mut chat = ChatSession::from_config(&config)?;
    chat.load(&path)?;

    let model = chat.model();
    print!("{}", chat.conversation().render());
    println!(
        "Model : {} ({}, {}T context, {} tokenizer)",
        model.id, model.mode, model.context_window, model.family
    );
    println!(
        "Session prompt : {}T for {} messages",
        chat.count_tokens(),
        chat.conversation().len()
    );

    Ok(())
}
