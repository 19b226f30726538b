//! One-off queries: `quill query` and `quill terminal`.

use std::io::{IsTerminal, Read};

use quill_context::terminal_context;
use quill_core::message::Message;

use super::support::{request_for, stream_to_stdout, App};

pub async fn run(query: &str, model: Option<&str>, prompt: Option<&str>) -> anyhow::Result<()> {
    let app = App::init()?;
    let (provider, model_config) = app.resolve_model(model)?;
    let prompt_text = app.prompt_text(prompt)?;

    let mut messages = Vec::new();
    let system = if prompt_text.is_empty() {
        model_config.system_prompt.clone()
    } else {
        Some(prompt_text)
    };
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(query));

    let request = request_for(&model_config, messages, true);
    let Some(response) = stream_to_stdout(provider.as_ref(), request).await? else {
        return Ok(());
    };

    let model_key = model.unwrap_or(&app.config.default_model);
    app.record_interaction(query, &response, model_key, "question", None)
        .await;
    Ok(())
}

/// Query with whatever was piped on stdin attached as terminal context:
/// `cargo build 2>&1 | quill terminal "explain this error"`.
pub async fn terminal(query: &str, model: Option<&str>) -> anyhow::Result<()> {
    let app = App::init()?;
    let (provider, model_config) = app.resolve_model(model)?;

    let mut content = query.to_string();
    if !std::io::stdin().is_terminal() {
        let mut piped = String::new();
        std::io::stdin().read_to_string(&mut piped)?;
        if !piped.trim().is_empty() {
            content.push_str(&terminal_context(&piped, app.config.max_file_tokens));
        }
    }

    let request = request_for(&model_config, vec![Message::user(content)], true);
    stream_to_stdout(provider.as_ref(), request).await?;
    Ok(())
}
