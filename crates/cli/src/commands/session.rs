//! Session management: create, list, delete, run.

use std::path::PathBuf;

use anyhow::ensure;
use quill_context::ContextAssembler;
use quill_core::message::Message;
use quill_session::{SessionLog, SessionMeta, SessionRegistry};

use super::support::{estimate_message_tokens, request_for, stream_to_stdout, App};

pub async fn create(name: &str, model: Option<&str>, prompt: Option<&str>) -> anyhow::Result<()> {
    let app = App::init()?;

    if let Some(key) = model {
        ensure!(
            app.config.model(key).is_some(),
            "Unknown model '{key}' (see `quill models`)"
        );
    }
    if let Some(prompt_name) = prompt {
        app.prompt_text(Some(prompt_name))?;
    }

    let registry = SessionRegistry::open(&app.config.sessions_dir)?;
    let meta = SessionMeta::fresh(name, model.unwrap_or(&app.config.default_model), prompt);
    registry.create(name, &meta)?;

    println!("Created new session: {name}");
    Ok(())
}

pub async fn ls() -> anyhow::Result<()> {
    let app = App::init()?;
    let registry = SessionRegistry::open(&app.config.sessions_dir)?;

    let sessions = registry.list()?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    for session in sessions {
        println!("- {session}");
    }
    Ok(())
}

pub async fn delete(name: &str) -> anyhow::Result<()> {
    let app = App::init()?;
    let registry = SessionRegistry::open(&app.config.sessions_dir)?;
    registry.delete(name)?;
    println!("Deleted session: {name}");
    Ok(())
}

pub async fn run(name: &str) -> anyhow::Result<()> {
    let app = App::init()?;
    let registry = SessionRegistry::open(&app.config.sessions_dir)?;
    let mut log = registry.load(name)?;
    let query = log.latest_query.clone();

    let Some(response) =
        answer_pending(&app, &mut log, Some(registry.session_dir(name))).await?
    else {
        return Ok(());
    };

    app.record_interaction(&query, &response, &log.meta.llm_config, "session", None)
        .await;
    println!("Updated {name}");
    Ok(())
}

/// The shared answer flow for `session run` and `run-file`: assemble the
/// context bundle, stream the model's answer, append it to the log.
///
/// Returns `None` when streaming was interrupted; nothing is written then.
pub(crate) async fn answer_pending(
    app: &App,
    log: &mut SessionLog,
    session_dir: Option<PathBuf>,
) -> anyhow::Result<Option<String>> {
    ensure!(
        !log.latest_query.is_empty(),
        "No pending query in {} - add one at the bottom of the file",
        log.path().display()
    );

    let (provider, model_config) = app.resolve_model(Some(&log.meta.llm_config))?;

    let mut assembler = ContextAssembler::new(&log.latest_query)
        .with_history(log.chat_history.clone())
        .with_files(log.meta.files.clone())
        .with_search(log.meta.search.clone())
        .with_max_file_tokens(app.config.max_file_tokens);
    if let Some(dir) = session_dir {
        assembler = assembler.with_session_dir(dir);
    }

    let resolver = app.search_resolver();
    let mut messages = assembler.get_messages(&resolver).await?;

    if let Some(prompt_name) = &log.meta.prompt {
        let text = app.prompt_text(Some(prompt_name))?;
        if !text.is_empty() {
            messages.insert(0, Message::system(text));
        }
    }

    log.meta.current_tokens = estimate_message_tokens(&messages);

    let request = request_for(&model_config, messages, true);
    let Some(response) = stream_to_stdout(provider.as_ref(), request).await? else {
        return Ok(None);
    };

    log.append_response(&response)?;
    Ok(Some(response))
}
