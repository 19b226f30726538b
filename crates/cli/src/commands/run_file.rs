//! `quill run-file` — answer the pending query in an arbitrary markdown
//! file, outside the session registry. No context caching happens in this
//! mode; every invocation re-extracts.

use quill_session::SessionLog;

use super::session::answer_pending;
use super::support::App;

pub async fn run(path: &str) -> anyhow::Result<()> {
    let app = App::init()?;
    let mut log = SessionLog::load(path)?;
    let query = log.latest_query.clone();

    let Some(response) = answer_pending(&app, &mut log, None).await? else {
        return Ok(());
    };

    app.record_interaction(
        &query,
        &response,
        &log.meta.llm_config,
        "file_analysis",
        Some(path.to_string()),
    )
    .await;
    println!("Updated {path}");
    Ok(())
}
