//! `quill search` — semantic search over recorded interactions.

use quill_recall::SearchService;

use super::support::App;

pub async fn run(
    query: &str,
    limit: usize,
    min_similarity: f32,
    detailed: bool,
) -> anyhow::Result<()> {
    let app = App::init()?;
    let service = SearchService::new(app.store()?);

    println!("Searching for: {query}");
    let results = service.search(query, limit, min_similarity).await?;
    println!("{}", SearchService::format_results(&results, detailed));
    Ok(())
}
