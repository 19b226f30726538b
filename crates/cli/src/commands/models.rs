//! `quill models` — show the model registry.

use super::support::App;

pub async fn run() -> anyhow::Result<()> {
    let app = App::init()?;

    println!("Configured models:");
    for key in app.router.model_keys() {
        let model_name = app
            .config
            .model(key)
            .map(|m| m.model_name.as_str())
            .unwrap_or("");
        let status = if app.router.is_available(key) {
            "ready"
        } else {
            "no API key"
        };
        let default_marker = if key == app.config.default_model {
            " (default)"
        } else {
            ""
        };
        println!("- {key}: {model_name} [{status}]{default_marker}");
    }
    Ok(())
}
