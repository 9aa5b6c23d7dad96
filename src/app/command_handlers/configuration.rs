use crate::app::command_support::{headless_api_config, load_context, map_config_err};
use crate::config::save_preferences;
use crate::wizard::configuration::{
    is_supported_model, mask_api_key, test_default_connection, ConfigDraft, DEFAULT_API_KEY_ENV,
    MODEL_OPTIONS,
};

pub fn cmd_config(args: &[String]) -> Result<String, String> {
    match args.first().map(String::as_str) {
        None | Some("show") => cmd_config_show(),
        Some("test") => cmd_config_test(),
        Some("test-default") => cmd_config_test_default(),
        Some(other) => Err(format!(
            "unknown config subcommand `{other}`; usage: config show|test|test-default"
        )),
    }
}

fn cmd_config_show() -> Result<String, String> {
    let context = load_context()?;
    let draft = context.draft();
    let key = std::env::var(DEFAULT_API_KEY_ENV).unwrap_or_default();
    Ok(format!(
        "backend_url={}\nmodel={}\nrequest_delay={}\nrequest_timeout={}\nmax_retries={}\napi_key={}\nprocess_timeout_secs={}\nmax_upload_bytes={}\npreferences={}",
        context.settings.effective_backend_url(),
        draft.model,
        draft.request_delay,
        draft.request_timeout,
        draft.max_retries,
        mask_api_key(key.trim()),
        context.settings.process_timeout_secs,
        context.settings.max_upload_bytes,
        context.paths.preferences_path().display()
    ))
}

fn cmd_config_test() -> Result<String, String> {
    let context = load_context()?;
    let config = headless_api_config(&context)?;
    let draft = ConfigDraft::from_config(&config);
    let backend = context.backend();
    let message = draft.test_connection(&backend).map_err(|e| {
        context
            .log
            .warn("backend.config_test_failed", &format!("model={}", config.model));
        e.to_string()
    })?;
    context
        .log
        .info("backend.config_tested", &format!("model={}", config.model));
    Ok(format!("status=ok\nmodel={}\nmessage={message}", config.model))
}

fn cmd_config_test_default() -> Result<String, String> {
    let context = load_context()?;
    let message = test_default_connection(&context.backend()).map_err(|e| e.to_string())?;
    Ok(format!("status=ok\nmessage={message}"))
}

pub fn cmd_model(args: &[String]) -> Result<String, String> {
    let context = load_context()?;
    let mut draft = context.draft();

    let Some(model) = args.first() else {
        return Ok(format!("model={}", draft.model));
    };
    if !is_supported_model(model) {
        return Err(format!(
            "model `{model}` is not supported; choose one of: {}",
            MODEL_OPTIONS.join(", ")
        ));
    }
    draft.set_model(model).map_err(|e| e.to_string())?;
    save_preferences(&context.paths, &draft.to_preferences()).map_err(map_config_err)?;
    Ok(format!("model={}", draft.model))
}
