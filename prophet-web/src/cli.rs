//! CLI argument parsing for the terminal client

use clap::{Parser, ValueEnum};
use prophet_web_sdk::{ModelClass, SearchBackend, UserSettings};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelClassArg {
    Litellm,
    Openrouter,
}

impl From<ModelClassArg> for ModelClass {
    fn from(arg: ModelClassArg) -> Self {
        match arg {
            ModelClassArg::Litellm => ModelClass::Litellm,
            ModelClassArg::Openrouter => ModelClass::Openrouter,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackendArg {
    Perplexity,
    Brave,
}

impl From<SearchBackendArg> for SearchBackend {
    fn from(arg: SearchBackendArg) -> Self {
        match arg {
            SearchBackendArg::Perplexity => SearchBackend::Perplexity,
            SearchBackendArg::Brave => SearchBackend::Brave,
        }
    }
}

/// Ask the forecasting agent a question and follow its run in the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "prophet-web", version)]
pub struct Args {
    /// Question to forecast, e.g. "Will it rain tomorrow in Paris?"
    pub prompt: String,

    /// Commit the proposed plan without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Backend base URL (overrides PROPHET_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long, value_enum, default_value = "litellm")]
    pub model_class: ModelClassArg,

    /// Model identifier passed to the model adapter
    #[arg(long, default_value = "google/gemini-2.5-flash-preview-05-20")]
    pub model_name: String,

    #[arg(long, value_enum, default_value = "perplexity")]
    pub search_backend: SearchBackendArg,

    #[arg(long, env = "OPENROUTER_API_KEY", default_value = "", hide_env_values = true)]
    pub openrouter_api_key: String,

    #[arg(long, env = "PERPLEXITY_API_KEY", default_value = "", hide_env_values = true)]
    pub perplexity_api_key: String,

    #[arg(long, env = "BRAVE_API_KEY", default_value = "", hide_env_values = true)]
    pub brave_api_key: String,
}

impl From<&Args> for UserSettings {
    fn from(args: &Args) -> Self {
        UserSettings {
            model_class: args.model_class.into(),
            model_name: args.model_name.clone(),
            search_backend: args.search_backend.into(),
            openrouter_api_key: args.openrouter_api_key.clone(),
            perplexity_api_key: args.perplexity_api_key.clone(),
            brave_api_key: args.brave_api_key.clone(),
        }
    }
}
