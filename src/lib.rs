pub mod arena;
pub mod builder;
pub mod config;
pub mod link;
pub mod model;
pub mod namespace;
pub mod naming;
pub mod path;
pub mod target;
pub mod types;

use wasm_bindgen::prelude::*;

use builder::{BuildError, Builder};
use config::{BuildOptions, Config, ConfigError};
use target::{RenderError, Target, TargetError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error("failed to build model")]
    Build(#[from] BuildError),
    #[error("failed to render {target}")]
    Render {
        target: Target,
        #[source]
        source: RenderError,
    },
}

/// Parse a JSON configuration, build it against `target` and render it.
pub fn generate(config_json: &str, target: &str, options: BuildOptions) -> Result<String, Error> {
    let target: Target = target.parse()?;
    let config = Config::from_json(config_json)?;
    let model = Builder::new(&target).with_options(options).build(&config)?;
    target
        .render(&model)
        .map_err(|source| Error::Render { target, source })
}

/// Render an error and each of its causes, outermost first.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Generate a target artifact from a JSON configuration
#[wasm_bindgen(js_name = "generateModel")]
pub fn generate_model(config_json: &str, target: &str) -> Result<String, String> {
    generate(config_json, target, BuildOptions::default()).map_err(|e| error_chain(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_lists_causes() {
        let input = r#"{ "databases": [{ "name": "db", "schemas": [{ "name": "s", "tables": [
            { "name": "t", "columns": [{ "name": "a", "type": "int(99)" }] }
        ]}]}]}"#;
        let err = generate(input, "json", BuildOptions::default()).unwrap_err();
        assert_eq!(
            error_chain(&err),
            "failed to build model: invalid type for column db.s.t.a: \
             int with 99 bits not supported (max 64)"
        );
    }

    #[test]
    fn test_generate_model_unknown_target() {
        let err = generate_model("{}", "cobol").unwrap_err();
        assert!(err.starts_with("Unknown target: \"cobol\""));
    }
}
