//! Writes the millwork OpenAPI document for client generators.
//!
//! `openapi-export [PATH]` writes to `PATH` (default
//! `docs/millwork-api.openapi.json`); `-` prints to stdout.
//! `openapi-export --check [PATH]` exits non-zero when the file on disk is
//! missing or differs from the routes compiled into this binary.

use std::{fs, path::Path, process::ExitCode};

use anyhow::Context;
use millwork_api::openapi::ApiDocV1;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "docs/millwork-api.openapi.json";

fn document() -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(&ApiDocV1::openapi())
        .context("serialising OpenAPI document")?;
    json.push('\n');
    Ok(json)
}

fn main() -> anyhow::Result<ExitCode> {
    let mut check = false;
    let mut output = DEFAULT_OUTPUT.to_string();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--check" => check = true,
            _ => output = arg,
        }
    }

    let json = document()?;
    if output == "-" {
        print!("{json}");
        return Ok(ExitCode::SUCCESS);
    }

    let path = Path::new(&output);
    if check {
        let on_disk = fs::read_to_string(path).unwrap_or_default();
        if on_disk == json {
            println!("{} is up to date", path.display());
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("{} is stale; rerun openapi-export", path.display());
        return Ok(ExitCode::FAILURE);
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {} ({} paths)", path.display(), ApiDocV1::openapi().paths.paths.len());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_project_and_drawing_routes() {
        let json = document().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let paths = value["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/v1/projects"));
        assert!(paths.contains_key("/api/v1/scope-items/{id}/drawing/override"));
        assert!(json.ends_with('\n'));
    }
}
