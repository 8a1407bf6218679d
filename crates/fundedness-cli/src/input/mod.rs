pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a typed input from `--input <file>` or, failing that, piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_input(path);
    }
    stdin::read_stdin(what)?.ok_or_else(|| {
        format!("--input <file.json|file.yaml> or piped JSON/YAML required for {what}").into()
    })
}
