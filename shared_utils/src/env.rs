use thiserror::Error;

/// One or more environment variables required by the application are not set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Missing environment variable(s): {}", .0.join(", "))]
pub struct MissingEnvVarError(pub Vec<String>);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Empty values are treated the same as unset ones, since an empty
/// credential is never usable.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MissingEnvVarError(vec![name.to_string()])),
    }
}

/// Reads several environment variables at once.
///
/// Unlike calling [`get_env_var`] in a loop, every missing name is reported
/// in a single error so the user can fix their `.env` file in one pass.
pub fn get_env_vars<const N: usize>(names: [&str; N]) -> Result<[String; N], MissingEnvVarError> {
    let mut missing = Vec::new();
    let values = names.map(|name| match get_env_var(name) {
        Ok(value) => value,
        Err(MissingEnvVarError(mut names)) => {
            missing.append(&mut names);
            String::new()
        }
    });

    if missing.is_empty() {
        Ok(values)
    } else {
        Err(MissingEnvVarError(missing))
    }
}
