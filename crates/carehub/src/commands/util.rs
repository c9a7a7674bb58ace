//! Shared helpers for command handlers.

use std::io::IsTerminal;

use crate::cli::BodyArgs;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Parse the JSON body from `--data` or `--from-file`.
pub fn read_body(args: &BodyArgs) -> Result<serde_json::Value, CliError> {
    let (source, text) = match (&args.data, &args.from_file) {
        (Some(data), _) => ("data", data.clone()),
        (None, Some(path)) => ("from-file", std::fs::read_to_string(path)?),
        (None, None) => {
            return Err(CliError::Validation {
                field: "body".into(),
                reason: "pass --data or --from-file".into(),
            });
        }
    };
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| CliError::Validation {
        field: source.into(),
        reason: format!("invalid JSON: {e}"),
    })?;
    if !value.is_object() {
        return Err(CliError::Validation {
            field: source.into(),
            reason: "expected a JSON object".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn inline_body_must_be_an_object() {
        let args = BodyArgs {
            data: Some("[1, 2]".into()),
            from_file: None,
        };
        let err = read_body(&args).unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "data"));
    }

    #[test]
    fn body_reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "Hoist"}}"#).unwrap();
        let args = BodyArgs {
            data: None,
            from_file: Some(file.path().to_path_buf()),
        };
        let body = read_body(&args).unwrap();
        assert_eq!(body["name"], "Hoist");
    }

    #[test]
    fn yes_flag_skips_prompt() {
        assert!(confirm("Delete?", true).unwrap());
    }
}
