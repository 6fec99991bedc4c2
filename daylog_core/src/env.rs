//! Environment variable access with explicit missing/invalid failures.

use crate::{Error, Result};

/// Read a variable, failing when it is unset or not valid unicode
pub fn get_string(name: &str) -> Result<String> {
    optional_string(name)?.ok_or_else(|| Error::Env {
        name: name.to_string(),
        reason: "not set".into(),
    })
}

/// Read a variable as a float, failing when unset or unparsable
pub fn get_float(name: &str) -> Result<f64> {
    optional_float(name)?.ok_or_else(|| Error::Env {
        name: name.to_string(),
        reason: "not set".into(),
    })
}

/// Read a variable if it is set
pub fn optional_string(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::Env {
            name: name.to_string(),
            reason: "not valid unicode".into(),
        }),
    }
}

/// Read a variable as a float if it is set; a set but unparsable value is an error
pub fn optional_float(name: &str) -> Result<Option<f64>> {
    let Some(raw) = optional_string(name)? else {
        return Ok(None);
    };

    raw.trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|e| Error::Env {
            name: name.to_string(),
            reason: format!("{:?} is not a number: {}", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name so they can run in parallel

    #[test]
    fn test_missing_string_is_error() {
        assert!(get_string("DAYLOG_TEST_ENV_MISSING").is_err());
        assert_eq!(optional_string("DAYLOG_TEST_ENV_MISSING").unwrap(), None);
    }

    #[test]
    fn test_float_parsing() {
        std::env::set_var("DAYLOG_TEST_ENV_FLOAT", " 2.5 ");
        assert_eq!(get_float("DAYLOG_TEST_ENV_FLOAT").unwrap(), 2.5);

        std::env::set_var("DAYLOG_TEST_ENV_BAD_FLOAT", "soon");
        let err = get_float("DAYLOG_TEST_ENV_BAD_FLOAT").unwrap_err();
        assert!(err.to_string().contains("DAYLOG_TEST_ENV_BAD_FLOAT"));
    }
}
