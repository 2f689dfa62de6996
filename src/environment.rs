use std::env;

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>` (empty entries are dropped)
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Retrieves an environment variable as an `f64`, falling back to a default when
/// the variable is unset or unparseable.
pub fn get_env_var_as_f64(var: &str, default: f64) -> f64 {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_entries() {
        env::set_var("NEWSDESK_TEST_VEC", "a; b ;;c");
        assert_eq!(get_env_var_as_vec("NEWSDESK_TEST_VEC", ';'), vec!["a", "b", "c"]);
        env::remove_var("NEWSDESK_TEST_VEC");
    }

    #[test]
    fn missing_var_yields_empty_vec() {
        assert!(get_env_var_as_vec("NEWSDESK_TEST_UNSET", ';').is_empty());
    }

    #[test]
    fn f64_falls_back_on_garbage() {
        env::set_var("NEWSDESK_TEST_F64", "not-a-number");
        assert_eq!(get_env_var_as_f64("NEWSDESK_TEST_F64", 90.0), 90.0);
        env::remove_var("NEWSDESK_TEST_F64");
    }
}
