use crate::format::OutputFormatter;
use libherder::{Result, validate_template};
use std::path::Path;

/// Handle the validate subcommand; returns false when the template has errors
pub fn handle_validate(formatter: &dyn OutputFormatter, template: &Path) -> Result<bool> {
    let errors = validate_template(template)?;

    if errors.is_empty() {
        formatter.success(&format!("{} is valid", template.display()));
        return Ok(true);
    }
    for error in &errors {
        println!("{}", error);
    }
    formatter.error(&format!(
        "{} failed validation with {} error(s)",
        template.display(),
        errors.len()
    ));
    Ok(false)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
