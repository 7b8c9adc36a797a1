use crate::context::AppContext;
use libherder::snapshot::load_dir;
use libherder::{HerderError, Result, ServiceField, ServicesDir, SnapshotSource};

/// Values of `field` for the requested services, one per service.
///
/// An empty `services` list means every service of the context.
pub fn field_values(ctx: &AppContext, field: &str, services: &[String]) -> Result<Vec<String>> {
    let field: ServiceField = field.parse()?;

    let mut source = ServicesDir::new(ctx.config.clone(), &ctx.root);
    if let Some(context) = ctx.context.as_deref() {
        source.switch_context(context)?;
    }
    let snapshot = load_dir(&source.services_dir()?)?;

    snapshot
        .select(services)?
        .into_iter()
        .map(|service| {
            service.field(field).ok_or_else(|| {
                HerderError::validation(format!(
                    "Service {} has no {}",
                    service.name, field
                ))
            })
        })
        .collect()
}

/// Handle the get subcommand
pub fn handle_get(ctx: &AppContext, field: &str, services: &[String]) -> Result<()> {
    for value in field_values(ctx, field, services)? {
        println!("{}", value);
    }
    Ok(())
}

#[cfg(test)]
#[path = "get_tests.rs"]
mod tests;
