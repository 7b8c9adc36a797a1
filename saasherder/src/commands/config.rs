use crate::context::AppContext;

/// Context names, one per line, in file order.
pub fn context_lines(ctx: &AppContext) -> Vec<String> {
    ctx.config
        .get_contexts()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Handle the config get-contexts subcommand
pub fn handle_get_contexts(ctx: &AppContext) {
    for line in context_lines(ctx) {
        println!("{}", line);
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
