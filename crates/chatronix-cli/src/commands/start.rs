use chatronix_core::session::{start_chat, StartForm};

use crate::cli::Grant;
use crate::commands::{chat, AppContext};
use crate::device::TerminalNotifier;
use crate::error::CliError;

pub async fn run_start(
    context: &AppContext,
    name: &str,
    color: Option<&str>,
    grants: &[Grant],
) -> Result<(), CliError> {
    let form = build_form(name, color)?;
    let (backend, config) = context.backend().await?;
    let identity = backend
        .identity
        .as_ref()
        .ok_or(CliError::AuthNotConfigured)?;

    let Some(route) = start_chat(identity, &form, &TerminalNotifier).await else {
        return Err(CliError::SignInFailed);
    };
    println!("Signed in as {} ({})", route.display_name, route.user_id);

    chat::run_chat(context, backend, &config, &route, grants).await
}

pub fn build_form(name: &str, color: Option<&str>) -> Result<StartForm, CliError> {
    let form = StartForm::new(name.trim());
    match color {
        Some(color) => Ok(form.with_color(color)?),
        None => Ok(form),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatronix_core::session::DEFAULT_COLOR;

    #[test]
    fn build_form_defaults_color_and_trims_name() {
        let form = build_form("  Ada ", None).unwrap();
        assert_eq!(form.display_name, "Ada");
        assert_eq!(form.color, DEFAULT_COLOR);
    }

    #[test]
    fn build_form_rejects_unknown_color() {
        assert!(matches!(
            build_form("Ada", Some("#000000")),
            Err(CliError::Core(_))
        ));
    }
}
