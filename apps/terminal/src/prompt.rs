use ideaboard_core::session::PasswordPrompt;

/// Reads passwords from the terminal without echo.
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn ask(&mut self, message: &str) -> Option<String> {
        match rpassword::prompt_password(format!("{message} ")) {
            Ok(password) => Some(password),
            // EOF or no terminal counts as dismissing the prompt.
            Err(err) => {
                tracing::debug!(error = %err, "password prompt dismissed");
                None
            }
        }
    }
}
