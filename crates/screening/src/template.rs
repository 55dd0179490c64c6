/// Assemble the instruction sent to the backend.
///
/// The system context, when present, is followed by a blank line; the
/// sanitized prompt always follows as a `User:` turn with an open
/// `Assistant:` turn on the next line.
pub fn build_instruction(system_context: Option<&str>, prompt: &str) -> String {
    match system_context.filter(|ctx| !ctx.is_empty()) {
        Some(ctx) => format!("{ctx}\n\nUser: {prompt}\nAssistant:"),
        None => format!("User: {prompt}\nAssistant:"),
    }
}
