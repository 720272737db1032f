pub enum Action {
    /// Text submitted from the prompt. Slash commands are answered in place,
    /// anything else starts a new repair session.
    Prompt(String),
}
