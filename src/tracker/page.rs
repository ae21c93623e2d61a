/// What the tracker needs to know about the page currently shown.
pub trait PageContext: Send + Sync {
    /// Navigation key; a change starts a new page visit.
    fn pathname(&self) -> String;
    fn referrer(&self) -> Option<String>;
    fn user_agent(&self) -> String;
    /// Current document title, read after the title delay.
    fn title(&self) -> String;
}
