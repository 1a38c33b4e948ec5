/// Double-faced cards gathered across a batch run, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DfcManifest {
    entries: Vec<(String, String)>,
}

impl DfcManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, deck_name: impl Into<String>, card_name: impl Into<String>) {
        self.entries.push((deck_name.into(), card_name.into()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `<deck> | <card>` line per card
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (deck, card) in &self.entries {
            out.push_str(deck);
            out.push_str(" | ");
            out.push_str(card);
            out.push('\n');
        }
        out
    }
}
